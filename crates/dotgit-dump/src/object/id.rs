//! SHA-1 object identifiers.

use std::fmt;
use std::str::FromStr;

use crate::error::DumpError;

/// Length of a raw SHA-1 object id.
pub const OID_LEN: usize = 20;

/// Length of a hex-encoded object id.
pub const OID_HEX_LEN: usize = 40;

/// A 20-byte object id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OID_LEN]);

impl ObjectId {
    /// Wraps raw bytes.
    pub const fn new(bytes: [u8; OID_LEN]) -> Self {
        Self(bytes)
    }

    /// Reads an id from the first 20 bytes of `slice`.
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; OID_LEN] = slice.get(..OID_LEN)?.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Parses 40 hex digits (either case).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.as_bytes();
        if hex.len() != OID_HEX_LEN {
            return None;
        }

        let mut bytes = [0u8; OID_LEN];
        for (i, pair) in hex.chunks_exact(2).enumerate() {
            bytes[i] = (hex_value(pair[0])? << 4) | hex_value(pair[1])?;
        }
        Some(Self(bytes))
    }

    /// Returns true if `token` is exactly 40 lowercase hex digits, the form
    /// git writes into refs and logs.
    pub fn is_hex_token(token: &str) -> bool {
        token.len() == OID_HEX_LEN
            && token
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; OID_LEN] {
        &self.0
    }

    /// Returns the lowercase hex form.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    /// Returns the repository-relative path of the loose object file,
    /// `.git/objects/ab/cdef...`.
    pub fn loose_path(&self) -> String {
        let hex = self.to_hex();
        format!(".git/objects/{}/{}", &hex[..2], &hex[2..])
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl FromStr for ObjectId {
    type Err = DumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
            .ok_or_else(|| DumpError::decode("object id", format!("'{s}' is not 40 hex digits")))
    }
}
