//! Loose object decoding and reference extraction.
//!
//! A loose object file is a zlib stream whose plaintext is
//! `"<kind> <size>\0<payload>"`. Only commits and trees reference other
//! objects; blobs and tags are leaves for the purpose of a dump.

use std::fmt;
use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use super::id::{OID_LEN, ObjectId};
use crate::error::{DumpError, Result};

/// Largest object payload accepted from a server.
pub const MAX_OBJECT_SIZE: usize = 256 * 1024 * 1024;

/// Cap on buffer preallocation from a declared size.
pub(crate) const PREALLOC_LIMIT: usize = 1024 * 1024;

/// `"commit 18446744073709551615"` fits with room to spare.
const MAX_HEADER_LEN: usize = 32;

/// The four object kinds of the git object model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl ObjectKind {
    /// Parses the kind name used in loose object headers.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"commit" => Some(Self::Commit),
            b"tree" => Some(Self::Tree),
            b"blob" => Some(Self::Blob),
            b"tag" => Some(Self::Tag),
            _ => None,
        }
    }

    /// Returns the header name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }

    /// Returns true for kinds that reference other objects.
    pub fn has_references(self) -> bool {
        matches!(self, Self::Commit | Self::Tree)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded loose object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooseObject {
    pub kind: ObjectKind,
    pub payload: Vec<u8>,
}

impl LooseObject {
    /// Inflates and header-parses a loose object file.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::Decode` for anything that is not a zlib stream
    /// with a well-formed header whose declared size matches the payload.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let mut decoder = ZlibDecoder::new(raw);
        let header = read_header(&mut decoder)?;

        let space = header
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| DumpError::decode("loose object", "malformed header"))?;
        let kind = ObjectKind::from_name(&header[..space]).ok_or_else(|| {
            DumpError::decode(
                "loose object",
                format!("unknown kind '{}'", String::from_utf8_lossy(&header[..space])),
            )
        })?;

        let size: usize = std::str::from_utf8(&header[space + 1..])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| DumpError::decode("loose object", "malformed size"))?;
        if size > MAX_OBJECT_SIZE {
            return Err(DumpError::decode(
                "loose object",
                format!("declared size {size} exceeds limit {MAX_OBJECT_SIZE}"),
            ));
        }

        let mut payload = Vec::with_capacity(size.min(PREALLOC_LIMIT));
        decoder
            .take(size as u64 + 1)
            .read_to_end(&mut payload)
            .map_err(|e| DumpError::decode("loose object", format!("inflate failed: {e}")))?;
        if payload.len() != size {
            return Err(DumpError::decode(
                "loose object",
                format!("declared size {size}, found {}", payload.len()),
            ));
        }

        Ok(Self { kind, payload })
    }

    /// Compresses the object into loose file form.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        write!(encoder, "{} {}\0", self.kind, self.payload.len())?;
        encoder.write_all(&self.payload)?;
        Ok(encoder.finish()?)
    }

    /// Returns the ids this object references.
    pub fn references(&self) -> Result<Vec<ObjectId>> {
        referenced_ids(self.kind, &self.payload)
    }
}

/// Reads the `<kind> <size>` header up to its NUL terminator.
fn read_header(decoder: &mut impl Read) -> Result<Vec<u8>> {
    let mut header = Vec::with_capacity(MAX_HEADER_LEN);
    let mut byte = [0u8; 1];
    loop {
        decoder.read_exact(&mut byte).map_err(|e| {
            DumpError::decode("loose object", format!("missing header terminator: {e}"))
        })?;
        if byte[0] == 0 {
            return Ok(header);
        }
        if header.len() == MAX_HEADER_LEN {
            return Err(DumpError::decode("loose object", "header too long"));
        }
        header.push(byte[0]);
    }
}

/// Returns the ids referenced by an object payload of the given kind:
/// tree and parents for a commit, every entry for a tree, nothing otherwise.
pub fn referenced_ids(kind: ObjectKind, payload: &[u8]) -> Result<Vec<ObjectId>> {
    match kind {
        ObjectKind::Commit => commit_references(payload),
        ObjectKind::Tree => tree_references(payload),
        ObjectKind::Blob | ObjectKind::Tag => Ok(Vec::new()),
    }
}

fn commit_references(payload: &[u8]) -> Result<Vec<ObjectId>> {
    let mut tree = None;
    let mut parents = Vec::new();

    for line in payload.split(|&b| b == b'\n') {
        if line.is_empty() {
            break;
        }
        if let Some(hex) = line.strip_prefix(b"tree ") {
            tree = Some(parse_header_id(hex, "tree")?);
        } else if let Some(hex) = line.strip_prefix(b"parent ") {
            parents.push(parse_header_id(hex, "parent")?);
        }
    }

    let tree = tree.ok_or_else(|| DumpError::decode("commit", "missing tree line"))?;
    let mut ids = Vec::with_capacity(parents.len() + 1);
    ids.push(tree);
    ids.extend(parents);
    Ok(ids)
}

fn parse_header_id(hex: &[u8], field: &str) -> Result<ObjectId> {
    std::str::from_utf8(hex)
        .ok()
        .and_then(|s| ObjectId::from_hex(s.trim_end_matches('\r')))
        .ok_or_else(|| DumpError::decode("commit", format!("malformed {field} id")))
}

fn tree_references(payload: &[u8]) -> Result<Vec<ObjectId>> {
    let mut ids = Vec::new();
    let mut rest = payload;

    while !rest.is_empty() {
        let nul = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| DumpError::decode("tree", "truncated entry name"))?;
        if !rest[..nul].contains(&b' ') {
            return Err(DumpError::decode("tree", "entry without mode"));
        }

        let id_start = nul + 1;
        let id = ObjectId::from_slice(&rest[id_start..])
            .ok_or_else(|| DumpError::decode("tree", "truncated entry id"))?;
        ids.push(id);
        rest = &rest[id_start + OID_LEN..];
    }

    Ok(ids)
}
