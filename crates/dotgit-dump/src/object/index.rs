//! Reader for the `.git/index` staging file.
//!
//! Only what a dump needs is decoded: the object id and path of every entry.
//! Extensions and the trailing checksum are ignored.

use super::id::{OID_LEN, ObjectId};
use crate::error::{DumpError, Result};

const SIGNATURE: &[u8; 4] = b"DIRC";
const HEADER_LEN: usize = 12;
/// ctime, mtime, dev, ino, mode, uid, gid, size: ten 32-bit fields.
const STAT_LEN: usize = 40;
const FLAG_EXTENDED: u16 = 0x4000;
const NAME_MASK: u16 = 0x0fff;

/// One entry of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: ObjectId,
    pub path: String,
}

/// Parses an index file of version 2, 3 or 4.
///
/// # Errors
///
/// Returns `DumpError::Decode` for a bad signature, an unsupported version
/// or a truncated entry.
pub fn read_index(data: &[u8]) -> Result<Vec<IndexEntry>> {
    if data.len() < HEADER_LEN || &data[..4] != SIGNATURE {
        return Err(DumpError::decode("index", "missing DIRC signature"));
    }

    let version = be_u32(data, 4)?;
    if !(2..=4).contains(&version) {
        return Err(DumpError::decode(
            "index",
            format!("unsupported version {version}"),
        ));
    }
    let count = be_u32(data, 8)? as usize;

    let mut entries = Vec::with_capacity(count.min(data.len() / (STAT_LEN + OID_LEN)));
    let mut pos = HEADER_LEN;
    let mut previous_path: Vec<u8> = Vec::new();

    for _ in 0..count {
        let start = pos;
        pos += STAT_LEN;

        let id = data
            .get(pos..)
            .and_then(ObjectId::from_slice)
            .ok_or_else(truncated)?;
        pos += OID_LEN;

        let flags = be_u16(data, pos)?;
        pos += 2;
        if version >= 3 && flags & FLAG_EXTENDED != 0 {
            pos += 2;
        }

        let path = if version == 4 {
            let strip = read_offset_varint(data, &mut pos)?;
            let keep = previous_path
                .len()
                .checked_sub(strip)
                .ok_or_else(|| DumpError::decode("index", "prefix strip exceeds previous path"))?;
            let suffix = read_nul_terminated(data, &mut pos)?;

            let mut path = previous_path[..keep].to_vec();
            path.extend_from_slice(suffix);
            path
        } else {
            let name_len = (flags & NAME_MASK) as usize;
            let name = if name_len < NAME_MASK as usize {
                let name = data.get(pos..pos + name_len).ok_or_else(truncated)?;
                pos += name_len;
                name
            } else {
                read_nul_terminated(data, &mut pos)?
            };
            let name = name.to_vec();

            // Entries are NUL-padded to a multiple of eight bytes.
            let fixed = pos - start - name.len();
            pos = start + ((fixed + name.len() + 8) & !7);
            if pos > data.len() {
                return Err(truncated());
            }
            name
        };

        entries.push(IndexEntry {
            id,
            path: String::from_utf8_lossy(&path).into_owned(),
        });
        previous_path = path;
    }

    Ok(entries)
}

fn truncated() -> DumpError {
    DumpError::decode("index", "truncated entry")
}

fn be_u32(data: &[u8], pos: usize) -> Result<u32> {
    data.get(pos..pos + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(truncated)
}

fn be_u16(data: &[u8], pos: usize) -> Result<u16> {
    data.get(pos..pos + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or_else(truncated)
}

/// Reads the offset-style varint used by index v4 path compression.
fn read_offset_varint(data: &[u8], pos: &mut usize) -> Result<usize> {
    let mut byte = *data.get(*pos).ok_or_else(truncated)?;
    *pos += 1;
    let mut value = (byte & 0x7f) as usize;

    while byte & 0x80 != 0 {
        byte = *data.get(*pos).ok_or_else(truncated)?;
        *pos += 1;
        value = value
            .checked_add(1)
            .and_then(|v| v.checked_mul(128))
            .map(|v| v | (byte & 0x7f) as usize)
            .ok_or_else(|| DumpError::decode("index", "varint overflow"))?;
    }

    Ok(value)
}

fn read_nul_terminated<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a [u8]> {
    let rest = data.get(*pos..).ok_or_else(truncated)?;
    let nul = rest.iter().position(|&b| b == 0).ok_or_else(truncated)?;
    *pos += nul + 1;
    Ok(&rest[..nul])
}
