//! Pack index (`.idx`) parsing, versions 1 and 2.

use std::collections::HashMap;

use crate::error::{DumpError, Result};
use crate::object::{OID_LEN, ObjectId};

const V2_MAGIC: [u8; 4] = [0xff, b't', b'O', b'c'];
const FANOUT_LEN: usize = 256 * 4;
const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

/// Object id to pack offset mapping.
#[derive(Debug, Clone)]
pub struct PackIndex {
    version: u32,
    entries: Vec<(ObjectId, u64)>,
    by_id: HashMap<ObjectId, u64>,
}

impl PackIndex {
    /// Parses an index file.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::Decode` for truncated tables or an unknown version.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (version, entries) = if data.starts_with(&V2_MAGIC) {
            let version = read_u32(data, 4)?;
            if version != 2 {
                return Err(DumpError::decode(
                    "pack index",
                    format!("unsupported version {version}"),
                ));
            }
            (2, parse_v2(data)?)
        } else {
            (1, parse_v1(data)?)
        };

        let by_id = entries.iter().copied().collect();
        Ok(Self {
            version,
            entries,
            by_id,
        })
    }

    /// Returns the index format version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns the number of objects in the pack.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the pack has no objects.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the ids in index order (sorted).
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Returns `(id, offset)` pairs in index order.
    pub fn entries(&self) -> &[(ObjectId, u64)] {
        &self.entries
    }

    /// Returns the pack offset of `id`.
    pub fn offset_of(&self, id: &ObjectId) -> Option<u64> {
        self.by_id.get(id).copied()
    }
}

fn parse_v1(data: &[u8]) -> Result<Vec<(ObjectId, u64)>> {
    let count = object_count(data, 0)?;
    let table = FANOUT_LEN;
    let record = 4 + OID_LEN;

    (0..count)
        .map(|i| {
            let pos = table + i * record;
            let offset = read_u32(data, pos)? as u64;
            let id = read_id(data, pos + 4)?;
            Ok((id, offset))
        })
        .collect()
}

fn parse_v2(data: &[u8]) -> Result<Vec<(ObjectId, u64)>> {
    let fanout = 8;
    let count = object_count(data, fanout)?;

    let ids_at = fanout + FANOUT_LEN;
    let crcs_at = ids_at + count * OID_LEN;
    let offsets_at = crcs_at + count * 4;
    let large_at = offsets_at + count * 4;

    (0..count)
        .map(|i| {
            let id = read_id(data, ids_at + i * OID_LEN)?;
            let small = read_u32(data, offsets_at + i * 4)?;
            let offset = if small & LARGE_OFFSET_FLAG != 0 {
                let slot = (small & !LARGE_OFFSET_FLAG) as usize;
                read_u64(data, large_at + slot * 8)?
            } else {
                small as u64
            };
            Ok((id, offset))
        })
        .collect()
}

/// The last fanout slot holds the total object count.
fn object_count(data: &[u8], fanout_at: usize) -> Result<usize> {
    let count = read_u32(data, fanout_at + FANOUT_LEN - 4)? as usize;
    if count > data.len() / OID_LEN {
        return Err(DumpError::decode(
            "pack index",
            format!("object count {count} exceeds file size"),
        ));
    }
    Ok(count)
}

fn read_u32(data: &[u8], pos: usize) -> Result<u32> {
    data.get(pos..pos + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(truncated)
}

fn read_u64(data: &[u8], pos: usize) -> Result<u64> {
    let hi = read_u32(data, pos)? as u64;
    let lo = read_u32(data, pos + 4)? as u64;
    Ok((hi << 32) | lo)
}

fn read_id(data: &[u8], pos: usize) -> Result<ObjectId> {
    data.get(pos..)
        .and_then(ObjectId::from_slice)
        .ok_or_else(truncated)
}

fn truncated() -> DumpError {
    DumpError::decode("pack index", "truncated table")
}
