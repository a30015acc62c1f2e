//! Pack data (`.pack`) entry parsing.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::error::{DumpError, Result};
use crate::object::{MAX_OBJECT_SIZE, OID_LEN, ObjectId, ObjectKind, PREALLOC_LIMIT};

const PACK_HEADER_LEN: usize = 12;
/// 64-bit sizes need at most ten 7-bit groups.
const MAX_VARINT_BYTES: usize = 10;

/// Where a pack member's content comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A full object.
    Base(ObjectKind),
    /// A delta against the member at an earlier offset.
    OfsDelta { base_offset: u64 },
    /// A delta against the member with the given id.
    RefDelta { base_id: ObjectId },
}

/// Header of one pack member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub kind: EntryKind,
    /// Inflated size of the member (the delta itself for delta members).
    pub size: usize,
    /// Offset of the zlib stream.
    pub data_start: usize,
}

/// A validated pack data file.
#[derive(Debug, Clone)]
pub struct PackData {
    bytes: Vec<u8>,
    version: u32,
    count: u32,
}

impl PackData {
    /// Validates the `PACK` header of a data file.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::Decode` for a bad signature or version.
    pub fn parse(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < PACK_HEADER_LEN + OID_LEN || !bytes.starts_with(b"PACK") {
            return Err(DumpError::decode("pack", "missing PACK signature"));
        }

        let version = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != 2 && version != 3 {
            return Err(DumpError::decode(
                "pack",
                format!("unsupported version {version}"),
            ));
        }
        let count = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

        Ok(Self {
            bytes,
            version,
            count,
        })
    }

    /// Returns the pack format version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns the object count declared in the header.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// End of the entry region; the trailing pack checksum follows.
    fn data_end(&self) -> usize {
        self.bytes.len() - OID_LEN
    }

    /// Parses the member header at `offset`.
    pub fn entry_header(&self, offset: u64) -> Result<EntryHeader> {
        let start = usize::try_from(offset)
            .ok()
            .filter(|&o| (PACK_HEADER_LEN..self.data_end()).contains(&o))
            .ok_or_else(|| DumpError::decode("pack", format!("offset {offset} out of range")))?;

        let mut pos = start;
        let mut byte = self.byte_at(pos)?;
        pos += 1;

        let type_code = (byte >> 4) & 0x07;
        let mut size = (byte & 0x0f) as u64;
        let mut shift = 4u32;
        while byte & 0x80 != 0 {
            if pos - start >= MAX_VARINT_BYTES {
                return Err(DumpError::decode("pack", "entry header too long"));
            }
            byte = self.byte_at(pos)?;
            pos += 1;
            size |= ((byte & 0x7f) as u64) << shift;
            shift += 7;
        }

        let kind = match type_code {
            1 => EntryKind::Base(ObjectKind::Commit),
            2 => EntryKind::Base(ObjectKind::Tree),
            3 => EntryKind::Base(ObjectKind::Blob),
            4 => EntryKind::Base(ObjectKind::Tag),
            6 => {
                let distance = self.ofs_distance(&mut pos)?;
                let base_offset = offset
                    .checked_sub(distance)
                    .filter(|&b| b > 0)
                    .ok_or_else(|| {
                        DumpError::decode("pack", format!("ofs-delta at {offset} points before pack"))
                    })?;
                EntryKind::OfsDelta { base_offset }
            },
            7 => {
                let base_id = self
                    .bytes
                    .get(pos..self.data_end())
                    .and_then(ObjectId::from_slice)
                    .ok_or_else(|| DumpError::decode("pack", "truncated ref-delta base"))?;
                pos += OID_LEN;
                EntryKind::RefDelta { base_id }
            },
            other => {
                return Err(DumpError::decode(
                    "pack",
                    format!("invalid entry type {other} at {offset}"),
                ));
            },
        };

        let size = usize::try_from(size)
            .ok()
            .filter(|&s| s <= MAX_OBJECT_SIZE)
            .ok_or_else(|| {
                DumpError::decode(
                    "pack",
                    format!("entry at {offset} declares {size} bytes, limit is {MAX_OBJECT_SIZE}"),
                )
            })?;
        Ok(EntryHeader {
            kind,
            size,
            data_start: pos,
        })
    }

    /// Inflates the zlib stream of a member and checks its size.
    pub fn inflate(&self, header: &EntryHeader) -> Result<Vec<u8>> {
        let input = self
            .bytes
            .get(header.data_start..self.data_end())
            .ok_or_else(|| DumpError::decode("pack", "entry data out of range"))?;

        let mut out = Vec::with_capacity(header.size.min(PREALLOC_LIMIT));
        ZlibDecoder::new(input)
            .take(header.size as u64 + 1)
            .read_to_end(&mut out)
            .map_err(|e| DumpError::decode("pack", format!("inflate failed: {e}")))?;

        if out.len() != header.size {
            return Err(DumpError::decode(
                "pack",
                format!("entry inflated to {} bytes, header says {}", out.len(), header.size),
            ));
        }
        Ok(out)
    }

    /// Reads the negative base distance of an ofs-delta.
    fn ofs_distance(&self, pos: &mut usize) -> Result<u64> {
        let mut byte = self.byte_at(*pos)?;
        *pos += 1;
        let mut value = (byte & 0x7f) as u64;

        let mut read = 1;
        while byte & 0x80 != 0 {
            if read >= MAX_VARINT_BYTES {
                return Err(DumpError::decode("pack", "ofs-delta offset too long"));
            }
            byte = self.byte_at(*pos)?;
            *pos += 1;
            read += 1;
            value = ((value + 1) << 7) | (byte & 0x7f) as u64;
        }

        Ok(value)
    }

    fn byte_at(&self, pos: usize) -> Result<u8> {
        if pos >= self.data_end() {
            return Err(DumpError::decode("pack", "truncated entry header"));
        }
        Ok(self.bytes[pos])
    }
}
