//! Enumerates pack members and the objects they reference.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::data::{EntryKind, PackData};
use super::delta::apply_delta;
use super::idx::PackIndex;
use crate::error::{DumpError, Result};
use crate::object::{ObjectId, ObjectKind, referenced_ids};

/// Longest delta chain that is followed before a member is given up on.
const MAX_DELTA_DEPTH: usize = 10_000;

/// What a pack contributes to a dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackContents {
    /// Every id stored in the pack.
    pub packed: BTreeSet<ObjectId>,
    /// Ids referenced by the pack's commits and trees.
    pub references: BTreeSet<ObjectId>,
    /// Members whose references could not be extracted.
    pub failed: usize,
}

/// A pack index paired with its data file.
#[derive(Debug, Clone)]
pub struct PackReader {
    index: PackIndex,
    data: PackData,
}

impl PackReader {
    /// Pairs parsed index and data bytes.
    ///
    /// # Errors
    ///
    /// Returns `DumpError::Decode` if either file is malformed or the object
    /// counts of the two files disagree.
    pub fn new(index_bytes: &[u8], pack_bytes: Vec<u8>) -> Result<Self> {
        let index = PackIndex::parse(index_bytes)?;
        let data = PackData::parse(pack_bytes)?;

        if data.count() as usize != index.len() {
            return Err(DumpError::decode(
                "pack",
                format!(
                    "pack holds {} objects, index lists {}",
                    data.count(),
                    index.len()
                ),
            ));
        }

        Ok(Self { index, data })
    }

    /// Reads and pairs the two files from disk.
    pub fn open(index_path: &Path, pack_path: &Path) -> Result<Self> {
        let index_bytes = std::fs::read(index_path)?;
        let pack_bytes = std::fs::read(pack_path)?;
        Self::new(&index_bytes, pack_bytes)
    }

    /// Returns the pack index.
    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    /// Returns the ids stored in the pack, in index order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.index.ids()
    }

    /// Collects every packed id and the references of every commit and tree.
    ///
    /// Blob and tag members are never inflated. A member that fails to
    /// decode is logged and counted; it does not fail the pack.
    pub fn contents(&self) -> PackContents {
        let mut contents = PackContents {
            packed: self.ids().collect(),
            ..Default::default()
        };

        for &(id, offset) in self.index.entries() {
            let refs = self
                .kind_at(offset)
                .and_then(|kind| self.references_at(offset, kind));

            match refs {
                Ok(refs) => contents.references.extend(refs),
                Err(e) => {
                    warn!("Skipping pack member {}: {}", id, e);
                    contents.failed += 1;
                },
            }
        }

        debug!(
            "Pack holds {} objects referencing {} ids ({} failed)",
            contents.packed.len(),
            contents.references.len(),
            contents.failed
        );
        contents
    }

    /// Fully resolves the member with the given id.
    pub fn object(&self, id: &ObjectId) -> Result<(ObjectKind, Vec<u8>)> {
        let offset = self
            .index
            .offset_of(id)
            .ok_or_else(|| DumpError::decode("pack", format!("{id} is not in this pack")))?;
        self.resolve(offset)
    }

    fn references_at(&self, offset: u64, kind: ObjectKind) -> Result<Vec<ObjectId>> {
        if !kind.has_references() {
            return Ok(Vec::new());
        }
        let (kind, payload) = self.resolve(offset)?;
        referenced_ids(kind, &payload)
    }

    /// Follows a member's delta chain through headers only, to learn the
    /// kind of the object without inflating anything.
    fn kind_at(&self, mut offset: u64) -> Result<ObjectKind> {
        for _ in 0..MAX_DELTA_DEPTH {
            match self.data.entry_header(offset)?.kind {
                EntryKind::Base(kind) => return Ok(kind),
                EntryKind::OfsDelta { base_offset } => offset = base_offset,
                EntryKind::RefDelta { base_id } => offset = self.base_offset(&base_id)?,
            }
        }
        Err(DumpError::decode("pack", "delta chain too deep"))
    }

    /// Inflates a member, applying its delta chain from the base outwards.
    fn resolve(&self, offset: u64) -> Result<(ObjectKind, Vec<u8>)> {
        let mut deltas = Vec::new();
        let mut current = offset;

        let (kind, mut payload) = loop {
            if deltas.len() > MAX_DELTA_DEPTH {
                return Err(DumpError::decode("pack", "delta chain too deep"));
            }

            let header = self.data.entry_header(current)?;
            match header.kind {
                EntryKind::Base(kind) => break (kind, self.data.inflate(&header)?),
                EntryKind::OfsDelta { base_offset } => {
                    deltas.push(header);
                    current = base_offset;
                },
                EntryKind::RefDelta { base_id } => {
                    deltas.push(header);
                    current = self.base_offset(&base_id)?;
                },
            }
        };

        for header in deltas.iter().rev() {
            let delta = self.data.inflate(header)?;
            payload = apply_delta(&payload, &delta)?;
        }

        Ok((kind, payload))
    }

    fn base_offset(&self, base_id: &ObjectId) -> Result<u64> {
        self.index.offset_of(base_id).ok_or_else(|| {
            DumpError::decode("pack", format!("ref-delta base {base_id} is not in this pack"))
        })
    }
}

/// Reads a pack pair on the blocking pool and returns its contents.
pub async fn read_pack(index_path: PathBuf, pack_path: PathBuf) -> Result<PackContents> {
    tokio::task::spawn_blocking(move || {
        PackReader::open(&index_path, &pack_path).map(|reader| reader.contents())
    })
    .await?
}
