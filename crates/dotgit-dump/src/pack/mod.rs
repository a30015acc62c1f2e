//! Pack index and pack data reading.
//!
//! Packs are read completely into memory. Only commit and tree members are
//! inflated; everything else is enumerated from the index alone.

mod data;
mod delta;
mod idx;
mod reader;

pub use data::{EntryHeader, EntryKind, PackData};
pub use delta::apply_delta;
pub use idx::PackIndex;
pub use reader::{PackContents, PackReader, read_pack};
