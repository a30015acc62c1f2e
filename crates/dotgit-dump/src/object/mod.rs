//! The subset of the git object model a dump needs.

mod id;
mod index;
mod loose;

pub use id::{OID_HEX_LEN, OID_LEN, ObjectId};
pub use index::{IndexEntry, read_index};
pub(crate) use loose::PREALLOC_LIMIT;
pub use loose::{LooseObject, MAX_OBJECT_SIZE, ObjectKind, referenced_ids};
