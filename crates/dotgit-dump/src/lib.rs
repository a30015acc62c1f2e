//! # dotgit Dump Engine
//!
//! Reconstructs a git repository from a web server that exposes its `.git`
//! directory.
//!
//! ## Features
//!
//! - Presence probe on `.git/HEAD` and strategy selection
//! - Recursive download when `.git/` is browsable
//! - Blind enumeration otherwise: well-known files, ref discovery, packs and
//!   transitive loose object fetching
//! - Loose object, index and pack (including deltas) decoding
//! - Path traversal checks on every server-supplied path
//! - Config sanitizing and a hardened `git checkout` of the result
//!
//! ## Example
//!
//! ```ignore
//! use dotgit_core::DumpJob;
//! use dotgit_dump::Dumper;
//!
//! let job = DumpJob::builder()
//!     .url("https://target.example/")
//!     .destination("/tmp/dumps/target.example")
//!     .retries(2)
//!     .build()?;
//!
//! let outcome = Dumper::new(job)?.run().await;
//! assert!(outcome.is_success());
//! ```

pub mod dumper;
pub mod error;
pub mod fetch;
pub mod frontier;
pub mod object;
pub mod pack;
pub mod sanitize;
pub mod transport;

// Re-exports
pub use dumper::{BlindSummary, CheckoutMode, DestinationLock, Dumper, Strategy, dump};
pub use error::{DumpError, Result};
pub use fetch::{DirectoryFetcher, FetchContext, FileFetcher, ObjectFetcher, RefFinder};
pub use frontier::{Frontier, TaskHandler};
pub use object::{LooseObject, ObjectId, ObjectKind};
pub use pack::{PackContents, PackReader, read_pack};
pub use sanitize::ConfigSanitizer;
pub use transport::{FetchResponse, HttpTransport, Transport};

// Re-export dotgit_core for consumers
pub use dotgit_core;
