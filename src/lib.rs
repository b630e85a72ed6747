//! Git-compatible plumbing: a content-addressed loose-object database, the
//! index binary format, and the repository layout that ties them together.
//!
//! The split mirrors the on-disk reality:
//! - [`objects`] is the pure data model with per-kind serialization
//! - [`codec`] frames payloads as `"<type> <len>\0<bytes>"`, the form the
//!   identifier hash and the compressor both consume
//! - [`store`] persists frames zlib-deflated under `objects/<xx>/<rest>`
//! - [`index`] reads and writes the staging area byte-for-byte
//! - [`repository`] finds and initialises the `.git` directory
//! - [`ops`] are the plumbing operations the CLI drives

pub mod codec;
pub mod errors;
pub mod hash;
pub mod index;
pub mod objects;
pub mod ops;
pub mod repository;
pub mod store;
pub mod utils;

pub use errors::{Error, Result};
pub use index::{Index, IndexEntry};
pub use objects::{Blob, Commit, Object, ObjectId, ObjectType, Tag, Tree};
pub use repository::{Repository, SetupOptions};
pub use store::ObjectStore;
