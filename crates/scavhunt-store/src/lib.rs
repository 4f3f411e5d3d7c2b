//! Store adapters for scavhunt.
//!
//! Two remote backends sit under the service, both high-latency HTTP APIs:
//!
//! - a **tabular store** (a workbook of named tables), wrapped by the
//!   [`TableApi`] trait with row/column addressing, batched reads and
//!   single-cell writes;
//! - a **blob store** for uploaded media, wrapped by the [`BlobApi`] trait
//!   and the higher-level [`MediaStore`] adapter (variants, prefix listing,
//!   signed URLs with a TTL cache).
//!
//! Each trait has an HTTP implementation ([`SheetsClient`],
//! [`BucketClient`]) and an in-memory implementation ([`MemoryTables`],
//! [`MemoryBucket`]) for tests.
//!
//! # Consistency
//!
//! Neither backend is transactional. A single cell write or object put is
//! atomic; anything spanning two calls is not, and **no call is retried
//! here**: the backends already back off transparently, and a retry on an
//! ambiguous failure (a write that landed but timed out on the response)
//! would double-write. Every failure surfaces immediately as a
//! [`StoreError`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod blob;
pub mod bucket;
pub mod error;
pub mod media;
pub mod memory;
pub mod sheets;
pub mod table;
pub mod url_cache;

pub use blob::{BlobApi, ObjectInfo};
pub use bucket::BucketClient;
pub use error::{Result, StoreError};
pub use media::MediaStore;
pub use memory::{MemoryBucket, MemoryTables};
pub use sheets::SheetsClient;
pub use table::{Table, TableApi};
pub use url_cache::SignedUrlCache;
