//! Uniform cache access over interchangeable backends.
//!
//! Application code programs against the [`CacheAdapter`] trait
//! (`get`/`set`/`set_if_not_exists`/`has`/`renew`/`remove`/`flush`) and picks
//! a backend at configuration time:
//! - [`FileCache`] — filesystem-backed records, the only backend that
//!   implements real storage logic itself
//! - [`MemoryCache`] — in-process map, no persistence
//! - [`NullCache`] — caching disabled, every read is a miss
//!
//! Misses, expired or corrupt records, and ordinary I/O failures all fold
//! into `None`/`false` results; only constructing an adapter against a
//! misconfigured root returns a [`CacheError`].
//!
//! ## On-disk layout ([`FileCache`])
//!
//! Records live under the configured root, sharded two levels deep by digest
//! prefix so no single directory accumulates too many files:
//!
//! ```text
//! <root>/<d[0..2]>/<d[2..4]>/hfs_<digest>
//! ```
//!
//! where `<digest>` is the lowercase-hex SHA-256 of the (optionally
//! prefixed) cache key. Each record file holds the ASCII decimal expiry
//! timestamp (UNIX seconds), a single `\n`, then the JSON-serialized value.

mod adapter;
mod digest;
mod error;
mod file;
mod fs_util;
mod memory;
mod null;
mod record;

pub use adapter::{CacheAdapter, DEFAULT_TTL_SECS};
pub use digest::KeyDigest;
pub use error::{CacheError, Result};
pub use file::{FileCache, FileCacheConfig};
pub use fs_util::RECORD_SIZE_LIMIT_BYTES;
pub use memory::MemoryCache;
pub use null::NullCache;
