use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors surfaced when constructing a cache adapter.
///
/// Steady-state operations never return these: misses, expired or corrupt
/// records, and ordinary I/O trouble all fold into `None`/`false` results so
/// that cache unavailability can never crash the caller. A misconfigured
/// root, on the other hand, is a programmer error and fails construction.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache root {path} does not exist")]
    RootMissing { path: PathBuf },

    #[error("cache root {path} is not a directory")]
    RootNotADirectory { path: PathBuf },

    #[error("cache root {path} is not writable: {source}")]
    RootNotWritable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
