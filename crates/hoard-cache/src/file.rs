use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::adapter::CacheAdapter;
use crate::digest::KeyDigest;
use crate::error::CacheError;
use crate::fs_util::{
    atomic_write, ensure_path, now_secs, read_record_file, remove_file_best_effort, remove_tree,
};
use crate::record::{decode_record, encode_record};

/// Fixed filename tag in front of every record digest, so a human poking
/// around the cache tree can tell what wrote the files.
const RECORD_FILE_TAG: &str = "hfs_";

/// Configuration for [`FileCache`].
#[derive(Clone, Debug, Default)]
pub struct FileCacheConfig {
    /// Existing, writable directory that will hold the record tree. The
    /// adapter owns this tree exclusively.
    pub path: PathBuf,
    /// Optional namespace mixed into every key digest, so multiple logical
    /// caches can share one root directory without colliding.
    pub key_prefix: Option<String>,
}

/// Filesystem-backed cache adapter.
///
/// Each entry is one record file at `<root>/<xx>/<yy>/hfs_<digest>`, where
/// `<digest>` is the lowercase-hex SHA-256 of the (optionally prefixed) key
/// and `<xx>`/`<yy>` are its first four hex chars. A record holds the ASCII
/// decimal expiry timestamp, one `\n`, then the JSON-serialized value.
///
/// Shard directories are created lazily by writers; readers never create
/// directories. Expired and corrupt records are deleted eagerly when a read
/// runs into them.
#[derive(Clone, Debug)]
pub struct FileCache {
    root: PathBuf,
    key_prefix: Option<String>,
}

impl FileCache {
    /// Validates that `config.path` names an existing, writable directory.
    ///
    /// A misconfigured root is the only failure this adapter ever surfaces
    /// as an error; every steady-state operation folds filesystem trouble
    /// into a miss instead.
    pub fn new(config: FileCacheConfig) -> Result<Self, CacheError> {
        let root = config.path;
        let meta = match fs::metadata(&root) {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(CacheError::RootMissing { path: root });
            }
            Err(err) => return Err(CacheError::Io(err)),
        };
        if !meta.is_dir() {
            return Err(CacheError::RootNotADirectory { path: root });
        }
        if let Err(err) = probe_writable(&root) {
            return Err(CacheError::RootNotWritable { path: root, source: err });
        }

        Ok(Self {
            root,
            key_prefix: config.key_prefix,
        })
    }

    /// Root directory exclusively owned by this adapter.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk path of the record for `key`. Exposed for inspection and
    /// tests; the file may or may not exist.
    pub fn record_path(&self, key: &str) -> PathBuf {
        let digest = self.digest(key);
        self.root
            .join(digest.shard_path())
            .join(format!("{RECORD_FILE_TAG}{digest}"))
    }

    fn digest(&self, key: &str) -> KeyDigest {
        match &self.key_prefix {
            Some(prefix) => {
                let mut bytes = Vec::with_capacity(prefix.len() + key.len());
                bytes.extend_from_slice(prefix.as_bytes());
                bytes.extend_from_slice(key.as_bytes());
                KeyDigest::from_bytes(bytes)
            }
            None => KeyDigest::from_bytes(key.as_bytes()),
        }
    }

    fn write_record(&self, key: &str, payload: &str, ttl_secs: u64) -> bool {
        let digest = self.digest(key);
        let shard = digest.shard_path();
        if !ensure_path(&self.root, &shard) {
            return false;
        }

        let path = self
            .root
            .join(shard)
            .join(format!("{RECORD_FILE_TAG}{digest}"));
        let content = encode_record(now_secs().saturating_add(ttl_secs), payload);
        match atomic_write(&path, content.as_bytes()) {
            Ok(()) => true,
            Err(err) => {
                // A shard directory vanishing mid-write (flush race) lands
                // here too; both are ordinary failed writes.
                tracing::debug!(
                    target = "hoard.cache",
                    path = %path.display(),
                    error = %err,
                    "failed to write record file"
                );
                false
            }
        }
    }
}

impl CacheAdapter for FileCache {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.record_path(key);
        let content = read_record_file(&path)?;
        if content.is_empty() {
            return None;
        }

        let record = match decode_record(&content) {
            Ok(record) => record,
            Err(err) => {
                tracing::debug!(
                    target = "hoard.cache",
                    path = %path.display(),
                    error = %err,
                    "corrupt record; dropping it"
                );
                remove_file_best_effort(&path, "get.corrupt_record");
                return None;
            }
        };

        if record.expires_at <= now_secs() {
            remove_file_best_effort(&path, "get.expired_record");
            return None;
        }

        match serde_json::from_str(record.payload) {
            Ok(value) => Some(value),
            Err(err) => {
                // Either real corruption or a payload the caller's type can
                // no longer represent; both degrade to a miss.
                tracing::debug!(
                    target = "hoard.cache",
                    path = %path.display(),
                    error = %err,
                    "undeserializable record payload; dropping it"
                );
                remove_file_best_effort(&path, "get.undeserializable_payload");
                None
            }
        }
    }

    fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> bool {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::debug!(
                    target = "hoard.cache",
                    error = %err,
                    "failed to serialize cache value"
                );
                return false;
            }
        };
        self.write_record(key, &payload, ttl_secs)
    }

    fn renew(&self, key: &str, ttl_secs: u64) -> bool {
        let path = self.record_path(key);
        let Some(content) = read_record_file(&path) else {
            return false;
        };
        if content.is_empty() {
            return false;
        }

        let record = match decode_record(&content) {
            Ok(record) => record,
            Err(err) => {
                tracing::debug!(
                    target = "hoard.cache",
                    path = %path.display(),
                    error = %err,
                    "corrupt record; dropping it"
                );
                remove_file_best_effort(&path, "renew.corrupt_record");
                return false;
            }
        };

        if record.expires_at <= now_secs() {
            remove_file_best_effort(&path, "renew.expired_record");
            return false;
        }
        if serde_json::from_str::<serde::de::IgnoredAny>(record.payload).is_err() {
            remove_file_best_effort(&path, "renew.undeserializable_payload");
            return false;
        }

        // Read-then-write, not atomic: a concurrent remove between the read
        // above and this write can resurrect the record.
        self.write_record(key, record.payload, ttl_secs)
    }

    fn remove(&self, key: &str) -> bool {
        let path = self.record_path(key);
        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(err) if err.kind() == io::ErrorKind::NotFound => false,
            Err(err) => {
                tracing::debug!(
                    target = "hoard.cache",
                    path = %path.display(),
                    error = %err,
                    "failed to remove record file"
                );
                false
            }
        }
    }

    fn flush(&self) -> bool {
        if let Err(err) = remove_tree(&self.root) {
            tracing::debug!(
                target = "hoard.cache",
                root = %self.root.display(),
                error = %err,
                "failed to delete cache tree"
            );
            return false;
        }
        match fs::create_dir(&self.root) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(
                    target = "hoard.cache",
                    root = %self.root.display(),
                    error = %err,
                    "failed to recreate cache root"
                );
                false
            }
        }
    }
}

/// The only reliable portable writability check is to write: open an
/// anonymous tempfile in `root` and let RAII clean it up.
fn probe_writable(root: &Path) -> io::Result<()> {
    tempfile::tempfile_in(root).map(drop)
}
