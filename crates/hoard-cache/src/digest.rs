use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

/// A stable SHA-256 digest of a cache key, stored as a lowercase hex string.
///
/// Digests name record files on disk, so they only need to be deterministic
/// and well distributed; nothing here is security sensitive.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyDigest(String);

impl KeyDigest {
    /// Compute the digest of an arbitrary byte slice.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes.as_ref());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Two-level shard directory for this digest: the first two hex chars,
    /// then the next two. Sharding bounds the number of record files any
    /// single directory accumulates.
    pub fn shard_path(&self) -> PathBuf {
        // SHA-256 hex is always 64 chars; anything shorter is a bug in this
        // type, not a runtime condition.
        debug_assert!(self.0.len() >= 4, "digest too short to shard: {}", self.0);
        PathBuf::from(&self.0[0..2]).join(&self.0[2..4])
    }
}

impl fmt::Display for KeyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_across_calls() {
        let a = KeyDigest::from_bytes("alpha");
        let b = KeyDigest::from_bytes("alpha");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_keys_produce_distinct_digests() {
        assert_ne!(KeyDigest::from_bytes("alpha"), KeyDigest::from_bytes("beta"));
        assert_ne!(KeyDigest::from_bytes("a"), KeyDigest::from_bytes("aa"));
        assert_ne!(KeyDigest::from_bytes(""), KeyDigest::from_bytes(" "));
    }

    #[test]
    fn digest_is_fixed_width_lowercase_hex() {
        for key in ["", "k", "a much longer key with spaces and ünicode"] {
            let digest = KeyDigest::from_bytes(key);
            assert_eq!(digest.as_str().len(), 64);
            assert!(digest
                .as_str()
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn shard_path_uses_first_four_chars() {
        let digest = KeyDigest::from_bytes("alpha");
        let hex = digest.as_str();
        let expected = PathBuf::from(&hex[0..2]).join(&hex[2..4]);
        assert_eq!(digest.shard_path(), expected);
    }
}
