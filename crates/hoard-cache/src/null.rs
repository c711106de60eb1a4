use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::adapter::CacheAdapter;

/// Adapter that never stores anything.
///
/// Useful when a deployment wants caching off without changing call sites:
/// every read is a miss and every mutation reports failure.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullCache;

impl CacheAdapter for NullCache {
    fn get<T: DeserializeOwned>(&self, _key: &str) -> Option<T> {
        None
    }

    fn set<T: Serialize>(&self, _key: &str, _value: &T, _ttl_secs: u64) -> bool {
        false
    }

    fn set_if_not_exists<T: Serialize>(&self, _key: &str, _value: &T, _ttl_secs: u64) -> bool {
        false
    }

    fn has(&self, _key: &str) -> bool {
        false
    }

    fn renew(&self, _key: &str, _ttl_secs: u64) -> bool {
        false
    }

    fn remove(&self, _key: &str) -> bool {
        false
    }

    fn flush(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_operation_is_a_miss_or_failure() {
        let cache = NullCache;
        assert!(!cache.set("k", &"v", 60));
        assert_eq!(cache.get::<String>("k"), None);
        assert!(!cache.has("k"));
        assert!(!cache.set_if_not_exists("k", &"v", 60));
        assert!(!cache.renew("k", 60));
        assert!(!cache.remove("k"));
        assert!(!cache.flush());
    }
}
