use serde::de::DeserializeOwned;
use serde::Serialize;

/// Default time-to-live for stored values, in seconds (one day).
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// The operation contract shared by every cache backend.
///
/// Callers program against this trait and treat backends as interchangeable.
/// A miss and an operational failure both surface as `None`/`false`, never as
/// an error the caller has to handle: a cache falling over must always leave
/// the application with a safe, cheap fallback path.
pub trait CacheAdapter {
    /// Fetch the value stored under `key`, if present, well formed and
    /// unexpired.
    ///
    /// Because the return is typed, a cached `false` (or any other falsy
    /// value) is an ordinary `Some` and is never confused with a miss.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T>;

    /// Store `value` under `key` for `ttl_secs` seconds, replacing any
    /// previous value. True iff the write completed.
    fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> bool;

    /// Store `value` only when `key` currently holds nothing valid.
    ///
    /// Check-then-act: two concurrent callers can both observe absence and
    /// both write, with the second write winning. Do not rely on this for
    /// mutual exclusion.
    fn set_if_not_exists<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) -> bool {
        if self.has(key) {
            return false;
        }
        self.set(key, value, ttl_secs)
    }

    /// Whether `key` currently holds a valid value.
    ///
    /// This performs a full `get` internally; when the value itself is
    /// needed, call `get` once instead of `has` followed by `get`.
    fn has(&self, key: &str) -> bool {
        self.get::<serde_json::Value>(key).is_some()
    }

    /// Reset the expiry of an existing record to `now + ttl_secs` without
    /// changing its value. False when the record is missing, expired or
    /// corrupt, or when the rewrite fails.
    fn renew(&self, key: &str, ttl_secs: u64) -> bool;

    /// Delete the record under `key`. True only when a record was removed.
    fn remove(&self, key: &str) -> bool;

    /// Drop every record held by this backend.
    fn flush(&self) -> bool;
}
