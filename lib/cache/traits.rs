use std::hash::Hash;

/// Membership queries against a cache that never blocks on I/O.
pub trait SyncReadableCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Whether `key` is present. Never refreshes recency.
    fn contains(&self, key: &K) -> bool;
}

/// Write access to a cache that never blocks on I/O.
pub trait SyncWritableCache<K, V>
where
    K: Eq + Hash,
{
    /// Insert or overwrite the value for `key`.
    fn insert(&self, key: K, value: V);
}
