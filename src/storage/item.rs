//! Cache Items
//!
//! A [`CacheItem`] is one stored entry: the caller's key and value plus the
//! bookkeeping the expiration sweep needs (lifespan, creation time, last
//! access time, access count).
//!
//! ## Why a second lock?
//!
//! The access-time bookkeeping lives behind the item's *own* `RwLock`,
//! separate from the table-wide lock. A `get` only needs the table's read
//! lock for the map lookup itself; updating `accessed_at`/`access_count`
//! happens afterwards under the item lock, so read-heavy workloads never
//! queue up behind the table's write lock just to record an access.

use bytes::Bytes;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Access bookkeeping, guarded by the item's own lock.
#[derive(Debug, Clone, Copy)]
struct AccessLog {
    /// Timestamp of the last successful read (starts at creation time)
    accessed_at: Instant,
    /// Number of successful reads
    access_count: u64,
}

/// A single stored cache entry.
///
/// Items are created by [`CacheTable::set`](crate::CacheTable::set) and handed
/// out as `Arc<CacheItem>` from `get` and `delete`. A later `set` under the
/// same key replaces the whole item - counters included - while existing
/// holders of the old `Arc` keep a valid (if stale) snapshot.
///
/// All fields are read-only from the outside; only the cache itself records
/// accesses.
#[derive(Debug)]
pub struct CacheItem {
    /// The caller-supplied key (opaque to the cache)
    key: Bytes,
    /// The caller-supplied value (opaque to the cache)
    value: Bytes,
    /// Duration after which the item may be swept if unaccessed.
    /// `Duration::ZERO` means the item is exempt from expiration.
    lifespan: Duration,
    /// When this item was created; set once, never mutated
    created_at: Instant,
    /// Access bookkeeping under its own lock
    access: RwLock<AccessLog>,
}

impl CacheItem {
    /// Creates a new item. Access time starts equal to the creation time.
    pub(crate) fn new(key: Bytes, value: Bytes, lifespan: Duration) -> Self {
        let now = Instant::now();
        Self {
            key,
            value,
            lifespan,
            created_at: now,
            access: RwLock::new(AccessLog {
                accessed_at: now,
                access_count: 0,
            }),
        }
    }

    /// Records a successful read: bumps the access count and moves the
    /// access time forward, which also pushes the expiry deadline out.
    pub(crate) fn touch(&self) {
        let mut access = self.access.write().unwrap();
        access.accessed_at = Instant::now();
        access.access_count += 1;
    }

    /// The item's key.
    pub fn key(&self) -> Bytes {
        self.key.clone()
    }

    /// The stored value.
    pub fn value(&self) -> Bytes {
        self.value.clone()
    }

    /// The item's lifespan. `Duration::ZERO` means it never expires.
    pub fn lifespan(&self) -> Duration {
        self.lifespan
    }

    /// When the item was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When the item was last read (creation time if never read).
    pub fn accessed_at(&self) -> Instant {
        self.access.read().unwrap().accessed_at
    }

    /// How many times the item has been read.
    pub fn access_count(&self) -> u64 {
        self.access.read().unwrap().access_count
    }
}
