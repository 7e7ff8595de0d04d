//! Cache Tables
//!
//! A [`CacheTable`] owns a map from key to [`CacheItem`] and runs the lazy,
//! self-rescheduling expiration sweep that removes entries whose lifespan has
//! elapsed.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     CacheTable                       │
//! │  ┌────────────────── RwLock ─────────────────────┐   │
//! │  │ items: HashMap<Bytes, Arc<CacheItem>>         │   │
//! │  │ deadline: Duration  (ZERO = no sweep pending) │   │
//! │  │ sweep: Option<OneShot>  (at most one)         │   │
//! │  └───────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────┘
//!                          ▲
//!                          │ fires after the minimum
//!                          │ remaining lifespan
//!               ┌──────────┴──────────┐
//!               │   OneShot timer     │
//!               │ (background task)   │
//!               └─────────────────────┘
//! ```
//!
//! Readers (`get`, `exists`, `count`, `for_each`) take the lock in shared
//! mode; writers (`set`, `delete`, `delete_all`) and the sweep take it in
//! exclusive mode. Access-time bookkeeping on `get` happens under the item's
//! own lock, after the table lock is released.
//!
//! ## Expiration Sweep
//!
//! Rather than polling on a fixed interval, the table remembers the shortest
//! remaining lifespan it saw on the last sweep (`deadline`) and schedules
//! exactly one timer for that moment. Inserting an item whose lifespan
//! undercuts the scheduled wake-up triggers an immediate re-sweep, so the
//! shortest TTL is always honored. When nothing finite is stored, no timer
//! runs at all.

use crate::error::{CacheError, CacheResult};
use crate::storage::item::CacheItem;
use crate::storage::timer::OneShot;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::{debug, trace};

/// Lifespan assigned to items stored with a negative TTL ("never expire").
///
/// Roughly 100 years. Items carrying this sentinel still participate in the
/// sweep like any other finite lifespan; only `Duration::ZERO` exempts an
/// item entirely.
pub const INFINITE_LIFESPAN: Duration = Duration::from_secs(3_155_760_000);

/// Everything guarded by the table's read/write lock.
#[derive(Debug)]
struct TableState {
    /// The stored items
    items: HashMap<Bytes, Arc<CacheItem>>,
    /// Shortest remaining lifespan observed at the last sweep.
    /// `Duration::ZERO` means no sweep is currently scheduled.
    deadline: Duration,
    /// The single outstanding sweep timer, if any
    sweep: Option<OneShot>,
}

/// A named cache table with per-item TTL support.
///
/// Tables are created through a [`CacheRegistry`](crate::CacheRegistry)
/// (usually via [`cache`](crate::cache())) and shared as `Arc<CacheTable>`.
/// All operations take `&self` and are safe to call from any thread.
///
/// # Runtime
///
/// A table captures the current Tokio runtime handle at creation time and
/// uses it to schedule expiration sweeps, so `CacheTable::new` must be called
/// from within a runtime. Operations afterwards may come from any thread,
/// async or not.
///
/// # Example
///
/// ```
/// use embercache::CacheTable;
/// use bytes::Bytes;
///
/// #[tokio::main]
/// async fn main() {
///     let table = CacheTable::new("sessions");
///
///     // Store for 60 seconds
///     table.set(Bytes::from("token"), Bytes::from("abc123"), 60);
///
///     let item = table.get(&Bytes::from("token")).unwrap();
///     assert_eq!(item.value(), Bytes::from("abc123"));
/// }
/// ```
#[derive(Debug)]
pub struct CacheTable {
    /// The table's name, immutable after creation
    name: String,

    /// Handle to the runtime that runs the sweep timers
    runtime: Handle,

    /// Self-reference handed to sweep timers so a fired callback can re-run
    /// the sweep on the owning table
    me: Weak<CacheTable>,

    /// Item map plus sweep bookkeeping, under the table lock
    state: RwLock<TableState>,

    /// Statistics: total SET operations
    set_count: AtomicU64,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: GET operations that found a live item
    hit_count: AtomicU64,

    /// Statistics: items removed by explicit delete
    del_count: AtomicU64,

    /// Statistics: items removed by the expiration sweep
    expired_count: AtomicU64,
}

impl CacheTable {
    /// Creates a new, empty table with the given name.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime (the table needs a runtime
    /// handle to schedule its expiration sweeps).
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            name: name.to_string(),
            runtime: Handle::current(),
            me: me.clone(),
            state: RwLock::new(TableState {
                items: HashMap::new(),
                deadline: Duration::ZERO,
                sweep: None,
            }),
            set_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        })
    }

    /// The table's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stores a key-value pair with a lifespan given in whole seconds.
    ///
    /// A negative `lifespan_secs` means "never expire" and is mapped to
    /// [`INFINITE_LIFESPAN`]. Zero also exempts the item from expiration;
    /// positive values are taken literally as seconds until expiry.
    ///
    /// Any existing item under `key` is replaced unconditionally, counters
    /// and all.
    pub fn set(&self, key: Bytes, value: Bytes, lifespan_secs: i64) {
        let lifespan = if lifespan_secs < 0 {
            INFINITE_LIFESPAN
        } else {
            Duration::from_secs(lifespan_secs as u64)
        };
        self.set_with_lifespan(key, value, lifespan);
    }

    /// Stores a key-value pair with an exact lifespan.
    ///
    /// `Duration::ZERO` exempts the item from expiration. This is the
    /// finer-grained sibling of [`set`](CacheTable::set) for callers that
    /// need sub-second lifespans.
    pub fn set_with_lifespan(&self, key: Bytes, value: Bytes, lifespan: Duration) {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let item = Arc::new(CacheItem::new(key.clone(), value, lifespan));

        let deadline = {
            let mut state = self.state.write().unwrap();
            trace!(
                table = %self.name,
                key = ?key,
                lifespan_ms = lifespan.as_millis() as u64,
                "item stored"
            );
            state.items.insert(key, item);
            state.deadline
        };

        // An item that can expire sooner than the scheduled wake-up (or when
        // nothing is scheduled at all) forces an immediate re-sweep so the
        // shortest TTL is honored.
        if !lifespan.is_zero() && (deadline.is_zero() || lifespan < deadline) {
            self.expiration_check();
        }
    }

    /// Returns the item stored under `key`, recording the access.
    ///
    /// The access bump happens under the item's own lock after the table
    /// lock is released, so `get` never blocks writers for longer than the
    /// map lookup itself. Reading an item pushes its expiry deadline out
    /// (lifespans count from the last access).
    ///
    /// # Errors
    ///
    /// [`CacheError::KeyNotFound`] if no live item exists under `key`. An
    /// item that expired and was swept is indistinguishable from one that
    /// was never stored.
    pub fn get(&self, key: &Bytes) -> CacheResult<Arc<CacheItem>> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let item = {
            let state = self.state.read().unwrap();
            state.items.get(key).cloned()
        };

        match item {
            Some(item) => {
                item.touch();
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Ok(item)
            }
            None => Err(CacheError::KeyNotFound),
        }
    }

    /// Removes the item stored under `key` and returns it.
    ///
    /// # Errors
    ///
    /// [`CacheError::KeyNotFound`] if no item exists under `key`.
    pub fn delete(&self, key: &Bytes) -> CacheResult<Arc<CacheItem>> {
        let mut state = self.state.write().unwrap();
        let item = self.remove_locked(&mut state, key)?;
        self.del_count.fetch_add(1, Ordering::Relaxed);
        Ok(item)
    }

    /// Removes every item, resets the sweep bookkeeping, and cancels any
    /// pending sweep timer so it cannot fire against the cleared table.
    pub fn delete_all(&self) {
        let mut state = self.state.write().unwrap();

        let dropped = state.items.len();
        state.items.clear();
        state.deadline = Duration::ZERO;

        if let Some(timer) = state.sweep.take() {
            timer.cancel();
        }

        debug!(table = %self.name, dropped, "table cleared");
    }

    /// Returns true if an item exists under `key`.
    pub fn exists(&self, key: &Bytes) -> bool {
        let state = self.state.read().unwrap();
        state.items.contains_key(key)
    }

    /// Returns the number of items currently stored.
    pub fn count(&self) -> usize {
        let state = self.state.read().unwrap();
        state.items.len()
    }

    /// Invokes `visitor` once per stored item, under the table's read lock.
    ///
    /// The visitor runs for the full traversal with the read lock held, so it
    /// must not call back into mutating operations (`set`, `delete`,
    /// `delete_all`) on the *same* table - that would deadlock. Read-only
    /// operations from the visitor are fine.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&Bytes, &Arc<CacheItem>),
    {
        let state = self.state.read().unwrap();
        for (key, item) in &state.items {
            visitor(key, item);
        }
    }

    /// Returns this table's operation counters.
    pub fn stats(&self) -> TableStats {
        TableStats {
            sets: self.set_count.load(Ordering::Relaxed),
            gets: self.get_count.load(Ordering::Relaxed),
            hits: self.hit_count.load(Ordering::Relaxed),
            deletes: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }

    /// Removes one item from an already write-locked state.
    ///
    /// Every removal path (`delete`, the sweep) funnels through here with
    /// the exclusive lock held exactly once by the caller; this helper never
    /// touches the lock itself.
    fn remove_locked(
        &self,
        state: &mut TableState,
        key: &Bytes,
    ) -> CacheResult<Arc<CacheItem>> {
        let item = state.items.remove(key).ok_or(CacheError::KeyNotFound)?;

        debug!(
            table = %self.name,
            key = ?key,
            access_count = item.access_count(),
            age_ms = item.created_at().elapsed().as_millis() as u64,
            "item removed"
        );

        Ok(item)
    }

    /// Runs one expiration sweep and schedules the next one.
    ///
    /// Invoked synchronously from `set` when a new item warrants an earlier
    /// wake-up, and asynchronously by the sweep timer firing. The whole pass
    /// runs under one acquisition of the table's write lock; running it
    /// redundantly is harmless.
    fn expiration_check(&self) {
        let mut state = self.state.write().unwrap();

        if state.deadline.is_zero() {
            debug!(table = %self.name, "expiration sweep (newly triggered)");
        } else {
            debug!(
                table = %self.name,
                deadline_ms = state.deadline.as_millis() as u64,
                "expiration sweep (scheduled)"
            );
        }

        let now = Instant::now();
        let mut expired: Vec<Bytes> = Vec::new();
        let mut next_deadline = Duration::ZERO;

        for (key, item) in &state.items {
            let lifespan = item.lifespan();

            // Zero lifespan = exempt from expiration entirely
            if lifespan.is_zero() {
                continue;
            }

            let elapsed = now.saturating_duration_since(item.accessed_at());

            if elapsed >= lifespan {
                expired.push(key.clone());
            } else {
                let remaining = lifespan - elapsed;
                if next_deadline.is_zero() || remaining < next_deadline {
                    next_deadline = remaining;
                }
            }
        }

        for key in expired {
            if self.remove_locked(&mut state, &key).is_ok() {
                self.expired_count.fetch_add(1, Ordering::Relaxed);
            }
        }

        state.deadline = next_deadline;

        if !next_deadline.is_zero() {
            self.schedule_sweep(&mut state, next_deadline);
        }
    }

    /// Arms the sweep timer for `delay` from now, superseding any pending one.
    ///
    /// The callback holds only a `Weak` reference; a table dropped before the
    /// timer fires is simply skipped.
    fn schedule_sweep(&self, state: &mut TableState, delay: Duration) {
        let me = self.me.clone();
        let timer = OneShot::schedule(&self.runtime, delay, move || {
            if let Some(table) = me.upgrade() {
                table.expiration_check();
            }
        });

        if let Some(old) = state.sweep.replace(timer) {
            old.cancel();
        }
    }
}

/// Per-table operation counters.
///
/// Counters use relaxed atomics, so values are approximate under heavy
/// concurrency.
#[derive(Debug, Clone, Copy)]
pub struct TableStats {
    /// Total SET operations
    pub sets: u64,
    /// Total GET operations
    pub gets: u64,
    /// GET operations that found a live item
    pub hits: u64,
    /// Items removed by explicit delete
    pub deletes: u64,
    /// Items removed by the expiration sweep
    pub expired: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Opt-in sweep logging for debugging: RUST_LOG=embercache=debug
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let table = CacheTable::new("basic");

        table.set(Bytes::from("key"), Bytes::from("value"), 60);

        let item = table.get(&Bytes::from("key")).unwrap();
        assert_eq!(item.key(), Bytes::from("key"));
        assert_eq!(item.value(), Bytes::from("value"));
        assert_eq!(item.lifespan(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let table = CacheTable::new("missing");
        assert_eq!(
            table.get(&Bytes::from("nope")).unwrap_err(),
            CacheError::KeyNotFound
        );
    }

    #[tokio::test]
    async fn test_get_records_access() {
        let table = CacheTable::new("access");
        table.set(Bytes::from("key"), Bytes::from("value"), 60);

        table.get(&Bytes::from("key")).unwrap();
        let item = table.get(&Bytes::from("key")).unwrap();

        assert_eq!(item.access_count(), 2);
    }

    #[tokio::test]
    async fn test_delete_returns_item() {
        let table = CacheTable::new("delete");
        table.set(Bytes::from("key"), Bytes::from("value"), 60);

        let removed = table.delete(&Bytes::from("key")).unwrap();
        assert_eq!(removed.value(), Bytes::from("value"));

        assert_eq!(
            table.delete(&Bytes::from("key")).unwrap_err(),
            CacheError::KeyNotFound
        );
        assert!(!table.exists(&Bytes::from("key")));
    }

    #[tokio::test]
    async fn test_exists_and_count() {
        let table = CacheTable::new("count");

        assert!(!table.exists(&Bytes::from("a")));
        assert_eq!(table.count(), 0);

        table.set(Bytes::from("a"), Bytes::from("1"), 60);
        table.set(Bytes::from("b"), Bytes::from("2"), -1);

        assert!(table.exists(&Bytes::from("a")));
        assert_eq!(table.count(), 2);
    }

    #[tokio::test]
    async fn test_overwrite_resets_counters() {
        let table = CacheTable::new("overwrite");

        table.set(Bytes::from("key"), Bytes::from("v1"), 10);
        let first = table.get(&Bytes::from("key")).unwrap();
        assert_eq!(first.access_count(), 1);
        let first_created = first.created_at();

        std::thread::sleep(Duration::from_millis(10));
        table.set(Bytes::from("key"), Bytes::from("v2"), 10);

        let second = table.get(&Bytes::from("key")).unwrap();
        assert_eq!(second.value(), Bytes::from("v2"));
        // The replacement is a fresh item: count restarted, creation time reset
        assert_eq!(second.access_count(), 1);
        assert!(second.created_at() > first_created);
    }

    #[tokio::test]
    async fn test_infinite_lifespan() {
        let table = CacheTable::new("infinite");

        table.set(Bytes::from("key"), Bytes::from("value"), -1);

        let item = table.get(&Bytes::from("key")).unwrap();
        assert_eq!(item.lifespan(), INFINITE_LIFESPAN);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            table.get(&Bytes::from("key")).unwrap().value(),
            Bytes::from("value")
        );
    }

    #[tokio::test]
    async fn test_zero_lifespan_is_exempt() {
        let table = CacheTable::new("exempt");

        table.set_with_lifespan(Bytes::from("key"), Bytes::from("value"), Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(200)).await;

        // Never sweepable, never factored into scheduling
        assert!(table.exists(&Bytes::from("key")));
        assert_eq!(table.count(), 1);
    }

    #[tokio::test]
    async fn test_expiration() {
        init_tracing();
        let table = CacheTable::new("expiry");

        table.set_with_lifespan(
            Bytes::from("key"),
            Bytes::from("value"),
            Duration::from_millis(100),
        );

        // Present immediately after the set
        assert!(table.get(&Bytes::from("key")).is_ok());

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(
            table.get(&Bytes::from("key")).unwrap_err(),
            CacheError::KeyNotFound
        );
    }

    #[tokio::test]
    async fn test_expired_items_removed_without_access() {
        let table = CacheTable::new("unattended");

        for i in 0..5 {
            table.set_with_lifespan(
                Bytes::from(format!("key{}", i)),
                Bytes::from("value"),
                Duration::from_millis(80),
            );
        }
        table.set(Bytes::from("keeper"), Bytes::from("value"), -1);

        tokio::time::sleep(Duration::from_millis(400)).await;

        // The sweep fired on its own; nobody read any of the expired keys
        assert_eq!(table.count(), 1);
        assert!(table.exists(&Bytes::from("keeper")));
        assert_eq!(table.stats().expired, 5);
    }

    #[tokio::test]
    async fn test_minimum_deadline_scheduling() {
        let table = CacheTable::new("deadline");

        // The long item arms a far-away timer first; the short item must
        // pull the wake-up forward rather than wait behind it.
        table.set(Bytes::from("long"), Bytes::from("value"), 5);
        table.set_with_lifespan(
            Bytes::from("short"),
            Bytes::from("value"),
            Duration::from_millis(100),
        );

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(!table.exists(&Bytes::from("short")));
        assert!(table.exists(&Bytes::from("long")));
    }

    #[tokio::test]
    async fn test_access_refreshes_expiry() {
        let table = CacheTable::new("refresh");

        table.set_with_lifespan(
            Bytes::from("key"),
            Bytes::from("value"),
            Duration::from_millis(400),
        );

        // Read halfway through the lifespan: the expiry clock restarts
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(table.get(&Bytes::from("key")).is_ok());

        // Past the original deadline, but within the refreshed one
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(table.exists(&Bytes::from("key")));

        // Left alone, it finally expires
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!table.exists(&Bytes::from("key")));
    }

    #[tokio::test]
    async fn test_delete_all_clears_and_cancels() {
        let table = CacheTable::new("clear");

        for i in 0..10 {
            table.set_with_lifespan(
                Bytes::from(format!("key{}", i)),
                Bytes::from("value"),
                Duration::from_millis(100),
            );
        }

        table.delete_all();
        assert_eq!(table.count(), 0);

        // The canceled timer must not fire against the cleared table
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(table.stats().expired, 0);

        // The table stays usable afterwards
        table.set(Bytes::from("fresh"), Bytes::from("value"), 60);
        assert_eq!(table.count(), 1);
    }

    #[tokio::test]
    async fn test_for_each_visits_all() {
        let table = CacheTable::new("foreach");

        for i in 0..5 {
            table.set(Bytes::from(format!("key{}", i)), Bytes::from("value"), 60);
        }

        let mut seen = Vec::new();
        table.for_each(|key, item| {
            assert_eq!(item.value(), Bytes::from("value"));
            seen.push(key.clone());
        });

        seen.sort();
        assert_eq!(seen.len(), 5);
        assert_eq!(seen[0], Bytes::from("key0"));
    }

    #[tokio::test]
    async fn test_stats() {
        let table = CacheTable::new("stats");

        table.set(Bytes::from("a"), Bytes::from("1"), 60);
        table.set(Bytes::from("b"), Bytes::from("2"), 60);
        table.get(&Bytes::from("a")).unwrap();
        let _ = table.get(&Bytes::from("missing"));
        table.delete(&Bytes::from("b")).unwrap();

        let stats = table.stats();
        assert_eq!(stats.sets, 2);
        assert_eq!(stats.gets, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.deletes, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access() {
        use std::thread;

        init_tracing();
        let table = CacheTable::new("stress");
        let mut handles = vec![];

        // Interleaved set/get/delete from independent OS threads
        for i in 0..8 {
            let table = Arc::clone(&table);
            handles.push(thread::spawn(move || {
                for j in 0..200 {
                    let key = Bytes::from(format!("key-{}-{}", i, j));
                    table.set(key.clone(), Bytes::from("value"), 60);
                    let _ = table.get(&key);
                    if j % 3 == 0 {
                        let _ = table.delete(&key);
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // 8 threads x 200 sets, one in three deleted again
        let expected = 8 * (200 - 200 / 3 - 1);
        assert_eq!(table.count(), expected);
    }
}
