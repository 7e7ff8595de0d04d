//! # embercache - A Concurrent In-Memory TTL Cache
//!
//! embercache is an in-process key-value cache with named tables and
//! per-item time-to-live, written in Rust. Expired entries are removed by a
//! lazy, self-rescheduling sweep - no polling loop, no caller involvement.
//!
//! ## Features
//!
//! - **Named Tables**: a process-wide registry hands out shared table
//!   instances by name, created lazily on first use
//! - **Per-Item TTL**: every entry carries its own lifespan; negative means
//!   "never expire", zero exempts the entry from sweeping entirely
//! - **Lazy Expiration**: each table schedules exactly one wake-up, timed to
//!   the shortest remaining lifespan it holds
//! - **Concurrent**: shared/exclusive locking per table, with access
//!   bookkeeping under a separate per-item lock so reads stay cheap
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        CacheRegistry                         │
//! │        name ──> Arc<CacheTable>   (process-wide, lazy)       │
//! └───────────────────────────┬──────────────────────────────────┘
//!                             │
//!                             ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         CacheTable                           │
//! │  ┌─────────────────────── RwLock ──────────────────────────┐ │
//! │  │  items: HashMap<Bytes, Arc<CacheItem>>                  │ │
//! │  │  deadline + at most one pending sweep timer             │ │
//! │  └─────────────────────────────────────────────────────────┘ │
//! └───────────────────────────▲──────────────────────────────────┘
//!                             │
//!               ┌─────────────┴─────────────┐
//!               │      OneShot timer        │
//!               │  (fires the next sweep)   │
//!               └───────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use embercache::cache;
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Grab (or lazily create) a shared table
//!     let sessions = cache("sessions");
//!
//!     // Store a value that expires 60 seconds after its last read
//!     sessions.set(Bytes::from("token"), Bytes::from("abc123"), 60);
//!
//!     // Reads record an access and push the expiry out
//!     let item = sessions.get(&Bytes::from("token")).unwrap();
//!     assert_eq!(item.value(), Bytes::from("abc123"));
//!     assert_eq!(item.access_count(), 1);
//!
//!     // Store a value that never expires
//!     sessions.set(Bytes::from("motd"), Bytes::from("hello"), -1);
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`registry`]: the named-table registry and the [`cache`] entry point
//! - [`storage`]: cache tables, items, and the expiration sweep
//! - [`error`]: the (single-variant) error surface
//!
//! ## Design Highlights
//!
//! ### Minimum-Deadline Sweeping
//!
//! Every sweep records the shortest remaining lifespan across surviving
//! items and schedules the next sweep for exactly that moment. An insert
//! that undercuts the pending wake-up triggers an immediate re-sweep, so no
//! item outlives its lifespan by more than the sweep's own execution time,
//! and an idle table never wakes up at all.
//!
//! ### Two-Level Locking
//!
//! The table lock is taken shared for reads and exclusive for writes and
//! sweeps. Access-time bookkeeping on `get` happens under the *item's* own
//! lock after the table lock is dropped, so read-heavy workloads do not
//! serialize on the table.
//!
//! ### Runtime
//!
//! Tables schedule their sweeps on the Tokio runtime that was current when
//! the table was created; operations themselves are plain synchronous calls
//! and work from any thread.

pub mod error;
pub mod registry;
pub mod storage;

// Re-export commonly used types for convenience
pub use error::{CacheError, CacheResult};
pub use registry::{cache, CacheRegistry};
pub use storage::{CacheItem, CacheTable, TableStats, INFINITE_LIFESPAN};

/// Version of embercache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
