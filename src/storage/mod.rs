//! Cache Core
//!
//! This module holds the storage side of embercache: the [`CacheTable`] with
//! its expiration sweep, the [`CacheItem`] entries it stores, and the
//! one-shot timer the sweep schedules itself with.
//!
//! ## Expiration
//!
//! Expiration is lazy and self-scheduling rather than interval-polled. Each
//! table remembers the shortest remaining lifespan it observed on its last
//! sweep and arms exactly one timer for that moment; inserting an item with
//! a shorter lifespan re-runs the sweep immediately. A table with nothing
//! finite stored wakes up never.
//!
//! ## Example
//!
//! ```
//! use embercache::{CacheTable, INFINITE_LIFESPAN};
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() {
//!     let table = CacheTable::new("sessions");
//!
//!     // Expires after 60 seconds without a read
//!     table.set(Bytes::from("token"), Bytes::from("abc123"), 60);
//!
//!     // Never expires
//!     table.set(Bytes::from("motd"), Bytes::from("hello"), -1);
//!     assert_eq!(
//!         table.get(&Bytes::from("motd")).unwrap().lifespan(),
//!         INFINITE_LIFESPAN,
//!     );
//! }
//! ```

pub mod item;
pub mod table;

pub(crate) mod timer;

// Re-export commonly used types
pub use item::CacheItem;
pub use table::{CacheTable, TableStats, INFINITE_LIFESPAN};
