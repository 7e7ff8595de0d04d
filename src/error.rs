//! Error Types
//!
//! The cache has a deliberately small error surface: the only thing that can
//! go wrong from a caller's point of view is asking for a key that isn't
//! there. Every other operation is total - `set` always succeeds,
//! `delete_all` always succeeds, `count`/`exists`/`for_each` never fail.
//!
//! Note that an expired-and-swept key and a key that was never inserted are
//! indistinguishable: both surface as [`CacheError::KeyNotFound`]. Internal
//! concerns (lock contention, timer scheduling) are never exposed as errors.

use thiserror::Error;

/// Errors returned by cache operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// No entry exists under the requested key.
    ///
    /// Returned by `get` and `delete`. Covers both "never inserted" and
    /// "expired and already swept".
    #[error("key not found")]
    KeyNotFound,
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
