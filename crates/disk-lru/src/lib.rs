//! Durable on-disk LRU index
//!
//! Maps string keys to string values (file paths) with per-entry creation
//! timestamps, bounded by entry count. The least-recently-accessed entry is
//! evicted on insert once the bound is exceeded; the evicted entry is handed
//! back to the caller, which owns any backing resource cleanup. The index
//! itself is persisted as a JSON file so entries survive process restarts.

pub mod error;
mod index;
mod types;

pub use error::{LruError, Result};
pub use index::DiskLru;
pub use types::LruEntry;
