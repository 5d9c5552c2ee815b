//! Avatar image caching engine
//!
//! Resolves batches of (identity, format) pairs to displayable avatar URLs,
//! backed by a bounded on-disk cache. Cache hits are served immediately,
//! misses are fetched synchronously from a remote source, and stale entries
//! are served as-is while a background refresh repopulates them. A fixed
//! worker pool downloads and commits images off the request path.
//!
//! Cached files are presented either as direct `file://` references or
//! through a loopback HTTP server for UI layers that can only load network
//! URLs.

pub mod config;
pub mod error;
pub mod populate;
pub mod present;
pub mod remote;
pub mod server;
pub mod source;
pub mod store;
pub mod types;

pub use config::{AvatarCacheConfig, ServingMode};
pub use error::{AvatarError, Result};
pub use remote::{HttpRemoteSource, RemoteSource};
pub use source::CachingSource;
pub use types::{cache_key, AvatarFormat, AvatarMap};
