//! Result caching module
//!
//! A generic TTL cache shared by the robots.txt provider and by callers caching
//! fetched or derived results, plus helpers for building stable cache keys from
//! request parameters. [`KeyedLocks`] keeps concurrent callers from
//! duplicating work for the same key.

mod key;
mod locks;
mod ttl;

pub use key::{cache_key, generate_cache_key};
pub use locks::{KeyedGuard, KeyedLocks};
pub use ttl::TtlCache;
