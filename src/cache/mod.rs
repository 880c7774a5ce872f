//! Template caching layer
//!
//! Two levels: a [`CacheRegistry`] of commands, each owning a persistent
//! [`BoundedCache`] of argument fingerprint → template. Per-command files
//! live directly under the cache directory (~/.tijo/ by default).

mod lru;
mod registry;

pub use lru::*;
pub use registry::*;
