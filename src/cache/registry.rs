//! Registry of per-command template caches
//!
//! One registry is created per process (or per worker) and handed to every
//! [`TemplateResolver`](crate::resolver::TemplateResolver). It keeps at most
//! `capacity` command caches in memory; an evicted command keeps its file on
//! disk and is reloaded on the next request.

use crate::cache::lru::BoundedCache;
use crate::command::Fingerprint;
use crate::Template;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fingerprint → template cache for a single command
pub type TemplateCache = BoundedCache<Fingerprint, Template>;

/// Per-command cache handed out by [`CacheRegistry::get_or_create`]
#[derive(Debug)]
pub enum CommandCache<'a> {
    /// Cache owned by the registry and persisted under the cache directory
    Shared(&'a mut TemplateCache),
    /// Unbounded, unsaved cache used when caching is disabled
    Ephemeral(TemplateCache),
}

impl CommandCache<'_> {
    pub fn is_ephemeral(&self) -> bool {
        matches!(self, CommandCache::Ephemeral(_))
    }
}

impl Deref for CommandCache<'_> {
    type Target = TemplateCache;

    fn deref(&self) -> &TemplateCache {
        match self {
            CommandCache::Shared(cache) => cache,
            CommandCache::Ephemeral(cache) => cache,
        }
    }
}

impl DerefMut for CommandCache<'_> {
    fn deref_mut(&mut self) -> &mut TemplateCache {
        match self {
            CommandCache::Shared(cache) => cache,
            CommandCache::Ephemeral(cache) => cache,
        }
    }
}

/// Bounded map of command name → per-command cache
#[derive(Debug)]
pub struct CacheRegistry {
    commands: BoundedCache<String, TemplateCache>,
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_REGISTRY_CAPACITY)
    }
}

impl CacheRegistry {
    /// Create a registry holding up to `capacity` commands (0 = unbounded)
    pub fn new(capacity: usize) -> Self {
        Self {
            commands: BoundedCache::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.commands.capacity()
    }

    /// Number of command caches currently held in memory
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Whether `command` is currently held in memory
    pub fn contains(&self, command: &str) -> bool {
        self.commands.contains_key(command)
    }

    /// Drop a command cache from memory, leaving its file untouched
    pub fn forget(&mut self, command: &str) -> Option<TemplateCache> {
        self.commands.remove(command)
    }

    /// Return the cache for `command`, creating it on first use.
    ///
    /// An existing cache is promoted to most recently used. A new cache is
    /// bound to `cache_dir/<file name>` and loaded from disk. Without a cache
    /// directory an ephemeral, unbounded cache is returned that is neither
    /// saved nor shared with later calls.
    pub fn get_or_create(
        &mut self,
        command: &str,
        capacity: usize,
        cache_dir: Option<&Path>,
    ) -> CommandCache<'_> {
        let Some(dir) = cache_dir else {
            return CommandCache::Ephemeral(TemplateCache::new(0));
        };

        if !self.commands.contains_key(command) {
            let path = cache_file(dir, command);
            debug!(command, path = %path.display(), "opening command cache");

            let cache = TemplateCache::open(capacity, path);
            for (evicted, _) in self.commands.set(command.to_string(), cache) {
                debug!(command = %evicted, "evicted command cache from memory");
            }
        }

        match self.commands.get_mut(command) {
            Some(cache) => CommandCache::Shared(cache),
            None => CommandCache::Ephemeral(TemplateCache::new(0)),
        }
    }
}

/// Path of the snapshot file for `command` under `dir`
pub fn cache_file(dir: &Path, command: &str) -> PathBuf {
    dir.join(cache_file_name(command))
}

/// Map a command token to a file name that stays inside the cache directory.
///
/// ASCII letters, digits and `-` are kept; every other byte (including `_`
/// and `.`) is written as `_xx` hex. Distinct commands never share a file, and
/// a snapshot name never collides with a dotfile or a `.tmp` save file.
pub fn cache_file_name(command: &str) -> String {
    let mut name = String::with_capacity(command.len());
    for byte in command.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("_{:02x}", byte));
        }
    }
    name
}

/// Inverse of [`cache_file_name`]; `None` for names it never produces
pub fn command_from_file_name(name: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(name.len());
    let mut rest = name.as_bytes();
    while let Some((&first, tail)) = rest.split_first() {
        if first == b'_' {
            let hex = std::str::from_utf8(tail.get(..2)?).ok()?;
            bytes.push(u8::from_str_radix(hex, 16).ok()?);
            rest = &tail[2..];
        } else {
            bytes.push(first);
            rest = tail;
        }
    }

    let command = String::from_utf8(bytes).ok()?;
    (cache_file_name(&command) == name).then_some(command)
}
