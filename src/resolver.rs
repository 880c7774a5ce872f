//! Template resolution through the cache hierarchy
//!
//! Resolution order for a [`Command`]:
//!
//! 1. a template already attached to the command (unless refreshing)
//! 2. the per-command cache, keyed by the argument fingerprint
//! 3. the remote registry; a hit is stored and the per-command cache is
//!    written to disk immediately

use crate::cache::CacheRegistry;
use crate::command::{Command, Fact, FactMap};
use crate::config::{Config, DEFAULT_LRU_CAPACITY};
use crate::Template;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// What the remote side is asked when the cache misses
#[derive(Debug, Clone)]
pub struct TemplateQuery<'a> {
    pub basename: &'a str,
    pub args: &'a [String],
    pub facts: Option<FactMap>,
}

impl<'a> TemplateQuery<'a> {
    /// Build a query for `command`, sending only the allow-listed facts
    pub fn from_command(command: &'a Command, facts: &[Fact]) -> Self {
        Self {
            basename: command.basename(),
            args: command.command_args(),
            facts: command.facts().to_map(facts),
        }
    }
}

/// Remote template search.
///
/// Implementations return the best ranked template, or `None` on any
/// failure; the resolver never sees transport errors.
#[async_trait]
pub trait TemplateLookup: Send + Sync {
    async fn search_template(&self, query: &TemplateQuery<'_>) -> Option<Template>;
}

/// Where and how much to cache
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Cache folder; `None` disables persistent caching
    pub cache_dir: Option<PathBuf>,

    /// Templates kept per command (0 = unbounded)
    pub lru_capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            cache_dir: None,
            lru_capacity: DEFAULT_LRU_CAPACITY,
        }
    }
}

impl CacheSettings {
    pub fn new(cache_dir: Option<PathBuf>, lru_capacity: usize) -> Self {
        Self {
            cache_dir,
            lru_capacity,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_path(), config.lru_capacity)
    }
}

/// Resolves templates against a shared [`CacheRegistry`]
#[derive(Debug)]
pub struct TemplateResolver<'r> {
    registry: &'r mut CacheRegistry,
    settings: CacheSettings,
}

impl<'r> TemplateResolver<'r> {
    pub fn new(registry: &'r mut CacheRegistry, settings: CacheSettings) -> Self {
        Self { registry, settings }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Resolve the template for `command`.
    ///
    /// With `disable_cache` both the attached template and the cached entry
    /// are ignored and the registry is always asked; a successful answer
    /// still refreshes the cache. The resolved template (or `None`) is also
    /// attached to `command`.
    pub async fn resolve<L>(
        &mut self,
        command: &mut Command,
        lookup: &L,
        disable_cache: bool,
    ) -> Option<Template>
    where
        L: TemplateLookup + ?Sized,
    {
        if !disable_cache {
            if let Some(template) = command.template() {
                debug!(command = command.command(), "using attached template");
                return Some(template.clone());
            }
        }

        let mut cache = self.registry.get_or_create(
            command.command(),
            self.settings.lru_capacity,
            self.settings.cache_dir.as_deref(),
        );

        if !disable_cache {
            if let Some(template) = cache.get(command.fingerprint()).cloned() {
                debug!(
                    command = command.command(),
                    fingerprint = %command.fingerprint(),
                    "template cache hit"
                );
                command.set_template(Some(template.clone()));
                return Some(template);
            }
        }

        debug!(
            command = command.command(),
            fingerprint = %command.fingerprint(),
            refresh = disable_cache,
            "template cache miss, searching registry"
        );

        let found = {
            let query = TemplateQuery::from_command(command, &Fact::DEFAULT);
            lookup.search_template(&query).await
        };

        if let Some(template) = &found {
            cache.set(command.fingerprint().clone(), template.clone());
            if let Err(e) = cache.save() {
                warn!(command = command.command(), error = %e, "failed to save template cache");
            }
            info!(command = command.command(), "cached template from registry");
        }

        command.set_template(found.clone());
        found
    }
}
