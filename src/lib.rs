//! tijo - Resolve output parsing templates for shell commands
//!
//! This library looks up the parsing template registered for a command
//! invocation in the tijo registry and memoizes the answer in a two-level,
//! disk-backed LRU cache. It can be used standalone or via the CLI.
//!
//! # Quick Start
//!
//! ```ignore
//! use tijo::{CacheRegistry, CacheSettings, Command, Config, TemplateResolver, TijoApi};
//!
//! let config = Config::load()?;
//! let api = TijoApi::from_config(&config)?;
//!
//! // One registry per process, shared by every resolver
//! let mut registry = CacheRegistry::new(config.registry_capacity);
//! let mut resolver = TemplateResolver::new(&mut registry, CacheSettings::from_config(&config));
//!
//! let mut command = Command::new(["ls", "-la"])?;
//! if let Some(template) = resolver.resolve(&mut command, &api, false).await {
//!     println!("{}", template);
//! }
//! ```
//!
//! # Publishing a Template
//!
//! ```ignore
//! use tijo::{Command, PushOptions};
//!
//! let mut api = TijoApi::from_config(&config)?;
//! api.login("me@example.com", "secret", true).await;
//!
//! let command = Command::new(["ls", "-la"])?.with_template(template);
//! api.push_template(&command, &PushOptions::default()).await?;
//! ```

pub mod api;
pub mod cache;
pub mod cli;
pub mod command;
pub mod config;
pub mod display;
pub mod error;
pub mod resolver;

/// A parsing template, stored and returned verbatim
pub type Template = serde_json::Value;

// Public re-exports for library users
pub use api::{PushOptions, TijoApi, Token};
pub use cache::{BoundedCache, CacheRegistry, CommandCache, TemplateCache};
pub use command::{Command, EnvironmentFacts, Fact, FactMap, Fingerprint};
pub use config::Config;
pub use error::{TijoError, TijoResult};
pub use resolver::{CacheSettings, TemplateLookup, TemplateQuery, TemplateResolver};
