//! Command invocations
//!
//! A [`Command`] is one shell invocation (`ls -la /tmp`) together with
//! everything the resolver needs to look up its parsing template: the cache
//! key for its trailing arguments and the environment facts sent to the
//! registry.

mod facts;
mod fingerprint;

pub use facts::*;
pub use fingerprint::*;

use crate::error::{TijoError, TijoResult};
use crate::Template;
use std::path::Path;

/// A validated command invocation
#[derive(Debug, Clone)]
pub struct Command {
    args: Vec<String>,
    basename: String,
    fingerprint: Fingerprint,
    facts: EnvironmentFacts,
    template: Option<Template>,
}

impl Command {
    /// Build an invocation from its argument vector, gathering host facts.
    ///
    /// Fails when `args` is empty or the command token is empty.
    pub fn new<I, S>(args: I) -> TijoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let command = validate(&args)?;
        let facts = EnvironmentFacts::gather(command);
        Self::with_facts(args, facts)
    }

    /// Build an invocation with facts supplied by the caller
    pub fn with_facts(args: Vec<String>, facts: EnvironmentFacts) -> TijoResult<Self> {
        let command = validate(&args)?;
        let basename = basename(command);
        let fingerprint = Fingerprint::of(&args[1..]);

        Ok(Self {
            args,
            basename,
            fingerprint,
            facts,
            template: None,
        })
    }

    /// Attach an already known template; it short-circuits resolution
    pub fn with_template(mut self, template: Template) -> Self {
        self.template = Some(template);
        self
    }

    /// Full argument vector, command token first
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The command token as given (`/usr/bin/ls`, `ls`)
    pub fn command(&self) -> &str {
        &self.args[0]
    }

    /// Last path component of the command token
    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Arguments after the command token
    pub fn command_args(&self) -> &[String] {
        &self.args[1..]
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn facts(&self) -> &EnvironmentFacts {
        &self.facts
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn set_template(&mut self, template: Option<Template>) {
        self.template = template;
    }
}

fn validate(args: &[String]) -> TijoResult<&str> {
    match args.first() {
        Some(command) if !command.is_empty() => Ok(command.as_str()),
        _ => Err(TijoError::InvalidCommand(
            "arguments must contain at least one non-empty value".into(),
        )),
    }
}

/// Basename that accepts both `/` and `\` separators
fn basename(command: &str) -> String {
    let trimmed = command.trim_end_matches(['/', '\\']);
    let name = trimmed
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(trimmed);

    if name.is_empty() {
        Path::new(command).display().to_string()
    } else {
        name.to_string()
    }
}
