//! Host and executable facts sent along with registry requests

use serde_json::Value;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Fact map as sent to the registry (`command_facts`)
pub type FactMap = BTreeMap<String, Value>;

/// Linux exposes the running kernel release here
const KERNEL_RELEASE_FILE: &str = "/proc/sys/kernel/osrelease";

/// Individual facts that may be included in a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fact {
    System,
    Kernel,
    Machine,
    RuntimeVersion,
    CommandPath,
    CommandPathFilesize,
}

impl Fact {
    /// Facts sent with every search and push unless overridden
    pub const DEFAULT: [Fact; 6] = [
        Fact::System,
        Fact::Kernel,
        Fact::Machine,
        Fact::RuntimeVersion,
        Fact::CommandPath,
        Fact::CommandPathFilesize,
    ];

    /// Wire name of the fact
    pub fn name(self) -> &'static str {
        match self {
            Fact::System => "system",
            Fact::Kernel => "kernel",
            Fact::Machine => "machine",
            Fact::RuntimeVersion => "runtime_version",
            Fact::CommandPath => "command_path",
            Fact::CommandPathFilesize => "command_path_filesize",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::DEFAULT.into_iter().find(|fact| fact.name() == name)
    }
}

/// Facts about the host and the command's executable
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentFacts {
    pub system: Option<String>,
    pub kernel: Option<String>,
    pub machine: Option<String>,
    pub runtime_version: Option<String>,
    pub command_path: Option<PathBuf>,
    /// Size of `command_path` in bytes, 0 when unresolved
    pub command_path_filesize: u64,
}

impl EnvironmentFacts {
    /// Gather facts for `command`. Resolution failures leave fields empty.
    pub fn gather(command: &str) -> Self {
        let command_path = find_executable(command);
        let command_path_filesize = command_path
            .as_deref()
            .and_then(|path| fs::metadata(path).ok())
            .map(|meta| meta.len())
            .unwrap_or(0);

        Self {
            system: Some(env::consts::OS.to_string()),
            kernel: kernel_release(),
            machine: Some(env::consts::ARCH.to_string()),
            runtime_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            command_path,
            command_path_filesize,
        }
    }

    /// Value of a single fact, `None` when absent or empty
    pub fn value(&self, fact: Fact) -> Option<Value> {
        let text = |s: &Option<String>| {
            s.as_deref()
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
        };

        match fact {
            Fact::System => text(&self.system),
            Fact::Kernel => text(&self.kernel),
            Fact::Machine => text(&self.machine),
            Fact::RuntimeVersion => text(&self.runtime_version),
            Fact::CommandPath => self
                .command_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .filter(|p| !p.is_empty())
                .map(Value::String),
            Fact::CommandPathFilesize => {
                Some(self.command_path_filesize)
                    .filter(|size| *size > 0)
                    .map(Value::from)
            }
        }
    }

    /// Collect the allow-listed facts that have a value; `None` if none do
    pub fn to_map(&self, facts: &[Fact]) -> Option<FactMap> {
        let map: FactMap = facts
            .iter()
            .filter_map(|fact| self.value(*fact).map(|v| (fact.name().to_string(), v)))
            .collect();

        if map.is_empty() {
            None
        } else {
            Some(map)
        }
    }
}

fn kernel_release() -> Option<String> {
    fs::read_to_string(KERNEL_RELEASE_FILE)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve `command` the way a shell would: tokens containing a path
/// separator are checked as-is, anything else is searched on `PATH`.
pub fn find_executable(command: &str) -> Option<PathBuf> {
    if command.is_empty() {
        return None;
    }

    let candidate = Path::new(command);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .flat_map(|dir| executable_names(command).map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

#[cfg(windows)]
fn executable_names(command: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(command.to_string())
        .chain([".exe", ".bat", ".cmd"].into_iter().map(move |ext| format!("{command}{ext}")))
}

#[cfg(not(windows))]
fn executable_names(command: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(command.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> EnvironmentFacts {
        EnvironmentFacts {
            system: Some("linux".into()),
            kernel: Some(String::new()),
            machine: Some("x86_64".into()),
            runtime_version: None,
            command_path: Some(PathBuf::from("/bin/ls")),
            command_path_filesize: 142_144,
        }
    }

    #[test]
    fn test_to_map_skips_empty_values() {
        let map = sample().to_map(&Fact::DEFAULT).unwrap();
        assert_eq!(map.get("system"), Some(&json!("linux")));
        assert_eq!(map.get("machine"), Some(&json!("x86_64")));
        assert_eq!(map.get("command_path"), Some(&json!("/bin/ls")));
        assert_eq!(map.get("command_path_filesize"), Some(&json!(142_144)));
        assert!(!map.contains_key("kernel"));
        assert!(!map.contains_key("runtime_version"));
    }

    #[test]
    fn test_to_map_honours_allow_list() {
        let map = sample().to_map(&[Fact::System]).unwrap();
        assert_eq!(map.len(), 1);

        assert_eq!(sample().to_map(&[]), None);
        assert_eq!(EnvironmentFacts::default().to_map(&Fact::DEFAULT), None);
    }

    #[test]
    fn test_fact_names_round_trip() {
        for fact in Fact::DEFAULT {
            assert_eq!(Fact::from_name(fact.name()), Some(fact));
        }
        assert_eq!(Fact::from_name("python_version"), None);
    }

    #[test]
    fn test_unknown_command_degrades() {
        let facts = EnvironmentFacts::gather("surely-not-a-real-command-7f3a");
        assert_eq!(facts.command_path, None);
        assert_eq!(facts.command_path_filesize, 0);
        assert_eq!(facts.system.as_deref(), Some(env::consts::OS));
    }

    #[test]
    fn test_explicit_path_is_resolved() {
        let temp = tempfile::tempdir().unwrap();
        let exe = temp.path().join("tool");
        fs::write(&exe, b"#!/bin/sh\n").unwrap();

        let facts = EnvironmentFacts::gather(exe.to_str().unwrap());
        assert_eq!(facts.command_path.as_deref(), Some(exe.as_path()));
        assert_eq!(facts.command_path_filesize, 10);

        assert_eq!(find_executable(temp.path().join("missing").to_str().unwrap()), None);
    }
}
