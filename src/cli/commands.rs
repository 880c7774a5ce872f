//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// tijo - Find output parsing templates for shell commands
#[derive(Debug, Parser)]
#[command(name = "tijo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Template registry URL (overrides config)
    #[arg(short = 'u', long, global = true)]
    pub api_url: Option<String>,

    /// Cache folder (overrides config)
    #[arg(long, global = true)]
    pub cache_dir: Option<String>,

    /// Do not read or write the on-disk cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Bypass cached templates and ask the registry
    #[arg(short, long, global = true)]
    pub refresh: bool,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// A shell invocation given after the subcommand
#[derive(Debug, Clone, Args)]
pub struct Invocation {
    /// Command followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the parsing template for a command invocation
    Template {
        #[command(flatten)]
        invocation: Invocation,
    },

    /// Publish a parsing template for a command invocation
    Push {
        /// JSON file holding the template
        #[arg(short, long)]
        file: PathBuf,

        /// Display name (defaults to the command name)
        #[arg(short, long)]
        name: Option<String>,

        /// Tag to attach, repeatable
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Extra fact as key=value, repeatable
        #[arg(long = "fact", value_parser = parse_fact)]
        facts: Vec<(String, String)>,

        #[command(flatten)]
        invocation: Invocation,
    },

    /// Show the facts sent to the registry for a command
    Facts {
        #[command(flatten)]
        invocation: Invocation,
    },

    /// Log in to the template registry
    Login {
        /// Account email (prompted if omitted)
        #[arg(short, long)]
        email: Option<String>,

        /// Keep the session token in the cache folder
        #[arg(short, long)]
        save: bool,
    },

    /// Create a registry account
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,
    },

    /// Resend the account confirmation email
    Resend {
        #[arg(short, long)]
        email: String,
    },

    /// Request a password reset email
    Reset {
        #[arg(short, long)]
        email: String,
    },

    /// Manage the local template cache
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },

    /// Manage tijo configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum CacheCommands {
    /// Show cached commands and their entry counts
    Show,

    /// Delete cached templates for one command, or all of them
    Clear {
        /// Command whose cache should be removed
        command: Option<String>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set configuration values
    Set {
        /// Template registry URL
        #[arg(long = "url")]
        url: Option<String>,

        /// Cache folder, empty to disable caching
        #[arg(long = "folder")]
        folder: Option<String>,

        /// Templates kept per command (0 = unbounded)
        #[arg(long)]
        lru_capacity: Option<usize>,

        /// HTTP timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

fn parse_fact(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_takes_hyphenated_args() {
        let cli = Cli::try_parse_from(["tijo", "-r", "template", "ls", "-la", "/tmp"]).unwrap();
        assert!(cli.refresh);
        match cli.command {
            Commands::Template { invocation } => {
                assert_eq!(invocation.args, vec!["ls", "-la", "/tmp"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_template_requires_command() {
        assert!(Cli::try_parse_from(["tijo", "template"]).is_err());
    }

    #[test]
    fn test_push_options() {
        let cli = Cli::try_parse_from([
            "tijo", "push", "-f", "t.json", "-t", "a", "-t", "b", "--fact", "system=linux", "ls",
            "-l",
        ])
        .unwrap();
        match cli.command {
            Commands::Push {
                file,
                tags,
                facts,
                invocation,
                ..
            } => {
                assert_eq!(file, PathBuf::from("t.json"));
                assert_eq!(tags, vec!["a", "b"]);
                assert_eq!(facts, vec![("system".to_string(), "linux".to_string())]);
                assert_eq!(invocation.args, vec!["ls", "-l"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_config_set_does_not_clash_with_globals() {
        let cli = Cli::try_parse_from([
            "tijo", "--cache-dir", "/tmp/a", "config", "set", "--folder", "/tmp/b", "--url",
            "https://example.com",
        ])
        .unwrap();
        assert_eq!(cli.cache_dir.as_deref(), Some("/tmp/a"));
        match cli.command {
            Commands::Config {
                action: ConfigCommands::Set { url, folder, .. },
            } => {
                assert_eq!(url.as_deref(), Some("https://example.com"));
                assert_eq!(folder.as_deref(), Some("/tmp/b"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_fact() {
        assert_eq!(parse_fact("a=b=c").unwrap(), ("a".into(), "b=c".into()));
        assert!(parse_fact("novalue").is_err());
        assert!(parse_fact("=x").is_err());
    }
}
