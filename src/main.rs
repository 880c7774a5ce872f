use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use tijo::cache::{cache_file, command_from_file_name, TemplateCache};
use tijo::cli::{CacheCommands, Cli, Commands, ConfigCommands, Invocation};
use tijo::config::Config;
use tijo::display::{
    display_cache_overview, display_config, display_error, display_facts, display_publish_hint,
    display_success, display_template,
};
use tijo::{
    CacheRegistry, CacheSettings, Command, PushOptions, Template, TemplateResolver, TijoApi,
    TijoError,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let result = run(cli).await;

    if let Err(e) = &result {
        display_error(&e.to_string());
        if let Some(TijoError::TemplateNotFound(invocation)) = e.downcast_ref::<TijoError>() {
            display_publish_hint(invocation);
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Template { invocation } => cmd_template(&cli, invocation).await,
        Commands::Push {
            file,
            name,
            tags,
            facts,
            invocation,
        } => cmd_push(&cli, invocation, file, name.clone(), tags, facts).await,
        Commands::Facts { invocation } => cmd_facts(invocation),
        Commands::Login { email, save } => cmd_login(&cli, email.clone(), *save).await,
        Commands::Register {
            email,
            first_name,
            last_name,
        } => cmd_register(&cli, email, first_name, last_name).await,
        Commands::Resend { email } => cmd_resend(&cli, email).await,
        Commands::Reset { email } => cmd_reset(&cli, email).await,
        Commands::Cache { action } => cmd_cache(&cli, action.clone()),
        Commands::Config { action } => cmd_config(action.clone()),
    }
}

// ============================================================================
// Command handlers
// ============================================================================

/// Handle `template` command - resolve and print the template
async fn cmd_template(cli: &Cli, invocation: &Invocation) -> Result<()> {
    let config = effective_config(cli)?;
    let api = TijoApi::from_config(&config)?;
    let mut command = Command::new(invocation.args.iter().cloned())?;

    let mut registry = CacheRegistry::new(config.registry_capacity);
    let mut resolver = TemplateResolver::new(&mut registry, CacheSettings::from_config(&config));

    match resolver.resolve(&mut command, &api, cli.refresh).await {
        Some(template) => {
            display_template(&template);
            Ok(())
        }
        None => Err(TijoError::TemplateNotFound(command.args().join(" ")).into()),
    }
}

/// Handle `push` command - publish a template file
async fn cmd_push(
    cli: &Cli,
    invocation: &Invocation,
    file: &Path,
    name: Option<String>,
    tags: &[String],
    facts: &[(String, String)],
) -> Result<()> {
    let config = effective_config(cli)?;
    let api = TijoApi::from_config(&config)?;

    let contents = fs::read_to_string(file)
        .with_context(|| format!("Failed to read template file {}", file.display()))?;
    let template: Template = serde_json::from_str(&contents)
        .with_context(|| format!("Template file {} is not valid JSON", file.display()))?;

    let command = Command::new(invocation.args.iter().cloned())?.with_template(template);
    let options = PushOptions {
        name,
        tags: tags.to_vec(),
        facts: facts
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect(),
        fact_kinds: None,
    };

    match api.push_template(&command, &options).await {
        Ok(Some(_)) => {
            display_success(&format!("Published template for '{}'", command.basename()));
            Ok(())
        }
        Ok(None) => Err(anyhow!("The registry rejected the template")),
        Err(TijoError::NotAuthenticated) => {
            Err(anyhow!("Not authenticated. Run `tijo login --save` first."))
        }
        Err(TijoError::TokenExpired) => {
            Err(anyhow!("Session expired. Run `tijo login --save` again."))
        }
        Err(e) => Err(e.into()),
    }
}

/// Handle `facts` command
fn cmd_facts(invocation: &Invocation) -> Result<()> {
    let command = Command::new(invocation.args.iter().cloned())?;
    display_facts(&command);
    Ok(())
}

/// Handle `login` command
async fn cmd_login(cli: &Cli, email: Option<String>, save: bool) -> Result<()> {
    let config = effective_config(cli)?;
    let mut api = TijoApi::from_config(&config)?;

    let email = match email {
        Some(email) => email,
        None => inquire::Text::new("Email:").prompt()?,
    };
    let password = inquire::Password::new("Password:")
        .without_confirmation()
        .prompt()?;

    match api.login(&email, &password, save).await {
        Some(_) if api.token().is_some() => {
            display_success(&format!("Logged in as {}", email));
            if save {
                if let Some(path) = api.token_file() {
                    display_success(&format!("Token saved to {}", path.display()));
                }
            }
            Ok(())
        }
        Some(_) => Err(anyhow!("Login response did not contain a token")),
        None => Err(anyhow!("Login failed")),
    }
}

/// Handle `register` command
async fn cmd_register(cli: &Cli, email: &str, first_name: &str, last_name: &str) -> Result<()> {
    let config = effective_config(cli)?;
    let api = TijoApi::from_config(&config)?;
    let password = inquire::Password::new("Password:").prompt()?;

    if !api.register(email, &password, first_name, last_name).await {
        bail!("Registration failed");
    }
    display_success(&format!("Registered {}, check your inbox", email));
    Ok(())
}

/// Handle `resend` command
async fn cmd_resend(cli: &Cli, email: &str) -> Result<()> {
    let config = effective_config(cli)?;
    let api = TijoApi::from_config(&config)?;
    let password = inquire::Password::new("Password:")
        .without_confirmation()
        .prompt()?;

    if !api.resend(email, &password).await {
        bail!("Could not resend confirmation email");
    }
    display_success(&format!("Confirmation email sent to {}", email));
    Ok(())
}

/// Handle `reset` command
async fn cmd_reset(cli: &Cli, email: &str) -> Result<()> {
    let config = effective_config(cli)?;
    let api = TijoApi::from_config(&config)?;

    if !api.reset(email).await {
        bail!("Could not request password reset");
    }
    display_success(&format!("Password reset email sent to {}", email));
    Ok(())
}

/// Handle `cache` subcommands
fn cmd_cache(cli: &Cli, action: CacheCommands) -> Result<()> {
    let config = effective_config(cli)?;
    let dir = config
        .cache_path()
        .ok_or_else(|| anyhow!("Caching is disabled"))?;

    match action {
        CacheCommands::Show => {
            let mut commands = Vec::new();
            for path in cache_files(&dir)? {
                let name = command_from_file_name(&file_name(&path)).unwrap_or_default();
                let cache = TemplateCache::open(0, &path);
                commands.push((name, cache.len()));
            }
            commands.sort();
            display_cache_overview(&dir, &commands);
            Ok(())
        }
        CacheCommands::Clear { command } => {
            let targets = match command {
                Some(command) => vec![cache_file(&dir, &command)],
                None => cache_files(&dir)?,
            };

            let mut removed = 0;
            for path in targets {
                if path.exists() {
                    fs::remove_file(&path)
                        .with_context(|| format!("Failed to remove {}", path.display()))?;
                    removed += 1;
                }
            }
            display_success(&format!("Removed {} cache file(s)", removed));
            Ok(())
        }
    }
}

/// Handle `config` subcommands
fn cmd_config(action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let config = Config::load()?;
            display_config(&config, &Config::file_path()?, Config::exists());
            Ok(())
        }
        ConfigCommands::Set {
            url,
            folder,
            lru_capacity,
            timeout,
        } => {
            if url.is_none() && folder.is_none() && lru_capacity.is_none() && timeout.is_none() {
                println!("No value provided to set.");
                println!("Usage: tijo config set [--url <URL>] [--folder <DIR>] [--lru-capacity <N>] [--timeout <SECS>]");
                return Ok(());
            }

            // Load existing config or defaults
            let mut config = Config::load()?;

            if let Some(url) = url {
                config.api_url = url;
            }
            if let Some(dir) = folder {
                config.cache_dir = dir;
            }
            if let Some(capacity) = lru_capacity {
                config.lru_capacity = capacity;
            }
            if let Some(timeout) = timeout {
                config.timeout_secs = timeout;
            }

            // Validate before saving
            config.validate()?;
            config.save()?;

            display_success(&format!("Saved config to {}", Config::file_path()?.display()));
            Ok(())
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Config file values with command-line overrides applied
fn effective_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?;

    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    if let Some(dir) = &cli.cache_dir {
        config.cache_dir = dir.clone();
    }
    if cli.no_cache {
        config.cache_dir = String::new();
    }

    config.validate()?;
    Ok(config)
}

/// Per-command snapshot files in the cache folder (the token and in-flight
/// `.tmp` files are skipped)
fn cache_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && command_from_file_name(&file_name(&path)).is_some() {
            files.push(path);
        }
    }
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
