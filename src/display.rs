//! Pretty-print helpers for CLI output

use crate::command::{Command, Fact};
use crate::config::Config;
use crate::Template;
use colored::Colorize;
use std::path::Path;

/// Print a main header (command title)
pub fn print_header(title: &str) {
    println!();
    println!("{}", title.bold().cyan());
    println!("{}", "─".repeat(50).dimmed());
}

/// Print a sub-header (section within output)
pub fn print_subheader(title: &str) {
    println!();
    println!("{}", title.bold().white());
}

/// Print a key-value pair
pub fn print_field(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a numbered list item
pub fn print_numbered_item(num: usize, text: &str) {
    println!("  {}. {}", format!("{:>2}", num).dimmed(), text);
}

/// Print a template as pretty JSON on stdout, uncolored so it can be piped
pub fn display_template(template: &Template) {
    match serde_json::to_string_pretty(template) {
        Ok(json) => println!("{}", json),
        Err(_) => println!("{}", template),
    }
}

/// Display the facts that accompany registry requests for `command`
pub fn display_facts(command: &Command) {
    print_header(&format!("Facts for {}", command.basename()));

    print_field("Fingerprint", command.fingerprint().as_str());
    print_subheader("Sent");
    for fact in Fact::DEFAULT {
        let value = command
            .facts()
            .value(fact)
            .map(|v| match v {
                serde_json::Value::String(s) => s.green().to_string(),
                other => other.to_string().green().to_string(),
            })
            .unwrap_or_else(|| "(absent)".dimmed().to_string());
        print_field(fact.name(), &value);
    }
    println!();
}

/// Display cached commands with their entry counts
pub fn display_cache_overview(dir: &Path, commands: &[(String, usize)]) {
    print_header(&format!("Template cache ({} commands)", commands.len()));
    print_field("Folder", &dir.display().to_string());
    println!();

    if commands.is_empty() {
        println!("  {}", "(empty)".dimmed());
    } else {
        for (i, (name, entries)) in commands.iter().enumerate() {
            let count = format!("{} templates", entries).dimmed();
            print_numbered_item(i + 1, &format!("{} {}", name.green(), count));
        }
    }
    println!();
}

/// Display the effective configuration
pub fn display_config(config: &Config, path: &Path, exists: bool) {
    print_header("tijo Configuration");
    print_field("Config file", &path.display().to_string());
    print_field(
        "File exists",
        if exists { "yes" } else { "no (using defaults)" },
    );
    println!();

    print_field("API URL", &config.api_url);
    let cache = match config.cache_path() {
        Some(dir) => dir.display().to_string(),
        None => "(disabled)".dimmed().to_string(),
    };
    print_field("Cache folder", &cache);
    print_field("Templates per command", &config.lru_capacity.to_string());
    print_field("Commands in memory", &config.registry_capacity.to_string());
    print_field("Timeout", &format!("{}s", config.timeout_secs));
    if config.insecure {
        print_field("TLS", &"not verified".red().to_string());
    }
    println!();
}

/// Display a success message
pub fn display_success(msg: &str) {
    eprintln!("{} {}", "✓".green().bold(), msg);
}

/// Display an error message
pub fn display_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

/// Suggest publishing a template for an invocation that had none
pub fn display_publish_hint(invocation: &str) {
    eprintln!();
    eprintln!(
        "{} {}",
        "Publish one with:".dimmed(),
        format!("tijo push --file <template.json> {}", invocation).green()
    );
}
