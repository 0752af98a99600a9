//! Status command implementation

use colored::Colorize;

use crate::cache::CacheStorage;
use crate::config::Config;
use crate::error::{ConfigError, Error, Result};

/// Run the status command to display configuration status
pub fn run(config_path: Option<&str>) -> Result<()> {
    println!("{}\n", "Spotop Configuration Status".bold());

    let path = Config::resolve_path(config_path)?;

    match Config::load_at(config_path) {
        Ok(config) => {
            println!("Config file: {}", path.display().to_string().cyan());
            println!();

            if config.resolved_token().is_some() {
                println!("{} Spot console token configured", "✓".green());
            } else {
                println!("{} Spot console token not configured", "✗".red());
                println!("  → Run 'spotop init' to enable live market scores");
            }

            if let Some(account_id) = config.resolved_account_id() {
                println!("{} Account ID: {}", "✓".green(), account_id);
            } else {
                println!("{} No account ID set", "○".dimmed());
            }

            if let Some(region) = &config.preferences.region {
                println!("{} Default region: {}", "✓".green(), region);
            }
        }
        Err(Error::Config(ConfigError::NotFound)) => {
            println!("Config file: {} {}", path.display(), "(not found)".dimmed());
            println!();
            println!("{} Spot console token not configured", "✗".red());
            println!("  → Run 'spotop init' to enable live market scores");
        }
        Err(e) => return Err(e),
    }

    println!();
    match CacheStorage::open().and_then(|c| c.stats()) {
        Ok(stats) => {
            println!(
                "{} Cache: {} entries, {} bytes",
                "○".dimmed(),
                stats.entries.len(),
                stats.total_size_bytes
            );
        }
        Err(e) => {
            println!("{} Cache unavailable: {}", "○".dimmed(), e);
        }
    }

    Ok(())
}
