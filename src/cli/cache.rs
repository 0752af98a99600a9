//! Cache management commands

use crate::cache::CacheStorage;
use crate::cli::OutputFormat;
use crate::error::Result;

/// Show cache status/statistics
pub fn status(format: OutputFormat) -> Result<()> {
    let cache = CacheStorage::open()?;
    let stats = cache.stats()?;
    let path = CacheStorage::cache_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    match format {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = stats
                .entries
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "name": e.name,
                        "size_bytes": e.size_bytes,
                        "age_seconds": e.age.map(|a| a.as_secs()),
                    })
                })
                .collect();
            let json = serde_json::json!({
                "path": path,
                "total_entries": stats.entries.len(),
                "total_size_bytes": stats.total_size_bytes,
                "total_size_human": format_size(stats.total_size_bytes),
                "entries": entries,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            println!("Cache Status");
            println!("────────────────────────────────────────");
            println!("Location:    {}", path);
            println!("Entries:     {}", stats.entries.len());
            println!("Total size:  {}", format_size(stats.total_size_bytes));

            if !stats.entries.is_empty() {
                println!();
                for entry in &stats.entries {
                    let age = entry
                        .age
                        .map(format_age)
                        .unwrap_or_else(|| "unknown age".to_string());
                    println!(
                        "  {:<24} {:>10}  {}",
                        entry.name,
                        format_size(entry.size_bytes),
                        age
                    );
                }
            }
        }
    }

    Ok(())
}

/// Clear all cache entries
pub fn clear(format: OutputFormat) -> Result<()> {
    let cache = CacheStorage::open()?;
    let stats = cache.clear_all()?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "entries_removed": stats.entries_removed,
                "success": true,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            if stats.entries_removed > 0 {
                println!("Cleared {} cache entries", stats.entries_removed);
            } else {
                println!("Cache was already empty");
            }
        }
    }

    Ok(())
}

/// Show cache path
pub fn path() -> Result<()> {
    let path = CacheStorage::cache_dir()?;
    println!("{}", path.display());
    Ok(())
}

/// Format bytes as human-readable size
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format an entry age as a coarse human-readable duration
fn format_age(age: std::time::Duration) -> String {
    let secs = age.as_secs();
    if secs >= 3600 {
        format!("{}h {}m old", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m old", secs / 60)
    } else {
        format!("{}s old", secs)
    }
}
