//! Advice command implementation

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::advice::rank::{SortBy, rank};
use crate::advice::{AdviceQuery, aggregate};
use crate::cache::CacheStorage;
use crate::cli::{AdviceArgs, OutputFormat};
use crate::client::{ConsoleClient, Transport};
use crate::config::Config;
use crate::error::Result;
use crate::output::{json::format_json, table::advice_table};
use crate::spot::SpotData;

const DEFAULT_REGION: &str = "us-east-1";

/// Run the advice command
pub async fn run(
    args: &AdviceArgs,
    format: OutputFormat,
    config_path: Option<&str>,
    no_cache: bool,
) -> Result<()> {
    let config = Config::load_or_default(config_path);

    let regions = if args.region.is_empty() {
        vec![
            config
                .preferences
                .region
                .clone()
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        ]
    } else {
        args.region.clone()
    };

    let transport = Arc::new(Transport::new()?);
    let console = Arc::new(ConsoleClient::new(
        config.resolved_token(),
        config.resolved_account_id(),
    )?);
    let cache = if no_cache {
        None
    } else {
        match CacheStorage::open() {
            Ok(cache) => Some(Arc::new(cache)),
            Err(e) => {
                log::warn!("cache unavailable, fetching fresh: {}", e);
                None
            }
        }
    };

    let data = SpotData::new(transport, console, cache);

    let query = AdviceQuery {
        regions: regions.clone(),
        pattern: args.instance_type.clone(),
        os: args.os,
        min_vcpu: args.min_vcpu,
        min_memory: args.min_memory,
        with_scores: args.scores,
    };

    // Ctrl-C stops dispatching new work; in-flight requests drain
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let spinner = if format == OutputFormat::Table {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Fetching spot market data...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let result = aggregate(&data, &query, &cancel).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let records = result?;
    let ascending = args.order != "desc";
    let records = rank(records, SortBy::parse(&args.sort), ascending);

    let show_region = regions.len() > 1 || regions.iter().any(|r| r == "all");
    match format {
        OutputFormat::Json => println!("{}", format_json(&records)?),
        OutputFormat::Table => println!("{}", advice_table(&records, show_region, args.scores)),
    }

    Ok(())
}
