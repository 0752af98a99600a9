//! CLI command definitions and handlers

use clap::{Args, Parser, Subcommand, ValueEnum};
pub use clap_complete::Shell;

use crate::spot::InstanceOs;

pub mod advice;
pub mod cache;
pub mod init;
pub mod status;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Spotop CLI - AWS spot instance market advisor
#[derive(Parser, Debug)]
#[command(name = "spotop")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(
        long,
        global = true,
        env = "SPOTOP_FORMAT",
        default_value = "table",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "SPOTOP_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "SPOTOP_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Bypass cache, fetch fresh data from the feeds
    #[arg(long, global = true, env = "SPOTOP_NO_CACHE", hide_env = true)]
    pub no_cache: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Query spot instance advice
    Advice(AdviceArgs),

    /// Initialize spotop configuration
    Init,

    /// Show authentication and configuration status
    Status,

    /// Manage the local data cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for the advice command
#[derive(Debug, Clone, Args)]
pub struct AdviceArgs {
    /// AWS regions to query; "all" expands to every known region
    #[arg(long, value_delimiter = ',')]
    pub region: Vec<String>,

    /// Instance type pattern (regular expression)
    #[arg(long = "type", default_value = ".*")]
    pub instance_type: String,

    /// Instance operating system
    #[arg(long, value_enum, default_value_t = InstanceOs::Linux)]
    pub os: InstanceOs,

    /// Minimum vCPU count
    #[arg(long, default_value_t = 0)]
    pub min_vcpu: u32,

    /// Minimum memory in GiB
    #[arg(long, default_value_t = 0.0)]
    pub min_memory: f32,

    /// Include live spot market scores (requires `spotop init`)
    #[arg(long)]
    pub scores: bool,

    /// Sort key (range, type, savings, price, region)
    #[arg(long, default_value = "range")]
    pub sort: String,

    /// Sort order (asc, desc)
    #[arg(long, default_value = "asc")]
    pub order: String,
}

/// Cache management subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show cache status/statistics
    Status,

    /// Remove all cached data
    Clear,

    /// Show cache directory path
    Path,
}
