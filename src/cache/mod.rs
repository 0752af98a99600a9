//! Local TTL cache for spot market datasets
//!
//! One file per cache name, aged by file modification time. Each dataset is
//! refreshed wholesale once its entry goes stale; nothing sweeps expired
//! entries in the background.

pub mod key;
pub mod storage;

use std::time::Duration;

/// Cache TTL configuration per data source.
///
/// All three feeds currently share the same 24-hour staleness window.
pub struct CacheTtl;

impl CacheTtl {
    /// Spot advisor dataset (interruption ranges, savings, instance shapes)
    pub const ADVISOR: Duration = Duration::from_secs(24 * 60 * 60);

    /// Historical spot price dataset
    pub const PRICE: Duration = Duration::from_secs(24 * 60 * 60);

    /// Live market score dataset
    pub const SCORE: Duration = Duration::from_secs(24 * 60 * 60);
}

// Re-export main types
pub use key::score_cache_name;
pub use storage::CacheStorage;
