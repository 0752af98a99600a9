//! Spot market data: advisory feed, price feed, live scores

pub mod advisor;
pub mod price;
pub mod score;
pub mod zones;

use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use advisor::{
    AdvisorData, AdvisorLoader, InstanceShape, InterruptionRange, RegionAdvice, SpotEntry,
};
pub use price::{InstancePrice, PriceData, PriceLoader};
pub use score::{ScoreDataset, ScoreFetcher};
pub use zones::zones_for_region;

use crate::cache::CacheStorage;
use crate::client::{ConsoleClient, MarketScoreApi, Transport};

/// Operating system axis for advisory and price lookups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceOs {
    #[default]
    Linux,
    Windows,
}

impl std::fmt::Display for InstanceOs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceOs::Linux => write!(f, "linux"),
            InstanceOs::Windows => write!(f, "windows"),
        }
    }
}

/// All three data sources behind their single-flight loaders
pub struct SpotData<A: MarketScoreApi + 'static = ConsoleClient> {
    advisor: AdvisorLoader,
    price: PriceLoader,
    scores: ScoreFetcher<A>,
}

impl SpotData<ConsoleClient> {
    pub fn new(
        transport: Arc<Transport>,
        console: Arc<ConsoleClient>,
        cache: Option<Arc<CacheStorage>>,
    ) -> Self {
        Self {
            advisor: AdvisorLoader::new(transport.clone(), cache.clone()),
            price: PriceLoader::new(transport, cache.clone()),
            scores: ScoreFetcher::new(console, cache),
        }
    }
}

impl<A: MarketScoreApi + 'static> SpotData<A> {
    pub fn advisor(&self) -> &AdvisorLoader {
        &self.advisor
    }

    pub fn price(&self) -> &PriceLoader {
        &self.price
    }

    pub fn scores(&self) -> &ScoreFetcher<A> {
        &self.scores
    }

    #[cfg(test)]
    pub fn with_parts(advisor: AdvisorLoader, price: PriceLoader, scores: ScoreFetcher<A>) -> Self {
        Self {
            advisor,
            price,
            scores,
        }
    }
}
