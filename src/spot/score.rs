//! Live market score dataset and fetcher
//!
//! The console score endpoint accepts a batch of zones and instance types
//! per call. The full instance universe is split into fixed-size batches
//! dispatched through a bounded pool; results merge into a shared table
//! under a lock. A failed batch is logged and skipped, so live coverage
//! degrades instead of failing the whole dataset.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheStorage, CacheTtl, score_cache_name};
use crate::client::{MarketScore, MarketScoreApi};
use crate::error::{DataError, Result};

/// Instance types per score call (the endpoint has a payload ceiling)
pub const SCORE_BATCH_SIZE: usize = 50;

/// Concurrent in-flight score calls (the endpoint has a rate ceiling)
pub const SCORE_MAX_CONCURRENT: usize = 10;

/// Scores keyed by availability zone, then instance type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreDataset {
    zones: HashMap<String, HashMap<String, i32>>,
}

impl ScoreDataset {
    /// Score lookup; `None` when live data never arrived for the pair
    pub fn lookup(&self, zone: &str, instance: &str) -> Option<i32> {
        self.zones.get(zone)?.get(instance).copied()
    }

    /// Score for a pair; a missing entry reads as zero ("unknown/lowest"),
    /// never an error.
    pub fn score(&self, zone: &str, instance: &str) -> i32 {
        self.lookup(zone, instance).unwrap_or(0)
    }

    /// Number of (zone, instance) pairs with a live score
    pub fn len(&self) -> usize {
        self.zones.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    fn merge(&mut self, rows: Vec<MarketScore>) {
        for row in rows {
            self.zones
                .entry(row.zone)
                .or_default()
                .insert(row.instance, row.score);
        }
    }
}

type BatchFuture = Pin<Box<dyn Future<Output = (usize, Result<Vec<MarketScore>>)> + Send>>;

/// Single-flight fetcher for the live score dataset
pub struct ScoreFetcher<A: MarketScoreApi> {
    api: Arc<A>,
    cache: Option<Arc<CacheStorage>>,
    cell: OnceCell<Arc<ScoreDataset>>,
}

impl<A: MarketScoreApi + 'static> ScoreFetcher<A> {
    pub fn new(api: Arc<A>, cache: Option<Arc<CacheStorage>>) -> Self {
        Self {
            api,
            cache,
            cell: OnceCell::new(),
        }
    }

    /// Whether score queries can be made at all
    pub fn authenticated(&self) -> bool {
        self.api.authenticated()
    }

    /// Populate (at most once) and return the score dataset for the given
    /// universe. Concurrent callers block until the first population
    /// completes; nobody observes a half-merged table.
    pub async fn dataset(
        &self,
        zones: &[String],
        instances: &[String],
        cancel: &CancellationToken,
    ) -> Result<Arc<ScoreDataset>> {
        let data = self
            .cell
            .get_or_try_init(|| async {
                self.populate(zones, instances, cancel).await.map(Arc::new)
            })
            .await?;
        Ok(data.clone())
    }

    /// Score for one pair, populating the dataset first if needed
    pub async fn get(
        &self,
        zones: &[String],
        instances: &[String],
        cancel: &CancellationToken,
        zone: &str,
        instance: &str,
    ) -> Result<i32> {
        let data = self.dataset(zones, instances, cancel).await?;
        Ok(data.score(zone, instance))
    }

    async fn populate(
        &self,
        zones: &[String],
        instances: &[String],
        cancel: &CancellationToken,
    ) -> Result<ScoreDataset> {
        let cache_name = score_cache_name(zones, instances);
        if let Some(cache) = &self.cache
            && let Some(data) = cache.get_json::<ScoreDataset>(&cache_name, CacheTtl::SCORE)
        {
            log::debug!("score dataset loaded from cache");
            return Ok(data);
        }

        if cancel.is_cancelled() {
            return Err(DataError::Cancelled.into());
        }

        let batches: Vec<Vec<String>> = instances
            .chunks(SCORE_BATCH_SIZE)
            .map(|chunk| chunk.to_vec())
            .collect();
        let total = batches.len();
        log::debug!(
            "dispatching {} score batches ({} instance types, {} zones, {} in flight)",
            total,
            instances.len(),
            zones.len(),
            SCORE_MAX_CONCURRENT
        );

        let table = Arc::new(Mutex::new(ScoreDataset::default()));
        let zone_universe: Arc<Vec<String>> = Arc::new(zones.to_vec());
        let mut failed = 0usize;

        let make_future = |index: usize, batch: Vec<String>| -> BatchFuture {
            let api = self.api.clone();
            let zones = zone_universe.clone();
            Box::pin(async move { (index, api.market_scores(&zones, &batch).await) })
        };

        let mut pending = batches.into_iter().enumerate();
        let mut in_flight: FuturesUnordered<BatchFuture> = FuturesUnordered::new();

        // Seed up to the pool size, then refill one per completion
        for (index, batch) in pending.by_ref().take(SCORE_MAX_CONCURRENT) {
            in_flight.push(make_future(index, batch));
        }

        while let Some((index, result)) = in_flight.next().await {
            match result {
                Ok(rows) => {
                    log::debug!("score batch {} returned {} rows", index + 1, rows.len());
                    if let Ok(mut guard) = table.lock() {
                        guard.merge(rows);
                    }
                }
                Err(e) => {
                    log::warn!("score batch {} failed, skipping: {}", index + 1, e);
                    failed += 1;
                }
            }

            // Cancellation stops new dispatch; in-flight calls drain normally
            if !cancel.is_cancelled()
                && let Some((index, batch)) = pending.next()
            {
                in_flight.push(make_future(index, batch));
            }
        }

        if cancel.is_cancelled() {
            return Err(DataError::Cancelled.into());
        }

        if failed > 0 {
            log::warn!("{} of {} score batches failed", failed, total);
        }

        let data = table.lock().map(|guard| guard.clone()).unwrap_or_default();
        if let Some(cache) = &self.cache {
            cache.put_json(&cache_name, &data);
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock score API: one row per (zone, instance) pair, with optional
    /// per-batch failure and concurrency tracking.
    struct MockScoreApi {
        calls: AtomicUsize,
        concurrent: AtomicUsize,
        max_concurrent: AtomicUsize,
        fail_marker: Option<String>,
        cancel_on_call: Option<CancellationToken>,
    }

    impl MockScoreApi {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                concurrent: AtomicUsize::new(0),
                max_concurrent: AtomicUsize::new(0),
                fail_marker: None,
                cancel_on_call: None,
            }
        }

        fn failing_on(marker: &str) -> Self {
            Self {
                fail_marker: Some(marker.to_string()),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl MarketScoreApi for MockScoreApi {
        fn authenticated(&self) -> bool {
            true
        }

        async fn market_scores(
            &self,
            zones: &[String],
            instances: &[String],
        ) -> Result<Vec<MarketScore>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(token) = &self.cancel_on_call {
                token.cancel();
            }

            let current = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_concurrent.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
            self.concurrent.fetch_sub(1, Ordering::SeqCst);

            if let Some(marker) = &self.fail_marker
                && instances.iter().any(|i| i == marker)
            {
                return Err(crate::error::ApiError::Network("boom".to_string()).into());
            }

            let mut rows = Vec::new();
            for zone in zones {
                for instance in instances {
                    rows.push(MarketScore {
                        zone: zone.clone(),
                        instance: instance.clone(),
                        score: 70,
                    });
                }
            }
            Ok(rows)
        }
    }

    fn instance_universe(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c5.size{}", i)).collect()
    }

    fn zone_universe() -> Vec<String> {
        vec!["us-east-1a".to_string(), "us-east-1b".to_string()]
    }

    #[tokio::test]
    async fn test_batch_count_is_ceil_of_universe() {
        // 120 instances at batch size 50 -> 3 calls
        let api = Arc::new(MockScoreApi::new());
        let fetcher = ScoreFetcher::new(api.clone(), None);
        let zones = zone_universe();
        let instances = instance_universe(120);

        let data = fetcher
            .dataset(&zones, &instances, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
        // One entry per queried (zone, instance) pair
        assert_eq!(data.len(), zones.len() * instances.len());
    }

    #[tokio::test]
    async fn test_failed_batch_omits_only_its_pairs() {
        let api = Arc::new(MockScoreApi::failing_on("c5.size75"));
        let fetcher = ScoreFetcher::new(api.clone(), None);
        let zones = zone_universe();
        let instances = instance_universe(120);

        let data = fetcher
            .dataset(&zones, &instances, &CancellationToken::new())
            .await
            .unwrap();

        // The middle batch (instances 50..100) failed; the rest survived
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
        assert_eq!(data.len(), zones.len() * (instances.len() - 50));
        assert!(data.lookup("us-east-1a", "c5.size0").is_some());
        assert!(data.lookup("us-east-1a", "c5.size75").is_none());
        assert!(data.lookup("us-east-1a", "c5.size110").is_some());
    }

    #[tokio::test]
    async fn test_concurrency_ceiling_observed() {
        // 600 instances -> 12 batches, pool capped at 10
        let api = Arc::new(MockScoreApi::new());
        let fetcher = ScoreFetcher::new(api.clone(), None);
        let zones = vec!["us-east-1a".to_string()];
        let instances = instance_universe(600);

        fetcher
            .dataset(&zones, &instances, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(api.calls.load(Ordering::SeqCst), 12);
        assert!(api.max_concurrent.load(Ordering::SeqCst) <= SCORE_MAX_CONCURRENT);
    }

    #[tokio::test]
    async fn test_cancelled_before_dispatch() {
        let api = Arc::new(MockScoreApi::new());
        let fetcher = ScoreFetcher::new(api.clone(), None);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fetcher
            .dataset(&zone_universe(), &instance_universe(10), &cancel)
            .await
            .unwrap_err();

        match err {
            crate::error::Error::Data(DataError::Cancelled) => (),
            other => panic!("expected Cancelled, got {other:?}"),
        }
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_stops_new_batches() {
        // First call cancels the token: the seeded batches finish, nothing
        // new is dispatched, and the caller gets a cancellation error.
        let cancel = CancellationToken::new();
        let api = Arc::new(MockScoreApi {
            cancel_on_call: Some(cancel.clone()),
            ..MockScoreApi::new()
        });
        let fetcher = ScoreFetcher::new(api.clone(), None);
        let instances = instance_universe(20 * SCORE_BATCH_SIZE);

        let err = fetcher
            .dataset(&zone_universe(), &instances, &cancel)
            .await
            .unwrap_err();

        match err {
            crate::error::Error::Data(DataError::Cancelled) => (),
            other => panic!("expected Cancelled, got {other:?}"),
        }
        assert!(api.calls.load(Ordering::SeqCst) <= SCORE_MAX_CONCURRENT);
    }

    #[tokio::test]
    async fn test_single_flight_population() {
        let api = Arc::new(MockScoreApi::new());
        let fetcher = ScoreFetcher::new(api.clone(), None);
        let zones = zone_universe();
        let instances = instance_universe(10);
        let cancel = CancellationToken::new();

        let first = fetcher.dataset(&zones, &instances, &cancel).await.unwrap();
        let calls_after_first = api.calls.load(Ordering::SeqCst);
        let second = fetcher.dataset(&zones, &instances, &cancel).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(api.calls.load(Ordering::SeqCst), calls_after_first);
    }

    #[tokio::test]
    async fn test_get_defaults_missing_pair_to_zero() {
        let api = Arc::new(MockScoreApi::new());
        let fetcher = ScoreFetcher::new(api, None);
        let zones = zone_universe();
        let instances = instance_universe(2);
        let cancel = CancellationToken::new();

        let known = fetcher
            .get(&zones, &instances, &cancel, "us-east-1a", "c5.size0")
            .await
            .unwrap();
        let unknown = fetcher
            .get(&zones, &instances, &cancel, "eu-west-1a", "z9.mega")
            .await
            .unwrap();

        assert_eq!(known, 70);
        assert_eq!(unknown, 0);
    }

    #[tokio::test]
    async fn test_populated_dataset_served_from_cache() {
        let dir = tempfile::TempDir::new().unwrap();
        let cache = Arc::new(CacheStorage::open_at(dir.path()).unwrap());
        let zones = zone_universe();
        let instances = instance_universe(5);
        let cancel = CancellationToken::new();

        let api1 = Arc::new(MockScoreApi::new());
        let fetcher1 = ScoreFetcher::new(api1.clone(), Some(cache.clone()));
        fetcher1.dataset(&zones, &instances, &cancel).await.unwrap();
        assert_eq!(api1.calls.load(Ordering::SeqCst), 1);

        // A fresh fetcher (new process, same universe) hits the disk cache
        let api2 = Arc::new(MockScoreApi::new());
        let fetcher2 = ScoreFetcher::new(api2.clone(), Some(cache));
        let data = fetcher2.dataset(&zones, &instances, &cancel).await.unwrap();

        assert_eq!(api2.calls.load(Ordering::SeqCst), 0);
        assert_eq!(data.len(), zones.len() * instances.len());
    }
}
