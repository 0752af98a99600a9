//! Spot advisor dataset and loader
//!
//! The public advisor feed carries interruption frequency ranges, savings
//! percentages per (region, OS, instance), and instance shapes. The raw wire
//! shape is normalized once on load and cached in normalized form.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::cache::{CacheStorage, CacheTtl};
use crate::client::Transport;
use crate::error::{DataError, Result};
use crate::spot::InstanceOs;

const ADVISOR_URL: &str = "https://spot-bid-advisor.s3.amazonaws.com/spot-advisor-data.json";
const ADVISOR_TIMEOUT: Duration = Duration::from_secs(10);
const CACHE_NAME: &str = "advisor";

/// Resolve the advisor feed URL, honoring the `SPOTOP_ADVISOR_URL` override
pub fn advisor_url() -> String {
    std::env::var("SPOTOP_ADVISOR_URL").unwrap_or_else(|_| ADVISOR_URL.to_string())
}

/// One interruption frequency band, e.g. "<5%" covering 0..=5
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptionRange {
    pub label: String,
    pub min: i32,
    pub max: i32,
}

/// Instance hardware shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceShape {
    pub cores: u32,
    pub emr: bool,
    pub ram_gb: f32,
}

/// Advisory entry for one instance in one (region, OS) partition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotEntry {
    /// Index into [`AdvisorData::ranges`]
    pub range: usize,
    /// Savings over on-demand, percent
    pub savings: i32,
}

/// Per-region advisory entries, partitioned by OS
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionAdvice {
    #[serde(default)]
    pub linux: HashMap<String, SpotEntry>,
    #[serde(default)]
    pub windows: HashMap<String, SpotEntry>,
}

impl RegionAdvice {
    pub fn os_partition(&self, os: InstanceOs) -> &HashMap<String, SpotEntry> {
        match os {
            InstanceOs::Linux => &self.linux,
            InstanceOs::Windows => &self.windows,
        }
    }
}

/// Normalized advisor dataset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvisorData {
    /// Global range list; [`SpotEntry::range`] indexes into it
    pub ranges: Vec<InterruptionRange>,
    pub instance_types: HashMap<String, InstanceShape>,
    pub regions: HashMap<String, RegionAdvice>,
}

impl AdvisorData {
    pub fn range(&self, index: usize) -> Option<&InterruptionRange> {
        self.ranges.get(index)
    }

    /// Shape for an instance type; instances missing from the shape table
    /// read as an all-zero shape.
    pub fn shape(&self, instance: &str) -> InstanceShape {
        self.instance_types
            .get(instance)
            .copied()
            .unwrap_or_default()
    }
}

// Wire shapes, externally owned

#[derive(Deserialize)]
struct RawAdvisor {
    ranges: Vec<RawRange>,
    instance_types: HashMap<String, InstanceShape>,
    spot_advisor: HashMap<String, RawOsPartitions>,
}

#[derive(Deserialize)]
struct RawRange {
    label: String,
    index: usize,
    max: i32,
}

#[derive(Deserialize)]
struct RawOsPartitions {
    #[serde(rename = "Windows", default)]
    windows: HashMap<String, RawSpotInfo>,
    #[serde(rename = "Linux", default)]
    linux: HashMap<String, RawSpotInfo>,
}

#[derive(Deserialize)]
struct RawSpotInfo {
    r: usize,
    s: i32,
}

/// Normalize the raw feed. The wire carries only each range's `max`; `min`
/// is derived as the previous range's max plus one after sorting by index.
fn normalize(raw: RawAdvisor) -> AdvisorData {
    let mut raw_ranges = raw.ranges;
    raw_ranges.sort_by_key(|r| r.index);

    let mut ranges = Vec::with_capacity(raw_ranges.len());
    let mut prev_max = -1;
    for r in raw_ranges {
        ranges.push(InterruptionRange {
            label: r.label,
            min: prev_max + 1,
            max: r.max,
        });
        prev_max = r.max;
    }

    let regions = raw
        .spot_advisor
        .into_iter()
        .map(|(region, os_partitions)| {
            let convert = |entries: HashMap<String, RawSpotInfo>| {
                entries
                    .into_iter()
                    .map(|(instance, info)| {
                        (
                            instance,
                            SpotEntry {
                                range: info.r,
                                savings: info.s,
                            },
                        )
                    })
                    .collect()
            };
            (
                region,
                RegionAdvice {
                    linux: convert(os_partitions.linux),
                    windows: convert(os_partitions.windows),
                },
            )
        })
        .collect();

    AdvisorData {
        ranges,
        instance_types: raw.instance_types,
        regions,
    }
}

/// Single-flight loader for the advisor dataset.
///
/// The first `get` call performs cache lookup, remote fetch, and
/// normalization; every caller observes the same fully-populated dataset.
pub struct AdvisorLoader {
    cell: OnceCell<Arc<AdvisorData>>,
    transport: Arc<Transport>,
    cache: Option<Arc<CacheStorage>>,
    url: String,
}

impl AdvisorLoader {
    pub fn new(transport: Arc<Transport>, cache: Option<Arc<CacheStorage>>) -> Self {
        Self {
            cell: OnceCell::new(),
            transport,
            cache,
            url: advisor_url(),
        }
    }

    #[cfg(test)]
    pub fn preloaded(data: AdvisorData) -> Self {
        Self {
            cell: OnceCell::new_with(Some(Arc::new(data))),
            transport: Arc::new(Transport::new().unwrap()),
            cache: None,
            url: String::new(),
        }
    }

    /// Get the advisor dataset, loading it on first call
    pub async fn get(&self) -> Result<Arc<AdvisorData>> {
        let data = self
            .cell
            .get_or_try_init(|| async { self.load().await.map(Arc::new) })
            .await?;
        Ok(data.clone())
    }

    async fn load(&self) -> Result<AdvisorData> {
        if let Some(cache) = &self.cache
            && let Some(data) = cache.get_json::<AdvisorData>(CACHE_NAME, CacheTtl::ADVISOR)
        {
            log::debug!("advisor dataset loaded from cache");
            return Ok(data);
        }

        log::info!("fetching spot advisor dataset");
        let bytes = self
            .transport
            .get_bytes(&self.url, ADVISOR_TIMEOUT)
            .await
            .map_err(|e| DataError::SourceUnavailable {
                source_name: "spot advisor",
                detail: e.to_string(),
            })?;

        let raw: RawAdvisor =
            serde_json::from_slice(&bytes).map_err(|e| DataError::MalformedData {
                source_name: "spot advisor",
                detail: e.to_string(),
            })?;

        let data = normalize(raw);
        if let Some(cache) = &self.cache {
            cache.put_json(CACHE_NAME, &data);
        }

        Ok(data)
    }
}
