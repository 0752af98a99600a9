//! Query planning and cross-source aggregation
//!
//! One query fans out to the advisory feed, the price feed, and (when
//! requested) the live score API, then joins the three into flat advice
//! records ready for ranking and rendering.

pub mod rank;

use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::client::MarketScoreApi;
use crate::error::{DataError, Result};
use crate::spot::{InstanceOs, InstanceShape, InterruptionRange, SpotData, zones_for_region};

/// One fully-joined advice record for a (region, instance type) pair
#[derive(Debug, Clone, Serialize)]
pub struct Advice {
    pub region: String,
    pub instance: String,
    pub range: InterruptionRange,
    /// Savings over on-demand, percent
    pub savings: i32,
    pub shape: InstanceShape,
    /// Spot price, USD per hour; zero when the price feed has no row
    pub price: f64,
    /// Per-zone market scores, present only for score-enabled queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_scores: Option<BTreeMap<String, i32>>,
}

/// Filter set for an advice query
#[derive(Debug, Clone)]
pub struct AdviceQuery {
    /// Region names; "all" expands to every region in the advisory feed
    pub regions: Vec<String>,
    /// Instance type regex, matched as a substring pattern
    pub pattern: String,
    pub os: InstanceOs,
    /// Minimum vCPU count; zero disables the filter
    pub min_vcpu: u32,
    /// Minimum memory in GiB; zero disables the filter
    pub min_memory: f32,
    pub with_scores: bool,
}

impl Default for AdviceQuery {
    fn default() -> Self {
        Self {
            regions: vec!["us-east-1".to_string()],
            pattern: String::new(),
            os: InstanceOs::Linux,
            min_vcpu: 0,
            min_memory: 0.0,
            with_scores: false,
        }
    }
}

/// Run a query against all data sources and join the results.
///
/// Fails fast on an invalid pattern or unknown region before any network
/// traffic. Missing prices degrade to zero; a failed score batch drops
/// only its own zone entries.
pub async fn aggregate<A: MarketScoreApi + 'static>(
    data: &SpotData<A>,
    query: &AdviceQuery,
    cancel: &CancellationToken,
) -> Result<Vec<Advice>> {
    let pattern = Regex::new(&query.pattern).map_err(|e| DataError::InvalidPattern {
        pattern: query.pattern.clone(),
        detail: e.to_string(),
    })?;

    if query.with_scores && !data.scores().authenticated() {
        return Err(DataError::Unauthenticated.into());
    }

    let advisor = data.advisor().get().await?;
    let regions = expand_regions(&query.regions, &advisor)?;

    // (region, instance, entry) candidates surviving the filters, in a
    // deterministic order so equal-keyed ranking is reproducible
    let mut candidates = Vec::new();
    for region in &regions {
        let Some(advice) = advisor.regions.get(region) else {
            return Err(DataError::UnknownRegion(region.clone()).into());
        };
        let partition = advice.os_partition(query.os);
        let mut instances: Vec<&String> = partition.keys().collect();
        instances.sort();
        for instance in instances {
            if !pattern.is_match(instance) {
                continue;
            }
            let shape = advisor.shape(instance);
            if query.min_vcpu > 0 && shape.cores < query.min_vcpu {
                continue;
            }
            if query.min_memory > 0.0 && shape.ram_gb < query.min_memory {
                continue;
            }
            candidates.push((region.clone(), instance.clone(), partition[instance]));
        }
    }

    let price = data.price().get().await?;

    let scores = if query.with_scores {
        let zones: Vec<String> = regions
            .iter()
            .flat_map(|r| zones_for_region(r).iter().map(|z| z.to_string()))
            .collect();
        let mut instances: Vec<String> =
            candidates.iter().map(|(_, i, _)| i.clone()).collect();
        instances.sort();
        instances.dedup();
        Some(data.scores().dataset(&zones, &instances, cancel).await?)
    } else {
        None
    };

    let mut records = Vec::with_capacity(candidates.len());
    for (region, instance, entry) in candidates {
        let Some(range) = advisor.range(entry.range) else {
            return Err(DataError::MalformedData {
                source_name: "spot advisor",
                detail: format!(
                    "instance {} in {} references range {} of {}",
                    instance,
                    region,
                    entry.range,
                    advisor.ranges.len()
                ),
            }
            .into());
        };

        let shape = advisor.shape(&instance);
        let hourly = match price.price_for(&region, &instance, query.os) {
            Some(p) => p,
            None => {
                log::debug!("no spot price for {} in {}", instance, region);
                0.0
            }
        };

        let zone_scores = scores.as_ref().map(|dataset| {
            zones_for_region(&region)
                .iter()
                .filter_map(|zone| {
                    dataset
                        .lookup(zone, &instance)
                        .map(|score| (zone.to_string(), score))
                })
                .collect()
        });

        records.push(Advice {
            region,
            instance,
            range: range.clone(),
            savings: entry.savings,
            shape,
            price: hourly,
            zone_scores,
        });
    }

    Ok(records)
}

/// Expand "all" to every advisory region, validating explicit names
fn expand_regions(
    requested: &[String],
    advisor: &crate::spot::AdvisorData,
) -> Result<Vec<String>> {
    if requested.iter().any(|r| r == "all") {
        let mut all: Vec<String> = advisor.regions.keys().cloned().collect();
        all.sort();
        return Ok(all);
    }
    for region in requested {
        if !advisor.regions.contains_key(region) {
            return Err(DataError::UnknownRegion(region.clone()).into());
        }
    }
    Ok(requested.to_vec())
}
