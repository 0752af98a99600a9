//! Historical spot price dataset and loader
//!
//! The pricing feed is a JSONP document (`callback({...});`) with prices as
//! strings and a handful of non-standard region codes. Both quirks are
//! handled during normalization; the cached form is the normalized dataset.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::cache::{CacheStorage, CacheTtl};
use crate::client::Transport;
use crate::error::{DataError, Result};
use crate::spot::InstanceOs;

const PRICE_URL: &str = "https://spot-price.s3.amazonaws.com/spot.js";
// Bulk download, much larger than the advisor document
const PRICE_TIMEOUT: Duration = Duration::from_secs(60);
const CACHE_NAME: &str = "price";

const JSONP_PREFIX: &str = "callback(";
const JSONP_SUFFIX: &str = ");";

/// Resolve the price feed URL, honoring the `SPOTOP_PRICE_URL` override
pub fn price_url() -> String {
    std::env::var("SPOTOP_PRICE_URL").unwrap_or_else(|_| PRICE_URL.to_string())
}

/// Map the feed's non-standard region codes to canonical AWS region codes
fn canonical_region(raw: &str) -> &str {
    match raw {
        "us-east" => "us-east-1",
        "us-west" => "us-west-1",
        "eu-ireland" => "eu-west-1",
        "apac-sin" => "ap-southeast-1",
        "apac-syd" => "ap-southeast-2",
        "apac-tokyo" => "ap-northeast-1",
        other => other,
    }
}

/// Spot price per OS in USD/hour
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InstancePrice {
    pub linux: f64,
    pub windows: f64,
}

/// Normalized price dataset keyed by canonical region code
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceData {
    pub regions: HashMap<String, HashMap<String, InstancePrice>>,
}

impl PriceData {
    /// Price lookup; `None` when the feed has no coverage for the pair
    pub fn price_for(&self, region: &str, instance: &str, os: InstanceOs) -> Option<f64> {
        let price = self.regions.get(region)?.get(instance)?;
        Some(match os {
            InstanceOs::Linux => price.linux,
            InstanceOs::Windows => price.windows,
        })
    }
}

// Wire shapes, externally owned

#[derive(Debug, Deserialize)]
struct RawPrice {
    config: RawConfig,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    regions: Vec<RawRegion>,
}

#[derive(Debug, Deserialize)]
struct RawRegion {
    region: String,
    #[serde(rename = "instanceTypes")]
    instance_types: Vec<RawInstanceType>,
}

#[derive(Debug, Deserialize)]
struct RawInstanceType {
    sizes: Vec<RawSize>,
}

#[derive(Debug, Deserialize)]
struct RawSize {
    size: String,
    #[serde(rename = "valueColumns")]
    value_columns: Vec<RawValueColumn>,
}

#[derive(Debug, Deserialize)]
struct RawValueColumn {
    name: String,
    prices: RawPrices,
}

#[derive(Debug, Deserialize)]
struct RawPrices {
    #[serde(rename = "USD")]
    usd: String,
}

/// Strip the JSONP wrapper and parse the inner document
fn parse_jsonp(body: &[u8]) -> Result<RawPrice> {
    let text = std::str::from_utf8(body).map_err(|e| DataError::MalformedData {
        source_name: "spot price",
        detail: format!("feed is not UTF-8: {}", e),
    })?;

    let trimmed = text.trim();
    let inner = trimmed.strip_prefix(JSONP_PREFIX).unwrap_or(trimmed);
    let inner = inner.strip_suffix(JSONP_SUFFIX).unwrap_or(inner);

    serde_json::from_str(inner).map_err(|e| {
        DataError::MalformedData {
            source_name: "spot price",
            detail: e.to_string(),
        }
        .into()
    })
}

/// Flatten the raw document into the region/instance price table.
/// Unparseable USD strings ("N/A*" and friends) read as zero; the `mswin`
/// column is Windows, anything else Linux.
fn normalize(raw: RawPrice) -> PriceData {
    let mut regions = HashMap::new();

    for region in raw.config.regions {
        let name = canonical_region(&region.region).to_string();
        let instances: &mut HashMap<String, InstancePrice> = regions.entry(name).or_default();

        for instance_type in region.instance_types {
            for size in instance_type.sizes {
                let mut price = InstancePrice::default();
                for column in size.value_columns {
                    let usd = column.prices.usd.parse::<f64>().unwrap_or(0.0);
                    if column.name == "mswin" {
                        price.windows = usd;
                    } else {
                        price.linux = usd;
                    }
                }
                instances.insert(size.size, price);
            }
        }
    }

    PriceData { regions }
}

/// Single-flight loader for the price dataset
pub struct PriceLoader {
    cell: OnceCell<Arc<PriceData>>,
    transport: Arc<Transport>,
    cache: Option<Arc<CacheStorage>>,
    url: String,
}

impl PriceLoader {
    pub fn new(transport: Arc<Transport>, cache: Option<Arc<CacheStorage>>) -> Self {
        Self {
            cell: OnceCell::new(),
            transport,
            cache,
            url: price_url(),
        }
    }

    #[cfg(test)]
    pub fn preloaded(data: PriceData) -> Self {
        Self {
            cell: OnceCell::new_with(Some(Arc::new(data))),
            transport: Arc::new(Transport::new().unwrap()),
            cache: None,
            url: String::new(),
        }
    }

    /// Get the price dataset, loading it on first call
    pub async fn get(&self) -> Result<Arc<PriceData>> {
        let data = self
            .cell
            .get_or_try_init(|| async { self.load().await.map(Arc::new) })
            .await?;
        Ok(data.clone())
    }

    async fn load(&self) -> Result<PriceData> {
        if let Some(cache) = &self.cache
            && let Some(data) = cache.get_json::<PriceData>(CACHE_NAME, CacheTtl::PRICE)
        {
            log::debug!("price dataset loaded from cache");
            return Ok(data);
        }

        log::info!("fetching spot price dataset");
        let bytes = self
            .transport
            .get_bytes(&self.url, PRICE_TIMEOUT)
            .await
            .map_err(|e| DataError::SourceUnavailable {
                source_name: "spot price",
                detail: e.to_string(),
            })?;

        let data = normalize(parse_jsonp(&bytes)?);
        if let Some(cache) = &self.cache {
            cache.put_json(CACHE_NAME, &data);
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"callback({
        "config": {
            "rate": "perhr",
            "regions": [
                {
                    "region": "us-east",
                    "instanceTypes": [
                        {
                            "type": "computeCurrentGen",
                            "sizes": [
                                {
                                    "size": "c5.xlarge",
                                    "valueColumns": [
                                        {"name": "linux", "prices": {"USD": "0.0654"}},
                                        {"name": "mswin", "prices": {"USD": "0.2454"}}
                                    ]
                                },
                                {
                                    "size": "c5.metal",
                                    "valueColumns": [
                                        {"name": "linux", "prices": {"USD": "N/A*"}}
                                    ]
                                }
                            ]
                        }
                    ]
                },
                {
                    "region": "eu-central-1",
                    "instanceTypes": [
                        {
                            "type": "generalCurrentGen",
                            "sizes": [
                                {
                                    "size": "m5.large",
                                    "valueColumns": [
                                        {"name": "linux", "prices": {"USD": "0.0412"}}
                                    ]
                                }
                            ]
                        }
                    ]
                }
            ]
        }
    });"#;

    fn sample_data() -> PriceData {
        normalize(parse_jsonp(SAMPLE.as_bytes()).unwrap())
    }

    #[test]
    fn test_jsonp_wrapper_stripped() {
        assert!(parse_jsonp(SAMPLE.as_bytes()).is_ok());
    }

    #[test]
    fn test_bare_json_also_accepted() {
        let bare = SAMPLE
            .trim()
            .strip_prefix("callback(")
            .unwrap()
            .strip_suffix(");")
            .unwrap();
        assert!(parse_jsonp(bare.as_bytes()).is_ok());
    }

    #[test]
    fn test_malformed_body_is_error() {
        let err = parse_jsonp(b"callback(this is not json);").unwrap_err();
        match err {
            crate::error::Error::Data(DataError::MalformedData { source_name, .. }) => {
                assert_eq!(source_name, "spot price");
            }
            other => panic!("expected MalformedData, got {other:?}"),
        }
    }

    #[test]
    fn test_region_alias_normalized() {
        let data = sample_data();

        // The raw feed says "us-east"; the dataset is keyed canonically
        assert!(data.regions.contains_key("us-east-1"));
        assert!(!data.regions.contains_key("us-east"));

        // Regions already canonical pass through untouched
        assert!(data.regions.contains_key("eu-central-1"));
    }

    #[test]
    fn test_os_column_split() {
        let data = sample_data();

        assert_eq!(
            data.price_for("us-east-1", "c5.xlarge", InstanceOs::Linux),
            Some(0.0654)
        );
        assert_eq!(
            data.price_for("us-east-1", "c5.xlarge", InstanceOs::Windows),
            Some(0.2454)
        );
    }

    #[test]
    fn test_unparseable_price_reads_as_zero() {
        let data = sample_data();
        assert_eq!(
            data.price_for("us-east-1", "c5.metal", InstanceOs::Linux),
            Some(0.0)
        );
    }

    #[test]
    fn test_missing_coverage_is_none() {
        let data = sample_data();
        assert_eq!(
            data.price_for("us-east-1", "z9.mega", InstanceOs::Linux),
            None
        );
        assert_eq!(
            data.price_for("ap-south-1", "c5.xlarge", InstanceOs::Linux),
            None
        );
    }
}
