//! Known availability zones per region
//!
//! The score endpoint wants explicit zone names, so regions are mapped to
//! their common zone sets here. A region missing from the table contributes
//! no zones; its score maps simply stay empty.

/// Availability zones known for a region
pub fn zones_for_region(region: &str) -> &'static [&'static str] {
    match region {
        "us-east-1" => &[
            "us-east-1a",
            "us-east-1b",
            "us-east-1c",
            "us-east-1d",
            "us-east-1f",
        ],
        "us-east-2" => &["us-east-2a", "us-east-2b", "us-east-2c"],
        "us-west-1" => &["us-west-1a", "us-west-1b"],
        "us-west-2" => &["us-west-2a", "us-west-2b", "us-west-2c", "us-west-2d"],
        "eu-west-1" => &["eu-west-1a", "eu-west-1b", "eu-west-1c"],
        "eu-central-1" => &["eu-central-1a", "eu-central-1b", "eu-central-1c"],
        "ap-southeast-1" => &["ap-southeast-1a", "ap-southeast-1b", "ap-southeast-1c"],
        "ap-northeast-1" => &["ap-northeast-1a", "ap-northeast-1c", "ap-northeast-1d"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_region_has_zones() {
        let zones = zones_for_region("us-east-1");
        assert!(zones.contains(&"us-east-1a"));
        assert_eq!(zones.len(), 5);
    }

    #[test]
    fn test_unknown_region_has_no_zones() {
        assert!(zones_for_region("mars-north-1").is_empty());
    }

    #[test]
    fn test_zones_belong_to_their_region() {
        for region in ["us-east-2", "eu-west-1", "ap-northeast-1"] {
            for zone in zones_for_region(region) {
                assert!(zone.starts_with(region), "{zone} not in {region}");
            }
        }
    }
}
