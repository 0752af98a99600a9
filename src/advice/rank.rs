//! Stable ranking of advice records

use std::cmp::Ordering;

use crate::advice::Advice;

/// Sort key for advice output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    Range,
    Instance,
    Savings,
    Price,
    Region,
}

impl SortBy {
    /// Parse a sort key name; unrecognized names fall back to the
    /// interruption range.
    pub fn parse(name: &str) -> Self {
        match name {
            "type" | "instance" => SortBy::Instance,
            "savings" => SortBy::Savings,
            "price" => SortBy::Price,
            "region" => SortBy::Region,
            "interruption" | "range" => SortBy::Range,
            other => {
                if !other.is_empty() {
                    log::debug!("unknown sort key {:?}, sorting by range", other);
                }
                SortBy::Range
            }
        }
    }
}

/// Sort records by the given key. The sort is stable, so records equal
/// under the key keep their aggregation order, and descending output is
/// the exact reverse of ascending output.
pub fn rank(mut records: Vec<Advice>, key: SortBy, ascending: bool) -> Vec<Advice> {
    records.sort_by(|a, b| {
        let ord = compare(a, b, key);
        if ascending { ord } else { ord.reverse() }
    });
    records
}

fn compare(a: &Advice, b: &Advice, key: SortBy) -> Ordering {
    match key {
        SortBy::Range => a.range.min.cmp(&b.range.min),
        SortBy::Instance => a.instance.cmp(&b.instance),
        SortBy::Savings => a.savings.cmp(&b.savings),
        SortBy::Price => a.price.total_cmp(&b.price),
        SortBy::Region => a.region.cmp(&b.region),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spot::{InstanceShape, InterruptionRange};

    fn record(region: &str, instance: &str, range_min: i32, savings: i32, price: f64) -> Advice {
        Advice {
            region: region.to_string(),
            instance: instance.to_string(),
            range: InterruptionRange {
                label: format!("{}%", range_min),
                min: range_min,
                max: range_min + 5,
            },
            savings,
            shape: InstanceShape::default(),
            price,
            zone_scores: None,
        }
    }

    fn fixture() -> Vec<Advice> {
        vec![
            record("us-east-1", "m5.large", 6, 60, 0.20),
            record("us-east-1", "c5.xlarge", 0, 40, 0.10),
            record("us-west-2", "t3.micro", 6, 70, 0.05),
        ]
    }

    #[test]
    fn test_sort_by_range_ascending() {
        let ranked = rank(fixture(), SortBy::Range, true);
        let names: Vec<&str> = ranked.iter().map(|r| r.instance.as_str()).collect();
        assert_eq!(names, vec!["c5.xlarge", "m5.large", "t3.micro"]);
    }

    #[test]
    fn test_equal_keys_keep_input_order() {
        // m5.large and t3.micro tie on range; stable sort preserves
        // their relative order both ways
        let ranked = rank(fixture(), SortBy::Range, true);
        assert_eq!(ranked[1].instance, "m5.large");
        assert_eq!(ranked[2].instance, "t3.micro");

        let ranked = rank(fixture(), SortBy::Range, false);
        assert_eq!(ranked[0].instance, "m5.large");
        assert_eq!(ranked[1].instance, "t3.micro");
    }

    #[test]
    fn test_descending_is_exact_reverse_without_ties() {
        let asc = rank(fixture(), SortBy::Price, true);
        let mut desc = rank(fixture(), SortBy::Price, false);
        desc.reverse();
        let asc: Vec<&str> = asc.iter().map(|r| r.instance.as_str()).collect();
        let desc: Vec<&str> = desc.iter().map(|r| r.instance.as_str()).collect();
        assert_eq!(asc, desc);
    }

    #[test]
    fn test_each_key_orders_by_its_field() {
        let by_instance = rank(fixture(), SortBy::Instance, true);
        assert_eq!(by_instance[0].instance, "c5.xlarge");

        let by_savings = rank(fixture(), SortBy::Savings, false);
        assert_eq!(by_savings[0].savings, 70);

        let by_price = rank(fixture(), SortBy::Price, true);
        assert_eq!(by_price[0].price, 0.05);

        let by_region = rank(fixture(), SortBy::Region, false);
        assert_eq!(by_region[0].region, "us-west-2");
    }

    #[test]
    fn test_parse_sort_keys() {
        assert_eq!(SortBy::parse("type"), SortBy::Instance);
        assert_eq!(SortBy::parse("instance"), SortBy::Instance);
        assert_eq!(SortBy::parse("savings"), SortBy::Savings);
        assert_eq!(SortBy::parse("price"), SortBy::Price);
        assert_eq!(SortBy::parse("region"), SortBy::Region);
        assert_eq!(SortBy::parse("interruption"), SortBy::Range);
        assert_eq!(SortBy::parse("range"), SortBy::Range);
        assert_eq!(SortBy::parse("bogus"), SortBy::Range);
    }
}
