//! Cache entry naming using SHA-256 hashes

use sha2::{Digest, Sha256};

/// Generate a deterministic cache entry name for a score query universe.
///
/// The name carries a hash of the queried zones and instance types so runs
/// with a different universe repopulate instead of serving a mismatched
/// table. Inputs are sorted for a consistent name regardless of order.
pub fn score_cache_name(zones: &[String], instances: &[String]) -> String {
    let mut hasher = Sha256::new();

    let mut sorted_zones: Vec<_> = zones.iter().collect();
    sorted_zones.sort();
    for zone in sorted_zones {
        hasher.update(zone.as_bytes());
        hasher.update(b"|");
    }

    hasher.update(b"#");

    let mut sorted_instances: Vec<_> = instances.iter().collect();
    sorted_instances.sort();
    for instance in sorted_instances {
        hasher.update(instance.as_bytes());
        hasher.update(b"|");
    }

    let digest = hasher.finalize();
    format!("score-{:x}", digest)[..22].to_string()
}
