//! Content-addressed fingerprints for strategy specs.
//!
//! Two runs with identical specs hash identically, which lets run
//! manifests and cached artifacts be compared across machines.

use crate::domain::strategy::StrategySpec;

/// Deterministic hash of a strategy specification (blake3 over its
/// canonical JSON form).
pub fn spec_fingerprint(spec: &StrategySpec) -> String {
    let json = serde_json::to_string(spec).expect("StrategySpec serialization failed");
    blake3::hash(json.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::presets;

    #[test]
    fn fingerprint_is_deterministic() {
        let spec = presets::scrubbing();
        assert_eq!(spec_fingerprint(&spec), spec_fingerprint(&spec));
    }

    #[test]
    fn fingerprint_changes_with_spec() {
        let a = presets::simple();
        let mut b = a.clone();
        b.confounds.gs = crate::domain::strategy::SignalGroup::raw();
        assert_ne!(spec_fingerprint(&a), spec_fingerprint(&b));
    }

    #[test]
    fn presets_have_distinct_fingerprints() {
        let mut prints: Vec<String> =
            presets::all().iter().map(spec_fingerprint).collect();
        prints.sort();
        prints.dedup();
        assert_eq!(prints.len(), 6);
    }
}
