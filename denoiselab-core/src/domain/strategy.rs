//! Strategy specifications — strongly-typed denoising configurations.
//!
//! A `StrategySpec` fully determines which confound regressors a design
//! matrix contains. The JSON form accepts `false` or an options object for
//! each signal group and for spike regression, mirroring the strategy files
//! consumed by the wider pipeline. Unknown keys are rejected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failure for a strategy specification.
///
/// Carries every violation found, not just the first.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("strategy spec '{name}' invalid: {}", .violations.join("; "))]
    Invalid {
        name: String,
        violations: Vec<String>,
    },
}

/// One tissue/motion signal group: disabled, or enabled with optional
/// derivative and quadratic expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SignalGroupRepr", into = "SignalGroupRepr")]
pub enum SignalGroup {
    Disabled,
    Enabled { derivative: bool, quadratic: bool },
}

impl SignalGroup {
    pub fn is_enabled(&self) -> bool {
        matches!(self, SignalGroup::Enabled { .. })
    }

    /// Enabled, raw signal only.
    pub fn raw() -> Self {
        SignalGroup::Enabled {
            derivative: false,
            quadratic: false,
        }
    }

    /// Enabled with derivative and quadratic expansion (the full 4-term set).
    pub fn full() -> Self {
        SignalGroup::Enabled {
            derivative: true,
            quadratic: true,
        }
    }
}

/// JSON form: `false`/`true`, or `{"raw": true, "td": true, "quad": false}`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SignalGroupRepr {
    Flag(bool),
    Options {
        #[serde(default = "default_true")]
        raw: bool,
        #[serde(default)]
        td: bool,
        #[serde(default)]
        quad: bool,
    },
}

fn default_true() -> bool {
    true
}

impl From<SignalGroupRepr> for SignalGroup {
    fn from(repr: SignalGroupRepr) -> Self {
        match repr {
            SignalGroupRepr::Flag(false) => SignalGroup::Disabled,
            SignalGroupRepr::Flag(true) => SignalGroup::raw(),
            SignalGroupRepr::Options { raw: false, .. } => SignalGroup::Disabled,
            SignalGroupRepr::Options { td, quad, .. } => SignalGroup::Enabled {
                derivative: td,
                quadratic: quad,
            },
        }
    }
}

impl From<SignalGroup> for SignalGroupRepr {
    fn from(group: SignalGroup) -> Self {
        match group {
            SignalGroup::Disabled => SignalGroupRepr::Flag(false),
            SignalGroup::Enabled {
                derivative: false,
                quadratic: false,
            } => SignalGroupRepr::Flag(true),
            SignalGroup::Enabled {
                derivative,
                quadratic,
            } => SignalGroupRepr::Options {
                raw: true,
                td: derivative,
                quad: quadratic,
            },
        }
    }
}

/// Spike (outlier) regression: disabled, or enabled with per-metric thresholds.
///
/// A missing threshold means that metric never flags a timepoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "SpikeConfigRepr", into = "SpikeConfigRepr")]
pub enum SpikeConfig {
    Disabled,
    Enabled {
        fd_threshold: Option<f64>,
        dvars_threshold: Option<f64>,
    },
}

impl SpikeConfig {
    pub fn is_enabled(&self) -> bool {
        matches!(self, SpikeConfig::Enabled { .. })
    }
}

/// JSON form: `false`/`true`, or `{"fd_th": 0.5, "dvars_th": 3.0}`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SpikeConfigRepr {
    Flag(bool),
    Thresholds {
        #[serde(default)]
        fd_th: Option<f64>,
        #[serde(default)]
        dvars_th: Option<f64>,
    },
}

impl From<SpikeConfigRepr> for SpikeConfig {
    fn from(repr: SpikeConfigRepr) -> Self {
        match repr {
            SpikeConfigRepr::Flag(false) => SpikeConfig::Disabled,
            SpikeConfigRepr::Flag(true) => SpikeConfig::Enabled {
                fd_threshold: None,
                dvars_threshold: None,
            },
            SpikeConfigRepr::Thresholds { fd_th, dvars_th } => SpikeConfig::Enabled {
                fd_threshold: fd_th,
                dvars_threshold: dvars_th,
            },
        }
    }
}

impl From<SpikeConfig> for SpikeConfigRepr {
    fn from(config: SpikeConfig) -> Self {
        match config {
            SpikeConfig::Disabled => SpikeConfigRepr::Flag(false),
            SpikeConfig::Enabled {
                fd_threshold: None,
                dvars_threshold: None,
            } => SpikeConfigRepr::Flag(true),
            SpikeConfig::Enabled {
                fd_threshold,
                dvars_threshold,
            } => SpikeConfigRepr::Thresholds {
                fd_th: fd_threshold,
                dvars_th: dvars_threshold,
            },
        }
    }
}

/// Which signal groups a strategy regresses out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfoundSelection {
    pub wm: SignalGroup,
    pub csf: SignalGroup,
    pub gs: SignalGroup,
    pub motion: SignalGroup,
    pub acompcor: bool,
}

/// Temporal filter cutoffs in Hz, carried as part of a strategy's identity.
///
/// Filtering itself happens upstream on the image side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSettings {
    #[serde(default)]
    pub low_pass: Option<f64>,
    #[serde(default)]
    pub high_pass: Option<f64>,
}

/// A complete denoising strategy specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategySpec {
    pub name: String,
    pub description: String,
    pub confounds: ConfoundSelection,
    pub aroma: bool,
    pub spikes: SpikeConfig,
    pub filter: FilterSettings,
    pub detrend: bool,
    pub standardize: bool,
}

impl StrategySpec {
    /// Parse a spec from its JSON form. Unknown keys are rejected by serde;
    /// value-level invariants are checked by [`StrategySpec::validate`].
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check all value-level invariants, collecting every violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut violations = Vec::new();

        if self.name.trim().is_empty() {
            violations.push("name must be non-empty".to_string());
        }

        if let SpikeConfig::Enabled {
            fd_threshold,
            dvars_threshold,
        } = self.spikes
        {
            check_threshold("spike fd_th", fd_threshold, &mut violations);
            check_threshold("spike dvars_th", dvars_threshold, &mut violations);
        }

        check_threshold("filter low_pass", self.filter.low_pass, &mut violations);
        check_threshold("filter high_pass", self.filter.high_pass, &mut violations);
        if let (Some(low), Some(high)) = (self.filter.low_pass, self.filter.high_pass) {
            if high >= low && low.is_finite() && high.is_finite() {
                violations.push(format!(
                    "band-pass requires high_pass < low_pass (got {high} >= {low})"
                ));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid {
                name: self.name.clone(),
                violations,
            })
        }
    }
}

fn check_threshold(label: &str, value: Option<f64>, violations: &mut Vec<String>) {
    if let Some(v) = value {
        if !v.is_finite() {
            violations.push(format!("{label} must be finite (got {v})"));
        } else if v < 0.0 {
            violations.push(format!("{label} must be non-negative (got {v})"));
        }
    }
}

// ─── Preset library ─────────────────────────────────────────────────

/// The canonical benchmark strategies.
pub mod presets {
    use super::*;

    fn base(name: &str, description: &str) -> StrategySpec {
        StrategySpec {
            name: name.to_string(),
            description: description.to_string(),
            confounds: ConfoundSelection {
                wm: SignalGroup::Disabled,
                csf: SignalGroup::Disabled,
                gs: SignalGroup::Disabled,
                motion: SignalGroup::Disabled,
                acompcor: false,
            },
            aroma: false,
            spikes: SpikeConfig::Disabled,
            filter: FilterSettings {
                low_pass: Some(0.08),
                high_pass: Some(0.008),
            },
            detrend: true,
            standardize: true,
        }
    }

    /// Motion parameters only.
    pub fn minimal() -> StrategySpec {
        let mut spec = base("minimal", "six motion parameters, band-pass");
        spec.confounds.motion = SignalGroup::raw();
        spec
    }

    /// Full-expansion motion plus mean tissue signals.
    pub fn simple() -> StrategySpec {
        let mut spec = base("simple", "24-parameter motion, WM and CSF means");
        spec.confounds.motion = SignalGroup::full();
        spec.confounds.wm = SignalGroup::raw();
        spec.confounds.csf = SignalGroup::raw();
        spec
    }

    /// `simple` plus global signal regression.
    pub fn simple_gsr() -> StrategySpec {
        let mut spec = base("simple_gsr", "simple plus global signal regression");
        spec.confounds.motion = SignalGroup::full();
        spec.confounds.wm = SignalGroup::raw();
        spec.confounds.csf = SignalGroup::raw();
        spec.confounds.gs = SignalGroup::raw();
        spec
    }

    /// `simple` plus spike regressors at conventional thresholds.
    pub fn scrubbing() -> StrategySpec {
        let mut spec = base("scrubbing", "simple plus FD/DVARS spike regressors");
        spec.confounds.motion = SignalGroup::full();
        spec.confounds.wm = SignalGroup::raw();
        spec.confounds.csf = SignalGroup::raw();
        spec.spikes = SpikeConfig::Enabled {
            fd_threshold: Some(0.5),
            dvars_threshold: Some(3.0),
        };
        spec
    }

    /// Anatomical component-based correction with full motion expansion.
    pub fn compcor() -> StrategySpec {
        let mut spec = base("compcor", "24-parameter motion plus aCompCor components");
        spec.confounds.motion = SignalGroup::full();
        spec.confounds.acompcor = true;
        spec
    }

    /// ICA-based denoising upstream, mean tissue signals here.
    pub fn aroma() -> StrategySpec {
        let mut spec = base("aroma", "ICA-AROMA upstream, WM and CSF means");
        spec.confounds.wm = SignalGroup::raw();
        spec.confounds.csf = SignalGroup::raw();
        spec.aroma = true;
        spec
    }

    /// All built-in presets, in benchmark order.
    pub fn all() -> Vec<StrategySpec> {
        vec![
            minimal(),
            simple(),
            simple_gsr(),
            scrubbing(),
            compcor(),
            aroma(),
        ]
    }

    /// Look up a preset by name.
    pub fn by_name(name: &str) -> Option<StrategySpec> {
        all().into_iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_forms() {
        let json = r#"{
            "name": "t",
            "description": "d",
            "confounds": {"wm": true, "csf": false, "gs": false, "motion": true, "acompcor": false},
            "aroma": false,
            "spikes": false,
            "filter": {"low_pass": null, "high_pass": null},
            "detrend": true,
            "standardize": true
        }"#;
        let spec = StrategySpec::from_json(json).unwrap();
        assert_eq!(spec.confounds.wm, SignalGroup::raw());
        assert_eq!(spec.confounds.csf, SignalGroup::Disabled);
        assert_eq!(spec.spikes, SpikeConfig::Disabled);
    }

    #[test]
    fn json_object_forms() {
        let json = r#"{
            "name": "t",
            "description": "d",
            "confounds": {
                "wm": {"td": true, "quad": true},
                "csf": {"raw": false},
                "gs": false,
                "motion": {"td": true},
                "acompcor": true
            },
            "aroma": false,
            "spikes": {"fd_th": 0.5, "dvars_th": 3.0},
            "filter": {"low_pass": 0.08, "high_pass": 0.008},
            "detrend": true,
            "standardize": true
        }"#;
        let spec = StrategySpec::from_json(json).unwrap();
        assert_eq!(spec.confounds.wm, SignalGroup::full());
        assert_eq!(spec.confounds.csf, SignalGroup::Disabled);
        assert_eq!(
            spec.confounds.motion,
            SignalGroup::Enabled {
                derivative: true,
                quadratic: false
            }
        );
        assert!(spec.confounds.acompcor);
        assert_eq!(
            spec.spikes,
            SpikeConfig::Enabled {
                fd_threshold: Some(0.5),
                dvars_threshold: Some(3.0)
            }
        );
    }

    #[test]
    fn json_rejects_unknown_keys() {
        let json = r#"{
            "name": "t",
            "description": "d",
            "confounds": {"wm": true, "csf": false, "gs": false, "motion": true, "acompcor": false},
            "aroma": false,
            "spikes": false,
            "filter": {"low_pass": null, "high_pass": null},
            "detrend": true,
            "standardize": true,
            "surprise": 1
        }"#;
        assert!(StrategySpec::from_json(json).is_err());
    }

    #[test]
    fn json_roundtrip() {
        for spec in presets::all() {
            let json = serde_json::to_string(&spec).unwrap();
            let back = StrategySpec::from_json(&json).unwrap();
            assert_eq!(back, spec);
        }
    }

    #[test]
    fn validate_collects_all_violations() {
        let mut spec = presets::scrubbing();
        spec.name = "  ".to_string();
        spec.spikes = SpikeConfig::Enabled {
            fd_threshold: Some(-0.5),
            dvars_threshold: Some(f64::NAN),
        };
        let err = spec.validate().unwrap_err();
        let ConfigError::Invalid { violations, .. } = err;
        assert_eq!(violations.len(), 3, "violations: {violations:?}");
    }

    #[test]
    fn validate_rejects_inverted_band() {
        let mut spec = presets::minimal();
        spec.filter = FilterSettings {
            low_pass: Some(0.01),
            high_pass: Some(0.1),
        };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn presets_are_valid_and_distinct() {
        let all = presets::all();
        assert_eq!(all.len(), 6);
        for spec in &all {
            spec.validate().unwrap();
        }
        let mut names: Vec<&str> = all.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 6);
        assert!(presets::by_name("scrubbing").is_some());
        assert!(presets::by_name("nope").is_none());
    }
}
