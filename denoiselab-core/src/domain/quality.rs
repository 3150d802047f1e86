//! Per-subject quality records.

use serde::{Deserialize, Serialize};

/// Motion/quality summary for one (subject, strategy) pair.
///
/// The JSON form uses the downstream field names: `n_conf` for the column
/// count and a numeric 1.0/0.0 `include` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectQualityRecord {
    pub subject: String,
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    pub mean_fd: f64,
    pub max_fd: f64,
    pub n_spikes: usize,
    pub perc_spikes: f64,
    #[serde(rename = "n_conf")]
    pub n_confound_columns: usize,
    #[serde(with = "include_flag")]
    pub include: bool,
}

/// Serialize the inclusion flag as 1.0/0.0 for downstream tabular tools.
mod include_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(include: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(if *include { 1.0 } else { 0.0 })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Ok(value > 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(include: bool) -> SubjectQualityRecord {
        SubjectQualityRecord {
            subject: "sub-01".into(),
            task: "rest".into(),
            session: None,
            mean_fd: 0.12,
            max_fd: 0.9,
            n_spikes: 3,
            perc_spikes: 1.5,
            n_confound_columns: 26,
            include,
        }
    }

    #[test]
    fn include_serializes_numeric() {
        let json = serde_json::to_value(record(true)).unwrap();
        assert_eq!(json["include"], 1.0);
        assert_eq!(json["n_conf"], 26);
        assert!(json.get("session").is_none());

        let json = serde_json::to_value(record(false)).unwrap();
        assert_eq!(json["include"], 0.0);
    }

    #[test]
    fn roundtrip_with_session() {
        let mut original = record(true);
        original.session = Some("01".into());
        let json = serde_json::to_string(&original).unwrap();
        let back: SubjectQualityRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }
}
