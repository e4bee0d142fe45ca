// src/utils/config.rs
use crate::utils::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const ENV_MIN_SECTION_SIZE: &str = "MIN_SECTION_SIZE";
const ENV_DEADLINE_SECS: &str = "PIPELINE_DEADLINE_SECS";

/// Tunables for one pipeline run. Constructed explicitly and passed to the
/// orchestrator; nothing reads global state after startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sections shorter than this (bytes) are dropped by the segmenter.
    pub min_section_len: usize,
    /// Hard cap on a section's length (bytes) when no end marker is found.
    pub max_section_len: usize,
    /// Fewer financial statements than this from markers triggers the keyword fallback.
    pub min_marker_sections: usize,
    /// Fraction of the document skipped by the keyword fallback (table of contents).
    pub toc_skip_fraction: f64,
    /// Lines captured after a "TABLE OF CONTENTS" heading for the navigator.
    pub toc_max_lines: usize,
    /// Narrative sections shorter than this are not sent to analyzers.
    pub min_narrative_len: usize,
    /// Bytes scanned from the start of a section for the unit-scale phrase.
    pub unit_scan_window: usize,
    /// Shared deadline for every task of one filing.
    pub deadline_secs: u64,
    /// Relative tolerance for flow-through and balance checks (0.01 = 1%).
    pub relative_tolerance: f64,
    /// Absolute floor below which differences are always accepted.
    pub absolute_tolerance: f64,
    /// Relative tolerance for the cash-flow net change check.
    pub cash_flow_relative_tolerance: f64,
    /// Absolute floor for the cash-flow net change check.
    pub cash_flow_absolute_tolerance: f64,
    /// Absolute tolerance for cross-statement linkage checks.
    pub linkage_tolerance: f64,
    /// Share of |net income| accepted as retained-earnings roll-forward variance.
    pub retained_earnings_fraction: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_section_len: 100,
            max_section_len: 50_000,
            min_marker_sections: 3,
            toc_skip_fraction: 0.10,
            toc_max_lines: 500,
            min_narrative_len: 100,
            unit_scan_window: 5_000,
            deadline_secs: 300,
            relative_tolerance: 0.01,
            absolute_tolerance: 1.0,
            cash_flow_relative_tolerance: 0.05,
            cash_flow_absolute_tolerance: 100.0,
            linkage_tolerance: 1.0,
            retained_earnings_fraction: 0.10,
        }
    }
}

impl PipelineConfig {
    /// Loads a JSON config file; missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path_str.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse { path: path_str, source })
    }

    /// Applies `MIN_SECTION_SIZE` and `PIPELINE_DEADLINE_SECS` if set.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env`](Self::apply_env) with variables read through `lookup`.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(size) = parse_var::<usize>(ENV_MIN_SECTION_SIZE, lookup(ENV_MIN_SECTION_SIZE))? {
            tracing::debug!("Using {}={} from environment", ENV_MIN_SECTION_SIZE, size);
            self.min_section_len = size;
        }
        if let Some(secs) = parse_var::<u64>(ENV_DEADLINE_SECS, lookup(ENV_DEADLINE_SECS))? {
            tracing::debug!("Using {}={} from environment", ENV_DEADLINE_SECS, secs);
            self.deadline_secs = secs;
        }
        Ok(self)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { key: key.to_string(), value }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "min_section_len": 250, "relative_tolerance": 0.02 }}"#).unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.min_section_len, 250);
        assert_eq!(config.relative_tolerance, 0.02);
        assert_eq!(config.max_section_len, PipelineConfig::default().max_section_len);
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = PipelineConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let config = PipelineConfig::default()
            .apply_overrides(vars(&[("MIN_SECTION_SIZE", " 400 "), ("PIPELINE_DEADLINE_SECS", "30")]))
            .unwrap();
        assert_eq!(config.min_section_len, 400);
        assert_eq!(config.deadline(), Duration::from_secs(30));
        assert_eq!(config.max_section_len, PipelineConfig::default().max_section_len);
    }

    #[test]
    fn test_unset_overrides_keep_config() {
        let base = PipelineConfig { min_section_len: 250, ..PipelineConfig::default() };
        let config = base.clone().apply_overrides(vars(&[])).unwrap();
        assert_eq!(config, base);
    }

    #[test]
    fn test_invalid_override_is_reported() {
        let err = PipelineConfig::default()
            .apply_overrides(vars(&[("PIPELINE_DEADLINE_SECS", "soon")]))
            .unwrap_err();
        match err {
            ConfigError::InvalidEnv { key, value } => {
                assert_eq!(key, "PIPELINE_DEADLINE_SECS");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_apply_env_reads_process_environment() {
        // The only test touching this variable.
        std::env::set_var("MIN_SECTION_SIZE", "321");
        let config = PipelineConfig::default().apply_env();
        std::env::remove_var("MIN_SECTION_SIZE");
        assert_eq!(config.unwrap().min_section_len, 321);
    }
}
