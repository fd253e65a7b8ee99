//! Analyzer configuration

use crate::error::AnalyzeError;
use crate::timestamp::DEFAULT_WINDOW_MINUTES;
use serde::{Deserialize, Serialize};

/// Largest supported window; buckets are formed within the hour
pub const MAX_WINDOW_MINUTES: u32 = 60;

/// Settings for one analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Window size in minutes (1..=60)
    #[serde(default = "default_window")]
    pub time_window_minutes: u32,
    /// Replacement beacon labels, in beacon enumeration order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beacon_labels: Option<Vec<String>>,
    /// Replacement object labels, in object enumeration order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_labels: Option<Vec<String>>,
    /// Deprecated combined list: beacons first, then objects.
    /// Ignored when either explicit list is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_labels: Option<Vec<String>>,
}

fn default_window() -> u32 {
    DEFAULT_WINDOW_MINUTES
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            time_window_minutes: DEFAULT_WINDOW_MINUTES,
            beacon_labels: None,
            object_labels: None,
            legacy_labels: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn with_time_window(mut self, minutes: u32) -> Self {
        self.time_window_minutes = minutes;
        self
    }

    pub fn with_beacon_labels(mut self, labels: Vec<String>) -> Self {
        self.beacon_labels = Some(labels);
        self
    }

    pub fn with_object_labels(mut self, labels: Vec<String>) -> Self {
        self.object_labels = Some(labels);
        self
    }

    pub fn with_legacy_labels(mut self, labels: Vec<String>) -> Self {
        self.legacy_labels = Some(labels);
        self
    }

    pub fn validate(&self) -> Result<(), AnalyzeError> {
        if self.time_window_minutes == 0 || self.time_window_minutes > MAX_WINDOW_MINUTES {
            return Err(AnalyzeError::InvalidTimeWindow(self.time_window_minutes));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.time_window_minutes, 1);
        assert!(config.validate().is_ok());

        let parsed: AnalyzerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_window_bounds() {
        assert!(AnalyzerConfig::default().with_time_window(60).validate().is_ok());
        assert!(matches!(
            AnalyzerConfig::default().with_time_window(0).validate(),
            Err(AnalyzeError::InvalidTimeWindow(0))
        ));
        assert!(AnalyzerConfig::default().with_time_window(61).validate().is_err());
    }
}
