//! Pipeline orchestration
//!
//! This module provides the public API for the SHPIA context analyzer.
//! It runs aggregated sensor JSON through classification, labeling, motion
//! scoring, proximity location and context fusion.

use crate::classifier::SensorClassifier;
use crate::config::AnalyzerConfig;
use crate::error::AnalyzeError;
use crate::interaction::InteractionScorer;
use crate::labels::{LabelMap, LabelSet};
use crate::location::ProximityLocator;
use crate::report::AnalysisReport;
use crate::rules::ActivityRules;
use crate::types::{
    AggregatedData, Classification, DeviceId, DeviceRecord, InteractionTimeline,
    LocationAnalysis, SensorRole,
};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Analyze an aggregated sensor document and return the report as JSON.
///
/// # Arguments
/// * `raw_json` - Aggregated document: device id → channel → timestamp → value
/// * `time_window_minutes` - Window size in minutes (1..=60)
///
/// # Example
/// ```ignore
/// let report_json = analyze_aggregated_json(aggregated, 1)?;
/// ```
pub fn analyze_aggregated_json(
    raw_json: String,
    time_window_minutes: u32,
) -> Result<String, AnalyzeError> {
    let config = AnalyzerConfig::default().with_time_window(time_window_minutes);
    let analyzer = ContextAnalyzer::new(config)?;
    analyzer.analyze_json(&raw_json)?.to_json_pretty()
}

/// Identifier-keyed results of one run plus the labels used to render them.
///
/// Relabeling swaps a whole label map at once; nothing else changes, and the
/// next rendered report carries the new labels everywhere.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub time_window_minutes: u32,
    pub classifications: Vec<Classification>,
    pub location: LocationAnalysis,
    pub interactions: BTreeMap<DeviceId, InteractionTimeline>,
    labels: LabelSet,
}

impl Analysis {
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Replace every beacon label; leaves labels untouched on error
    pub fn relabel_beacons(&mut self, labels: &[String]) -> Result<(), AnalyzeError> {
        self.labels.beacons = self.labels.beacons.with_overrides(labels)?;
        Ok(())
    }

    /// Replace every object label; leaves labels untouched on error
    pub fn relabel_objects(&mut self, labels: &[String]) -> Result<(), AnalyzeError> {
        self.labels.objects = self.labels.objects.with_overrides(labels)?;
        Ok(())
    }

    /// Replace both maps from a combined list, beacons first
    pub fn relabel_legacy(&mut self, labels: &[String]) -> Result<(), AnalyzeError> {
        self.labels = self.labels.with_legacy_overrides(labels)?;
        Ok(())
    }
}

/// Analyzer holding run settings and the activity rule table.
pub struct ContextAnalyzer {
    config: AnalyzerConfig,
    rules: ActivityRules,
    instance_id: String,
}

impl ContextAnalyzer {
    /// Create an analyzer with the built-in rule table
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalyzeError> {
        config.validate()?;
        Ok(Self {
            config,
            rules: ActivityRules::default(),
            instance_id: Uuid::new_v4().to_string(),
        })
    }

    pub fn with_rules(mut self, rules: ActivityRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn set_rules(&mut self, rules: ActivityRules) {
        self.rules = rules;
    }

    /// Fix the producer instance id (for reproducible output)
    pub fn with_instance_id(mut self, instance_id: String) -> Self {
        self.instance_id = instance_id;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn rules(&self) -> &ActivityRules {
        &self.rules
    }

    /// Parse and analyze, then render the report
    pub fn analyze_json(&self, raw_json: &str) -> Result<AnalysisReport, AnalyzeError> {
        let analysis = self.analysis_from_json(raw_json)?;
        Ok(self.report(&analysis))
    }

    /// Parse and analyze without rendering
    pub fn analysis_from_json(&self, raw_json: &str) -> Result<Analysis, AnalyzeError> {
        let data: AggregatedData = serde_json::from_str(raw_json)?;
        Ok(self.analyze(data))
    }

    /// Run every stage over an aggregated document.
    ///
    /// Pipeline stages:
    /// 1. SensorClassifier - Assign a role to each device
    /// 2. LabelMap - Default labels, then configured overrides
    /// 3. InteractionScorer - Per-window motion scores for objects
    /// 4. ProximityLocator - Per-window closest beacon
    pub fn analyze(&self, data: AggregatedData) -> Analysis {
        let window = self.config.time_window_minutes;
        let records = DeviceRecord::from_aggregated(data);

        // Stage 1: Classify
        let classifications = SensorClassifier::classify_all(&records);

        let mut beacons: Vec<&DeviceRecord> = Vec::new();
        let mut objects: Vec<&DeviceRecord> = Vec::new();
        for (record, class) in records.iter().zip(&classifications) {
            match class.role {
                SensorRole::ProximityBeacon => beacons.push(record),
                SensorRole::MotionObject => objects.push(record),
            }
        }

        // Stage 2: Label
        let beacon_ids: Vec<DeviceId> = beacons.iter().map(|r| r.id.clone()).collect();
        let object_ids: Vec<DeviceId> = objects.iter().map(|r| r.id.clone()).collect();
        let labels = LabelSet::new(
            LabelMap::assign_defaults(&beacon_ids, SensorRole::ProximityBeacon),
            LabelMap::assign_defaults(&object_ids, SensorRole::MotionObject),
        );

        // Stage 3: Score objects
        let interactions: BTreeMap<DeviceId, InteractionTimeline> = objects
            .iter()
            .map(|record| (record.id.clone(), InteractionScorer::score(record, window)))
            .collect();

        // Stage 4: Locate
        let location = ProximityLocator::locate(&beacons, window);

        info!(
            beacons = beacons.len(),
            objects = objects.len(),
            location_windows = location.windows.len(),
            window_minutes = window,
            "analysis complete"
        );

        let mut analysis = Analysis {
            time_window_minutes: window,
            classifications,
            location,
            interactions,
            labels,
        };
        self.apply_label_overrides(&mut analysis);
        analysis
    }

    /// Render a report for an analysis with its current labels
    pub fn report(&self, analysis: &Analysis) -> AnalysisReport {
        AnalysisReport::assemble(
            analysis,
            &self.rules,
            AnalysisReport::producer(&self.instance_id),
            Utc::now().to_rfc3339(),
        )
    }

    /// Apply configured overrides; a rejected override keeps the defaults
    fn apply_label_overrides(&self, analysis: &mut Analysis) {
        let config = &self.config;

        if let Some(labels) = &config.beacon_labels {
            keep_defaults_on_error(analysis.relabel_beacons(labels), "beacon");
        }
        if let Some(labels) = &config.object_labels {
            keep_defaults_on_error(analysis.relabel_objects(labels), "object");
        }

        if let Some(labels) = &config.legacy_labels {
            if config.beacon_labels.is_some() || config.object_labels.is_some() {
                warn!("combined label list ignored because explicit role labels are set");
                return;
            }
            warn!("combined label list is deprecated; use separate beacon and object labels");
            keep_defaults_on_error(analysis.relabel_legacy(labels), "combined");
        }
    }
}

/// Log a rejected override. Recoverable kinds are warnings; the defaults stay
/// in place either way.
fn keep_defaults_on_error(result: Result<(), AnalyzeError>, labels: &'static str) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_recoverable() => {
            warn!(error = %e, labels, "override rejected; keeping default labels")
        }
        Err(e) => error!(error = %e, labels, "unexpected override failure; keeping default labels"),
    }
}

impl Default for ContextAnalyzer {
    fn default() -> Self {
        Self {
            config: AnalyzerConfig::default(),
            rules: ActivityRules::default(),
            instance_id: Uuid::new_v4().to_string(),
        }
    }
}
