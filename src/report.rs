//! Report assembly
//!
//! Renders an [`Analysis`] into the output document and the human-readable
//! text report. Rendering is a pure function of the identifier-keyed results,
//! the current labels and the rule table; every label in the output is looked
//! up here, so relabeling an analysis and rendering again yields a fully
//! consistent document.

use crate::error::AnalyzeError;
use crate::fusion::{ContextFuser, ObjectObservation};
use crate::labels::LabelMap;
use crate::pipeline::Analysis;
use crate::rules::ActivityRules;
use crate::timestamp::WindowKey;
use crate::types::{
    Classification, ContextInference, DeviceId, InteractionTimeline, LocationWindow, WindowScore,
};
use crate::{PRODUCER_NAME, VERSION};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write as _};
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Suffix of the text report written beside the JSON output
pub const REPORT_SUFFIX: &str = "_report.txt";

/// Number of combined windows listed in the text report
const SAMPLE_WINDOWS: usize = 5;

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Run settings and device inventory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSettings {
    pub time_window_minutes: u32,
    pub beacon_labels: LabelMap,
    pub object_labels: LabelMap,
    pub total_beacons: usize,
    pub total_objects: usize,
    pub total_time_windows: usize,
    pub sensor_classification: Vec<Classification>,
}

/// One beacon's signal summary, keyed by label in the output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeaconReading {
    pub mac: DeviceId,
    pub average_rssi: f64,
    pub max_rssi: f64,
    pub min_rssi: f64,
    pub sample_count: usize,
}

/// Location estimate of one window with labels resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationInfo {
    pub closest_location: Option<String>,
    pub closest_mac: Option<DeviceId>,
    pub closest_rssi: Option<f64>,
    pub all_locations: BTreeMap<String, BeaconReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationReport {
    pub time_windows: BTreeMap<WindowKey, LocationInfo>,
    pub location_summary: BTreeMap<String, u32>,
}

/// Fused view of one window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedWindow {
    pub location_info: Option<LocationInfo>,
    pub object_interactions: BTreeMap<String, WindowScore>,
    pub context_inference: ContextInference,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySummary {
    pub location_frequency: BTreeMap<String, u32>,
    pub object_interaction_frequency: BTreeMap<String, u32>,
}

/// Complete analysis output document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub analysis_settings: AnalysisSettings,
    pub location_analysis: LocationReport,
    pub object_interactions: BTreeMap<DeviceId, InteractionTimeline>,
    pub combined_analysis: BTreeMap<WindowKey, CombinedWindow>,
    pub activity_summary: ActivitySummary,
}

impl AnalysisReport {
    /// Render an analysis with its current labels
    pub fn assemble(
        analysis: &Analysis,
        rules: &ActivityRules,
        producer: ReportProducer,
        computed_at_utc: String,
    ) -> Self {
        let labels = analysis.labels();
        let fuser = ContextFuser::new(rules);

        let time_windows: BTreeMap<WindowKey, LocationInfo> = analysis
            .location
            .windows
            .iter()
            .map(|(key, window)| (*key, location_info(window, &labels.beacons)))
            .collect();

        let location_summary: BTreeMap<String, u32> = analysis
            .location
            .closest_counts
            .iter()
            .map(|(id, count)| (labels.beacons.label_or_id(id).to_string(), *count))
            .collect();

        let window_keys: BTreeSet<WindowKey> = time_windows
            .keys()
            .copied()
            .chain(analysis.interactions.values().flat_map(|t| t.keys().copied()))
            .collect();

        let mut combined_analysis = BTreeMap::new();
        for key in window_keys {
            let location = time_windows.get(&key).cloned();

            let observations: Vec<ObjectObservation> = labels
                .objects
                .iter()
                .filter_map(|(id, label)| {
                    let score = analysis.interactions.get(id)?.get(&key)?;
                    Some(ObjectObservation {
                        device_id: id,
                        label,
                        score,
                    })
                })
                .collect();

            let context_inference = fuser.infer(
                location
                    .as_ref()
                    .and_then(|info| info.closest_location.as_deref()),
                &observations,
            );

            let object_interactions = observations
                .iter()
                .map(|obs| (obs.label.to_string(), obs.score.clone()))
                .collect();

            combined_analysis.insert(
                key,
                CombinedWindow {
                    location_info: location,
                    object_interactions,
                    context_inference,
                },
            );
        }

        let mut object_interaction_frequency = BTreeMap::new();
        for (id, label) in labels.objects.iter() {
            let active = analysis
                .interactions
                .get(id)
                .map(|t| t.values().filter(|s| s.is_interacting).count() as u32)
                .unwrap_or(0);
            if active > 0 {
                object_interaction_frequency.insert(label.to_string(), active);
            }
        }

        AnalysisReport {
            producer,
            computed_at_utc,
            analysis_settings: AnalysisSettings {
                time_window_minutes: analysis.time_window_minutes,
                beacon_labels: labels.beacons.clone(),
                object_labels: labels.objects.clone(),
                total_beacons: labels.beacons.len(),
                total_objects: labels.objects.len(),
                total_time_windows: combined_analysis.len(),
                sensor_classification: analysis.classifications.clone(),
            },
            location_analysis: LocationReport {
                time_windows,
                location_summary: location_summary.clone(),
            },
            object_interactions: analysis.interactions.clone(),
            combined_analysis,
            activity_summary: ActivitySummary {
                location_frequency: location_summary,
                object_interaction_frequency,
            },
        }
    }

    /// Build a producer block for this crate
    pub fn producer(instance_id: &str) -> ReportProducer {
        ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: VERSION.to_string(),
            instance_id: instance_id.to_string(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, AnalyzeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON document and the text report; returns the report path.
    ///
    /// Both files are staged beside their targets and renamed into place, so
    /// a failure leaves neither of them behind.
    pub fn write_files(&self, output: &Path) -> Result<PathBuf, AnalyzeError> {
        let json = self.to_json_pretty()?;
        let text = render_text_report(self);
        let report_path = report_path_for(output);

        let staged_json = stage(output, json.as_bytes())?;
        let staged_text = stage(&report_path, text.as_bytes())?;

        staged_text
            .persist(&report_path)
            .map_err(|e| AnalyzeError::Io(e.error))?;
        if let Err(e) = staged_json.persist(output) {
            // Best effort
            let _ = fs::remove_file(&report_path);
            return Err(AnalyzeError::Io(e.error));
        }
        Ok(report_path)
    }
}

/// Temp file holding `contents` in the directory of `target`
fn stage(target: &Path, contents: &[u8]) -> Result<NamedTempFile, AnalyzeError> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    Ok(file)
}

fn location_info(window: &LocationWindow, beacons: &LabelMap) -> LocationInfo {
    LocationInfo {
        closest_location: window
            .closest_device
            .as_deref()
            .map(|id| beacons.label_or_id(id).to_string()),
        closest_mac: window.closest_device.clone(),
        closest_rssi: window.closest_rssi,
        all_locations: window
            .beacons
            .iter()
            .map(|(id, summary)| {
                (
                    beacons.label_or_id(id).to_string(),
                    BeaconReading {
                        mac: id.clone(),
                        average_rssi: summary.average_rssi,
                        max_rssi: summary.max_rssi,
                        min_rssi: summary.min_rssi,
                        sample_count: summary.sample_count,
                    },
                )
            })
            .collect(),
    }
}

/// `<dir>/<stem>_report.txt` for an output path
pub fn report_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "analysis".to_string());
    output.with_file_name(format!("{stem}{REPORT_SUFFIX}"))
}

/// Entries sorted by count descending, then name
fn by_frequency(counts: &BTreeMap<String, u32>) -> Vec<(&String, u32)> {
    let mut entries: Vec<(&String, u32)> = counts.iter().map(|(k, v)| (k, *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
}

fn percentage(count: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Most frequent entry; ties go to the smallest name
fn most_common(counts: &BTreeMap<String, u32>) -> Option<(&String, u32)> {
    by_frequency(counts).into_iter().next()
}

/// Pattern descriptions over all fused windows
pub fn activity_patterns(report: &AnalysisReport) -> Vec<(String, String)> {
    let mut combinations: BTreeMap<String, u32> = BTreeMap::new();
    let mut activities: BTreeMap<String, u32> = BTreeMap::new();

    for window in report.combined_analysis.values() {
        let Some(location) = window
            .location_info
            .as_ref()
            .and_then(|info| info.closest_location.as_deref())
        else {
            continue;
        };
        for obj in &window.context_inference.active_objects {
            *combinations
                .entry(format!("{location}+{}", obj.object))
                .or_insert(0) += 1;
        }
        for activity in &window.context_inference.inferred_activities {
            *activities.entry(activity.clone()).or_insert(0) += 1;
        }
    }

    let mut patterns = Vec::new();
    if let Some((combo, count)) = most_common(&combinations) {
        patterns.push((
            "Most Common Location-Object Combination".to_string(),
            format!("{combo} ({count} times)"),
        ));
    }
    if let Some((activity, count)) = most_common(&activities) {
        patterns.push((
            "Most Common Activity".to_string(),
            format!("{activity} ({count} times)"),
        ));
    }
    patterns.push((
        "Activity Diversity".to_string(),
        format!("{} unique activities detected", activities.len()),
    ));
    patterns
}

/// Human-readable summary of a report
pub fn render_text_report(report: &AnalysisReport) -> String {
    let mut out = String::new();
    // fmt::Write for String never fails
    let _ = write_text_report(&mut out, report);
    out
}

fn write_text_report(out: &mut String, report: &AnalysisReport) -> fmt::Result {
    let rule = "=".repeat(70);
    let settings = &report.analysis_settings;

    writeln!(out, "{rule}")?;
    writeln!(out, "SHPIA COMPREHENSIVE LOCATION & ACTIVITY ANALYSIS REPORT")?;
    writeln!(out, "{rule}")?;
    writeln!(out, "Time Window: {} minute(s)", settings.time_window_minutes)?;
    writeln!(out, "Total Proximity Beacons (Locations): {}", settings.total_beacons)?;
    writeln!(out, "Total Motion Objects (Objects): {}", settings.total_objects)?;
    writeln!(out, "Total Time Windows: {}", settings.total_time_windows)?;
    writeln!(out)?;

    writeln!(out, "SENSOR LABELS:")?;
    writeln!(out, "  Proximity Beacons (Locations):")?;
    for (id, label) in settings.beacon_labels.iter() {
        writeln!(out, "    {label}: {id}")?;
    }
    writeln!(out, "  Motion Objects (Objects):")?;
    for (id, label) in settings.object_labels.iter() {
        writeln!(out, "    {label}: {id}")?;
    }
    let assumed: Vec<&Classification> = settings
        .sensor_classification
        .iter()
        .filter(|c| c.assumed)
        .collect();
    if !assumed.is_empty() {
        writeln!(out, "  Assumed roles:")?;
        for c in assumed {
            writeln!(out, "    {}: {} (assumed)", c.device_id, c.role.as_str())?;
        }
    }
    writeln!(out)?;

    writeln!(out, "ACTIVITY SUMMARY:")?;
    let summary = &report.activity_summary;
    writeln!(out, "  Location Frequency:")?;
    let location_total: u32 = summary.location_frequency.values().sum();
    for (location, count) in by_frequency(&summary.location_frequency) {
        writeln!(
            out,
            "    {location}: {count} windows ({:.1}%)",
            percentage(count, location_total)
        )?;
    }
    writeln!(out, "  Object Interaction Frequency:")?;
    let object_total: u32 = summary.object_interaction_frequency.values().sum();
    for (object, count) in by_frequency(&summary.object_interaction_frequency) {
        writeln!(
            out,
            "    {object}: {count} interactions ({:.1}%)",
            percentage(count, object_total)
        )?;
    }
    writeln!(out)?;

    writeln!(out, "SAMPLE COMBINED ANALYSIS:")?;
    for (key, window) in report.combined_analysis.iter().take(SAMPLE_WINDOWS) {
        writeln!(out, "  {key}:")?;

        match window
            .location_info
            .as_ref()
            .and_then(|info| info.closest_location.as_ref().map(|l| (l, info.closest_rssi)))
        {
            Some((location, Some(rssi))) => {
                writeln!(out, "    Location: {location} (RSSI: {rssi:.1} dBm)")?;
            }
            Some((location, None)) => {
                writeln!(out, "    Location: {location} (RSSI: N/A dBm)")?;
            }
            None => {
                writeln!(out, "    Location: Unknown")?;
            }
        }

        if !window.object_interactions.is_empty() {
            writeln!(out, "    Object Interactions:")?;
            for (name, score) in &window.object_interactions {
                if score.is_interacting {
                    let kind = score
                        .interaction_type
                        .map(|k| k.as_str())
                        .unwrap_or("unknown");
                    writeln!(
                        out,
                        "      {name}: {kind} (score: {})",
                        score.total_activity_score
                    )?;
                }
            }
        }

        let context = &window.context_inference;
        if !context.inferred_activities.is_empty() {
            writeln!(out, "    Inferred Activities:")?;
            for activity in &context.inferred_activities {
                writeln!(out, "      - {activity}")?;
            }
            writeln!(out, "    Confidence: {:.2}", context.confidence_score)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "ACTIVITY PATTERNS:")?;
    for (pattern, description) in activity_patterns(report) {
        writeln!(out, "  {pattern}: {description}")?;
    }

    Ok(())
}
