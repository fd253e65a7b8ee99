//! SHPIA Context - offline location and activity-context inference from
//! dual-sensor BLE logs
//!
//! Aggregated per-device readings are classified into proximity beacons and
//! motion objects, bucketed into fixed time windows and fused into a
//! per-window picture of where the occupant is and what they are doing:
//! classification → labeling → motion scoring → proximity location → context
//! fusion → report assembly.
//!
//! ## Modules
//!
//! - **Aggregation**: fold raw per-reading records into the analyzer input
//! - **Analysis**: [`ContextAnalyzer`] and the one-shot [`analyze_aggregated_json`]

pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fusion;
pub mod interaction;
pub mod labels;
pub mod location;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod timestamp;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use aggregate::{aggregate_records, aggregate_records_json};
pub use config::AnalyzerConfig;
pub use error::AnalyzeError;
pub use labels::{LabelMap, LabelSet};
pub use pipeline::{analyze_aggregated_json, Analysis, ContextAnalyzer};
pub use report::{render_text_report, report_path_for, AnalysisReport};
pub use rules::{ActivityRule, ActivityRules};
pub use timestamp::WindowKey;

/// Analyzer version embedded in every report
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "shpia-context";
