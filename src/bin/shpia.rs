//! SHPIA CLI - Command-line interface for the SHPIA context analyzer
//!
//! Commands:
//! - analyze: Infer locations and activities from an aggregated sensor file
//! - aggregate: Fold raw sensor records into the aggregated analyzer input

use clap::{Parser, Subcommand};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use shpia_context::config::MAX_WINDOW_MINUTES;
use shpia_context::timestamp::DEFAULT_WINDOW_MINUTES;
use shpia_context::{
    aggregate_records_json, render_text_report, ActivityRules, AnalyzeError, AnalyzerConfig,
    ContextAnalyzer, VERSION,
};

/// SHPIA - Location and activity context from dual-sensor BLE logs
#[derive(Parser)]
#[command(name = "shpia")]
#[command(author = "SHPIA Contributors")]
#[command(version = VERSION)]
#[command(about = "Infer where an occupant is and what they are doing from BLE sensor logs", long_about = None)]
struct Cli {
    /// Log level or filter directive (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an aggregated sensor file
    Analyze {
        /// Aggregated input file
        input: PathBuf,

        /// Output JSON path; a `<stem>_report.txt` is written beside it.
        /// Prints the text report to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Window size in minutes
        #[arg(long, default_value_t = DEFAULT_WINDOW_MINUTES,
              value_parser = clap::value_parser!(u32).range(1..=MAX_WINDOW_MINUTES as i64))]
        time_window: u32,

        /// Beacon labels in identifier order
        #[arg(long, num_args = 1..)]
        beacon_labels: Option<Vec<String>>,

        /// Object labels in identifier order
        #[arg(long, num_args = 1..)]
        object_labels: Option<Vec<String>>,

        /// Deprecated: beacon labels followed by object labels
        #[arg(long, num_args = 1.., conflicts_with_all = ["beacon_labels", "object_labels"])]
        labels: Option<Vec<String>>,

        /// JSON file of activity rules replacing the built-in table
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Aggregate raw sensor records by device address
    Aggregate {
        /// JSON array of raw records
        input: PathBuf,

        /// Output path; prints to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    finish(run(cli))
}

/// Print a failed run as a JSON error on stderr and pick the exit code
fn finish(result: Result<(), ShpiaCliError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), ShpiaCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            time_window,
            beacon_labels,
            object_labels,
            labels,
            rules,
        } => {
            let mut config = AnalyzerConfig::default().with_time_window(time_window);
            config.beacon_labels = beacon_labels;
            config.object_labels = object_labels;
            config.legacy_labels = labels;
            cmd_analyze(&input, output.as_deref(), config, rules.as_deref())
        }

        Commands::Aggregate { input, output } => cmd_aggregate(&input, output.as_deref()),
    }
}

fn read_input(input: &Path) -> Result<String, ShpiaCliError> {
    if !input.exists() {
        return Err(ShpiaCliError::InputNotFound(input.to_path_buf()));
    }
    Ok(fs::read_to_string(input)?)
}

fn cmd_analyze(
    input: &Path,
    output: Option<&Path>,
    config: AnalyzerConfig,
    rules: Option<&Path>,
) -> Result<(), ShpiaCliError> {
    let raw = read_input(input)?;

    let mut analyzer = ContextAnalyzer::new(config)?;
    if let Some(rules_path) = rules {
        let rules = ActivityRules::from_json(&read_input(rules_path)?)?;
        info!(rules = rules.len(), path = %rules_path.display(), "loaded activity rules");
        analyzer.set_rules(rules);
    }

    let report = analyzer.analyze_json(&raw)?;
    if report.analysis_settings.total_time_windows == 0 {
        warn!("no time windows produced; check channel names and timestamps");
    }

    match output {
        Some(path) => {
            let report_path = report.write_files(path)?;
            info!(
                output = %path.display(),
                report = %report_path.display(),
                windows = report.analysis_settings.total_time_windows,
                "analysis written"
            );
        }
        None => print!("{}", render_text_report(&report)),
    }

    Ok(())
}

fn cmd_aggregate(input: &Path, output: Option<&Path>) -> Result<(), ShpiaCliError> {
    let raw = read_input(input)?;
    let aggregated = aggregate_records_json(raw)?;

    match output {
        Some(path) => {
            fs::write(path, aggregated)?;
            info!(output = %path.display(), "aggregated data written");
        }
        None => println!("{aggregated}"),
    }

    Ok(())
}

// Error handling

#[derive(Debug)]
enum ShpiaCliError {
    Io(io::Error),
    InputNotFound(PathBuf),
    Analyze(AnalyzeError),
}

impl From<io::Error> for ShpiaCliError {
    fn from(e: io::Error) -> Self {
        ShpiaCliError::Io(e)
    }
}

impl From<AnalyzeError> for ShpiaCliError {
    fn from(e: AnalyzeError) -> Self {
        ShpiaCliError::Analyze(e)
    }
}

#[derive(Debug, serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ShpiaCliError> for CliError {
    fn from(e: ShpiaCliError) -> Self {
        match e {
            ShpiaCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ShpiaCliError::InputNotFound(path) => CliError {
                code: "INPUT_NOT_FOUND".to_string(),
                message: format!("Input file '{}' not found", path.display()),
                hint: None,
            },
            ShpiaCliError::Analyze(e) => {
                let (code, hint) = match &e {
                    AnalyzeError::JsonError(_) | AnalyzeError::ParseError(_) => (
                        "PARSE_ERROR",
                        Some("Input must be aggregated JSON: device -> channel -> timestamp -> value"),
                    ),
                    AnalyzeError::InvalidTimeWindow(_) => {
                        ("INVALID_CONFIG", Some("Use a window between 1 and 60 minutes"))
                    }
                    AnalyzeError::InvalidRules(_) => (
                        "INVALID_RULES",
                        Some("Rules file must be an array of {location, object, interaction_type, activity}"),
                    ),
                    AnalyzeError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
                    _ => ("PROCESSING_ERROR", None),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(String::from),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    const AGGREGATED: &str = r#"{
        "AA:BB:CC:DD:EE:01": {
            "rssiValues": {"2025-07-14 11:42:58:448": -60},
            "accelerometerValues_x": {"2025-07-14 11:42:58:448": 0.01}
        }
    }"#;

    fn parse_kind(args: &[&str]) -> Option<ErrorKind> {
        Cli::try_parse_from(args).err().map(|e| e.kind())
    }

    #[test]
    fn test_missing_input_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");

        let err = read_input(&missing).unwrap_err();
        assert!(matches!(&err, ShpiaCliError::InputNotFound(p) if p == &missing));

        let cli_error = CliError::from(err);
        assert_eq!(cli_error.code, "INPUT_NOT_FOUND");
        assert!(cli_error.message.contains("missing.json"));
    }

    #[test]
    fn test_analyze_missing_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("analysis.json");

        let result = cmd_analyze(
            &dir.path().join("missing.json"),
            Some(&output),
            AnalyzerConfig::default(),
            None,
        );
        assert!(matches!(result, Err(ShpiaCliError::InputNotFound(_))));
        assert!(!output.exists());
        assert!(!dir.path().join("analysis_report.txt").exists());
    }

    #[test]
    fn test_analyze_missing_rules_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("aggregated.json");
        fs::write(&input, AGGREGATED).unwrap();
        let output = dir.path().join("analysis.json");
        let rules = dir.path().join("rules.json");

        let result = cmd_analyze(&input, Some(&output), AnalyzerConfig::default(), Some(&rules));
        assert!(matches!(&result, Err(ShpiaCliError::InputNotFound(p)) if p == &rules));
        assert!(!output.exists());
    }

    #[test]
    fn test_analyze_invalid_rules() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("aggregated.json");
        fs::write(&input, AGGREGATED).unwrap();
        let rules = dir.path().join("rules.json");
        fs::write(&rules, r#"[{"location": "kitchen"}]"#).unwrap();
        let output = dir.path().join("analysis.json");

        let err = cmd_analyze(&input, Some(&output), AnalyzerConfig::default(), Some(&rules))
            .unwrap_err();
        assert_eq!(CliError::from(err).code, "INVALID_RULES");
        assert!(!output.exists());
    }

    #[test]
    fn test_analyze_writes_json_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("aggregated.json");
        fs::write(&input, AGGREGATED).unwrap();
        let output = dir.path().join("analysis.json");

        cmd_analyze(&input, Some(&output), AnalyzerConfig::default(), None).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["analysis_settings"]["total_beacons"], 1);
        assert!(dir.path().join("analysis_report.txt").exists());
    }

    #[test]
    fn test_aggregate_command() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.json");
        fs::write(
            &input,
            r#"[{"_id": "1", "address": "AA", "rssiValues": {"2025-07-14 11:42:58:448": -60}}]"#,
        )
        .unwrap();
        let output = dir.path().join("aggregated.json");

        cmd_aggregate(&input, Some(&output)).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["AA"]["rssiValues"]["2025-07-14 11:42:58:448"], -60.0);
    }

    #[test]
    fn test_legacy_labels_conflict_with_role_labels() {
        assert_eq!(
            parse_kind(&["shpia", "analyze", "in.json", "--labels", "a", "--beacon-labels", "b"]),
            Some(ErrorKind::ArgumentConflict)
        );
        assert_eq!(
            parse_kind(&["shpia", "analyze", "in.json", "--labels", "a", "--object-labels", "b"]),
            Some(ErrorKind::ArgumentConflict)
        );
        assert_eq!(
            parse_kind(&["shpia", "analyze", "in.json", "--beacon-labels", "a", "--object-labels", "b"]),
            None
        );
    }

    #[test]
    fn test_time_window_range() {
        for window in ["0", "61"] {
            assert_eq!(
                parse_kind(&["shpia", "analyze", "in.json", "--time-window", window]),
                Some(ErrorKind::ValueValidation)
            );
        }

        let cli = Cli::try_parse_from(["shpia", "analyze", "in.json", "--time-window", "60"])
            .unwrap();
        assert!(matches!(cli.command, Commands::Analyze { time_window: 60, .. }));
    }

    #[test]
    fn test_error_codes() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let cases = [
            (ShpiaCliError::from(AnalyzeError::from(json_err)), "PARSE_ERROR", true),
            (ShpiaCliError::from(AnalyzeError::InvalidTimeWindow(0)), "INVALID_CONFIG", true),
            (
                ShpiaCliError::from(AnalyzeError::InvalidRules("bad".to_string())),
                "INVALID_RULES",
                true,
            ),
            (
                ShpiaCliError::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
                "IO_ERROR",
                true,
            ),
            (
                ShpiaCliError::from(AnalyzeError::LabelCountMismatch {
                    role: "beacon",
                    expected: 2,
                    actual: 1,
                }),
                "PROCESSING_ERROR",
                false,
            ),
        ];

        for (err, code, has_hint) in cases {
            let cli_error = CliError::from(err);
            assert_eq!(cli_error.code, code);
            assert_eq!(cli_error.hint.is_some(), has_hint, "{code}");

            let json: serde_json::Value = serde_json::to_value(&cli_error).unwrap();
            assert_eq!(json["code"], code);
            assert!(json["message"].is_string());
        }
    }

    #[test]
    fn test_failed_run_exits_nonzero() {
        assert_eq!(finish(Ok(())), ExitCode::SUCCESS);
        assert_eq!(
            finish(Err(ShpiaCliError::InputNotFound(PathBuf::from("missing.json")))),
            ExitCode::FAILURE
        );
    }
}
