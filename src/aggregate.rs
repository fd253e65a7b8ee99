//! Raw record aggregation
//!
//! Folds a JSON array of per-reading records into the aggregated document the
//! analyzer consumes: device id → channel → timestamp → value.

use crate::error::AnalyzeError;
use crate::types::{AggregatedData, ChannelSeries};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Field holding the device identifier
pub const ADDRESS_FIELD: &str = "address";

/// Store metadata field dropped from every record
pub const RECORD_ID_FIELD: &str = "_id";

/// Aggregate a raw record array
pub fn aggregate_records(raw_json: &str) -> Result<AggregatedData, AnalyzeError> {
    let value: Value = serde_json::from_str(raw_json)?;
    let Value::Array(records) = value else {
        return Err(AnalyzeError::ParseError(
            "expected a JSON array of sensor records".to_string(),
        ));
    };

    let mut aggregated = AggregatedData::new();
    let mut skipped = 0usize;

    for (index, record) in records.iter().enumerate() {
        let Some(fields) = record.as_object() else {
            debug!(index, "skipping non-object record");
            skipped += 1;
            continue;
        };
        let Some(address) = fields
            .get(ADDRESS_FIELD)
            .and_then(Value::as_str)
            .filter(|a| !a.is_empty())
        else {
            debug!(index, "skipping record without address");
            skipped += 1;
            continue;
        };

        let device = aggregated.entry(address.to_string()).or_default();
        for (channel, readings) in fields {
            if channel == ADDRESS_FIELD || channel == RECORD_ID_FIELD {
                continue;
            }
            if let Value::Object(readings) = readings {
                merge_readings(device.entry(channel.clone()).or_default(), readings, address);
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, "records without a device address were skipped");
    }
    info!(
        records = records.len(),
        devices = aggregated.len(),
        "aggregated sensor records"
    );

    Ok(aggregated)
}

/// Aggregate a raw record array and return the document as pretty JSON
pub fn aggregate_records_json(raw_json: String) -> Result<String, AnalyzeError> {
    let aggregated = aggregate_records(&raw_json)?;
    Ok(serde_json::to_string_pretty(&aggregated)?)
}

fn merge_readings(series: &mut ChannelSeries, readings: &Map<String, Value>, device: &str) {
    for (timestamp, value) in readings {
        match value.as_f64() {
            Some(v) => {
                series.insert(timestamp.clone(), v);
            }
            None => debug!(device, timestamp = %timestamp, "skipping non-numeric reading"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_groups_by_address() {
        let raw = json!([
            {"_id": "1", "address": "AA", "rssiValues": {"2025-07-14 11:42:58:448": -60}},
            {"_id": "2", "address": "AA", "rssiValues": {"2025-07-14 11:42:59:448": -65}},
            {"_id": "3", "address": "BB", "gyroscopeValues_x": {"2025-07-14 11:42:59:448": 0.5}}
        ]);
        let aggregated = aggregate_records(&raw.to_string()).unwrap();

        assert_eq!(aggregated.len(), 2);
        let rssi = &aggregated["AA"]["rssiValues"];
        assert_eq!(rssi.len(), 2);
        assert_eq!(rssi["2025-07-14 11:42:58:448"], -60.0);
        assert!(!aggregated["AA"].contains_key("_id"));
        assert!(!aggregated["AA"].contains_key("address"));
        assert_eq!(aggregated["BB"]["gyroscopeValues_x"]["2025-07-14 11:42:59:448"], 0.5);
    }

    #[test]
    fn test_later_records_overwrite() {
        let raw = json!([
            {"address": "AA", "rssiValues": {"t": -60}},
            {"address": "AA", "rssiValues": {"t": -70}}
        ]);
        let aggregated = aggregate_records(&raw.to_string()).unwrap();
        assert_eq!(aggregated["AA"]["rssiValues"]["t"], -70.0);
    }

    #[test]
    fn test_skips_unusable_fields_and_records() {
        let raw = json!([
            {"rssiValues": {"t": -60}},
            "not a record",
            {"address": "AA", "name": "thingy", "rssiValues": {"t1": -60, "t2": "n/a"}}
        ]);
        let aggregated = aggregate_records(&raw.to_string()).unwrap();
        assert_eq!(aggregated.len(), 1);
        assert!(!aggregated["AA"].contains_key("name"));
        assert_eq!(aggregated["AA"]["rssiValues"].len(), 1);
    }

    #[test]
    fn test_empty_address_skipped() {
        let raw = json!([
            {"address": "", "rssiValues": {"2025-07-14 11:42:58:448": -60}},
            {"address": null, "rssiValues": {"2025-07-14 11:42:58:448": -61}}
        ]);
        let aggregated = aggregate_records(&raw.to_string()).unwrap();
        assert!(aggregated.is_empty());
    }

    #[test]
    fn test_rejects_non_array() {
        assert!(matches!(
            aggregate_records(r#"{"address": "AA"}"#),
            Err(AnalyzeError::ParseError(_))
        ));
        assert!(matches!(
            aggregate_records("not json"),
            Err(AnalyzeError::JsonError(_))
        ));
    }

    #[test]
    fn test_output_feeds_analyzer() {
        let raw = json!([
            {"address": "AA", "rssiValues": {"2025-07-14 11:42:58:448": -60}},
            {"address": "AA", "accelerometerValues_x": {"2025-07-14 11:42:58:448": 0.01}}
        ]);
        let aggregated = aggregate_records_json(raw.to_string()).unwrap();
        let report = crate::analyze_aggregated_json(aggregated, 1).unwrap();
        let report: Value = serde_json::from_str(&report).unwrap();
        assert_eq!(report["analysis_settings"]["total_beacons"], 1);
    }
}
