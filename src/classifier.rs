//! Sensor role classification
//!
//! Assigns each device a [`SensorRole`] from the set of channel families it
//! reports. Beacons report signal strength plus a basic accelerometer; object
//! sensors report rotation/orientation channels and no signal strength.

use crate::types::{ChannelFamily, ChannelSummary, Classification, DeviceRecord, SensorRole};
use tracing::info;

/// Classifier for device records
pub struct SensorClassifier;

impl SensorClassifier {
    /// Classify a single device. First matching rule wins.
    pub fn classify(record: &DeviceRecord) -> Classification {
        let summary = summarize_channels(record);

        let has_rotation = summary.has_gyroscope;
        let has_orientation = summary.has_quaternion;

        let (role, assumed) = if summary.has_signal_strength
            && summary.has_accelerometer
            && !(has_rotation || has_orientation)
        {
            (SensorRole::ProximityBeacon, false)
        } else if !summary.has_signal_strength
            && (has_rotation || has_orientation || summary.has_compass)
        {
            (SensorRole::MotionObject, false)
        } else if summary.has_signal_strength {
            (SensorRole::ProximityBeacon, true)
        } else {
            (SensorRole::MotionObject, true)
        };

        info!(
            device = %record.id,
            role = role.as_str(),
            assumed,
            rssi_samples = summary.signal_strength_samples,
            accelerometer_samples = summary.accelerometer_samples,
            gyroscope_samples = summary.gyroscope_samples,
            quaternion_samples = summary.quaternion_samples,
            "classified sensor"
        );

        Classification {
            device_id: record.id.clone(),
            role,
            assumed,
            summary,
        }
    }

    /// Classify every record, preserving input order
    pub fn classify_all(records: &[DeviceRecord]) -> Vec<Classification> {
        let classifications: Vec<Classification> = records.iter().map(Self::classify).collect();

        let beacons = classifications
            .iter()
            .filter(|c| c.role == SensorRole::ProximityBeacon)
            .count();
        info!(
            beacons,
            objects = classifications.len() - beacons,
            "sensor classification summary"
        );

        classifications
    }
}

fn summarize_channels(record: &DeviceRecord) -> ChannelSummary {
    ChannelSummary {
        has_signal_strength: record.has_family(ChannelFamily::SignalStrength),
        has_accelerometer: record.has_family(ChannelFamily::Accelerometer),
        has_gyroscope: record.has_family(ChannelFamily::Gyroscope),
        has_quaternion: record.has_family(ChannelFamily::Quaternion),
        has_compass: record.has_family(ChannelFamily::Compass),
        signal_strength_samples: record.sample_count(ChannelFamily::SignalStrength),
        accelerometer_samples: record.sample_count(ChannelFamily::Accelerometer),
        gyroscope_samples: record.sample_count(ChannelFamily::Gyroscope),
        quaternion_samples: record.sample_count(ChannelFamily::Quaternion),
        compass_samples: record.sample_count(ChannelFamily::Compass),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChannelSeries, DeviceChannels};

    fn record(channels: &[&str]) -> DeviceRecord {
        let mut map = DeviceChannels::new();
        for name in channels {
            let mut series = ChannelSeries::new();
            series.insert("2025-07-14 11:42:58:448".to_string(), 1.0);
            map.insert(name.to_string(), series);
        }
        DeviceRecord::new("dev", map)
    }

    #[test]
    fn test_clear_beacon() {
        let c = SensorClassifier::classify(&record(&["rssiValues", "accelerometerValues_x"]));
        assert_eq!(c.role, SensorRole::ProximityBeacon);
        assert!(!c.assumed);
        assert_eq!(c.summary.signal_strength_samples, 1);
    }

    #[test]
    fn test_clear_object() {
        for channels in [
            vec!["gyroscopeValues_x", "accelerometerValues_x"],
            vec!["quaternionValues_w"],
            vec!["compassValues_x"],
        ] {
            let c = SensorClassifier::classify(&record(&channels));
            assert_eq!(c.role, SensorRole::MotionObject, "{channels:?}");
            assert!(!c.assumed);
        }
    }

    #[test]
    fn test_assumed_beacon_with_rotation() {
        let c = SensorClassifier::classify(&record(&[
            "rssiValues",
            "accelerometerValues_x",
            "gyroscopeValues_x",
        ]));
        assert_eq!(c.role, SensorRole::ProximityBeacon);
        assert!(c.assumed);

        // signal strength alone
        let c = SensorClassifier::classify(&record(&["rssiValues"]));
        assert_eq!(c.role, SensorRole::ProximityBeacon);
        assert!(c.assumed);
    }

    #[test]
    fn test_assumed_object_fallback() {
        let c = SensorClassifier::classify(&record(&["accelerometerValues_x", "temperature"]));
        assert_eq!(c.role, SensorRole::MotionObject);
        assert!(c.assumed);

        let c = SensorClassifier::classify(&record(&[]));
        assert_eq!(c.role, SensorRole::MotionObject);
        assert!(c.assumed);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let r = record(&["rssiValues", "quaternionValues_x"]);
        let first = SensorClassifier::classify(&r);
        for _ in 0..5 {
            assert_eq!(SensorClassifier::classify(&r), first);
        }
    }
}
