//! Motion / interaction scoring
//!
//! Computes per-window activity statistics for motion-object sensors and
//! classifies the kind of manipulation.
//!
//! Per window, samples of each axis family are pooled and summarized by mean
//! and population variance. The composite score weights the variances:
//!
//! ```text
//! score = 1.0 * accel_variance + 0.5 * gyro_variance + 0.3 * orientation_variance
//! ```
//!
//! All statistics are rounded to 4 decimals (half away from zero) and the
//! thresholds below are applied to the rounded values.

use crate::timestamp::{parse_timestamp, WindowKey};
use crate::types::{
    round4, ChannelFamily, DeviceRecord, FamilyStats, InteractionTimeline, InteractionType,
    SensorData, WindowScore,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const ACCEL_WEIGHT: f64 = 1.0;
const GYRO_WEIGHT: f64 = 0.5;
const ORIENTATION_WEIGHT: f64 = 0.3;

/// Accelerometer variance above which the object is moving
const ACCEL_MOTION_THRESHOLD: f64 = 0.001;
/// Gyroscope variance above which motion counts as manipulation
const GYRO_MANIPULATION_THRESHOLD: f64 = 0.5;
/// Gyroscope variance above which an otherwise still object is rotating
const GYRO_ROTATION_THRESHOLD: f64 = 0.1;
/// Quaternion variance above which orientation changed
const ORIENTATION_THRESHOLD: f64 = 0.01;
/// Composite score above which the object is being interacted with
const INTERACTION_THRESHOLD: f64 = 0.01;

/// Families pooled by the scorer
const SCORED_FAMILIES: [ChannelFamily; 3] = [
    ChannelFamily::Accelerometer,
    ChannelFamily::Gyroscope,
    ChannelFamily::Quaternion,
];

#[derive(Default)]
struct WindowSamples {
    accelerometer: Vec<f64>,
    gyroscope: Vec<f64>,
    quaternion: Vec<f64>,
}

impl WindowSamples {
    fn bucket(&mut self, family: ChannelFamily) -> Option<&mut Vec<f64>> {
        match family {
            ChannelFamily::Accelerometer => Some(&mut self.accelerometer),
            ChannelFamily::Gyroscope => Some(&mut self.gyroscope),
            ChannelFamily::Quaternion => Some(&mut self.quaternion),
            _ => None,
        }
    }
}

/// Scorer for motion-object sensors
pub struct InteractionScorer;

impl InteractionScorer {
    /// Score every window in which the device reported axis samples.
    ///
    /// Samples with malformed timestamps are skipped.
    pub fn score(record: &DeviceRecord, window_minutes: u32) -> InteractionTimeline {
        let mut windows: BTreeMap<WindowKey, WindowSamples> = BTreeMap::new();
        let mut skipped = 0usize;

        for family in SCORED_FAMILIES {
            for (channel, series) in record.axis_channels(family) {
                for (raw_ts, value) in series {
                    let timestamp = match parse_timestamp(raw_ts) {
                        Ok(ts) => ts,
                        Err(e) => {
                            warn!(device = %record.id, channel = %channel, error = %e, "skipping sample");
                            skipped += 1;
                            continue;
                        }
                    };
                    let key = WindowKey::bucket(timestamp, window_minutes);
                    if let Some(bucket) = windows.entry(key).or_default().bucket(family) {
                        bucket.push(*value);
                    }
                }
            }
        }

        debug!(
            device = %record.id,
            windows = windows.len(),
            skipped,
            "scored object windows"
        );

        windows
            .into_iter()
            .map(|(key, samples)| (key, score_window(&samples)))
            .collect()
    }
}

fn score_window(samples: &WindowSamples) -> WindowScore {
    let sensor_data = SensorData {
        accelerometer: family_stats(&samples.accelerometer),
        gyroscope: family_stats(&samples.gyroscope),
        quaternion: family_stats(&samples.quaternion),
    };

    let accel = sensor_data.accelerometer.map(|s| s.variance).unwrap_or(0.0);
    let gyro = sensor_data.gyroscope.map(|s| s.variance).unwrap_or(0.0);
    let orientation = sensor_data.quaternion.map(|s| s.variance).unwrap_or(0.0);

    let total_activity_score = composite_score(accel, gyro, orientation);

    WindowScore {
        accelerometer_activity: accel,
        gyroscope_activity: gyro,
        orientation_change: orientation,
        total_activity_score,
        is_interacting: total_activity_score > INTERACTION_THRESHOLD,
        interaction_type: classify_interaction(accel, gyro, orientation),
        sensor_data,
    }
}

/// Rounded mean and population variance; `None` for an empty sample set
pub fn family_stats(values: &[f64]) -> Option<FamilyStats> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

    Some(FamilyStats {
        mean: round4(mean),
        variance: round4(variance),
        sample_count: values.len(),
    })
}

/// Weighted composite of family variances, rounded to 4 decimals
pub fn composite_score(accel: f64, gyro: f64, orientation: f64) -> f64 {
    round4(accel * ACCEL_WEIGHT + gyro * GYRO_WEIGHT + orientation * ORIENTATION_WEIGHT)
}

/// Interaction type from family variances; first matching rule wins
pub fn classify_interaction(accel: f64, gyro: f64, orientation: f64) -> Option<InteractionType> {
    if accel > ACCEL_MOTION_THRESHOLD {
        if gyro > GYRO_MANIPULATION_THRESHOLD {
            Some(InteractionType::ActiveManipulation)
        } else {
            Some(InteractionType::GentleMovement)
        }
    } else if gyro > GYRO_ROTATION_THRESHOLD {
        Some(InteractionType::RotationOnly)
    } else if orientation > ORIENTATION_THRESHOLD {
        Some(InteractionType::OrientationChange)
    } else {
        None
    }
}
