//! Core types for the SHPIA context pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: device records, sensor roles, per-window motion scores, per-window
//! proximity estimates, and inferred activity context.
//!
//! Every derived structure is keyed by device identifier. Human-readable labels
//! are attached only when a report is rendered.

use crate::timestamp::WindowKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque device identifier (usually a BLE MAC address)
pub type DeviceId = String;

/// Timestamp string → numeric reading
pub type ChannelSeries = BTreeMap<String, f64>;

/// Channel name → readings
pub type DeviceChannels = BTreeMap<String, ChannelSeries>;

/// Device identifier → channels; the analyzer input document
pub type AggregatedData = BTreeMap<DeviceId, DeviceChannels>;

/// Name of the signal-strength channel
pub const SIGNAL_STRENGTH_CHANNEL: &str = "rssiValues";

/// Sensor family, derived from the channel-name prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelFamily {
    SignalStrength,
    Accelerometer,
    Gyroscope,
    Quaternion,
    Compass,
}

impl ChannelFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelFamily::SignalStrength => "signal_strength",
            ChannelFamily::Accelerometer => "accelerometer",
            ChannelFamily::Gyroscope => "gyroscope",
            ChannelFamily::Quaternion => "quaternion",
            ChannelFamily::Compass => "compass",
        }
    }

    /// Family of a channel name, if it follows the naming convention
    pub fn of_channel(name: &str) -> Option<Self> {
        if name == SIGNAL_STRENGTH_CHANNEL {
            return Some(ChannelFamily::SignalStrength);
        }
        [
            ChannelFamily::Accelerometer,
            ChannelFamily::Gyroscope,
            ChannelFamily::Quaternion,
            ChannelFamily::Compass,
        ]
        .into_iter()
        .find(|family| name.starts_with(family.as_str()))
    }
}

/// Vector axis, derived from the channel-name suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    W,
    X,
    Y,
    Z,
}

impl Axis {
    pub fn of_channel(name: &str) -> Option<Self> {
        let (_, suffix) = name.rsplit_once('_')?;
        match suffix {
            "w" => Some(Axis::W),
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            "z" => Some(Axis::Z),
            _ => None,
        }
    }
}

/// All channel readings collected under one device identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: DeviceId,
    pub channels: DeviceChannels,
}

impl DeviceRecord {
    pub fn new(id: impl Into<DeviceId>, channels: DeviceChannels) -> Self {
        Self {
            id: id.into(),
            channels,
        }
    }

    /// Split an aggregated document into records, ordered by identifier
    pub fn from_aggregated(data: AggregatedData) -> Vec<DeviceRecord> {
        data.into_iter()
            .map(|(id, channels)| DeviceRecord { id, channels })
            .collect()
    }

    /// Channels belonging to a sensor family
    pub fn family_channels(
        &self,
        family: ChannelFamily,
    ) -> impl Iterator<Item = (&String, &ChannelSeries)> {
        self.channels
            .iter()
            .filter(move |(name, _)| ChannelFamily::of_channel(name) == Some(family))
    }

    /// Axis channels of a vector sensor family (`<family>..._x` etc.)
    pub fn axis_channels(
        &self,
        family: ChannelFamily,
    ) -> impl Iterator<Item = (&String, &ChannelSeries)> {
        self.family_channels(family)
            .filter(|(name, _)| Axis::of_channel(name).is_some())
    }

    pub fn has_family(&self, family: ChannelFamily) -> bool {
        self.family_channels(family).next().is_some()
    }

    /// Total number of readings across a family's channels
    pub fn sample_count(&self, family: ChannelFamily) -> usize {
        self.family_channels(family)
            .map(|(_, series)| series.len())
            .sum()
    }
}

/// Functional category of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorRole {
    /// Fixed beacon; signal strength locates the occupant
    ProximityBeacon,
    /// Sensor attached to an object; motion indicates manipulation
    MotionObject,
}

impl SensorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorRole::ProximityBeacon => "proximity_beacon",
            SensorRole::MotionObject => "motion_object",
        }
    }

    /// Short tag used for synthetic labels and messages
    pub fn tag(&self) -> &'static str {
        match self {
            SensorRole::ProximityBeacon => "beacon",
            SensorRole::MotionObject => "object",
        }
    }
}

/// Channel presence and sample counts observed for one device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub has_signal_strength: bool,
    pub has_accelerometer: bool,
    pub has_gyroscope: bool,
    pub has_quaternion: bool,
    pub has_compass: bool,
    pub signal_strength_samples: usize,
    pub accelerometer_samples: usize,
    pub gyroscope_samples: usize,
    pub quaternion_samples: usize,
    pub compass_samples: usize,
}

/// Role decision for one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub device_id: DeviceId,
    pub role: SensorRole,
    /// True when the channel set matched neither clear-cut pattern
    pub assumed: bool,
    pub summary: ChannelSummary,
}

/// Kind of object manipulation inferred from motion statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    ActiveManipulation,
    GentleMovement,
    RotationOnly,
    OrientationChange,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::ActiveManipulation => "active_manipulation",
            InteractionType::GentleMovement => "gentle_movement",
            InteractionType::RotationOnly => "rotation_only",
            InteractionType::OrientationChange => "orientation_change",
        }
    }
}

/// Mean and population variance of one family's samples in a window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FamilyStats {
    pub mean: f64,
    pub variance: f64,
    pub sample_count: usize,
}

/// Per-family statistics of a motion window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accelerometer: Option<FamilyStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gyroscope: Option<FamilyStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quaternion: Option<FamilyStats>,
}

/// Motion score for one object in one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowScore {
    /// Accelerometer variance (0 when absent)
    pub accelerometer_activity: f64,
    /// Gyroscope variance (0 when absent)
    pub gyroscope_activity: f64,
    /// Quaternion variance (0 when absent)
    pub orientation_change: f64,
    /// Weighted composite of the three variances
    pub total_activity_score: f64,
    pub is_interacting: bool,
    pub interaction_type: Option<InteractionType>,
    pub sensor_data: SensorData,
}

/// Window scores of one object, in window order
pub type InteractionTimeline = BTreeMap<WindowKey, WindowScore>;

/// Signal-strength summary of one beacon in one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    /// Mean signal strength, rounded to 2 decimals
    pub average_rssi: f64,
    pub max_rssi: f64,
    pub min_rssi: f64,
    pub sample_count: usize,
}

/// Nearest-beacon estimate for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationWindow {
    pub closest_device: Option<DeviceId>,
    pub closest_rssi: Option<f64>,
    pub beacons: BTreeMap<DeviceId, SignalSummary>,
}

/// Location estimates over all windows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationAnalysis {
    pub windows: BTreeMap<WindowKey, LocationWindow>,
    /// Number of windows in which each beacon was closest
    pub closest_counts: BTreeMap<DeviceId, u32>,
}

/// An interacting object as seen by the context fuser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveObject {
    pub object: String,
    pub mac: DeviceId,
    pub interaction_type: Option<InteractionType>,
    pub activity_score: f64,
}

/// Activity context inferred for one window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextInference {
    pub primary_location: Option<String>,
    pub active_objects: Vec<ActiveObject>,
    pub inferred_activities: Vec<String>,
    /// Heuristic in [0, 1]; not a probability
    pub confidence_score: f64,
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Score rounding used for all displayed and compared scores
pub fn round4(value: f64) -> f64 {
    round_to(value, 4)
}
