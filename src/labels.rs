//! Label assignment
//!
//! Maps device identifiers to human-readable names per role. Labels are a
//! presentation layer: analysis results stay keyed by identifier and labels are
//! looked up when a report is rendered, so replacing a [`LabelMap`] relabels
//! every derived structure at once.

use crate::error::AnalyzeError;
use crate::types::{DeviceId, SensorRole};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;

/// Default location names for proximity beacons
pub const DEFAULT_BEACON_LABELS: [&str; 8] = [
    "kitchen",
    "living_room",
    "bedroom",
    "bathroom",
    "office",
    "hallway",
    "balcony",
    "dining_room",
];

/// Default object names for motion sensors
pub const DEFAULT_OBJECT_LABELS: [&str; 8] = [
    "bottle",
    "toothbrush",
    "phone",
    "keys",
    "wallet",
    "book",
    "cup",
    "remote",
];

/// Ordered identifier → label mapping for one role.
///
/// Serializes as a JSON object in enumeration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    role: SensorRole,
    entries: Vec<(DeviceId, String)>,
}

impl LabelMap {
    /// Assign default labels in input order; identifiers past the pool get
    /// `<role>_<n>` with a 1-based position.
    pub fn assign_defaults(ids: &[DeviceId], role: SensorRole) -> Self {
        let pool: &[&str] = match role {
            SensorRole::ProximityBeacon => &DEFAULT_BEACON_LABELS,
            SensorRole::MotionObject => &DEFAULT_OBJECT_LABELS,
        };

        let entries = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let label = pool
                    .get(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("{}_{}", role.tag(), i + 1));
                (id.clone(), label)
            })
            .collect();

        Self { role, entries }
    }

    /// Build a new map with the same identifiers and the given labels.
    ///
    /// Fails without side effects when the count differs or a label repeats.
    pub fn with_overrides(&self, labels: &[String]) -> Result<LabelMap, AnalyzeError> {
        if labels.len() != self.entries.len() {
            return Err(AnalyzeError::LabelCountMismatch {
                role: self.role.tag(),
                expected: self.entries.len(),
                actual: labels.len(),
            });
        }

        let mut seen = HashSet::new();
        for label in labels {
            if !seen.insert(label.as_str()) {
                return Err(AnalyzeError::DuplicateLabel {
                    role: self.role.tag(),
                    label: label.clone(),
                });
            }
        }

        let entries = self
            .entries
            .iter()
            .zip(labels)
            .map(|((id, _), label)| (id.clone(), label.clone()))
            .collect();

        Ok(Self {
            role: self.role,
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Label for an identifier
    pub fn label(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, label)| label.as_str())
    }

    /// Label for an identifier, falling back to the identifier itself
    pub fn label_or_id<'a>(&'a self, id: &'a str) -> &'a str {
        self.label(id).unwrap_or(id)
    }

    /// Identifiers in enumeration order
    pub fn ids(&self) -> impl Iterator<Item = &DeviceId> {
        self.entries.iter().map(|(id, _)| id)
    }

    /// Labels in enumeration order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, label)| label.as_str())
    }

    /// (identifier, label) pairs in enumeration order
    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, &str)> {
        self.entries.iter().map(|(id, label)| (id, label.as_str()))
    }
}

impl Serialize for LabelMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, label) in &self.entries {
            map.serialize_entry(id, label)?;
        }
        map.end()
    }
}

/// Beacon and object label maps used to render one report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    pub beacons: LabelMap,
    pub objects: LabelMap,
}

impl LabelSet {
    pub fn new(beacons: LabelMap, objects: LabelMap) -> Self {
        Self { beacons, objects }
    }

    /// Split a combined label list: the first N go to beacons, the rest to
    /// objects. The total must equal the number of devices.
    pub fn with_legacy_overrides(&self, labels: &[String]) -> Result<LabelSet, AnalyzeError> {
        let expected = self.beacons.len() + self.objects.len();
        if labels.len() != expected {
            return Err(AnalyzeError::LabelCountMismatch {
                role: "device",
                expected,
                actual: labels.len(),
            });
        }

        let (beacon_labels, object_labels) = labels.split_at(self.beacons.len());
        Ok(LabelSet {
            beacons: self.beacons.with_overrides(beacon_labels)?,
            objects: self.objects.with_overrides(object_labels)?,
        })
    }
}
