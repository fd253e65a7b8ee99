//! Context fusion
//!
//! Combines a window's location estimate with its active objects into inferred
//! activities. Each active object contributes one activity, taken from the
//! rule table or, failing an exact match, from a generic template.

use crate::rules::{generic_activity, ActivityRules};
use crate::types::{round4, ActiveObject, ContextInference, DeviceId, WindowScore};

/// Confidence contributed by each inferred activity
const CONFIDENCE_PER_ACTIVITY: f64 = 0.3;

/// One object's score in a window, with its current label
#[derive(Debug, Clone, Copy)]
pub struct ObjectObservation<'a> {
    pub device_id: &'a DeviceId,
    pub label: &'a str,
    pub score: &'a WindowScore,
}

/// Fuser for per-window location and interaction results
pub struct ContextFuser<'a> {
    rules: &'a ActivityRules,
}

impl<'a> ContextFuser<'a> {
    pub fn new(rules: &'a ActivityRules) -> Self {
        Self { rules }
    }

    /// Infer activity context for one window.
    ///
    /// Activities are only inferred when both a location and at least one
    /// active object are present; otherwise the list is empty and confidence 0.
    pub fn infer(
        &self,
        location: Option<&str>,
        objects: &[ObjectObservation<'_>],
    ) -> ContextInference {
        let active_objects: Vec<ActiveObject> = objects
            .iter()
            .filter(|obs| obs.score.is_interacting)
            .map(|obs| ActiveObject {
                object: obs.label.to_string(),
                mac: obs.device_id.clone(),
                interaction_type: obs.score.interaction_type,
                activity_score: obs.score.total_activity_score,
            })
            .collect();

        let inferred_activities: Vec<String> = match location {
            Some(location) if !active_objects.is_empty() => active_objects
                .iter()
                .map(|obj| self.activity_for(location, obj))
                .collect(),
            _ => Vec::new(),
        };

        let confidence_score = confidence(inferred_activities.len());

        ContextInference {
            primary_location: location.map(String::from),
            active_objects,
            inferred_activities,
            confidence_score,
        }
    }

    fn activity_for(&self, location: &str, obj: &ActiveObject) -> String {
        obj.interaction_type
            .and_then(|kind| self.rules.lookup(location, &obj.object, kind))
            .map(String::from)
            .unwrap_or_else(|| generic_activity(&obj.object, obj.interaction_type))
    }
}

/// `min(1, 0.3 * n)`, rounded to 4 decimals
fn confidence(activity_count: usize) -> f64 {
    round4((CONFIDENCE_PER_ACTIVITY * activity_count as f64).min(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InteractionType, SensorData};

    fn score(kind: Option<InteractionType>, total: f64) -> WindowScore {
        WindowScore {
            accelerometer_activity: 0.0,
            gyroscope_activity: 0.0,
            orientation_change: 0.0,
            total_activity_score: total,
            is_interacting: total > 0.01,
            interaction_type: kind,
            sensor_data: SensorData::default(),
        }
    }

    #[test]
    fn test_exact_rule_match() {
        let rules = ActivityRules::default();
        let fuser = ContextFuser::new(&rules);
        let id = "EE:01".to_string();
        let s = score(Some(InteractionType::ActiveManipulation), 0.8);
        let obs = [ObjectObservation {
            device_id: &id,
            label: "bottle",
            score: &s,
        }];

        let context = fuser.infer(Some("kitchen"), &obs);
        assert_eq!(context.primary_location.as_deref(), Some("kitchen"));
        assert_eq!(context.inferred_activities, vec!["drinking".to_string()]);
        assert_eq!(context.confidence_score, 0.3);
        assert_eq!(context.active_objects[0].mac, "EE:01");
        assert_eq!(context.active_objects[0].activity_score, 0.8);
    }

    #[test]
    fn test_generic_fallback_and_confidence_cap() {
        let rules = ActivityRules::default();
        let fuser = ContextFuser::new(&rules);
        let ids: Vec<String> = (0..4).map(|i| format!("id{i}")).collect();
        let labels = ["keys", "wallet", "book", "toothbrush"];
        let scores = [
            score(Some(InteractionType::ActiveManipulation), 1.0),
            score(Some(InteractionType::RotationOnly), 0.2),
            score(None, 0.05),
            score(Some(InteractionType::RotationOnly), 0.3),
        ];
        let obs: Vec<ObjectObservation> = (0..4)
            .map(|i| ObjectObservation {
                device_id: &ids[i],
                label: labels[i],
                score: &scores[i],
            })
            .collect();

        let context = fuser.infer(Some("bathroom"), &obs);
        assert_eq!(
            context.inferred_activities,
            vec![
                "actively_using_keys",
                "rotating_wallet",
                "interacting_with_book",
                "rotating_toothbrush",
            ]
        );
        assert_eq!(context.confidence_score, 1.0);

        let three = fuser.infer(Some("bathroom"), &obs[..3]);
        assert_eq!(three.confidence_score, 0.9);
    }

    #[test]
    fn test_no_location_or_no_active_objects() {
        let rules = ActivityRules::default();
        let fuser = ContextFuser::new(&rules);
        let id = "EE:01".to_string();
        let active = score(Some(InteractionType::GentleMovement), 0.5);
        let idle = score(None, 0.0);

        let without_location = fuser.infer(
            None,
            &[ObjectObservation {
                device_id: &id,
                label: "cup",
                score: &active,
            }],
        );
        assert!(without_location.inferred_activities.is_empty());
        assert_eq!(without_location.confidence_score, 0.0);
        assert_eq!(without_location.active_objects.len(), 1);

        let idle_only = fuser.infer(
            Some("kitchen"),
            &[ObjectObservation {
                device_id: &id,
                label: "cup",
                score: &idle,
            }],
        );
        assert!(idle_only.active_objects.is_empty());
        assert!(idle_only.inferred_activities.is_empty());
        assert_eq!(idle_only.confidence_score, 0.0);
    }

    #[test]
    fn test_injected_rules_replace_defaults() {
        let rules = ActivityRules::from_rules([crate::rules::ActivityRule::new(
            "office",
            "book",
            InteractionType::GentleMovement,
            "reading",
        )]);
        let fuser = ContextFuser::new(&rules);
        let id = "B1".to_string();
        let s = score(Some(InteractionType::GentleMovement), 0.02);
        let obs = [ObjectObservation {
            device_id: &id,
            label: "book",
            score: &s,
        }];
        assert_eq!(fuser.infer(Some("office"), &obs).inferred_activities, vec!["reading"]);

        let bottle = score(Some(InteractionType::ActiveManipulation), 0.9);
        let obs = [ObjectObservation {
            device_id: &id,
            label: "bottle",
            score: &bottle,
        }];
        assert_eq!(
            fuser.infer(Some("kitchen"), &obs).inferred_activities,
            vec!["actively_using_bottle"]
        );
    }
}
