//! Activity rule table
//!
//! Maps an exact (location, object, interaction type) triple to an activity
//! name. The table is a plain value so callers and tests can inject their own.

use crate::error::AnalyzeError;
use crate::types::InteractionType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One rule row, as stored in a rules file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRule {
    pub location: String,
    pub object: String,
    pub interaction_type: InteractionType,
    pub activity: String,
}

impl ActivityRule {
    pub fn new(
        location: &str,
        object: &str,
        interaction_type: InteractionType,
        activity: &str,
    ) -> Self {
        Self {
            location: location.to_string(),
            object: object.to_string(),
            interaction_type,
            activity: activity.to_string(),
        }
    }
}

type RuleKey = (String, String, InteractionType);

/// Lookup table of activity rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRules {
    rules: BTreeMap<RuleKey, String>,
}

impl ActivityRules {
    /// Build from rows. A later row for the same triple replaces an earlier one.
    pub fn from_rules(rows: impl IntoIterator<Item = ActivityRule>) -> Self {
        let rules = rows
            .into_iter()
            .map(|r| ((r.location, r.object, r.interaction_type), r.activity))
            .collect();
        Self { rules }
    }

    /// Parse a JSON array of rule rows
    pub fn from_json(json: &str) -> Result<Self, AnalyzeError> {
        let rows: Vec<ActivityRule> = serde_json::from_str(json)
            .map_err(|e| AnalyzeError::InvalidRules(e.to_string()))?;
        if let Some(row) = rows.iter().find(|r| r.activity.trim().is_empty()) {
            return Err(AnalyzeError::InvalidRules(format!(
                "empty activity for ({}, {}, {})",
                row.location,
                row.object,
                row.interaction_type.as_str()
            )));
        }
        Ok(Self::from_rules(rows))
    }

    /// Exact-match lookup
    pub fn lookup(
        &self,
        location: &str,
        object: &str,
        interaction_type: InteractionType,
    ) -> Option<&str> {
        self.rules
            .get(&(location.to_string(), object.to_string(), interaction_type))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rows in key order
    pub fn to_rules(&self) -> Vec<ActivityRule> {
        self.rules
            .iter()
            .map(|((location, object, interaction_type), activity)| ActivityRule {
                location: location.clone(),
                object: object.clone(),
                interaction_type: *interaction_type,
                activity: activity.clone(),
            })
            .collect()
    }
}

/// Built-in household rules
impl Default for ActivityRules {
    fn default() -> Self {
        use InteractionType::*;

        Self::from_rules([
            ActivityRule::new("kitchen", "bottle", ActiveManipulation, "drinking"),
            ActivityRule::new("kitchen", "bottle", GentleMovement, "handling_bottle"),
            ActivityRule::new("kitchen", "bottle", RotationOnly, "opening_bottle"),
            ActivityRule::new("bathroom", "toothbrush", ActiveManipulation, "brushing_teeth"),
            ActivityRule::new("bathroom", "toothbrush", GentleMovement, "handling_toothbrush"),
            ActivityRule::new("kitchen", "cup", ActiveManipulation, "drinking"),
            ActivityRule::new("kitchen", "cup", GentleMovement, "handling_cup"),
            ActivityRule::new("living_room", "remote", ActiveManipulation, "using_remote"),
            ActivityRule::new("living_room", "remote", GentleMovement, "handling_remote"),
            ActivityRule::new("bedroom", "phone", ActiveManipulation, "using_phone"),
            ActivityRule::new("bedroom", "phone", GentleMovement, "handling_phone"),
        ])
    }
}

/// Activity name when no rule matches
pub fn generic_activity(object: &str, interaction_type: Option<InteractionType>) -> String {
    match interaction_type {
        Some(InteractionType::ActiveManipulation) => format!("actively_using_{object}"),
        Some(InteractionType::GentleMovement) => format!("handling_{object}"),
        Some(InteractionType::RotationOnly) => format!("rotating_{object}"),
        Some(InteractionType::OrientationChange) | None => format!("interacting_with_{object}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_lookup() {
        let rules = ActivityRules::default();
        assert_eq!(rules.len(), 11);
        assert_eq!(
            rules.lookup("kitchen", "bottle", InteractionType::ActiveManipulation),
            Some("drinking")
        );
        assert_eq!(
            rules.lookup("bathroom", "toothbrush", InteractionType::GentleMovement),
            Some("handling_toothbrush")
        );
        assert_eq!(
            rules.lookup("bathroom", "bottle", InteractionType::ActiveManipulation),
            None
        );
        assert_eq!(
            rules.lookup("bathroom", "toothbrush", InteractionType::RotationOnly),
            None
        );
    }

    #[test]
    fn test_generic_fallbacks() {
        assert_eq!(
            generic_activity("keys", Some(InteractionType::ActiveManipulation)),
            "actively_using_keys"
        );
        assert_eq!(
            generic_activity("keys", Some(InteractionType::GentleMovement)),
            "handling_keys"
        );
        assert_eq!(
            generic_activity("keys", Some(InteractionType::RotationOnly)),
            "rotating_keys"
        );
        assert_eq!(
            generic_activity("keys", Some(InteractionType::OrientationChange)),
            "interacting_with_keys"
        );
        assert_eq!(generic_activity("keys", None), "interacting_with_keys");
    }

    #[test]
    fn test_rules_from_json() {
        let json = r#"[
            {"location": "office", "object": "book", "interaction_type": "gentle_movement", "activity": "reading"},
            {"location": "office", "object": "book", "interaction_type": "gentle_movement", "activity": "studying"}
        ]"#;
        let rules = ActivityRules::from_json(json).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules.lookup("office", "book", InteractionType::GentleMovement),
            Some("studying")
        );
        assert_eq!(rules.to_rules()[0].activity, "studying");
    }

    #[test]
    fn test_rules_from_json_rejects_bad_rows() {
        assert!(matches!(
            ActivityRules::from_json(r#"[{"location": "office"}]"#),
            Err(AnalyzeError::InvalidRules(_))
        ));
        assert!(matches!(
            ActivityRules::from_json(
                r#"[{"location": "a", "object": "b", "interaction_type": "spinning", "activity": "x"}]"#
            ),
            Err(AnalyzeError::InvalidRules(_))
        ));
        assert!(matches!(
            ActivityRules::from_json(
                r#"[{"location": "a", "object": "b", "interaction_type": "rotation_only", "activity": " "}]"#
            ),
            Err(AnalyzeError::InvalidRules(_))
        ));
    }
}
