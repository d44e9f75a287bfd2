use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Risk classification shared by zones and checklist items. A session only
/// presents checklist items whose category matches the selected zone's.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    HighRisk,
    MedRisk,
    General,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 3] = [
        RiskCategory::HighRisk,
        RiskCategory::MedRisk,
        RiskCategory::General,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::HighRisk => "High-risk area",
            RiskCategory::MedRisk => "Medium-risk area",
            RiskCategory::General => "General area",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspector {
    pub id: String,
    pub display_name: String,
    pub username: String,
    // Placeholder credential; authentication is out of scope.
    pub password_hash: String,
    pub allowed_zone_types: Vec<RiskCategory>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    #[serde(rename = "type_code")]
    pub category: RiskCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    /// Display number; the sole sort key, unique per category among active items.
    pub number: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    pub max_score: u32,
    pub area_type: RiskCategory,
    #[serde(rename = "isActive")]
    pub is_active: bool,
    #[serde(default)]
    pub possible_observations: Vec<String>,
}

/// The configuration document: the unit of JSON import/export. All three
/// keys are required, so a partial document fails to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub inspectors: Vec<Inspector>,
    pub zones: Vec<Zone>,
    pub checklists: Vec<ChecklistItem>,
}

/// Immutable snapshot of one submitted inspection. Never mutated after
/// creation; the history collection is its sole owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionRecord {
    pub id: String,
    pub inspector_name: String,
    pub zone_name: String,
    pub zone_type: RiskCategory,
    pub timestamp: DateTime<Utc>,
    pub scores: BTreeMap<String, u32>,
    pub notes: BTreeMap<String, String>,
    #[serde(default)]
    pub selected_observations: BTreeMap<String, Vec<String>>,
    pub total_score: u32,
    pub max_possible_score: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub count: usize,
    pub unique_zone_count: usize,
    pub average_percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub average_percentage: f64,
    pub inspections: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionStatus {
    pub answered: usize,
    pub total: usize,
    pub is_complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_serialize_to_wire_codes() {
        assert_eq!(
            serde_json::to_string(&RiskCategory::HighRisk).unwrap(),
            "\"HIGH_RISK\""
        );
        assert_eq!(
            serde_json::to_string(&RiskCategory::MedRisk).unwrap(),
            "\"MED_RISK\""
        );
        assert_eq!(
            serde_json::to_string(&RiskCategory::General).unwrap(),
            "\"GENERAL\""
        );
    }

    #[test]
    fn inspector_wire_fields_are_camel_case() {
        let inspector = Inspector {
            id: "1".to_string(),
            display_name: "Amal".to_string(),
            username: "amal".to_string(),
            password_hash: "123".to_string(),
            allowed_zone_types: vec![RiskCategory::General],
            is_active: true,
        };
        let json = serde_json::to_string(&inspector).unwrap();
        assert!(json.contains("\"displayName\""));
        assert!(json.contains("\"allowedZoneTypes\""));
        assert!(json.contains("\"isActive\""));
    }

    #[test]
    fn zone_category_round_trips_through_type_code() {
        let zone: Zone =
            serde_json::from_str(r#"{"id":"z1","name":"Ward 5","type_code":"HIGH_RISK"}"#)
                .unwrap();
        assert_eq!(zone.category, RiskCategory::HighRisk);
        let json = serde_json::to_string(&zone).unwrap();
        assert!(json.contains("\"type_code\":\"HIGH_RISK\""));
    }

    #[test]
    fn every_category_has_a_label() {
        for category in RiskCategory::ALL {
            assert!(!category.label().is_empty());
        }
    }
}
