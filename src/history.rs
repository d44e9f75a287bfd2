use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::models::InspectionRecord;

/// Append-only, newest-first collection of submitted records; the sole owner
/// of every `InspectionRecord`. Existing entries are never mutated.
#[derive(Debug, Default)]
pub struct History {
    records: Vec<InspectionRecord>,
}

impl History {
    pub fn new() -> Self {
        History::default()
    }

    /// Newest records go to the front.
    pub fn prepend(&mut self, record: InspectionRecord) {
        self.records.insert(0, record);
    }

    pub fn records(&self) -> &[InspectionRecord] {
        &self.records
    }

    pub fn find(&self, id: &str) -> Option<&InspectionRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Loads the exported history blob; a missing file is an empty history,
    /// since records only persist across runs when the user exported them.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(History::new());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read history from {}", path.display()))?;
        let records: Vec<InspectionRecord> = serde_json::from_str(&text)
            .with_context(|| format!("invalid history document {}", path.display()))?;
        Ok(History { records })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(&self.records)?;
        fs::write(path, text)
            .with_context(|| format!("failed to write history to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskCategory;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn sample_record(id: &str) -> InspectionRecord {
        InspectionRecord {
            id: id.to_string(),
            inspector_name: "Amal".to_string(),
            zone_name: "Ward 5".to_string(),
            zone_type: RiskCategory::HighRisk,
            timestamp: Utc::now(),
            scores: BTreeMap::from([("h1".to_string(), 4)]),
            notes: BTreeMap::new(),
            selected_observations: BTreeMap::new(),
            total_score: 4,
            max_possible_score: 6,
            percentage: 4.0 / 6.0 * 100.0,
        }
    }

    #[test]
    fn newest_records_come_first() {
        let mut history = History::new();
        history.prepend(sample_record("EVS-20260101-1000"));
        history.prepend(sample_record("EVS-20260102-2000"));

        assert_eq!(history.records()[0].id, "EVS-20260102-2000");
        assert_eq!(history.records()[1].id, "EVS-20260101-1000");
    }

    #[test]
    fn records_are_found_by_reference_id() {
        let mut history = History::new();
        history.prepend(sample_record("EVS-20260101-1234"));

        assert!(history.find("EVS-20260101-1234").is_some());
        assert!(history.find("EVS-20260101-9999").is_none());
    }

    #[test]
    fn missing_file_loads_as_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::load(&dir.path().join("nothing-here.json")).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn history_round_trips_through_the_json_blob() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut history = History::new();
        history.prepend(sample_record("EVS-20260101-1000"));
        history.prepend(sample_record("EVS-20260102-2000"));
        history.save(&path).unwrap();

        let loaded = History::load(&path).unwrap();
        assert_eq!(loaded.records(), history.records());
    }

    #[test]
    fn malformed_history_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(History::load(&path).is_err());
    }
}
