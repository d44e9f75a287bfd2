use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::Context;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AppConfig, ChecklistItem, Inspector, RiskCategory, Zone};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration document: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("duplicate active checklist number {number} in {}", .category.label())]
    DuplicateItemNumber { category: RiskCategory, number: u32 },
}

/// Sole owner of the in-memory configuration. Keeps a precomputed index from
/// category to its sorted active checklist items, rebuilt whenever the
/// configuration changes.
pub struct ConfigStore {
    config: AppConfig,
    checklist_index: BTreeMap<RiskCategory, Vec<ChecklistItem>>,
}

impl ConfigStore {
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        validate(&config)?;
        let mut store = ConfigStore {
            config,
            checklist_index: BTreeMap::new(),
        };
        store.rebuild_index();
        Ok(store)
    }

    pub fn seed() -> Self {
        let mut store = ConfigStore {
            config: seed_config(),
            checklist_index: BTreeMap::new(),
        };
        store.rebuild_index();
        store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Active checklist items for a category, ordered by display number.
    pub fn active_checklist(&self, category: RiskCategory) -> &[ChecklistItem] {
        self.checklist_index
            .get(&category)
            .map(|items| items.as_slice())
            .unwrap_or(&[])
    }

    pub fn inspector(&self, id: &str) -> Option<&Inspector> {
        self.config.inspectors.iter().find(|i| i.id == id)
    }

    pub fn active_inspectors(&self) -> impl Iterator<Item = &Inspector> {
        self.config.inspectors.iter().filter(|i| i.is_active)
    }

    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.config.zones.iter().find(|z| z.id == id)
    }

    pub fn zones_in(&self, category: RiskCategory) -> impl Iterator<Item = &Zone> {
        self.config.zones.iter().filter(move |z| z.category == category)
    }

    /// Replaces the entire configuration from a JSON document. The swap is
    /// atomic: any parse or validation failure leaves the current
    /// configuration untouched.
    pub fn import_json(&mut self, text: &str) -> Result<(), ConfigError> {
        let incoming: AppConfig = serde_json::from_str(text)?;
        validate(&incoming)?;
        self.config = incoming;
        self.rebuild_index();
        Ok(())
    }

    pub fn export_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&self.config)?)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&text)
            .with_context(|| format!("invalid configuration document {}", path.display()))?;
        Ok(ConfigStore::new(config)?)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        fs::write(path, self.export_json()?)
            .with_context(|| format!("failed to write configuration to {}", path.display()))
    }

    pub fn upsert_inspector(&mut self, mut inspector: Inspector) -> String {
        if inspector.id.is_empty() {
            inspector.id = Uuid::new_v4().to_string();
        }
        let id = inspector.id.clone();
        match self.config.inspectors.iter_mut().find(|i| i.id == inspector.id) {
            Some(existing) => *existing = inspector,
            None => self.config.inspectors.push(inspector),
        }
        id
    }

    pub fn remove_inspector(&mut self, id: &str) -> bool {
        let before = self.config.inspectors.len();
        self.config.inspectors.retain(|i| i.id != id);
        self.config.inspectors.len() != before
    }

    pub fn upsert_zone(&mut self, mut zone: Zone) -> String {
        if zone.id.is_empty() {
            zone.id = Uuid::new_v4().to_string();
        }
        let id = zone.id.clone();
        match self.config.zones.iter_mut().find(|z| z.id == zone.id) {
            Some(existing) => *existing = zone,
            None => self.config.zones.push(zone),
        }
        id
    }

    pub fn remove_zone(&mut self, id: &str) -> bool {
        let before = self.config.zones.len();
        self.config.zones.retain(|z| z.id != id);
        self.config.zones.len() != before
    }

    pub fn upsert_checklist_item(&mut self, mut item: ChecklistItem) -> Result<String, ConfigError> {
        if item.id.is_empty() {
            item.id = Uuid::new_v4().to_string();
        }
        let id = item.id.clone();
        let mut checklists = self.config.checklists.clone();
        match checklists.iter_mut().find(|c| c.id == item.id) {
            Some(existing) => *existing = item,
            None => checklists.push(item),
        }
        validate_checklists(&checklists)?;
        self.config.checklists = checklists;
        self.rebuild_index();
        Ok(id)
    }

    pub fn remove_checklist_item(&mut self, id: &str) -> bool {
        let before = self.config.checklists.len();
        self.config.checklists.retain(|c| c.id != id);
        let removed = self.config.checklists.len() != before;
        if removed {
            self.rebuild_index();
        }
        removed
    }

    fn rebuild_index(&mut self) {
        let mut index: BTreeMap<RiskCategory, Vec<ChecklistItem>> = BTreeMap::new();
        for category in RiskCategory::ALL {
            index.insert(category, Vec::new());
        }
        for item in &self.config.checklists {
            if item.is_active {
                if let Some(items) = index.get_mut(&item.area_type) {
                    items.push(item.clone());
                }
            }
        }
        for items in index.values_mut() {
            items.sort_by_key(|item| item.number);
        }
        self.checklist_index = index;
    }
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    validate_checklists(&config.checklists)
}

fn validate_checklists(items: &[ChecklistItem]) -> Result<(), ConfigError> {
    let mut seen: HashSet<(RiskCategory, u32)> = HashSet::new();
    for item in items.iter().filter(|i| i.is_active) {
        if !seen.insert((item.area_type, item.number)) {
            return Err(ConfigError::DuplicateItemNumber {
                category: item.area_type,
                number: item.number,
            });
        }
    }
    Ok(())
}

/// Built-in hospital campus catalog, loaded by the `seed` command.
pub fn seed_config() -> AppConfig {
    let inspectors = vec![
        ("1", "Amal", "amal", true),
        ("2", "Laila", "laila", true),
        ("3", "Nizar Almalki", "nizar", true),
        ("4", "Abdullah Alharbi", "abdullah", true),
        ("5", "Ali Alqarni", "ali", true),
        ("6", "Thiab (evening shift)", "thiab", false),
    ]
    .into_iter()
    .map(|(id, name, username, active)| Inspector {
        id: id.to_string(),
        display_name: name.to_string(),
        username: username.to_string(),
        password_hash: "123".to_string(),
        allowed_zone_types: RiskCategory::ALL.to_vec(),
        is_active: active,
    })
    .collect();

    let zones = vec![
        ("z1", "Ward 5", RiskCategory::HighRisk),
        ("z2", "Ward 7-8", RiskCategory::HighRisk),
        ("z3", "Dental Department", RiskCategory::HighRisk),
        ("z4", "CSSD", RiskCategory::HighRisk),
        ("z5", "Main Laboratory", RiskCategory::HighRisk),
        ("z6", "Delivery Ward", RiskCategory::HighRisk),
        ("z7", "Physiotherapy", RiskCategory::MedRisk),
        ("z8", "Blood Bank", RiskCategory::MedRisk),
        ("z9", "Outpatient Clinics Building", RiskCategory::MedRisk),
        ("z10", "Main Warehouse", RiskCategory::MedRisk),
        ("z11", "Dietary Department", RiskCategory::General),
        ("z12", "Education Rooms and Library", RiskCategory::General),
        ("z13", "Social Services Offices", RiskCategory::General),
        ("z14", "Visitor Parking", RiskCategory::General),
    ]
    .into_iter()
    .map(|(id, name, category)| Zone {
        id: id.to_string(),
        name: name.to_string(),
        category,
    })
    .collect();

    let general = RiskCategory::General;
    let med = RiskCategory::MedRisk;
    let high = RiskCategory::HighRisk;
    let checklist_rows: Vec<(&str, u32, &str, u32, RiskCategory, &[&str])> = vec![
        ("g1", 1, "Carpet cleanliness", 6, general, &["Dust", "Stains", "Bad odor"]),
        ("g2", 2, "Floors, tiles, stairs and ceilings", 10, general, &["Dust", "Stains", "Rust"]),
        ("g3", 3, "Marble and vinyl floor polishing", 8, general, &["Needs cleaning", "Needs waxing", "Needs polishing"]),
        ("g4", 4, "Office furniture and chairs", 4, general, &["Dust", "Stains", "Not clean"]),
        ("g5", 5, "Chemical handling and use", 10, general, &["Expired", "No list", "Wrong dilution", "Unlabelled"]),
        ("g6", 6, "Bathrooms and toilets", 7, general, &["Stains", "Odor", "Checklist incomplete", "Waste not collected"]),
        ("g7", 7, "General waste", 7, general, &["Mixed", "Overflowing", "Not collected", "Damaged container"]),
        ("g8", 8, "Personal protective equipment", 7, general, &["Not available", "Not approved", "Damaged"]),
        ("m1", 1, "Carpet cleanliness", 3, med, &["Dust", "Stains", "Odor"]),
        ("m2", 2, "Floors, stairs and ceilings", 6, med, &["Dust", "Stains", "Rust"]),
        ("m3", 3, "Marble and vinyl floor polishing", 6, med, &["Needs cleaning", "Needs waxing"]),
        ("m4", 4, "Chemical handling and use", 10, med, &["Expired", "No list", "Wrong dilution", "Unlabelled"]),
        ("m5", 5, "Bathrooms and toilets", 7, med, &["Stains", "Odor", "Checklist incomplete", "Waste not collected"]),
        ("m6", 6, "Medical waste", 10, med, &["Mixed", "Overflowing", "Not tied"]),
        ("m7", 7, "Infection control", 9, med, &["Supplies missing", "Not compliant"]),
        ("m8", 8, "Uniform and personal hygiene", 5, med, &["Not available", "Not approved", "Not suitable"]),
        ("h1", 1, "Floors, stairs and ceilings", 6, high, &["Dust", "Stains", "Rust"]),
        ("h2", 2, "Marble and vinyl floor polishing", 6, high, &["Needs cleaning", "Needs waxing"]),
        ("h3", 3, "Chemical handling and use", 12, high, &["Expired", "No list", "Wrong dilution", "Unlabelled"]),
        ("h4", 4, "Critical area cleanliness", 12, high, &["Not clean", "Not compliant", "Needs special disinfection"]),
        ("h5", 5, "Bathrooms and toilets", 6, high, &["Stains", "Odor", "Checklist incomplete", "Waste not collected"]),
        ("h6", 6, "Medical waste", 10, high, &["Mixed", "Overflowing", "Not tied"]),
        ("h7", 7, "Infection control", 7, high, &["Supplies missing", "Not compliant"]),
        ("h8", 8, "Emergency response", 5, high, &["Late", "Not qualified"]),
    ];
    let checklists = checklist_rows
        .into_iter()
        .map(|(id, number, name, max_score, area_type, observations)| ChecklistItem {
            id: id.to_string(),
            number,
            name: name.to_string(),
            name_en: None,
            max_score,
            area_type,
            is_active: true,
            possible_observations: observations.iter().map(|o| o.to_string()).collect(),
        })
        .collect();

    AppConfig {
        inspectors,
        zones,
        checklists,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_catalog_is_valid_and_indexed() {
        let store = ConfigStore::seed();
        assert!(validate(store.config()).is_ok());
        for category in RiskCategory::ALL {
            let items = store.active_checklist(category);
            assert!(!items.is_empty());
            for pair in items.windows(2) {
                assert!(pair[0].number < pair[1].number);
            }
            assert!(items.iter().all(|i| i.area_type == category && i.is_active));
        }
    }

    #[test]
    fn inactive_inspectors_are_not_listed_as_active() {
        let store = ConfigStore::seed();
        assert!(store.active_inspectors().all(|i| i.is_active));
        assert!(store
            .config()
            .inspectors
            .iter()
            .any(|i| !i.is_active));
    }

    #[test]
    fn import_with_missing_key_leaves_config_untouched() {
        let mut store = ConfigStore::seed();
        let before = store.export_json().unwrap();

        let result = store.import_json(r#"{"inspectors": [], "zones": []}"#);
        assert!(result.is_err());
        assert_eq!(store.export_json().unwrap(), before);
    }

    #[test]
    fn import_rejects_non_object_documents() {
        let mut store = ConfigStore::seed();
        let before = store.export_json().unwrap();

        assert!(store.import_json("[]").is_err());
        assert!(store.import_json("not json at all").is_err());
        assert!(store.import_json("42").is_err());
        assert_eq!(store.export_json().unwrap(), before);
    }

    #[test]
    fn export_import_round_trips_in_order() {
        let store = ConfigStore::seed();
        let exported = store.export_json().unwrap();

        let mut other = ConfigStore::seed();
        other.remove_zone("z1");
        other.import_json(&exported).unwrap();

        assert_eq!(other.config(), store.config());
    }

    #[test]
    fn duplicate_active_numbers_are_rejected() {
        let mut config = seed_config();
        let mut clone = config.checklists[0].clone();
        clone.id = "g1-dup".to_string();
        config.checklists.push(clone);

        assert!(matches!(
            ConfigStore::new(config),
            Err(ConfigError::DuplicateItemNumber { .. })
        ));
    }

    #[test]
    fn inactive_duplicates_are_allowed() {
        let mut config = seed_config();
        let mut clone = config.checklists[0].clone();
        clone.id = "g1-retired".to_string();
        clone.is_active = false;
        config.checklists.push(clone);

        assert!(ConfigStore::new(config).is_ok());
    }

    #[test]
    fn upsert_generates_ids_for_new_entities() {
        let mut store = ConfigStore::seed();
        let id = store.upsert_zone(Zone {
            id: String::new(),
            name: "New Wing".to_string(),
            category: RiskCategory::General,
        });
        assert!(!id.is_empty());
        assert_eq!(store.zone(&id).map(|z| z.name.as_str()), Some("New Wing"));
    }

    #[test]
    fn deactivating_an_item_drops_it_from_the_index() {
        let mut store = ConfigStore::seed();
        let before = store.active_checklist(RiskCategory::General).len();

        let mut item = store.active_checklist(RiskCategory::General)[0].clone();
        item.is_active = false;
        store.upsert_checklist_item(item).unwrap();

        assert_eq!(
            store.active_checklist(RiskCategory::General).len(),
            before - 1
        );
    }

    #[test]
    fn zones_are_filtered_by_category() {
        let store = ConfigStore::seed();
        assert!(store
            .zones_in(RiskCategory::MedRisk)
            .all(|z| z.category == RiskCategory::MedRisk));
        assert!(store.zones_in(RiskCategory::HighRisk).count() > 0);
    }
}
