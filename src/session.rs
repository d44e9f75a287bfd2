use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use rand::Rng;
use thiserror::Error;

use crate::config::ConfigStore;
use crate::history::History;
use crate::models::{ChecklistItem, CompletionStatus, InspectionRecord, RiskCategory};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown checklist item: {item_id}")]
    UnknownItem { item_id: String },
    #[error("score {score} exceeds the maximum of {max_score} for item {item_id}")]
    ScoreOutOfRange {
        item_id: String,
        score: u32,
        max_score: u32,
    },
    #[error("observation \"{tag}\" is not defined for item {item_id}")]
    UnknownObservation { item_id: String, tag: String },
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("no inspection in progress")]
    NotStarted,
    #[error("checklist incomplete: {remaining} item(s) still unanswered")]
    Incomplete { remaining: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Selecting,
    Scoring,
    Summary,
}

/// Drives a single inspection from inspector/zone selection to a submitted
/// record. Borrows the configuration for its whole lifetime, so the catalog
/// cannot change underneath an open session.
pub struct InspectionSession<'a> {
    store: &'a ConfigStore,
    phase: Phase,
    inspector_name: Option<String>,
    category: Option<RiskCategory>,
    zone_name: Option<String>,
    scores: BTreeMap<String, u32>,
    notes: BTreeMap<String, String>,
    observations: BTreeMap<String, Vec<String>>,
    last_record: Option<InspectionRecord>,
}

impl<'a> InspectionSession<'a> {
    pub fn new(store: &'a ConfigStore) -> Self {
        InspectionSession {
            store,
            phase: Phase::Selecting,
            inspector_name: None,
            category: None,
            zone_name: None,
            scores: BTreeMap::new(),
            notes: BTreeMap::new(),
            observations: BTreeMap::new(),
            last_record: None,
        }
    }

    /// Only active inspectors are selectable.
    pub fn select_inspector(&mut self, inspector_id: &str) -> bool {
        match self.store.inspector(inspector_id) {
            Some(inspector) if inspector.is_active => {
                self.inspector_name = Some(inspector.display_name.clone());
                true
            }
            _ => false,
        }
    }

    /// The zone list is category-filtered, so a zone chosen under the
    /// previous category must not survive the change.
    pub fn select_category(&mut self, category: RiskCategory) {
        self.category = Some(category);
        self.zone_name = None;
    }

    pub fn select_zone(&mut self, zone_id: &str) -> bool {
        let Some(category) = self.category else {
            return false;
        };
        match self.store.zone(zone_id) {
            Some(zone) if zone.category == category => {
                self.zone_name = Some(zone.name.clone());
                true
            }
            _ => false,
        }
    }

    pub fn selected_inspector(&self) -> Option<&str> {
        self.inspector_name.as_deref()
    }

    pub fn selected_category(&self) -> Option<RiskCategory> {
        self.category
    }

    pub fn selected_zone(&self) -> Option<&str> {
        self.zone_name.as_deref()
    }

    /// Begins the checklist-filling phase. No-op returning false unless an
    /// inspector, a category, and a zone have all been selected.
    pub fn start(&mut self) -> bool {
        if self.inspector_name.is_none() || self.category.is_none() || self.zone_name.is_none() {
            return false;
        }
        self.scores.clear();
        self.notes.clear();
        self.observations.clear();
        self.last_record = None;
        self.phase = Phase::Scoring;
        true
    }

    /// Active checklist items presented by this session, ordered by number.
    pub fn checklist(&self) -> &[ChecklistItem] {
        match self.category {
            Some(category) => self.store.active_checklist(category),
            None => &[],
        }
    }

    fn item(&self, item_id: &str) -> Option<&ChecklistItem> {
        self.checklist().iter().find(|item| item.id == item_id)
    }

    pub fn set_score(&mut self, item_id: &str, score: u32) -> Result<(), SessionError> {
        let max_score = self
            .item(item_id)
            .map(|item| item.max_score)
            .ok_or_else(|| SessionError::UnknownItem {
                item_id: item_id.to_string(),
            })?;
        if score > max_score {
            return Err(SessionError::ScoreOutOfRange {
                item_id: item_id.to_string(),
                score,
                max_score,
            });
        }
        self.scores.insert(item_id.to_string(), score);
        Ok(())
    }

    /// Last write wins; no length constraint.
    pub fn set_note(&mut self, item_id: &str, note: &str) {
        self.notes.insert(item_id.to_string(), note.to_string());
    }

    /// Adds the tag if absent, removes it if present. Insertion order is
    /// preserved for the submitted record.
    pub fn toggle_observation(&mut self, item_id: &str, tag: &str) {
        let selected = self.observations.entry(item_id.to_string()).or_default();
        match selected.iter().position(|t| t == tag) {
            Some(position) => {
                selected.remove(position);
            }
            None => selected.push(tag.to_string()),
        }
    }

    pub fn completion(&self) -> CompletionStatus {
        let total = self.checklist().len();
        let answered = self
            .checklist()
            .iter()
            .filter(|item| self.scores.contains_key(&item.id))
            .count();
        CompletionStatus {
            answered,
            total,
            is_complete: total > 0 && answered == total,
        }
    }

    /// Applies a parsed score sheet: one row per checklist item, observation
    /// tags separated by `|`. Tags are checked against the item's predefined
    /// list here, at the input surface.
    pub fn apply_score_sheet(&mut self, rows: &[ScoreSheetRow]) -> Result<(), SessionError> {
        for row in rows {
            self.set_score(&row.item_id, row.score)?;
            let note = row.note.trim();
            if !note.is_empty() {
                self.set_note(&row.item_id, note);
            }
            for tag in row
                .observations
                .split('|')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
            {
                let known = self
                    .item(&row.item_id)
                    .map(|item| item.possible_observations.iter().any(|o| o == tag))
                    .unwrap_or(false);
                if !known {
                    return Err(SessionError::UnknownObservation {
                        item_id: row.item_id.clone(),
                        tag: tag.to_string(),
                    });
                }
                self.toggle_observation(&row.item_id, tag);
            }
        }
        Ok(())
    }

    /// Builds the immutable record and prepends it to history. Blocked with
    /// the unanswered count while the checklist is incomplete; the session
    /// state is preserved so the caller can continue.
    pub fn submit(&mut self, history: &mut History) -> Result<InspectionRecord, SubmitError> {
        if self.phase != Phase::Scoring {
            return Err(SubmitError::NotStarted);
        }
        let status = self.completion();
        if !status.is_complete {
            return Err(SubmitError::Incomplete {
                remaining: status.total - status.answered,
            });
        }
        let (Some(inspector_name), Some(category), Some(zone_name)) = (
            self.inspector_name.clone(),
            self.category,
            self.zone_name.clone(),
        ) else {
            return Err(SubmitError::NotStarted);
        };

        let items = self.store.active_checklist(category);
        let total_score: u32 = items
            .iter()
            .filter_map(|item| self.scores.get(&item.id))
            .sum();
        let max_possible_score: u32 = items.iter().map(|item| item.max_score).sum();
        let percentage = if max_possible_score > 0 {
            f64::from(total_score) / f64::from(max_possible_score) * 100.0
        } else {
            0.0
        };

        let timestamp = Utc::now();
        let record = InspectionRecord {
            id: reference_id(timestamp.date_naive()),
            inspector_name,
            zone_name,
            zone_type: category,
            timestamp,
            scores: self.scores.clone(),
            notes: self.notes.clone(),
            selected_observations: self.observations.clone(),
            total_score,
            max_possible_score,
            percentage,
        };

        history.prepend(record.clone());
        self.last_record = Some(record.clone());
        self.phase = Phase::Summary;
        Ok(record)
    }

    pub fn last_record(&self) -> Option<&InspectionRecord> {
        self.last_record.as_ref()
    }

    /// Discards the in-progress checklist and the zone selection; the
    /// inspector and category survive for the next run.
    pub fn cancel(&mut self) {
        self.zone_name = None;
        self.scores.clear();
        self.notes.clear();
        self.observations.clear();
        self.phase = Phase::Selecting;
    }
}

/// Reference ids look like `EVS-20240307-4821`: submission date plus a
/// 4-digit suffix drawn uniformly from 1000..=9999. No collision check.
pub fn reference_id(date: NaiveDate) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(1000..=9999);
    format!("EVS-{}-{}", date.format("%Y%m%d"), suffix)
}

#[derive(Debug, serde::Deserialize)]
pub struct ScoreSheetRow {
    pub item_id: String,
    pub score: u32,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub observations: String,
}

pub fn read_score_sheet(path: &Path) -> anyhow::Result<Vec<ScoreSheetRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open score sheet {}", path.display()))?;
    parse_score_sheet(file)
}

pub fn parse_score_sheet<R: io::Read>(reader: R) -> anyhow::Result<Vec<ScoreSheetRow>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for result in reader.deserialize::<ScoreSheetRow>() {
        rows.push(result.context("invalid score sheet row")?);
    }
    Ok(rows)
}
