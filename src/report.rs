use std::fmt::Write;

use crate::models::{AppConfig, ChecklistItem, InspectionRecord};

/// Printable markdown report for one submitted inspection. The join runs
/// over the full catalog filtered by area type, not the active-only index,
/// so records referencing since-deactivated items still render.
pub fn build_record_report(record: &InspectionRecord, config: &AppConfig) -> String {
    let mut items: Vec<&ChecklistItem> = config
        .checklists
        .iter()
        .filter(|item| item.area_type == record.zone_type)
        .collect();
    items.sort_by_key(|item| item.number);

    let mut output = String::new();
    let _ = writeln!(output, "# Environmental Services Inspection Report");
    let _ = writeln!(output);
    let _ = writeln!(output, "- Reference: {}", record.id);
    let _ = writeln!(output, "- Inspector: {}", record.inspector_name);
    let _ = writeln!(
        output,
        "- Zone: {} ({})",
        record.zone_name,
        record.zone_type.label()
    );
    let _ = writeln!(
        output,
        "- Date: {}",
        record.timestamp.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(
        output,
        "- Final score: {} / {} ({:.1}%)",
        record.total_score, record.max_possible_score, record.percentage
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Checklist");

    let mut rendered_any = false;
    for item in items {
        let Some(score) = record.scores.get(&item.id) else {
            continue;
        };
        rendered_any = true;
        let _ = writeln!(
            output,
            "- #{} {}: {} / {}",
            item.number, item.name, score, item.max_score
        );
        if let Some(observations) = record.selected_observations.get(&item.id) {
            for tag in observations {
                let _ = writeln!(output, "  - Observation: {tag}");
            }
        }
        if let Some(note) = record.notes.get(&item.id).filter(|note| !note.is_empty()) {
            let _ = writeln!(output, "  - Note: {note}");
        }
    }
    if !rendered_any {
        let _ = writeln!(output, "No scored items recorded for this inspection.");
    }

    output
}
