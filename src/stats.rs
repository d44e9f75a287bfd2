use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use clap::ValueEnum;

use crate::models::{DailyTrend, HistorySummary, InspectionRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimeWindow {
    Week,
    Month,
    Quarter,
    Year,
}

/// Start of a reporting window: a week is seven days back, while month,
/// quarter and year subtract calendar months rather than fixed durations.
pub fn window_start(now: DateTime<Utc>, window: TimeWindow) -> DateTime<Utc> {
    let months_back = |months: u32| {
        now.checked_sub_months(Months::new(months))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    };
    match window {
        TimeWindow::Week => now - Duration::days(7),
        TimeWindow::Month => months_back(1),
        TimeWindow::Quarter => months_back(3),
        TimeWindow::Year => months_back(12),
    }
}

/// Records by one inspector inside the window, newest first.
pub fn filter_by_inspector_and_window(
    records: &[InspectionRecord],
    inspector_name: &str,
    window: TimeWindow,
) -> Vec<InspectionRecord> {
    filter_since(records, window, Some(inspector_name))
}

/// Records inside the window regardless of inspector, newest first.
pub fn filter_by_window(records: &[InspectionRecord], window: TimeWindow) -> Vec<InspectionRecord> {
    filter_since(records, window, None)
}

fn filter_since(
    records: &[InspectionRecord],
    window: TimeWindow,
    inspector_name: Option<&str>,
) -> Vec<InspectionRecord> {
    let start = window_start(Utc::now(), window);
    let mut matches: Vec<InspectionRecord> = records
        .iter()
        .filter(|record| record.timestamp >= start)
        .filter(|record| {
            inspector_name
                .map(|name| record.inspector_name == name)
                .unwrap_or(true)
        })
        .cloned()
        .collect();
    matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    matches
}

/// Count, distinct zone names, and mean percentage. Empty input degrades to
/// all zeroes rather than dividing by zero.
pub fn summarize(records: &[InspectionRecord]) -> HistorySummary {
    if records.is_empty() {
        return HistorySummary {
            count: 0,
            unique_zone_count: 0,
            average_percentage: 0.0,
        };
    }
    let zones: HashSet<&str> = records.iter().map(|r| r.zone_name.as_str()).collect();
    let total: f64 = records.iter().map(|r| r.percentage).sum();
    HistorySummary {
        count: records.len(),
        unique_zone_count: zones.len(),
        average_percentage: total / records.len() as f64,
    }
}

/// Mean percentage per calendar day, oldest first, for charting.
pub fn daily_trend(records: &[InspectionRecord]) -> Vec<DailyTrend> {
    let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = buckets
            .entry(record.timestamp.date_naive())
            .or_insert((0.0, 0));
        entry.0 += record.percentage;
        entry.1 += 1;
    }
    buckets
        .into_iter()
        .map(|(date, (sum, count))| DailyTrend {
            date,
            average_percentage: sum / count as f64,
            inspections: count,
        })
        .collect()
}
