use std::path::PathBuf;

use anyhow::{ensure, Context};
use clap::{Parser, Subcommand};

mod config;
mod history;
mod models;
mod report;
mod session;
mod stats;

use config::ConfigStore;
use history::History;
use models::{InspectionRecord, RiskCategory};
use session::InspectionSession;
use stats::TimeWindow;

#[derive(Parser)]
#[command(name = "evs-inspection-tracker")]
#[command(about = "Environmental services inspection tracker for a hospital campus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the built-in configuration catalog to a config file
    Seed {
        #[arg(long, default_value = "evs_config.json")]
        out: PathBuf,
    },
    /// Run one inspection from a CSV score sheet and append it to history
    Submit {
        #[arg(long, default_value = "evs_config.json")]
        config: PathBuf,
        #[arg(long, default_value = "evs_history.json")]
        history: PathBuf,
        /// Inspector id from the configuration
        #[arg(long)]
        inspector: String,
        /// Risk category of the inspected zone
        #[arg(long, value_enum)]
        category: RiskCategory,
        /// Zone id from the configuration
        #[arg(long)]
        zone: String,
        /// CSV score sheet with columns item_id,score,note,observations
        #[arg(long)]
        scores: PathBuf,
    },
    /// Summarize the inspection history, optionally per inspector and window
    Summary {
        #[arg(long, default_value = "evs_history.json")]
        history: PathBuf,
        /// Inspector display name; omit to cover the whole history
        #[arg(long)]
        inspector: Option<String>,
        #[arg(long, value_enum)]
        window: Option<TimeWindow>,
    },
    /// Per-day average scores, oldest first
    Trend {
        #[arg(long, default_value = "evs_history.json")]
        history: PathBuf,
        /// Inspector display name; omit to cover the whole history
        #[arg(long)]
        inspector: Option<String>,
        #[arg(long, value_enum)]
        window: Option<TimeWindow>,
    },
    /// Render one inspection record as a markdown report
    Report {
        #[arg(long, default_value = "evs_config.json")]
        config: PathBuf,
        #[arg(long, default_value = "evs_history.json")]
        history: PathBuf,
        /// Reference id, e.g. EVS-20260101-4821
        #[arg(long)]
        id: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn select_records(
    history: &History,
    inspector: Option<&str>,
    window: Option<TimeWindow>,
) -> Vec<InspectionRecord> {
    match (inspector, window) {
        (Some(name), Some(window)) => {
            stats::filter_by_inspector_and_window(history.records(), name, window)
        }
        (None, Some(window)) => stats::filter_by_window(history.records(), window),
        (Some(name), None) => history
            .records()
            .iter()
            .filter(|record| record.inspector_name == name)
            .cloned()
            .collect(),
        (None, None) => history.records().to_vec(),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Seed { out } => {
            let store = ConfigStore::seed();
            store.save(&out)?;
            println!("Seed configuration written to {}.", out.display());
        }
        Commands::Submit {
            config,
            history,
            inspector,
            category,
            zone,
            scores,
        } => {
            let store = ConfigStore::load(&config)?;
            let mut log = History::load(&history)?;

            let mut session = InspectionSession::new(&store);
            ensure!(
                session.select_inspector(&inspector),
                "unknown or inactive inspector id: {inspector}"
            );
            session.select_category(category);
            ensure!(
                session.select_zone(&zone),
                "zone {zone} is not a {} zone in this configuration",
                category.label()
            );
            ensure!(session.start(), "inspection could not be started");

            let rows = session::read_score_sheet(&scores)?;
            session.apply_score_sheet(&rows)?;
            let record = session.submit(&mut log)?;
            log.save(&history)?;

            println!("Inspection {} submitted.", record.id);
            println!("- Inspector: {}", record.inspector_name);
            println!("- Zone: {} ({})", record.zone_name, record.zone_type.label());
            println!(
                "- Score: {} / {} ({:.1}%)",
                record.total_score, record.max_possible_score, record.percentage
            );
        }
        Commands::Summary {
            history,
            inspector,
            window,
        } => {
            let log = History::load(&history)?;
            let records = select_records(&log, inspector.as_deref(), window);
            let summary = stats::summarize(&records);

            if summary.count == 0 {
                println!("No inspections found for this selection.");
                return Ok(());
            }
            println!("Inspections: {}", summary.count);
            println!("Zones visited: {}", summary.unique_zone_count);
            println!("Average score: {:.1}%", summary.average_percentage);
        }
        Commands::Trend {
            history,
            inspector,
            window,
        } => {
            let log = History::load(&history)?;
            let records = select_records(&log, inspector.as_deref(), window);
            let trend = stats::daily_trend(&records);

            if trend.is_empty() {
                println!("No inspections found for this selection.");
                return Ok(());
            }
            println!("Daily average scores:");
            for point in trend {
                println!(
                    "- {}: {:.1}% across {} inspection(s)",
                    point.date, point.average_percentage, point.inspections
                );
            }
        }
        Commands::Report {
            config,
            history,
            id,
            out,
        } => {
            let store = ConfigStore::load(&config)?;
            let log = History::load(&history)?;
            let record = log
                .find(&id)
                .with_context(|| format!("no inspection record with reference id {id}"))?;
            let rendered = report::build_record_report(record, store.config());
            std::fs::write(&out, rendered)
                .with_context(|| format!("failed to write report to {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
