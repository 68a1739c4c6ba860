//! `tandem status` — config, watermark, and store visibility.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use tandem_core::config;
use tandem_sync::{timestamp, watermark};

use super::{home_dir, open_stores};

/// Arguments for `tandem status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// Also contact both stores and report record counts.
    #[arg(long)]
    pub check: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let settings = config::load_at(&home).context("failed to load config")?;

        let watermark_exists = watermark::store_path_at(&home).exists();
        let current = watermark::load_at(&home).context("failed to load watermark")?;

        let (database_count, sheet_count) = if self.check {
            let (database, sheet) = open_stores(&settings)?;
            let db_records = database
                .fetch_records()
                .context("database check failed")?;
            let sheet_records = sheet.fetch_records().context("sheet check failed")?;
            (Some(db_records.len()), Some(sheet_records.len()))
        } else {
            (None, None)
        };

        let report = StatusReport {
            database_path: settings.database.path.display().to_string(),
            database_table: settings.database.table.clone(),
            spreadsheet_id: settings.sheet.spreadsheet_id.clone(),
            tab: settings.sheet.tab.clone(),
            interval_secs: settings.interval_secs,
            watermark_gating: settings.watermark_gating,
            last_cycle_at: watermark_exists.then(|| timestamp::format_naive(current)),
            last_cycle_age: if watermark_exists {
                format_age_seconds(age_seconds(current))
            } else {
                "never".to_string()
            },
            database_count,
            sheet_count,
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status")?
            );
            return Ok(());
        }

        print_table(report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    database_path: String,
    database_table: String,
    spreadsheet_id: String,
    tab: String,
    interval_secs: u64,
    watermark_gating: bool,
    last_cycle_at: Option<String>,
    last_cycle_age: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    database_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sheet_count: Option<usize>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "setting")]
    setting: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

fn print_table(report: StatusReport) {
    println!(
        "Tandem v{} | {} ↔ sheet {}",
        env!("CARGO_PKG_VERSION"),
        report.database_path,
        report.spreadsheet_id,
    );

    let last_cycle = match &report.last_cycle_at {
        Some(at) => format!("{at} ({} ago)", report.last_cycle_age).green().to_string(),
        None => "never".yellow().bold().to_string(),
    };

    let mut rows = vec![
        StatusTableRow {
            setting: "database",
            value: format!("{} (table {})", report.database_path, report.database_table),
        },
        StatusTableRow {
            setting: "sheet",
            value: format!("{} (tab {})", report.spreadsheet_id, report.tab),
        },
        StatusTableRow {
            setting: "interval",
            value: format!("{}s", report.interval_secs),
        },
        StatusTableRow {
            setting: "watermark gating",
            value: report.watermark_gating.to_string(),
        },
        StatusTableRow {
            setting: "last cycle",
            value: last_cycle,
        },
    ];
    if let Some(count) = report.database_count {
        rows.push(StatusTableRow {
            setting: "database records",
            value: count.to_string(),
        });
    }
    if let Some(count) = report.sheet_count {
        rows.push(StatusTableRow {
            setting: "sheet records",
            value: count.to_string(),
        });
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if report.last_cycle_at.is_none() {
        println!("Run 'tandem cycle' to reconcile for the first time.");
    }
}

fn age_seconds(last_cycle_at: chrono::NaiveDateTime) -> u64 {
    Local::now()
        .naive_local()
        .signed_duration_since(last_cycle_at)
        .num_seconds()
        .max(0) as u64
}

fn format_age_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
