use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::db::Database;
use crate::models::AttendanceEntry;

/// One class's slice of a day, records in time-of-marking order.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassSection {
    pub class_name: String,
    pub records: Vec<AttendanceEntry>,
}

/// The exportable attendance document for one date: one section per class
/// that had at least one record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    pub date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<ClassSection>,
}

impl DailyReport {
    pub fn total_records(&self) -> usize {
        self.sections.iter().map(|s| s.records.len()).sum()
    }
}

/// Derive the per-class grouping for a date. Pure function of the ledger:
/// sections come out sorted by class name, and records keep the ledger's
/// marking order inside each section, so the same ledger content always
/// yields the same document.
pub async fn build_report(db: &Database, date: NaiveDate) -> Result<DailyReport> {
    let entries = db.attendance_for_date(date).await?;

    let mut groups: BTreeMap<String, Vec<AttendanceEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(entry.class_name.clone()).or_default().push(entry);
    }

    let sections = groups
        .into_iter()
        .map(|(class_name, records)| ClassSection {
            class_name,
            records,
        })
        .collect();

    Ok(DailyReport {
        date,
        generated_at: Utc::now(),
        sections,
    })
}

pub fn write_json(report: &DailyReport, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create report file {}", path.display()))?;
    serde_json::to_writer_pretty(file, report).context("failed to serialize report")?;
    Ok(())
}
