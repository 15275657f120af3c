use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// One presence event. At most one row exists per `(subject_id, date)`;
/// the ledger enforces this with a unique index, so records are never
/// updated or deleted by the scan pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub subject_id: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// An attendance record joined with its subject's registry fields,
/// as read back for reporting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub subject_id: String,
    pub name: String,
    pub class_name: String,
    pub section: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: String,
}
