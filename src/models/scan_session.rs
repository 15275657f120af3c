use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScanSessionStatus {
    Running,
    Completed,
    Failed,
}

impl ScanSessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanSessionStatus::Running => "Running",
            ScanSessionStatus::Completed => "Completed",
            ScanSessionStatus::Failed => "Failed",
        }
    }
}

/// Durable trace of one run of the scanning loop, from start to
/// cancellation or acquisition failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSession {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub status: ScanSessionStatus,
    pub frames: u64,
    pub detections: u64,
    pub marked: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
