use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered person whose QR code can be scanned.
///
/// Owned by the registry; the scan pipeline only ever reads it.
/// `code_payload` is the decoded string content of the subject's QR code
/// and is globally unique across the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub class_name: String,
    pub section: String,
    pub code_payload: String,
    pub created_at: DateTime<Utc>,
}
