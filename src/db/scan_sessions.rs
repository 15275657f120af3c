use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{parse_datetime, parse_optional_datetime, parse_session_status, to_i64, to_u64},
    Database,
};
use crate::models::{ScanSession, ScanSessionStatus};

fn row_to_scan_session(row: &Row) -> Result<ScanSession> {
    let started_at: String = row.get("started_at")?;
    let stopped_at: Option<String> = row.get("stopped_at")?;
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(ScanSession {
        id: row.get("id")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        stopped_at: parse_optional_datetime(stopped_at, "stopped_at")?,
        status: parse_session_status(&status)?,
        frames: to_u64(row.get("frames")?, "frames")?,
        detections: to_u64(row.get("detections")?, "detections")?,
        marked: to_u64(row.get("marked")?, "marked")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_scan_session(&self, session: &ScanSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO scan_sessions
                     (id, started_at, stopped_at, status, frames, detections, marked,
                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.started_at.to_rfc3339(),
                    record.stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                    to_i64(record.frames)?,
                    to_i64(record.detections)?,
                    to_i64(record.marked)?,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn finalize_scan_session(
        &self,
        session_id: &str,
        status: ScanSessionStatus,
        frames: u64,
        detections: u64,
        marked: u64,
        stopped_at: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE scan_sessions
                 SET status = ?1,
                     frames = ?2,
                     detections = ?3,
                     marked = ?4,
                     stopped_at = ?5,
                     updated_at = ?6
                 WHERE id = ?7",
                params![
                    status.as_str(),
                    to_i64(frames)?,
                    to_i64(detections)?,
                    to_i64(marked)?,
                    stopped_at.to_rfc3339(),
                    stopped_at.to_rfc3339(),
                    session_id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_scan_session(&self, session_id: &str) -> Result<Option<ScanSession>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, started_at, stopped_at, status, frames, detections, marked,
                        created_at, updated_at
                 FROM scan_sessions
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_scan_session(row)?)),
                None => Ok(None),
            }
        })
        .await
    }
}
