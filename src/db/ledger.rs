use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{format_date, format_time, parse_date, parse_datetime, parse_time},
    Database,
};
use crate::models::{AttendanceEntry, AttendanceRecord};

/// Result of a ledger commit. `AlreadyMarked` is informational, not an
/// error: it is the durable cross-session guarantee that a subject appears
/// at most once per day, independent of debounce timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Marked,
    AlreadyMarked,
}

fn row_to_entry(row: &Row) -> Result<AttendanceEntry> {
    let date: String = row.get("date")?;
    let time: String = row.get("time")?;

    Ok(AttendanceEntry {
        subject_id: row.get("subject_id")?,
        name: row.get("name")?,
        class_name: row.get("class_name")?,
        section: row.get("section")?,
        date: parse_date(&date, "date")?,
        time: parse_time(&time, "time")?,
        status: row.get("status")?,
    })
}

impl Database {
    /// Append a presence record for `(subject_id, date)` if none exists.
    ///
    /// The uniqueness check and the append are a single statement riding on
    /// the `UNIQUE(subject_id, date)` index, so a concurrent commit for the
    /// same pair can never produce two rows; the loser observes the conflict
    /// and reports `AlreadyMarked`.
    pub async fn mark_attendance(
        &self,
        subject_id: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<MarkOutcome> {
        let subject_id = subject_id.to_string();
        self.execute(move |conn| {
            let inserted = conn
                .execute(
                    "INSERT INTO attendance (subject_id, date, time, status, created_at)
                     VALUES (?1, ?2, ?3, 'present', ?4)
                     ON CONFLICT(subject_id, date) DO NOTHING",
                    params![
                        subject_id,
                        format_date(date),
                        format_time(time),
                        Utc::now().to_rfc3339(),
                    ],
                )
                .context("failed to append attendance record")?;

            if inserted == 0 {
                Ok(MarkOutcome::AlreadyMarked)
            } else {
                Ok(MarkOutcome::Marked)
            }
        })
        .await
    }

    /// All of a date's records joined with their registry fields, in
    /// time-of-marking order (row id breaks ties for same-second scans).
    pub async fn attendance_for_date(&self, date: NaiveDate) -> Result<Vec<AttendanceEntry>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT a.subject_id, s.name, s.class_name, s.section,
                        a.date, a.time, a.status
                 FROM attendance a
                 JOIN subjects s ON s.id = a.subject_id
                 WHERE a.date = ?1
                 ORDER BY a.time, a.id",
            )?;

            let mut rows = stmt.query(params![format_date(date)])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_entry(row)?);
            }

            Ok(entries)
        })
        .await
    }

    /// The day's record for one subject, if any.
    pub async fn attendance_record(
        &self,
        subject_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        let subject_id = subject_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT subject_id, date, time, status, created_at
                 FROM attendance
                 WHERE subject_id = ?1 AND date = ?2",
            )?;

            let mut rows = stmt.query(params![subject_id, format_date(date)])?;
            match rows.next()? {
                Some(row) => {
                    let date: String = row.get("date")?;
                    let time: String = row.get("time")?;
                    let created_at: String = row.get("created_at")?;
                    Ok(Some(AttendanceRecord {
                        subject_id: row.get("subject_id")?,
                        date: parse_date(&date, "date")?,
                        time: parse_time(&time, "time")?,
                        status: row.get("status")?,
                        created_at: parse_datetime(&created_at, "created_at")?,
                    }))
                }
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn attendance_count(&self, subject_id: &str, date: NaiveDate) -> Result<u64> {
        let subject_id = subject_id.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM attendance WHERE subject_id = ?1 AND date = ?2",
                params![subject_id, format_date(date)],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime, Utc};
    use uuid::Uuid;

    use crate::db::{Database, MarkOutcome};
    use crate::models::Subject;

    fn temp_database() -> Database {
        let path = std::env::temp_dir().join(format!("rollcall-test-{}.sqlite3", Uuid::new_v4()));
        Database::new(path).expect("open temp database")
    }

    fn subject(id: &str, payload: &str, class_name: &str) -> Subject {
        Subject {
            id: id.to_string(),
            name: format!("Subject {id}"),
            class_name: class_name.to_string(),
            section: "A".to_string(),
            code_payload: payload.to_string(),
            created_at: Utc::now(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M:%S").expect("valid time")
    }

    #[tokio::test]
    async fn second_commit_for_same_day_is_already_marked() {
        let db = temp_database();
        db.insert_subject(&subject("s1", "PAY-1", "5")).await.expect("insert subject");

        let day = date("2024-01-10");
        let first = db
            .mark_attendance("s1", day, time("09:00:00"))
            .await
            .expect("first commit");
        assert_eq!(first, MarkOutcome::Marked);

        let second = db
            .mark_attendance("s1", day, time("09:05:00"))
            .await
            .expect("second commit");
        assert_eq!(second, MarkOutcome::AlreadyMarked);

        let count = db.attendance_count("s1", day).await.expect("count");
        assert_eq!(count, 1);

        // The losing commit must not have touched the original row.
        let record = db
            .attendance_record("s1", day)
            .await
            .expect("read record")
            .expect("record exists");
        assert_eq!(record.time, time("09:00:00"));
        assert_eq!(record.status, "present");
    }

    #[tokio::test]
    async fn same_subject_can_be_marked_on_different_days() {
        let db = temp_database();
        db.insert_subject(&subject("s1", "PAY-1", "5")).await.expect("insert subject");

        let monday = db
            .mark_attendance("s1", date("2024-01-08"), time("09:00:00"))
            .await
            .expect("monday commit");
        let tuesday = db
            .mark_attendance("s1", date("2024-01-09"), time("09:00:00"))
            .await
            .expect("tuesday commit");

        assert_eq!(monday, MarkOutcome::Marked);
        assert_eq!(tuesday, MarkOutcome::Marked);
    }

    #[tokio::test]
    async fn attendance_for_date_preserves_marking_order() {
        let db = temp_database();
        db.insert_subject(&subject("s1", "PAY-1", "5")).await.expect("insert s1");
        db.insert_subject(&subject("s2", "PAY-2", "5")).await.expect("insert s2");

        let day = date("2024-01-10");
        db.mark_attendance("s2", day, time("08:55:00")).await.expect("mark s2");
        db.mark_attendance("s1", day, time("09:00:00")).await.expect("mark s1");

        let entries = db.attendance_for_date(day).await.expect("read back");
        let ids: Vec<&str> = entries.iter().map(|e| e.subject_id.as_str()).collect();
        assert_eq!(ids, vec!["s2", "s1"]);
    }

    #[tokio::test]
    async fn duplicate_payload_registration_is_rejected() {
        let db = temp_database();
        db.insert_subject(&subject("s1", "PAY-1", "5")).await.expect("insert s1");

        let err = db
            .insert_subject(&subject("s2", "PAY-1", "6"))
            .await
            .expect_err("duplicate payload must be rejected");
        assert!(err.to_string().contains("already registered"));
    }

    #[tokio::test]
    async fn duplicate_id_is_not_reported_as_a_payload_conflict() {
        let db = temp_database();
        db.insert_subject(&subject("s1", "PAY-1", "5")).await.expect("insert s1");

        let err = db
            .insert_subject(&subject("s1", "PAY-2", "5"))
            .await
            .expect_err("duplicate id must be rejected");
        let message = format!("{err:#}");
        assert!(!message.contains("already registered"));
        assert!(message.contains("failed to insert subject"));
    }
}
