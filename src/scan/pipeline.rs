use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::db::{Database, MarkOutcome};
use crate::decode::Detection;
use crate::models::Subject;

use super::debounce::{Admission, DebounceGate};

/// Everything a detection can turn into. All four are routine, routed to
/// the status renderer as values; none of them stops the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Marked(Subject),
    AlreadyMarked(Subject),
    Suppressed(Subject),
    NotRecognized(String),
}

impl ScanOutcome {
    pub fn display_text(&self) -> String {
        match self {
            ScanOutcome::Marked(subject) => format!("{} marked present", subject.name),
            ScanOutcome::AlreadyMarked(subject) => {
                format!("{} already marked today", subject.name)
            }
            ScanOutcome::Suppressed(subject) => format!("{} just scanned, hold on", subject.name),
            ScanOutcome::NotRecognized(_) => "Code not recognized".to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScanOutcome::Marked(_) => "marked",
            ScanOutcome::AlreadyMarked(_) => "already-marked",
            ScanOutcome::Suppressed(_) => "suppressed",
            ScanOutcome::NotRecognized(_) => "not-recognized",
        }
    }
}

/// Run one detection through resolve, gate, and ledger commit.
///
/// Resolution comes first: an unrecognized payload must not stamp the gate
/// or touch the ledger, so stray codes never occupy a debounce slot. The
/// gate stamps on admission, before the commit.
pub async fn process_detection(
    db: &Database,
    gate: &mut DebounceGate,
    detection: &Detection,
    now: DateTime<Utc>,
    date: NaiveDate,
    time: NaiveTime,
) -> Result<ScanOutcome> {
    let Some(subject) = db.find_subject_by_payload(&detection.payload).await? else {
        return Ok(ScanOutcome::NotRecognized(detection.payload.clone()));
    };

    if gate.admit(&detection.payload, now) == Admission::Suppressed {
        return Ok(ScanOutcome::Suppressed(subject));
    }

    match db.mark_attendance(&subject.id, date, time).await? {
        MarkOutcome::Marked => Ok(ScanOutcome::Marked(subject)),
        MarkOutcome::AlreadyMarked => Ok(ScanOutcome::AlreadyMarked(subject)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    use crate::decode::BoundingBox;
    use crate::models::Subject;

    use super::*;

    fn temp_database() -> Database {
        let path = std::env::temp_dir().join(format!("rollcall-test-{}.sqlite3", Uuid::new_v4()));
        Database::new(path).expect("open temp database")
    }

    fn detection(payload: &str) -> Detection {
        Detection {
            payload: payload.to_string(),
            bounds: BoundingBox {
                x: 0,
                y: 0,
                w: 10,
                h: 10,
            },
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("valid timestamp")
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M:%S").expect("valid time")
    }

    async fn register(db: &Database, id: &str, payload: &str, class_name: &str) -> Subject {
        let subject = Subject {
            id: id.to_string(),
            name: format!("Subject {id}"),
            class_name: class_name.to_string(),
            section: "A".to_string(),
            code_payload: payload.to_string(),
            created_at: Utc::now(),
        };
        db.insert_subject(&subject).await.expect("insert subject");
        subject
    }

    #[tokio::test]
    async fn marked_then_suppressed_then_already_marked() {
        let db = temp_database();
        let s1 = register(&db, "s1", "PAY-1", "5").await;
        let mut gate = DebounceGate::new(Duration::seconds(3));
        let day = date("2024-01-10");

        // 09:00:00, first sight of the code
        let first = process_detection(&db, &mut gate, &detection("PAY-1"), at(0), day, time("09:00:00"))
            .await
            .expect("first scan");
        assert_eq!(first, ScanOutcome::Marked(s1.clone()));

        // 09:00:01, still inside the cooldown window
        let second = process_detection(&db, &mut gate, &detection("PAY-1"), at(1), day, time("09:00:01"))
            .await
            .expect("second scan");
        assert_eq!(second, ScanOutcome::Suppressed(s1.clone()));

        // 09:05:00, cooldown long expired; the ledger is what blocks now
        let third = process_detection(&db, &mut gate, &detection("PAY-1"), at(300), day, time("09:05:00"))
            .await
            .expect("third scan");
        assert_eq!(third, ScanOutcome::AlreadyMarked(s1));

        let count = db.attendance_count("s1", day).await.expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn ledger_dedup_survives_a_session_restart() {
        let db = temp_database();
        register(&db, "s1", "PAY-1", "5").await;
        let day = date("2024-01-10");

        let mut gate = DebounceGate::new(Duration::seconds(3));
        let first = process_detection(&db, &mut gate, &detection("PAY-1"), at(0), day, time("09:00:00"))
            .await
            .expect("first session scan");
        assert!(matches!(first, ScanOutcome::Marked(_)));

        // Fresh gate simulates a restarted session: the debounce map is
        // gone, the ledger guarantee is not.
        let mut restarted_gate = DebounceGate::new(Duration::seconds(3));
        let rescanned = process_detection(
            &db,
            &mut restarted_gate,
            &detection("PAY-1"),
            at(600),
            day,
            time("09:10:00"),
        )
        .await
        .expect("post-restart scan");
        assert!(matches!(rescanned, ScanOutcome::AlreadyMarked(_)));

        let count = db.attendance_count("s1", day).await.expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn unknown_payload_mutates_nothing() {
        let db = temp_database();
        register(&db, "s1", "PAY-1", "5").await;
        let mut gate = DebounceGate::new(Duration::seconds(3));
        let day = date("2024-01-10");

        let outcome = process_detection(&db, &mut gate, &detection("XYZ"), at(0), day, time("09:00:00"))
            .await
            .expect("unknown scan");
        assert_eq!(outcome, ScanOutcome::NotRecognized("XYZ".to_string()));
        assert_eq!(outcome.display_text(), "Code not recognized");

        // No debounce slot burned, no ledger row written.
        assert_eq!(gate.tracked_payloads(), 0);
        assert_eq!(db.attendance_count("s1", day).await.expect("count"), 0);
        assert!(db.attendance_for_date(day).await.expect("entries").is_empty());
    }
}
