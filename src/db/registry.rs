use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Error as SqlError, ErrorCode, Row};

use crate::db::{helpers::parse_datetime, Database};
use crate::models::Subject;

fn row_to_subject(row: &Row) -> Result<Subject> {
    let created_at: String = row.get("created_at")?;

    Ok(Subject {
        id: row.get("id")?,
        name: row.get("name")?,
        class_name: row.get("class_name")?,
        section: row.get("section")?,
        code_payload: row.get("code_payload")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    pub async fn insert_subject(&self, subject: &Subject) -> Result<()> {
        let record = subject.clone();
        self.execute(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO subjects (id, name, class_name, section, code_payload, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.name,
                    record.class_name,
                    record.section,
                    record.code_payload,
                    record.created_at.to_rfc3339(),
                ],
            );

            match inserted {
                Ok(_) => Ok(()),
                // Only the code_payload unique index gets the friendly
                // message; an id collision is a caller bug and keeps the
                // raw constraint error.
                Err(SqlError::SqliteFailure(err, Some(ref msg)))
                    if err.code == ErrorCode::ConstraintViolation
                        && msg.contains("code_payload") =>
                {
                    Err(anyhow!(
                        "code payload '{}' is already registered",
                        record.code_payload
                    ))
                }
                Err(err) => Err(err).context("failed to insert subject"),
            }
        })
        .await
    }

    /// Resolve a decoded payload to its subject. An unknown payload is a
    /// normal outcome, so it comes back as `None`, not an error.
    pub async fn find_subject_by_payload(&self, payload: &str) -> Result<Option<Subject>> {
        let payload = payload.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, class_name, section, code_payload, created_at
                 FROM subjects
                 WHERE code_payload = ?1",
            )?;

            let mut rows = stmt.query(params![payload])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_subject(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    pub async fn list_subjects(&self) -> Result<Vec<Subject>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, class_name, section, code_payload, created_at
                 FROM subjects
                 ORDER BY class_name, section, name",
            )?;

            let mut rows = stmt.query([])?;
            let mut subjects = Vec::new();
            while let Some(row) = rows.next()? {
                subjects.push(row_to_subject(row)?);
            }

            Ok(subjects)
        })
        .await
    }
}
