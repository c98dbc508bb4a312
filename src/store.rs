use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::Serialize;
use tracing::{info, warn};

use crate::model::{StudentAnswerRecord, UploadReport};
use crate::util::now_utc_string;

pub const DB_SCHEMA_VERSION: &str = "1.0.0";

/// How hard to try before giving up on opening the store. Delays grow as
/// `base_delay * 2^attempt`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl ConnectPolicy {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn open(&self, path: &Path) -> Result<Store> {
        let mut attempt = 0_u32;
        loop {
            match Store::open(path) {
                Ok(store) => return Ok(store),
                Err(err) if attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        path = %path.display(),
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "store open failed; retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => {
                    return Err(err.context(format!(
                        "failed to open store after {} attempts",
                        attempt + 1
                    )));
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentListing {
    pub student_code: String,
    pub student_name: Option<String>,
    pub total_score: Option<f64>,
    pub subject_count: i64,
    pub source_document: String,
    pub uploaded_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreCounts {
    pub students: i64,
    pub uploads: i64,
    pub schema_version: Option<String>,
    pub last_upload_at: Option<String>,
}

pub struct Store {
    connection: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            crate::util::ensure_directory(parent)?;
        }
        let connection = Connection::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        configure_connection(&connection)?;
        ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    pub fn open_read_only(path: &Path) -> Result<Self> {
        let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("failed to open {} read-only", path.display()))?;
        Ok(Self { connection })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory().context("failed to open in-memory store")?;
        ensure_schema(&connection)?;
        Ok(Self { connection })
    }

    /// Inserts or fully replaces one row per student code in a single
    /// transaction.
    pub fn upsert_records(&mut self, records: &[StudentAnswerRecord]) -> Result<usize> {
        let tx = self
            .connection
            .transaction()
            .context("failed to start upsert transaction")?;
        {
            let mut statement = tx.prepare(
                "
                INSERT INTO students(
                  student_code, student_name, total_score, total_questions,
                  correct_answers, wrong_answers, subject_count, source_document,
                  sheet_name, pdf_page_number, uploaded_at, record_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(student_code) DO UPDATE SET
                  student_name=excluded.student_name,
                  total_score=excluded.total_score,
                  total_questions=excluded.total_questions,
                  correct_answers=excluded.correct_answers,
                  wrong_answers=excluded.wrong_answers,
                  subject_count=excluded.subject_count,
                  source_document=excluded.source_document,
                  sheet_name=excluded.sheet_name,
                  pdf_page_number=excluded.pdf_page_number,
                  uploaded_at=excluded.uploaded_at,
                  record_json=excluded.record_json
                ",
            )?;

            for record in records {
                let record_json = serde_json::to_string(record).with_context(|| {
                    format!("failed to serialize student {}", record.student_code)
                })?;
                statement
                    .execute(params![
                        record.student_code,
                        record.student_name,
                        record.total_score,
                        record.total_questions,
                        record.correct_answers,
                        record.wrong_answers,
                        record.subjects.len() as i64,
                        record.source_document,
                        record.sheet_name,
                        record.pdf_page_number,
                        record.uploaded_at,
                        record_json,
                    ])
                    .with_context(|| format!("failed to upsert student {}", record.student_code))?;
            }
        }
        tx.commit().context("failed to commit upsert transaction")?;

        info!(students = records.len(), "upserted student records");
        Ok(records.len())
    }

    pub fn record_upload(&self, report: &UploadReport) -> Result<()> {
        self.connection
            .execute(
                "
                INSERT INTO uploads(
                  upload_id, source_document, source_sha256, document_kind,
                  students_processed, students_failed, segments_failed, uploaded_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(upload_id) DO UPDATE SET
                  students_processed=excluded.students_processed,
                  students_failed=excluded.students_failed,
                  segments_failed=excluded.segments_failed
                ",
                params![
                    report.upload_id,
                    report.source_document,
                    report.source_sha256,
                    report.document_kind.as_str(),
                    report.counts.students_processed as i64,
                    report.counts.students_failed as i64,
                    report.counts.segments_failed as i64,
                    report.started_at,
                ],
            )
            .with_context(|| format!("failed to record upload {}", report.upload_id))?;
        Ok(())
    }

    pub fn load_student(&self, student_code: &str) -> Result<Option<StudentAnswerRecord>> {
        let raw: Option<String> = self
            .connection
            .query_row(
                "SELECT record_json FROM students WHERE student_code = ?1",
                [student_code],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("failed to load student {student_code}"))?;

        raw.map(|raw| {
            serde_json::from_str::<StudentAnswerRecord>(&raw)
                .with_context(|| format!("failed to parse stored record for {student_code}"))
        })
        .transpose()
    }

    pub fn list_students(&self, limit: usize) -> Result<Vec<StudentListing>> {
        let mut statement = self.connection.prepare(
            "
            SELECT student_code, student_name, total_score, subject_count,
                   source_document, uploaded_at
            FROM students
            ORDER BY uploaded_at DESC, student_code ASC
            LIMIT ?1
            ",
        )?;
        let rows = statement.query_map([limit as i64], |row| {
            Ok(StudentListing {
                student_code: row.get(0)?,
                student_name: row.get(1)?,
                total_score: row.get(2)?,
                subject_count: row.get(3)?,
                source_document: row.get(4)?,
                uploaded_at: row.get(5)?,
            })
        })?;

        let mut listings = Vec::new();
        for row in rows {
            listings.push(row.context("failed to read student listing row")?);
        }
        Ok(listings)
    }

    pub fn counts(&self) -> Result<StoreCounts> {
        Ok(StoreCounts {
            students: count_rows(&self.connection, "SELECT COUNT(*) FROM students")?,
            uploads: count_rows(&self.connection, "SELECT COUNT(*) FROM uploads")?,
            schema_version: self
                .connection
                .query_row(
                    "SELECT value FROM metadata WHERE key = 'db_schema_version'",
                    [],
                    |row| row.get(0),
                )
                .optional()?,
            last_upload_at: self
                .connection
                .query_row("SELECT MAX(uploaded_at) FROM uploads", [], |row| row.get(0))
                .optional()?
                .flatten(),
        })
    }
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .busy_timeout(Duration::from_secs(5))
        .context("failed to set busy timeout")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS students (
              student_code TEXT PRIMARY KEY,
              student_name TEXT,
              total_score REAL,
              total_questions INTEGER NOT NULL,
              correct_answers INTEGER NOT NULL,
              wrong_answers INTEGER NOT NULL,
              subject_count INTEGER NOT NULL,
              source_document TEXT NOT NULL,
              sheet_name TEXT,
              pdf_page_number INTEGER,
              uploaded_at TEXT NOT NULL,
              record_json TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS uploads (
              upload_id TEXT PRIMARY KEY,
              source_document TEXT NOT NULL,
              source_sha256 TEXT NOT NULL,
              document_kind TEXT NOT NULL,
              students_processed INTEGER NOT NULL,
              students_failed INTEGER NOT NULL,
              segments_failed INTEGER NOT NULL,
              uploaded_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_students_uploaded_at ON students(uploaded_at);
            ",
        )
        .context("failed to initialize store schema")?;

    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now_utc_string()],
    )?;

    Ok(())
}

fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
