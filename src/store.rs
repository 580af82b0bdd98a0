use crate::config::Identity;
use crate::history::{AttemptRecord, RoundRecord, SavedRound};
use crate::problem::{Operation, ProblemError};
use chrono::{DateTime, Local, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<ProblemError> for StoreError {
    fn from(e: ProblemError) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Where finished rounds are kept for one signed-in user
pub trait HistoryStore {
    /// Most recent rounds first, attempts included
    fn fetch_recent(&self, limit: usize) -> Result<Vec<SavedRound>>;
    fn save(&mut self, record: &RoundRecord) -> Result<SavedRound>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    name TEXT,
    image TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    duration INTEGER NOT NULL,
    time_taken INTEGER NOT NULL,
    difficulty TEXT NOT NULL,
    mode TEXT NOT NULL,
    operations TEXT NOT NULL,
    correct INTEGER NOT NULL,
    attempted INTEGER NOT NULL,
    score INTEGER NOT NULL,
    accuracy INTEGER NOT NULL,
    pace REAL NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_user_created ON history(user_id, created_at);

CREATE TABLE IF NOT EXISTS problem_attempts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    history_id INTEGER NOT NULL REFERENCES history(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    prompt TEXT NOT NULL,
    answer INTEGER NOT NULL,
    user_answer INTEGER NOT NULL,
    operation TEXT NOT NULL,
    is_correct BOOLEAN NOT NULL,
    time_taken INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_problem_attempts_history ON problem_attempts(history_id);
"#;

/// SQLite history for a single identity
#[derive(Debug)]
pub struct HistoryDb {
    conn: Connection,
    user_id: i64,
}

impl HistoryDb {
    /// Open (creating if needed) the database at `path` and sign `identity` in
    pub fn open<P: AsRef<Path>>(path: P, identity: &Identity) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(2))?;
        Self::init(conn, identity)
    }

    pub fn open_in_memory(identity: &Identity) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, identity)
    }

    fn init(conn: Connection, identity: &Identity) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        let user_id = sign_in(&conn, identity)?;
        Ok(Self { conn, user_id })
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    fn fetch_attempts(&self, history_id: i64) -> Result<Vec<AttemptRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT prompt, answer, user_answer, operation, is_correct, time_taken
            FROM problem_attempts
            WHERE history_id = ?1
            ORDER BY position
            "#,
        )?;

        let rows = stmt.query_map([history_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, u32>(5)?,
            ))
        })?;

        let mut attempts = Vec::new();
        for row in rows {
            let (prompt, answer, user_answer, category, is_correct, time_taken_secs) = row?;
            attempts.push(AttemptRecord {
                prompt,
                answer,
                user_answer,
                category: category.parse()?,
                is_correct,
                time_taken_secs,
            });
        }
        Ok(attempts)
    }
}

/// Find the user row for `identity`, creating it on first sign-in
fn sign_in(conn: &Connection, identity: &Identity) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE email = ?1",
            [&identity.email],
            |row| row.get(0),
        )
        .optional()?;

    let user_id = match existing {
        Some(id) => {
            conn.execute(
                "UPDATE users SET name = COALESCE(?2, name), image = COALESCE(?3, image) WHERE id = ?1",
                params![id, identity.name, identity.image],
            )?;
            id
        }
        None => {
            conn.execute(
                "INSERT INTO users (email, name, image) VALUES (?1, ?2, ?3)",
                params![identity.email, identity.name, identity.image],
            )?;
            tracing::info!(email = %identity.email, "created user");
            conn.last_insert_rowid()
        }
    };
    Ok(user_id)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Local>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Local))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{s}': {e}")))
}

fn parse_operations(s: &str) -> Result<Vec<Operation>> {
    serde_json::from_str(s).map_err(|e| StoreError::Corrupt(format!("bad operations '{s}': {e}")))
}

impl HistoryStore for HistoryDb {
    fn fetch_recent(&self, limit: usize) -> Result<Vec<SavedRound>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, duration, time_taken, difficulty, mode, operations,
                   correct, attempted, score, accuracy, pace, created_at
            FROM history
            WHERE user_id = ?1
            ORDER BY julianday(created_at) DESC, id DESC
            LIMIT ?2
            "#,
        )?;

        let rows = stmt.query_map(params![self.user_id, limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, u32>(6)?,
                row.get::<_, u32>(7)?,
                row.get::<_, u32>(8)?,
                row.get::<_, u32>(9)?,
                row.get::<_, f64>(10)?,
                row.get::<_, String>(11)?,
            ))
        })?;

        let mut rounds = Vec::new();
        for row in rows {
            let (
                id,
                duration_secs,
                time_taken_secs,
                difficulty,
                mode,
                operations,
                correct,
                attempted,
                score,
                accuracy,
                pace,
                created_at,
            ) = row?;

            let record = RoundRecord {
                duration_secs,
                time_taken_secs,
                difficulty: difficulty.parse()?,
                mode: mode.parse().map_err(StoreError::Corrupt)?,
                operations: parse_operations(&operations)?,
                correct,
                attempted,
                score,
                accuracy,
                pace,
                attempts: self.fetch_attempts(id)?,
                created_at: parse_timestamp(&created_at)?,
            };
            rounds.push(SavedRound { id, record });
        }
        Ok(rounds)
    }

    fn save(&mut self, record: &RoundRecord) -> Result<SavedRound> {
        let operations = serde_json::to_string(&record.operations)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO history
            (user_id, duration, time_taken, difficulty, mode, operations,
             correct, attempted, score, accuracy, pace, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                self.user_id,
                record.duration_secs,
                record.time_taken_secs,
                record.difficulty.to_string(),
                record.mode.to_string(),
                operations,
                record.correct,
                record.attempted,
                record.score,
                record.accuracy,
                record.pace,
                record.created_at.with_timezone(&Utc).to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        for (position, attempt) in record.attempts.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO problem_attempts
                (history_id, position, prompt, answer, user_answer, operation, is_correct, time_taken)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    id,
                    position as i64,
                    attempt.prompt,
                    attempt.answer,
                    attempt.user_answer,
                    attempt.category.to_string(),
                    attempt.is_correct,
                    attempt.time_taken_secs,
                ],
            )?;
        }
        tx.commit()?;

        tracing::debug!(id, attempts = record.attempts.len(), "saved round");
        Ok(SavedRound {
            id,
            record: record.clone(),
        })
    }
}
