//! SQLite-based store backend.
//!
//! Provides persistent storage for:
//! - Per-item learning progress
//! - Study session summaries
//! - The manual review list
//!
//! Timestamps are stored as fixed-width RFC 3339 text (UTC, nanoseconds) so
//! that string order matches time order in range queries.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    check_session_patch, validate_review_entry, ProgressStore, ReviewListStore, SessionStore,
};
use crate::error::StoreError;
use crate::models::{ProgressRecord, ReviewListEntry, SessionPatch, SessionSummary, StudyMode};

/// SQLite database implementing every store trait.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    ///
    /// # Errors
    /// Returns `Unavailable` if the file cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("connection lock poisoned: {e}")))
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS progress (
                user_id              TEXT NOT NULL,
                item_id              TEXT NOT NULL,
                mastery_level        REAL NOT NULL,
                study_count          INTEGER NOT NULL,
                correct_count        INTEGER NOT NULL,
                incorrect_count      INTEGER NOT NULL,
                ease_factor          REAL NOT NULL,
                review_interval_days INTEGER NOT NULL,
                next_review_at       TEXT,
                is_favorite          INTEGER NOT NULL DEFAULT 0,
                last_studied         TEXT,
                updated_at           TEXT NOT NULL,
                PRIMARY KEY (user_id, item_id)
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL,
                mode            TEXT NOT NULL,
                category        TEXT NOT NULL DEFAULT '',
                total_items     INTEGER NOT NULL,
                completed_items INTEGER NOT NULL,
                correct_answers INTEGER NOT NULL,
                start_time      TEXT NOT NULL,
                end_time        TEXT
            );

            CREATE TABLE IF NOT EXISTS review_list (
                user_id        TEXT NOT NULL,
                item_id        TEXT NOT NULL,
                review_count   INTEGER NOT NULL DEFAULT 0,
                added_at       TEXT NOT NULL,
                last_reviewed  TEXT,
                next_review_at TEXT,
                PRIMARY KEY (user_id, item_id)
            );

            -- Create indexes for common query patterns
            CREATE INDEX IF NOT EXISTS idx_progress_user_next_review
                ON progress(user_id, next_review_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_user_start ON sessions(user_id, start_time);
            CREATE INDEX IF NOT EXISTS idx_review_list_user_added
                ON review_list(user_id, added_at);",
        )?;
        Ok(())
    }
}

fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn opt_ts(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(ts)
}

fn parse_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|raw| parse_ts(idx, raw)).transpose()
}

const PROGRESS_COLUMNS: &str = "user_id, item_id, mastery_level, study_count, correct_count,
     incorrect_count, ease_factor, review_interval_days, next_review_at, is_favorite, last_studied";

fn progress_from_row(row: &Row<'_>) -> rusqlite::Result<ProgressRecord> {
    Ok(ProgressRecord {
        user_id: row.get(0)?,
        item_id: row.get(1)?,
        mastery_level: row.get(2)?,
        study_count: row.get(3)?,
        correct_count: row.get(4)?,
        incorrect_count: row.get(5)?,
        ease_factor: row.get(6)?,
        review_interval_days: row.get(7)?,
        next_review_at: parse_opt_ts(8, row.get(8)?)?,
        is_favorite: row.get(9)?,
        last_studied: parse_opt_ts(10, row.get(10)?)?,
    })
}

const SESSION_COLUMNS: &str = "id, user_id, mode, category, total_items, completed_items, \
    correct_answers, start_time, end_time";

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<SessionSummary> {
    let mode: String = row.get(2)?;
    let mode = mode.parse::<StudyMode>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::<dyn std::error::Error + Send + Sync>::from(e),
        )
    })?;
    Ok(SessionSummary {
        id: row.get(0)?,
        user_id: row.get(1)?,
        mode,
        category: row.get(3)?,
        total_items: row.get(4)?,
        completed_items: row.get(5)?,
        correct_answers: row.get(6)?,
        start_time: parse_ts(7, row.get(7)?)?,
        end_time: parse_opt_ts(8, row.get(8)?)?,
    })
}

const REVIEW_COLUMNS: &str =
    "user_id, item_id, review_count, added_at, last_reviewed, next_review_at";

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<ReviewListEntry> {
    Ok(ReviewListEntry {
        user_id: row.get(0)?,
        item_id: row.get(1)?,
        review_count: row.get(2)?,
        added_at: parse_ts(3, row.get(3)?)?,
        last_reviewed: parse_opt_ts(4, row.get(4)?)?,
        next_review_at: parse_opt_ts(5, row.get(5)?)?,
    })
}

impl ProgressStore for SqliteStore {
    fn get_progress(
        &self,
        user_id: &str,
        item_id: &str,
    ) -> Result<Option<ProgressRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = ?1 AND item_id = ?2"
        ))?;
        Ok(stmt
            .query_row(params![user_id, item_id], progress_from_row)
            .optional()?)
    }

    fn put_progress(&self, record: &ProgressRecord) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO progress (
                user_id, item_id, mastery_level, study_count, correct_count, incorrect_count,
                ease_factor, review_interval_days, next_review_at, is_favorite, last_studied,
                updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(user_id, item_id) DO UPDATE SET
                mastery_level = excluded.mastery_level,
                study_count = excluded.study_count,
                correct_count = excluded.correct_count,
                incorrect_count = excluded.incorrect_count,
                ease_factor = excluded.ease_factor,
                review_interval_days = excluded.review_interval_days,
                next_review_at = excluded.next_review_at,
                is_favorite = excluded.is_favorite,
                last_studied = excluded.last_studied,
                updated_at = excluded.updated_at",
            params![
                record.user_id,
                record.item_id,
                record.mastery_level,
                record.study_count,
                record.correct_count,
                record.incorrect_count,
                record.ease_factor,
                record.review_interval_days,
                opt_ts(record.next_review_at),
                record.is_favorite,
                opt_ts(record.last_studied),
                ts(Utc::now()),
            ],
        )?;
        Ok(())
    }

    fn list_progress(&self, user_id: &str) -> Result<Vec<ProgressRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = ?1"
        ))?;
        let rows = stmt.query_map(params![user_id], progress_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl SessionStore for SqliteStore {
    fn create_session(&self, summary: &SessionSummary) -> Result<String, StoreError> {
        let conn = self.conn()?;
        let exists = conn
            .query_row(
                "SELECT 1 FROM sessions WHERE id = ?1",
                params![summary.id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if exists {
            return Err(StoreError::validation(
                "session_id",
                format!("session '{}' already exists", summary.id),
            ));
        }
        conn.execute(
            &format!(
                "INSERT INTO sessions ({SESSION_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
            ),
            params![
                summary.id,
                summary.user_id,
                summary.mode.as_str(),
                summary.category,
                summary.total_items,
                summary.completed_items,
                summary.correct_answers,
                ts(summary.start_time),
                opt_ts(summary.end_time),
            ],
        )?;
        Ok(summary.id.clone())
    }

    fn get_session(&self, session_id: &str) -> Result<Option<SessionSummary>, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"))?;
        Ok(stmt.query_row(params![session_id], session_from_row).optional()?)
    }

    fn update_session(&self, session_id: &str, patch: &SessionPatch) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut session = {
            let mut stmt =
                tx.prepare(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"))?;
            stmt.query_row(params![session_id], session_from_row)
                .optional()?
                .ok_or_else(|| StoreError::not_found("session", session_id))?
        };
        check_session_patch(&session)?;
        session.apply(patch);
        tx.execute(
            "UPDATE sessions
             SET total_items = ?2, completed_items = ?3, correct_answers = ?4, end_time = ?5
             WHERE id = ?1",
            params![
                session.id,
                session.total_items,
                session.completed_items,
                session.correct_answers,
                opt_ts(session.end_time),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn list_sessions(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        let conn = self.conn()?;
        let sessions = match since {
            Some(since) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE user_id = ?1 AND start_time >= ?2
                     ORDER BY start_time"
                ))?;
                let rows = stmt.query_map(params![user_id, ts(since)], session_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ?1 ORDER BY start_time"
                ))?;
                let rows = stmt.query_map(params![user_id], session_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(sessions)
    }
}

impl ReviewListStore for SqliteStore {
    fn get_review_entry(
        &self,
        user_id: &str,
        item_id: &str,
    ) -> Result<Option<ReviewListEntry>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM review_list WHERE user_id = ?1 AND item_id = ?2"
        ))?;
        Ok(stmt
            .query_row(params![user_id, item_id], review_from_row)
            .optional()?)
    }

    fn upsert_review_entry(&self, entry: &ReviewListEntry) -> Result<(), StoreError> {
        validate_review_entry(entry)?;
        self.conn()?.execute(
            &format!(
                "INSERT OR REPLACE INTO review_list ({REVIEW_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ),
            params![
                entry.user_id,
                entry.item_id,
                entry.review_count,
                ts(entry.added_at),
                opt_ts(entry.last_reviewed),
                opt_ts(entry.next_review_at),
            ],
        )?;
        Ok(())
    }

    fn remove_review_entry(&self, user_id: &str, item_id: &str) -> Result<bool, StoreError> {
        let removed = self.conn()?.execute(
            "DELETE FROM review_list WHERE user_id = ?1 AND item_id = ?2",
            params![user_id, item_id],
        )?;
        Ok(removed > 0)
    }

    fn list_review_entries(&self, user_id: &str) -> Result<Vec<ReviewListEntry>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM review_list WHERE user_id = ?1 ORDER BY added_at, item_id"
        ))?;
        let rows = stmt.query_map(params![user_id], review_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample_session(id: &str, start: DateTime<Utc>) -> SessionSummary {
        SessionSummary {
            id: id.into(),
            user_id: "u1".into(),
            mode: StudyMode::Review,
            category: "food".into(),
            total_items: 8,
            completed_items: 0,
            correct_answers: 0,
            start_time: start,
            end_time: None,
        }
    }

    #[test]
    fn progress_round_trip_and_upsert() {
        let store = SqliteStore::open_memory().unwrap();
        let studied = Utc.with_ymd_and_hms(2024, 7, 1, 12, 30, 15).unwrap()
            + Duration::nanoseconds(123_456_789);
        let mut record = ProgressRecord::new("u1", "word-42");
        record.mastery_level = 0.3;
        record.study_count = 4;
        record.correct_count = 3;
        record.incorrect_count = 1;
        record.ease_factor = 2.46;
        record.review_interval_days = 6;
        record.last_studied = Some(studied);
        record.next_review_at = Some(studied + Duration::days(6));
        store.put_progress(&record).unwrap();
        assert_eq!(store.get_progress("u1", "word-42").unwrap(), Some(record.clone()));

        record.is_favorite = true;
        store.put_progress(&record).unwrap();
        let all = store.list_progress("u1").unwrap();
        assert_eq!(all, vec![record]);
        assert!(store.get_progress("u1", "other").unwrap().is_none());
    }

    #[test]
    fn session_lifecycle() {
        let store = SqliteStore::open_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap();
        store.create_session(&sample_session("s1", start)).unwrap();
        store
            .create_session(&sample_session("s0", start - Duration::days(3)))
            .unwrap();

        store
            .update_session(
                "s1",
                &SessionPatch {
                    completed_items: Some(8),
                    correct_answers: Some(6),
                    end_time: Some(start + Duration::minutes(9)),
                    ..Default::default()
                },
            )
            .unwrap();
        let finished = store.get_session("s1").unwrap().unwrap();
        assert_eq!(finished.correct_answers, 6);
        assert_eq!(finished.duration_minutes(), 9);

        assert!(store
            .update_session("s1", &SessionPatch::default())
            .unwrap_err()
            .is_validation());

        let ids: Vec<String> = store
            .list_sessions("u1", None)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["s0", "s1"]);
        assert_eq!(
            store
                .list_sessions("u1", Some(start - Duration::days(1)))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn review_list_round_trip() {
        let store = SqliteStore::open_memory().unwrap();
        let added = Utc.with_ymd_and_hms(2024, 7, 1, 8, 0, 0).unwrap();
        let mut entry = ReviewListEntry::new("u1", "ubiquitous", added);
        store.upsert_review_entry(&entry).unwrap();

        entry.review_count = 1;
        entry.last_reviewed = Some(added + Duration::hours(3));
        store.upsert_review_entry(&entry).unwrap();

        assert_eq!(store.list_review_entries("u1").unwrap(), vec![entry]);
        assert!(store.remove_review_entry("u1", "ubiquitous").unwrap());
        assert!(store.list_review_entries("u1").unwrap().is_empty());
    }

    #[test]
    fn file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.put_progress(&ProgressRecord::new("u1", "kept")).unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert!(reopened.get_progress("u1", "kept").unwrap().is_some());
    }
}
