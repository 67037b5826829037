//! SQLite-based session storage.
//!
//! Provides persistent storage for:
//! - Focus and break sessions (complete and incomplete)
//! - The per-day aggregate derived from them
//!
//! The store owns no lifecycle state; it is a stateless translator over
//! the durable session collection.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::error::{CoreError, Result, StorageError};
use crate::session::{DailyAggregate, Session, SessionType};

use super::data_dir;

/// Default number of sessions returned by [`SessionStore::recent_sessions`].
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// SQLite store for session records.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    /// Open the store at `<data-dir>/focusdaily.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("focusdaily.db");
        Self::open_at(path)
    }

    /// Open the store at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory store, primarily for tests.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StorageError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source: e,
        })?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS sessions (
                    id              TEXT PRIMARY KEY,
                    session_type    TEXT NOT NULL,
                    start_time      TEXT NOT NULL,
                    end_time        TEXT,
                    planned_seconds INTEGER NOT NULL,
                    completed       INTEGER NOT NULL DEFAULT 0,
                    created_at      TEXT NOT NULL,
                    updated_at      TEXT NOT NULL
                );

                -- Create indexes for common query patterns
                CREATE INDEX IF NOT EXISTS idx_sessions_created_at ON sessions(created_at);
                CREATE INDEX IF NOT EXISTS idx_sessions_session_type ON sessions(session_type);",
            )
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    /// Insert a new incomplete session and return it.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn create_session(
        &self,
        session_type: SessionType,
        planned_seconds: u32,
    ) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            session_type,
            start_time: now,
            end_time: None,
            planned_seconds,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        self.conn.execute(
            "INSERT INTO sessions (id, session_type, start_time, end_time,
                                   planned_seconds, completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                session.id,
                session.session_type.as_str(),
                session.start_time.to_rfc3339(),
                Option::<String>::None,
                session.planned_seconds,
                session.completed,
                session.created_at.to_rfc3339(),
                session.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(session)
    }

    /// Mark a session completed, stamping its end time, and return the
    /// record read back from storage.
    ///
    /// Re-invocation on an already-completed session re-stamps
    /// `end_time` and `updated_at`.
    ///
    /// # Errors
    /// Returns `CoreError::NotFound` if no session has the given id.
    pub fn mark_completed(&self, id: &str) -> Result<Session> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE sessions SET completed = 1, end_time = ?1, updated_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        if changed == 0 {
            return Err(CoreError::NotFound { id: id.to_string() });
        }
        self.get_session(id)
    }

    /// Fetch a session by id.
    ///
    /// # Errors
    /// Returns `CoreError::NotFound` if no session has the given id.
    pub fn get_session(&self, id: &str) -> Result<Session> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_type, start_time, end_time,
                    planned_seconds, completed, created_at, updated_at
             FROM sessions WHERE id = ?1",
        )?;
        match stmt.query_row(params![id], row_to_session) {
            Ok(session) => Ok(session),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(CoreError::NotFound {
                id: id.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// The most recently created sessions, newest first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_type, start_time, end_time,
                    planned_seconds, completed, created_at, updated_at
             FROM sessions ORDER BY created_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_session)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    /// Delete a session. Deleting an absent id is not an error.
    pub fn delete_session(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Aggregate the sessions created on the given local calendar day.
    ///
    /// Focus sessions count whether or not they completed; only completed
    /// ones contribute their planned seconds to `total_focus_seconds`.
    /// Break sessions of either kind feed `break_count` regardless of
    /// completion.
    pub fn daily_aggregate(&self, date: NaiveDate) -> Result<DailyAggregate> {
        let day = date.format("%Y-%m-%d").to_string();
        let mut stmt = self.conn.prepare(
            "SELECT session_type, COUNT(*),
                    COALESCE(SUM(CASE WHEN completed = 1 THEN planned_seconds ELSE 0 END), 0)
             FROM sessions
             WHERE date(created_at, 'localtime') = ?1
             GROUP BY session_type",
        )?;

        let mut aggregate = DailyAggregate::default();
        let rows = stmt.query_map(params![day], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u64>(2)?,
            ))
        })?;

        for row in rows {
            let (session_type, count, completed_seconds) = row?;
            match session_type.as_str() {
                "Focus" => {
                    aggregate.focus_count += count;
                    aggregate.total_focus_seconds += completed_seconds;
                }
                "LongBreak" | "MicroBreak" => {
                    aggregate.break_count += count;
                }
                _ => {}
            }
        }
        Ok(aggregate)
    }
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    let session_type: String = row.get(1)?;
    let start_time: String = row.get(2)?;
    let end_time: Option<String> = row.get(3)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(Session {
        id: row.get(0)?,
        session_type: SessionType::parse(&session_type),
        start_time: parse_datetime(&start_time),
        end_time: end_time.as_deref().map(parse_datetime),
        planned_seconds: row.get(4)?,
        completed: row.get(5)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

/// Parse an RFC 3339 timestamp, falling back to now for malformed values.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use proptest::prelude::*;

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    #[test]
    fn create_and_get() {
        let store = SessionStore::open_memory().unwrap();
        let created = store.create_session(SessionType::Focus, 5400).unwrap();
        let fetched = store.get_session(&created.id).unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.session_type, SessionType::Focus);
        assert_eq!(fetched.planned_seconds, 5400);
        assert!(!fetched.completed);
        assert!(fetched.end_time.is_none());
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let store = SessionStore::open_memory().unwrap();
        let err = store.get_session("no-such-id").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn mark_completed_stamps_end_time() {
        let store = SessionStore::open_memory().unwrap();
        let created = store.create_session(SessionType::LongBreak, 1200).unwrap();
        let completed = store.mark_completed(&created.id).unwrap();
        assert!(completed.completed);
        assert!(completed.end_time.is_some());
        assert!(completed.updated_at >= completed.created_at);
    }

    #[test]
    fn mark_completed_unknown_id_is_not_found() {
        let store = SessionStore::open_memory().unwrap();
        let err = store.mark_completed("no-such-id").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn completed_iff_end_time_present() {
        let store = SessionStore::open_memory().unwrap();
        let created = store.create_session(SessionType::Focus, 60).unwrap();
        assert_eq!(created.completed, created.end_time.is_some());
        let completed = store.mark_completed(&created.id).unwrap();
        assert_eq!(completed.completed, completed.end_time.is_some());
    }

    #[test]
    fn recent_sessions_newest_first_and_bounded() {
        let store = SessionStore::open_memory().unwrap();
        let mut last_id = String::new();
        for _ in 0..12 {
            last_id = store.create_session(SessionType::Focus, 60).unwrap().id;
        }
        let recent = store.recent_sessions(DEFAULT_RECENT_LIMIT).unwrap();
        assert_eq!(recent.len(), DEFAULT_RECENT_LIMIT);
        assert_eq!(recent[0].id, last_id);
        for pair in recent.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
    }

    #[test]
    fn delete_is_idempotent() {
        let store = SessionStore::open_memory().unwrap();
        let created = store.create_session(SessionType::MicroBreak, 15).unwrap();
        store.delete_session(&created.id).unwrap();
        store.delete_session(&created.id).unwrap();
        store.delete_session("never-existed").unwrap();
        assert!(matches!(
            store.get_session(&created.id),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn aggregate_counts_incomplete_focus_without_their_time() {
        let store = SessionStore::open_memory().unwrap();
        let done = store.create_session(SessionType::Focus, 5400).unwrap();
        store.mark_completed(&done.id).unwrap();
        store.create_session(SessionType::Focus, 1800).unwrap();

        let aggregate = store.daily_aggregate(today()).unwrap();
        assert_eq!(aggregate.focus_count, 2);
        assert_eq!(aggregate.total_focus_seconds, 5400);
        assert_eq!(aggregate.break_count, 0);
    }

    #[test]
    fn aggregate_counts_breaks_regardless_of_completion() {
        let store = SessionStore::open_memory().unwrap();
        let done = store.create_session(SessionType::LongBreak, 1200).unwrap();
        store.mark_completed(&done.id).unwrap();
        store.create_session(SessionType::MicroBreak, 15).unwrap();

        let aggregate = store.daily_aggregate(today()).unwrap();
        assert_eq!(aggregate.focus_count, 0);
        assert_eq!(aggregate.break_count, 2);
        assert_eq!(aggregate.total_focus_seconds, 0);
    }

    #[test]
    fn aggregate_for_another_day_is_empty() {
        let store = SessionStore::open_memory().unwrap();
        let done = store.create_session(SessionType::Focus, 60).unwrap();
        store.mark_completed(&done.id).unwrap();

        let far_away = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        assert_eq!(store.daily_aggregate(far_away).unwrap(), DailyAggregate::default());
    }

    proptest! {
        #[test]
        fn aggregate_matches_manual_sum(
            specs in prop::collection::vec((0u8..3, 1u32..7200, any::<bool>()), 0..40)
        ) {
            let store = SessionStore::open_memory().unwrap();
            let mut expected = DailyAggregate::default();
            for (kind, seconds, complete) in specs {
                let session_type = match kind {
                    0 => SessionType::Focus,
                    1 => SessionType::LongBreak,
                    _ => SessionType::MicroBreak,
                };
                let session = store.create_session(session_type, seconds).unwrap();
                if complete {
                    store.mark_completed(&session.id).unwrap();
                }
                match session_type {
                    SessionType::Focus => {
                        expected.focus_count += 1;
                        if complete {
                            expected.total_focus_seconds += seconds as u64;
                        }
                    }
                    SessionType::LongBreak | SessionType::MicroBreak => {
                        expected.break_count += 1;
                    }
                }
            }
            let aggregate = store.daily_aggregate(Local::now().date_naive()).unwrap();
            prop_assert_eq!(aggregate, expected);
        }
    }
}
