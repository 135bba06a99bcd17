use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::SenbetsuError;
use crate::health::{SourceStatus, StatusStore, MAX_ESCALATION_LEVEL};
use crate::models::{ReleaseMarker, SourceId};

const SCHEMA_V1: &str = include_str!("../../../migrations/001_source_status.sql");

/// SQLite-backed [`StatusStore`], so quarantines survive restarts.
pub struct SqliteStatusStore {
    conn: Mutex<Connection>,
}

impl SqliteStatusStore {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, SenbetsuError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, SenbetsuError> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatusStore for SqliteStatusStore {
    fn get(&self, source_id: SourceId) -> Result<Option<SourceStatus>, SenbetsuError> {
        self.conn()
            .query_row(
                "SELECT source_id, escalation_level, initial_failure, most_recent_failure,
                 disabled_until, last_continuous_sync, last_sync_marker
                 FROM source_status WHERE source_id = ?1",
                params![source_id],
                |row| Ok(row_to_status(row)),
            )
            .optional()
            .map_err(Into::into)
    }

    fn upsert(&self, status: &SourceStatus) -> Result<(), SenbetsuError> {
        let marker_json = status
            .last_sync_marker
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn().execute(
            "INSERT INTO source_status (source_id, escalation_level, initial_failure,
             most_recent_failure, disabled_until, last_continuous_sync, last_sync_marker)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(source_id) DO UPDATE SET
                escalation_level = excluded.escalation_level,
                initial_failure = excluded.initial_failure,
                most_recent_failure = excluded.most_recent_failure,
                disabled_until = excluded.disabled_until,
                last_continuous_sync = excluded.last_continuous_sync,
                last_sync_marker = excluded.last_sync_marker",
            params![
                status.source_id,
                status.escalation_level,
                status.initial_failure.map(|dt| dt.to_rfc3339()),
                status.most_recent_failure.map(|dt| dt.to_rfc3339()),
                status.disabled_until.map(|dt| dt.to_rfc3339()),
                status.last_continuous_sync.map(|dt| dt.to_rfc3339()),
                marker_json,
            ],
        )?;
        Ok(())
    }

    fn all(&self) -> Result<Vec<SourceStatus>, SenbetsuError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT source_id, escalation_level, initial_failure, most_recent_failure,
             disabled_until, last_continuous_sync, last_sync_marker
             FROM source_status ORDER BY source_id",
        )?;
        let rows = stmt
            .query_map([], |row| Ok(row_to_status(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }
}

// ── Migrations ──────────────────────────────────────────────────

/// Run schema migrations using `PRAGMA user_version` for version tracking.
fn run_migrations(conn: &Connection) -> Result<(), SenbetsuError> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite's datetime('now') produces "YYYY-MM-DD HH:MM:SS".
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

fn get_datetime(row: &rusqlite::Row<'_>, idx: usize) -> Option<DateTime<Utc>> {
    row.get::<_, Option<String>>(idx)
        .ok()
        .flatten()
        .and_then(|s| parse_datetime(&s))
}

// ── Row mapping helpers ─────────────────────────────────────────

fn row_to_status(row: &rusqlite::Row<'_>) -> SourceStatus {
    let marker_str: Option<String> = row.get(6).unwrap_or_default();
    let last_sync_marker: Option<ReleaseMarker> =
        marker_str.and_then(|s| serde_json::from_str(&s).ok());

    SourceStatus {
        source_id: row.get(0).unwrap_or(0),
        escalation_level: row
            .get::<_, u32>(1)
            .unwrap_or(0)
            .min(MAX_ESCALATION_LEVEL),
        initial_failure: get_datetime(row, 2),
        most_recent_failure: get_datetime(row, 3),
        disabled_until: get_datetime(row, 4),
        last_continuous_sync: get_datetime(row, 5),
        last_sync_marker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{TimeDelta, TimeZone};

    use crate::clock::ManualClock;
    use crate::health::SourceHealthTracker;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_get_missing_status() {
        let db = SqliteStatusStore::open_memory().unwrap();
        assert!(db.get(1).unwrap().is_none());
        assert!(db.all().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_and_get() {
        let db = SqliteStatusStore::open_memory().unwrap();
        let mut status = SourceStatus::new(3);
        status.escalation_level = 2;
        status.initial_failure = Some(now());
        status.most_recent_failure = Some(now() + TimeDelta::minutes(5));
        status.disabled_until = Some(now() + TimeDelta::minutes(20));
        status.last_sync_marker = Some(ReleaseMarker {
            guid: Some("guid-1".into()),
            title: "Show.S01E02.1080p".into(),
            publish_date: now(),
        });
        db.upsert(&status).unwrap();

        assert_eq!(db.get(3).unwrap(), Some(status.clone()));

        status.escalation_level = 1;
        status.disabled_until = None;
        db.upsert(&status).unwrap();
        let loaded = db.get(3).unwrap().unwrap();
        assert_eq!(loaded.escalation_level, 1);
        assert_eq!(loaded.disabled_until, None);
        assert_eq!(db.all().unwrap().len(), 1);
    }

    #[test]
    fn test_all_ordered_by_source() {
        let db = SqliteStatusStore::open_memory().unwrap();
        for id in [5, 1, 3] {
            db.upsert(&SourceStatus::new(id)).unwrap();
        }
        let ids: Vec<SourceId> = db.all().unwrap().into_iter().map(|s| s.source_id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    #[test]
    fn test_sqlite_datetime_format() {
        assert_eq!(
            parse_datetime("2024-05-01 12:00:00"),
            Some(now())
        );
        assert_eq!(parse_datetime("not a date"), None);
    }

    #[test]
    fn test_quarantine_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("senbetsu.db");
        let clock = ManualClock::new(now());

        {
            let store = Arc::new(SqliteStatusStore::open(&path).unwrap());
            let tracker = SourceHealthTracker::with_clock(store, Arc::new(clock.clone()));
            tracker.record_failure(9, None).unwrap();
            tracker.record_failure(9, None).unwrap();
        }

        let store = Arc::new(SqliteStatusStore::open(&path).unwrap());
        let tracker = SourceHealthTracker::with_clock(store, Arc::new(clock));
        assert!(tracker.is_blocked(9));
        assert_eq!(tracker.status(9).unwrap().escalation_level, 2);
    }
}
