// SQLite persistence layer for draft state and the pick audit log.

use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use snakedraft_core::draft::Pick;
use snakedraft_core::DraftStore;

/// Key under which the engine's state blob is stored.
pub const DRAFT_STATE_KEY: &str = "draft";

/// Kind of a row in the `draft_events` audit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    PickCommitted,
    PickUndone,
}

impl EventKind {
    fn as_str(&self) -> &'static str {
        match self {
            EventKind::PickCommitted => "pick_committed",
            EventKind::PickUndone => "pick_undone",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "pick_committed" => Some(EventKind::PickCommitted),
            "pick_undone" => Some(EventKind::PickUndone),
            _ => None,
        }
    }
}

/// One audit row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftEvent {
    pub kind: EventKind,
    pub pick_number: u32,
    pub participant: String,
    pub item_name: String,
    pub group_label: String,
    /// Written by SQLite at insert time.
    pub timestamp: String,
}

/// SQLite-backed persistence for the draft state blob and the append-only
/// pick audit log.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS draft_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS draft_events (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                draft_id    TEXT NOT NULL,
                event       TEXT NOT NULL,
                pick_number INTEGER NOT NULL,
                participant TEXT NOT NULL,
                item_name   TEXT NOT NULL,
                group_label TEXT NOT NULL,
                timestamp   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_draft_events_draft_id ON draft_events(draft_id);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database mutex poisoned"))
    }

    /// Persist an arbitrary JSON value under `key`. Uses INSERT OR REPLACE so
    /// repeated saves overwrite the previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn()?;
        let json_str =
            serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO draft_state (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load a previously saved JSON value by `key`. Returns `None` if the key
    /// does not exist.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT value FROM draft_state WHERE key = ?1")
            .context("failed to prepare load_state query")?;

        let mut rows = stmt
            .query_map(params![key], |row| row.get::<_, String>(0))
            .context("failed to query draft state")?;

        match rows.next() {
            Some(row_result) => {
                let json_str = row_result.context("failed to read state row")?;
                let value: serde_json::Value = serde_json::from_str(&json_str)
                    .context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Append a pick event to the audit log.
    pub fn record_event(&self, draft_id: &str, kind: EventKind, pick: &Pick) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO draft_events
                (draft_id, event, pick_number, participant, item_name, group_label)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                draft_id,
                kind.as_str(),
                pick.pick_number,
                pick.participant,
                pick.item_name,
                pick.group_label,
            ],
        )
        .context("failed to record draft event")?;
        Ok(())
    }

    /// Audit rows for one draft, oldest first.
    pub fn load_events(&self, draft_id: &str) -> Result<Vec<DraftEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT event, pick_number, participant, item_name, group_label, timestamp
                 FROM draft_events WHERE draft_id = ?1 ORDER BY id",
            )
            .context("failed to prepare load_events query")?;

        let rows = stmt
            .query_map(params![draft_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    DraftEvent {
                        kind: EventKind::PickCommitted,
                        pick_number: row.get(1)?,
                        participant: row.get(2)?,
                        item_name: row.get(3)?,
                        group_label: row.get(4)?,
                        timestamp: row.get(5)?,
                    },
                ))
            })
            .context("failed to query draft events")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map draft event rows")?;

        rows.into_iter()
            .map(|(event, mut row)| {
                row.kind = EventKind::parse(&event)
                    .with_context(|| format!("unknown draft event kind {event:?}"))?;
                Ok(row)
            })
            .collect()
    }
}

impl DraftStore for Database {
    fn load_blob(&self) -> Result<Option<serde_json::Value>> {
        self.load_state(DRAFT_STATE_KEY)
    }

    fn save_blob(&self, blob: &serde_json::Value) -> Result<()> {
        self.save_state(DRAFT_STATE_KEY, blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use snakedraft_core::Category;

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn sample_pick(pick_number: u32) -> Pick {
        Pick {
            participant: "u1".into(),
            item_name: format!("Player {pick_number}"),
            group_label: "DET".into(),
            category: Category::WideReceiver,
            pick_number,
            round: 1,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn().unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"draft_state".to_string()));
        assert!(tables.contains(&"draft_events".to_string()));
    }

    #[test]
    fn save_and_load_state_round_trip() {
        let db = test_db();
        let value = json!({"current_pick": 3, "base_order": ["a", "b"]});

        db.save_state("draft", &value).unwrap();
        assert_eq!(db.load_state("draft").unwrap(), Some(value));
    }

    #[test]
    fn load_state_returns_none_for_missing_key() {
        let db = test_db();
        assert!(db.load_state("nonexistent").unwrap().is_none());
    }

    #[test]
    fn save_state_overwrites_previous_value() {
        let db = test_db();
        db.save_state("key", &json!(1)).unwrap();
        db.save_state("key", &json!(2)).unwrap();
        assert_eq!(db.load_state("key").unwrap(), Some(json!(2)));
    }

    #[test]
    fn draft_store_uses_draft_key() {
        let db = test_db();
        assert!(db.load_blob().unwrap().is_none());

        db.save_blob(&json!({"is_active": true})).unwrap();
        assert_eq!(
            db.load_state(DRAFT_STATE_KEY).unwrap(),
            Some(json!({"is_active": true}))
        );
    }

    #[test]
    fn events_round_trip_in_order() {
        let db = test_db();
        db.record_event("d1", EventKind::PickCommitted, &sample_pick(1))
            .unwrap();
        db.record_event("d1", EventKind::PickCommitted, &sample_pick(2))
            .unwrap();
        db.record_event("d1", EventKind::PickUndone, &sample_pick(2))
            .unwrap();
        db.record_event("other", EventKind::PickCommitted, &sample_pick(1))
            .unwrap();

        let events = db.load_events("d1").unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].pick_number, 1);
        assert_eq!(events[2].kind, EventKind::PickUndone);
        assert_eq!(events[2].item_name, "Player 2");
        assert!(events[0].timestamp.contains('T'));
    }

    #[test]
    fn file_database_survives_reopen() {
        let path = std::env::temp_dir().join("snakedraft_db_reopen.db");
        let _ = std::fs::remove_file(&path);
        let path_str = path.to_str().unwrap();
        {
            let db = Database::open(path_str).unwrap();
            db.save_blob(&json!({"draft_id": "draft_x"})).unwrap();
        }
        let db = Database::open(path_str).unwrap();
        assert_eq!(db.load_blob().unwrap(), Some(json!({"draft_id": "draft_x"})));

        drop(db);
        let _ = std::fs::remove_file(&path);
    }
}
