//! SQLite-backed publish journal.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::journal::{JournalEntry, JournalError, PublishJournal, PublishStatus};

/// SQLite-backed publish journal.
pub struct SqlitePublishJournal {
    conn: Mutex<Connection>,
}

impl SqlitePublishJournal {
    /// Open the journal, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, JournalError> {
        let conn = Connection::open(path).map_err(|e| JournalError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory journal (useful for testing).
    pub fn in_memory() -> Result<Self, JournalError> {
        let conn =
            Connection::open_in_memory().map_err(|e| JournalError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JournalError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS publish_journal (
                filename TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                container_id TEXT,
                post_id TEXT,
                content_hash TEXT,
                run_id TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| JournalError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, JournalError> {
        self.conn
            .lock()
            .map_err(|_| JournalError::Database("journal connection poisoned".to_string()))
    }
}

/// A journal row before its status and timestamp are parsed.
struct RawEntry {
    filename: String,
    status: String,
    container_id: Option<String>,
    post_id: Option<String>,
    content_hash: Option<String>,
    run_id: String,
    updated_at: String,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            filename: row.get(0)?,
            status: row.get(1)?,
            container_id: row.get(2)?,
            post_id: row.get(3)?,
            content_hash: row.get(4)?,
            run_id: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_entry(self) -> Result<JournalEntry, JournalError> {
        let status = self
            .status
            .parse::<PublishStatus>()
            .map_err(|reason| JournalError::Corrupt {
                filename: self.filename.clone(),
                reason,
            })?;
        let updated_at = DateTime::parse_from_rfc3339(&self.updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| JournalError::Corrupt {
                filename: self.filename.clone(),
                reason: e.to_string(),
            })?;

        Ok(JournalEntry {
            filename: self.filename,
            status,
            container_id: self.container_id,
            post_id: self.post_id,
            content_hash: self.content_hash,
            run_id: self.run_id,
            updated_at,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT filename, status, container_id, post_id, content_hash, run_id, updated_at FROM publish_journal";

impl PublishJournal for SqlitePublishJournal {
    fn get(&self, filename: &str) -> Result<Option<JournalEntry>, JournalError> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                &format!("{} WHERE filename = ?1", SELECT_COLUMNS),
                params![filename],
                RawEntry::from_row,
            )
            .optional()
            .map_err(|e| JournalError::Database(e.to_string()))?;

        raw.map(RawEntry::into_entry).transpose()
    }

    fn record(&self, entry: &JournalEntry) -> Result<(), JournalError> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO publish_journal
                (filename, status, container_id, post_id, content_hash, run_id, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(filename) DO UPDATE SET
                status = excluded.status,
                container_id = COALESCE(excluded.container_id, publish_journal.container_id),
                post_id = COALESCE(excluded.post_id, publish_journal.post_id),
                content_hash = COALESCE(excluded.content_hash, publish_journal.content_hash),
                run_id = excluded.run_id,
                updated_at = excluded.updated_at
            "#,
            params![
                entry.filename,
                entry.status.as_str(),
                entry.container_id,
                entry.post_id,
                entry.content_hash,
                entry.run_id,
                entry.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| JournalError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_and_get() {
        let journal = SqlitePublishJournal::in_memory().unwrap();
        assert!(journal.get("a.png").unwrap().is_none());

        let entry = JournalEntry::new("a.png", PublishStatus::ContainerCreated, "run-1")
            .with_container("c-1")
            .with_content_hash(Some("hash-a".to_string()));
        journal.record(&entry).unwrap();

        let stored = journal.get("a.png").unwrap().unwrap();
        assert_eq!(stored.status, PublishStatus::ContainerCreated);
        assert_eq!(stored.container_id.as_deref(), Some("c-1"));
        assert_eq!(stored.content_hash.as_deref(), Some("hash-a"));
        assert_eq!(stored.run_id, "run-1");
    }

    #[test]
    fn test_upsert_keeps_earlier_fields() {
        let journal = SqlitePublishJournal::in_memory().unwrap();
        journal
            .record(
                &JournalEntry::new("a.png", PublishStatus::ContainerCreated, "run-1")
                    .with_container("c-1")
                    .with_content_hash(Some("hash-a".to_string())),
            )
            .unwrap();
        journal
            .record(&JournalEntry::new("a.png", PublishStatus::Published, "run-1").with_post("p-1"))
            .unwrap();

        let stored = journal.get("a.png").unwrap().unwrap();
        assert_eq!(stored.status, PublishStatus::Published);
        assert_eq!(stored.container_id.as_deref(), Some("c-1"));
        assert_eq!(stored.post_id.as_deref(), Some("p-1"));
        assert_eq!(stored.content_hash.as_deref(), Some("hash-a"));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.db");

        {
            let journal = SqlitePublishJournal::new(&path).unwrap();
            journal
                .record(&JournalEntry::new("a.png", PublishStatus::Moved, "run-1"))
                .unwrap();
        }

        let journal = SqlitePublishJournal::new(&path).unwrap();
        let stored = journal.get("a.png").unwrap().unwrap();
        assert_eq!(stored.status, PublishStatus::Moved);
    }

    #[test]
    fn test_corrupt_status_is_reported() {
        let journal = SqlitePublishJournal::in_memory().unwrap();
        journal
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO publish_journal (filename, status, run_id, updated_at) VALUES ('x.png', 'bogus', 'r', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();

        let err = journal.get("x.png").unwrap_err();
        assert!(matches!(err, JournalError::Corrupt { .. }));
    }
}
