//! `SQLite` task store.
//!
//! Mirrors the remote table: same column names, store-assigned ids and
//! timestamps, newest-first listing. Useful for development without a hosted
//! project and as a faithful table double in tests.

use crate::tasks::models::{Task, TaskId, TaskPatch};
use crate::tasks::store::{StoreError, StoreResult, TaskStore};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Special path that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

const SELECT_COLUMNS: &str = "SELECT id, todo, is_completed, created_at FROM tasks";

/// SQLite-based task store.
#[derive(Debug)]
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Open (or create) a task database at the given path.
    ///
    /// The path [`IN_MEMORY`] opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path = db_path.as_ref();
        if db_path == Path::new(IN_MEMORY) {
            return Self::in_memory();
        }

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(format!("cannot create {}: {e}", parent.display())))?;
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::with_connection(conn)
    }

    /// Create a store backed by a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                todo TEXT NOT NULL,
                is_completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);
            ",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Unavailable("task database lock poisoned".into()))
    }

    fn parse_task(row: &Row<'_>) -> rusqlite::Result<Task> {
        let id: i64 = row.get(0)?;
        let created_at: String = row.get(3)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
            })?
            .with_timezone(&Utc);

        Ok(Task {
            id: TaskId::from(id),
            text: row.get(1)?,
            is_completed: row.get(2)?,
            created_at,
        })
    }

    fn row_id(id: &TaskId) -> Option<i64> {
        id.as_str().parse().ok()
    }

    fn get(conn: &Connection, id: i64) -> StoreResult<Option<Task>> {
        Ok(conn
            .query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), params![id], Self::parse_task)
            .optional()?)
    }
}

/// Timestamps are stored with a fixed precision so that text order is time order.
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn list(&self) -> StoreResult<Vec<Task>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC"))?;
        let tasks = stmt.query_map([], Self::parse_task)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    async fn create(&self, text: &str) -> StoreResult<Task> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (todo, is_completed, created_at) VALUES (?1, 0, ?2)",
            params![text, now_timestamp()],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(id, "created task in sqlite store");

        Self::get(&conn, id)?.ok_or_else(|| StoreError::NotFound(TaskId::from(id)))
    }

    async fn update(&self, id: &TaskId, patch: &TaskPatch) -> StoreResult<Task> {
        let not_found = || StoreError::NotFound(id.clone());
        let row_id = Self::row_id(id).ok_or_else(not_found)?;
        let conn = self.lock()?;

        if !patch.is_empty() {
            let mut updates = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(ref text) = patch.text {
                updates.push("todo = ?");
                values.push(Box::new(text.clone()));
            }
            if let Some(is_completed) = patch.is_completed {
                updates.push("is_completed = ?");
                values.push(Box::new(is_completed));
            }
            values.push(Box::new(row_id));

            let sql = format!("UPDATE tasks SET {} WHERE id = ?", updates.join(", "));
            let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(AsRef::as_ref).collect();
            if conn.execute(&sql, params.as_slice())? == 0 {
                return Err(not_found());
            }
        }

        Self::get(&conn, row_id)?.ok_or_else(not_found)
    }

    async fn delete(&self, id: &TaskId) -> StoreResult<bool> {
        let Some(row_id) = Self::row_id(id) else {
            return Ok(false);
        };
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM tasks WHERE id = ?1", params![row_id])? > 0)
    }
}
