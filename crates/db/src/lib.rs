//! SQLite connection handle for the bookstore service.
//!
//! A [`Database`] owns a single `rusqlite` connection behind a mutex. All
//! statements run on tokio's blocking pool through [`Database::call`], so
//! async handlers never block the runtime while SQLite does I/O.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use rusqlite::{self, params, Connection, OptionalExtension, Row};
use rusqlite::{ErrorCode, OpenFlags};
use thiserror::Error;

/// Path value that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Errors raised by the database layer.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid database path: {0}")]
    InvalidPath(String),

    #[error("database connection lock poisoned")]
    Poisoned,

    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl DbError {
    /// True when SQLite rejected a statement because of a UNIQUE, PRIMARY KEY,
    /// NOT NULL or CHECK constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
        )
    }

    /// True only for PRIMARY KEY and UNIQUE violations, i.e. a duplicate key.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

/// Idempotent DDL contributed by a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaDefinition {
    pub id: &'static str,
    pub ddl: &'static str,
}

/// Cloneable handle to the service database.
#[derive(Debug, Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
    location: Arc<str>,
}

impl Database {
    /// Open (or create) the database file at `path`.
    ///
    /// The special path `:memory:` opens a private in-memory database instead.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, DbError> {
        let path = path.as_ref();
        if path == Path::new(IN_MEMORY) {
            return Self::in_memory();
        }
        validate_path(path)?;

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(path, flags)?;
        connection.execute_batch("PRAGMA foreign_keys = ON;")?;
        connection.execute_batch("PRAGMA journal_mode = WAL;")?;
        connection.busy_timeout(busy_timeout)?;

        tracing::info!(target: "bookstore-db", path = %path.display(), "database opened");
        Ok(Self::from_connection(connection, path.display().to_string()))
    }

    /// Open a private in-memory database. Every call yields an isolated store.
    pub fn in_memory() -> Result<Self, DbError> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self::from_connection(connection, IN_MEMORY.to_string()))
    }

    fn from_connection(connection: Connection, location: String) -> Self {
        Self {
            connection: Arc::new(Mutex::new(connection)),
            location: location.into(),
        }
    }

    /// Where this database lives: a file path or `:memory:`.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Run `f` against the connection on the blocking thread pool.
    pub async fn call<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let mut guard = connection.lock().map_err(|_| DbError::Poisoned)?;
            f(&mut guard).map_err(DbError::from)
        })
        .await?
    }

    /// Round-trip a trivial query to prove the connection is usable.
    pub async fn ping(&self) -> Result<(), DbError> {
        self.call(|connection| connection.query_row("SELECT 1", [], |row| row.get::<_, i64>(0)))
            .await
            .map(|_| ())
    }

    /// Apply module DDL inside a single transaction.
    ///
    /// Definitions must be idempotent (`CREATE TABLE IF NOT EXISTS ...`); they
    /// run on every startup and nothing records which ones already ran.
    pub async fn ensure_schema(
        &self,
        definitions: Vec<(&'static str, SchemaDefinition)>,
    ) -> Result<usize, DbError> {
        let applied = definitions.len();
        self.call(move |connection| {
            let tx = connection.transaction()?;
            for (module, definition) in &definitions {
                tracing::debug!(
                    target: "bookstore-db",
                    module = %module,
                    schema = definition.id,
                    "applying schema definition"
                );
                tx.execute_batch(definition.ddl)?;
            }
            tx.commit()
        })
        .await?;
        Ok(applied)
    }
}

fn validate_path(path: &Path) -> Result<(), DbError> {
    if path.as_os_str().is_empty() {
        return Err(DbError::InvalidPath("path is empty".to_string()));
    }
    if path.is_dir() {
        return Err(DbError::InvalidPath(format!(
            "{} is a directory",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const NOTES: SchemaDefinition = SchemaDefinition {
        id: "001_notes",
        ddl: "CREATE TABLE IF NOT EXISTS notes (id TEXT PRIMARY KEY, body TEXT NOT NULL);",
    };

    #[tokio::test]
    async fn in_memory_database_answers_ping() {
        let db = Database::in_memory().unwrap();
        db.ping().await.unwrap();
        assert_eq!(db.location(), IN_MEMORY);
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.ensure_schema(vec![("notes", NOTES)]).await.unwrap(), 1);
        assert_eq!(db.ensure_schema(vec![("notes", NOTES)]).await.unwrap(), 1);

        let tables: i64 = db
            .call(|c| {
                c.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'notes'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[tokio::test]
    async fn duplicate_primary_key_is_a_constraint_violation() {
        let db = Database::in_memory().unwrap();
        db.ensure_schema(vec![("notes", NOTES)]).await.unwrap();

        let insert = |db: Database| async move {
            db.call(|c| c.execute("INSERT INTO notes (id, body) VALUES ('a', 'x')", []))
                .await
        };
        insert(db.clone()).await.unwrap();
        let err = insert(db.clone()).await.unwrap_err();
        assert!(err.is_constraint_violation(), "unexpected error: {err}");
        assert!(err.is_unique_violation(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn not_null_failure_is_not_a_unique_violation() {
        let db = Database::in_memory().unwrap();
        db.ensure_schema(vec![("notes", NOTES)]).await.unwrap();

        let err = db
            .call(|c| c.execute("INSERT INTO notes (id, body) VALUES ('a', NULL)", []))
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());
        assert!(!err.is_unique_violation());
    }

    #[tokio::test]
    async fn syntax_errors_are_not_constraint_violations() {
        let db = Database::in_memory().unwrap();
        let err = db
            .call(|c| c.execute("INSERT INTO nowhere VALUES (1)", []))
            .await
            .unwrap_err();
        assert!(!err.is_constraint_violation());
    }

    #[test]
    fn open_rejects_directory_path() {
        let dir = TempDir::new().unwrap();
        let err = Database::open(dir.path(), Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, DbError::InvalidPath(_)));
    }

    #[test]
    fn open_rejects_empty_path() {
        let err = Database::open("", Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, DbError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn file_database_persists_between_handles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.db");

        let first = Database::open(&path, Duration::from_millis(500)).unwrap();
        first.ensure_schema(vec![("notes", NOTES)]).await.unwrap();
        first
            .call(|c| c.execute("INSERT INTO notes (id, body) VALUES ('k', 'kept')", []))
            .await
            .unwrap();
        drop(first);

        let second = Database::open(&path, Duration::from_millis(500)).unwrap();
        let body: String = second
            .call(|c| c.query_row("SELECT body FROM notes WHERE id = 'k'", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(body, "kept");
    }
}
