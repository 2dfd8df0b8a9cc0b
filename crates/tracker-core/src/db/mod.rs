//! `SQLite`-backed record store.
//!
//! Runtime defaults are conservative:
//! - `journal_mode = WAL` to allow concurrent readers while writers append
//! - `busy_timeout = 5s` to reduce transient lock failures under contention
//! - `foreign_keys = ON` so an issue can never point at a missing project

pub mod query;
pub mod schema;

use crate::config::DatabaseUri;
use crate::error::StoreError;
use crate::model::{Issue, IssueFilter, IssuePatch, NewIssue, Project, RecordId, issue::now_millis};
use crate::store::RecordStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (or create) the store database file, apply runtime pragmas, and
/// create any missing tables.
///
/// # Errors
///
/// Returns an error if opening, configuring or creating the schema fails.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }

    let conn =
        Connection::open(path).with_context(|| format!("open store database {}", path.display()))?;

    configure_connection(&conn).context("configure sqlite pragmas")?;
    schema::ensure_schema(&conn).context("create store schema")?;

    Ok(conn)
}

/// Open a private in-memory database with the same schema.
///
/// # Errors
///
/// Returns an error if configuring the connection or creating the schema fails.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory store")?;
    configure_connection(&conn).context("configure sqlite pragmas")?;
    schema::ensure_schema(&conn).context("create store schema")?;
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    Ok(())
}

/// [`RecordStore`] over a single `SQLite` connection.
///
/// The connection is guarded by a mutex; each trait call holds the lock for
/// the duration of one short statement or transaction.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the store named by `uri`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or its schema created.
    pub fn open(uri: &DatabaseUri) -> Result<Self> {
        let conn = match uri {
            DatabaseUri::Memory => open_in_memory()?,
            DatabaseUri::File(path) => open_database(path)?,
        };
        tracing::info!(%uri, "opened record store");
        Ok(Self::from_connection(conn))
    }

    /// Fresh in-memory store, mostly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_connection(open_in_memory()?))
    }

    /// Wrap a connection that already carries the schema.
    #[must_use]
    pub const fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn with_conn<R>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut guard = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&mut guard)
    }
}

impl RecordStore for SqliteStore {
    fn find_project(&self, name: &str) -> Result<Option<Project>, StoreError> {
        self.with_conn(|conn| query::get_project_by_name(conn, name))
    }

    fn get_or_create_project(&self, name: &str) -> Result<Project, StoreError> {
        self.with_conn(|conn| query::upsert_project(conn, name, now_millis()))
    }

    fn find_issues(
        &self,
        project: &RecordId,
        filter: &IssueFilter,
    ) -> Result<Vec<Issue>, StoreError> {
        self.with_conn(|conn| query::list_issues(conn, project, filter))
    }

    fn insert_issue(&self, issue: &NewIssue) -> Result<Issue, StoreError> {
        self.with_conn(|conn| query::insert_issue(conn, issue))
    }

    fn update_issue(
        &self,
        id: &RecordId,
        patch: &IssuePatch,
        updated_on: DateTime<Utc>,
    ) -> Result<Option<Issue>, StoreError> {
        self.with_conn(|conn| query::update_issue(conn, id, patch, updated_on))
    }

    fn delete_issue(&self, id: &RecordId) -> Result<Option<Issue>, StoreError> {
        self.with_conn(|conn| query::delete_issue(conn, id))
    }
}
