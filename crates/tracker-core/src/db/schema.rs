//! `SQLite` schema for the issue store.
//!
//! - `projects` holds one row per project name (`UNIQUE`, so get-or-create
//!   is a single upsert)
//! - `issues` holds the issue records, each pointing at its project
//!
//! There is no version ladder. Every statement is `IF NOT EXISTS`, so the
//! batch runs on each open and only fills in what is missing.

use rusqlite::Connection;

/// Tables and list-path indexes.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS projects (
    project_id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_on_ms INTEGER NOT NULL,
    CHECK (length(project_id) = 24)
);

CREATE TABLE IF NOT EXISTS issues (
    issue_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(project_id) ON DELETE RESTRICT,
    issue_title TEXT NOT NULL,
    issue_text TEXT NOT NULL,
    created_by TEXT NOT NULL,
    assigned_to TEXT NOT NULL DEFAULT '',
    status_text TEXT NOT NULL DEFAULT '',
    is_open INTEGER NOT NULL DEFAULT 1 CHECK (is_open IN (0, 1)),
    created_on_ms INTEGER NOT NULL,
    updated_on_ms INTEGER NOT NULL,
    CHECK (length(issue_id) = 24)
);

CREATE INDEX IF NOT EXISTS idx_issues_project_created
    ON issues(project_id, created_on_ms);

CREATE INDEX IF NOT EXISTS idx_issues_project_open
    ON issues(project_id, is_open);
";

/// Indexes expected by the list path.
pub const REQUIRED_INDEXES: &[&str] = &["idx_issues_project_created", "idx_issues_project_open"];

/// Create whatever tables and indexes are missing.
///
/// # Errors
///
/// Returns an error if any statement in the batch fails.
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    tracing::debug!("store schema in place");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{REQUIRED_INDEXES, ensure_schema};
    use rusqlite::{Connection, params};

    fn sqlite_object_exists(
        conn: &Connection,
        object_type: &str,
        object_name: &str,
    ) -> rusqlite::Result<bool> {
        conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            )",
            params![object_type, object_name],
            |row| row.get(0),
        )
    }

    #[test]
    fn empty_db_gets_tables_and_indexes() -> rusqlite::Result<()> {
        let conn = Connection::open_in_memory()?;
        ensure_schema(&conn)?;

        assert!(sqlite_object_exists(&conn, "table", "projects")?);
        assert!(sqlite_object_exists(&conn, "table", "issues")?);
        for index in REQUIRED_INDEXES {
            assert!(
                sqlite_object_exists(&conn, "index", index)?,
                "missing expected index {index}"
            );
        }

        let user_version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        assert_eq!(user_version, 0);
        Ok(())
    }

    #[test]
    fn reapplying_keeps_rows() -> rusqlite::Result<()> {
        let conn = Connection::open_in_memory()?;
        ensure_schema(&conn)?;
        conn.execute(
            "INSERT INTO projects (project_id, name, created_on_ms)
             VALUES ('65a1c0de0123456789abcdef', 'apitest', 1)",
            [],
        )?;

        ensure_schema(&conn)?;

        let projects: i64 = conn.query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?;
        assert_eq!(projects, 1);
        Ok(())
    }

    #[test]
    fn project_names_are_unique() -> rusqlite::Result<()> {
        let conn = Connection::open_in_memory()?;
        ensure_schema(&conn)?;

        conn.execute(
            "INSERT INTO projects (project_id, name, created_on_ms)
             VALUES ('65a1c0de0123456789abcdef', 'apitest', 1)",
            [],
        )?;
        let dup = conn.execute(
            "INSERT INTO projects (project_id, name, created_on_ms)
             VALUES ('65a1c0de0123456789abcdee', 'apitest', 2)",
            [],
        );
        assert!(dup.is_err());
        Ok(())
    }
}
