//! `SQLite` query helpers for the issue store.
//!
//! Free functions over a `&Connection` (or `&mut Connection` where a
//! transaction is needed) returning typed records, never raw rows.

use crate::error::StoreError;
use crate::model::{FilterValue, Issue, IssueFilter, IssuePatch, NewIssue, Project, RecordId};
use chrono::{DateTime, Utc};
use rusqlite::types::{ToSql, Type};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params, params_from_iter};

const ISSUE_COLUMNS: &str = "issue_id, project_id, issue_title, issue_text, created_by, \
                             assigned_to, status_text, is_open, created_on_ms, updated_on_ms";

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Fetch a project by exact name.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_project_by_name(conn: &Connection, name: &str) -> Result<Option<Project>, StoreError> {
    let project = conn
        .query_row(
            "SELECT project_id, name, created_on_ms FROM projects WHERE name = ?1",
            params![name],
            row_to_project,
        )
        .optional()?;
    Ok(project)
}

/// Insert-if-absent on the unique `name` column, then read back whichever
/// row won. Both statements share one immediate transaction, so a second
/// writer waits on the busy timeout instead of racing the read-back.
///
/// # Errors
///
/// Returns an error if the upsert or the read-back fails.
pub fn upsert_project(
    conn: &mut Connection,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Project, StoreError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let inserted = tx.execute(
        "INSERT INTO projects (project_id, name, created_on_ms) VALUES (?1, ?2, ?3) \
         ON CONFLICT(name) DO NOTHING",
        params![RecordId::generate_at(now), name, now.timestamp_millis()],
    )?;
    let project = tx.query_row(
        "SELECT project_id, name, created_on_ms FROM projects WHERE name = ?1",
        params![name],
        row_to_project,
    )?;
    tx.commit()?;

    if inserted > 0 {
        tracing::info!(project = name, id = %project.id, "created project");
    }
    Ok(project)
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// Fetch a single issue by id.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_issue(conn: &Connection, id: &RecordId) -> Result<Option<Issue>, StoreError> {
    let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE issue_id = ?1");
    let issue = conn.query_row(&sql, params![id], row_to_issue).optional()?;
    Ok(issue)
}

/// List the issues of `project` matching every predicate in `filter`, in
/// creation order. An unsatisfiable filter returns no rows without querying.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_issues(
    conn: &Connection,
    project: &RecordId,
    filter: &IssueFilter,
) -> Result<Vec<Issue>, StoreError> {
    if filter.is_unsatisfiable() {
        return Ok(Vec::new());
    }

    let mut conditions = vec!["project_id = ?1".to_string()];
    let mut param_values: Vec<Box<dyn ToSql>> = vec![Box::new(project.clone())];

    for predicate in filter.predicates() {
        param_values.push(filter_param(&predicate.value));
        conditions.push(format!(
            "{} = ?{}",
            predicate.field.column(),
            param_values.len()
        ));
    }

    let sql = format!(
        "SELECT {ISSUE_COLUMNS} FROM issues WHERE {} ORDER BY created_on_ms ASC, rowid ASC",
        conditions.join(" AND ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_ref: Vec<&dyn ToSql> = param_values.iter().map(AsRef::as_ref).collect();
    let rows = stmt.query_map(params_from_iter(params_ref), row_to_issue)?;

    let mut issues = Vec::new();
    for row in rows {
        issues.push(row?);
    }
    Ok(issues)
}

/// Insert a new issue under a freshly generated id and return the stored row.
///
/// # Errors
///
/// Returns an error if the insert fails (for example, the project does not
/// exist) or the row cannot be read back.
pub fn insert_issue(conn: &Connection, issue: &NewIssue) -> Result<Issue, StoreError> {
    let id = RecordId::generate_at(issue.created_on);
    let stamp = issue.created_on.timestamp_millis();

    conn.execute(
        "INSERT INTO issues (issue_id, project_id, issue_title, issue_text, created_by, \
         assigned_to, status_text, is_open, created_on_ms, updated_on_ms) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)",
        params![
            id,
            issue.project_id,
            issue.issue_title,
            issue.issue_text,
            issue.created_by,
            issue.assigned_to,
            issue.status_text,
            stamp
        ],
    )?;

    get_issue(conn, &id)?
        .ok_or_else(|| StoreError::Corrupt(format!("issue {id} missing after insert")))
}

/// Merge `patch` into the stored issue and stamp `updated_on`.
///
/// Returns `None` when no issue has this id.
///
/// # Errors
///
/// Returns an error if the read or the write fails.
pub fn update_issue(
    conn: &mut Connection,
    id: &RecordId,
    patch: &IssuePatch,
    updated_on: DateTime<Utc>,
) -> Result<Option<Issue>, StoreError> {
    let tx = conn.transaction()?;
    let Some(mut issue) = get_issue(&tx, id)? else {
        return Ok(None);
    };

    patch.apply_to(&mut issue);
    issue.updated_on = updated_on;

    tx.execute(
        "UPDATE issues SET issue_title = ?2, issue_text = ?3, created_by = ?4, \
         assigned_to = ?5, status_text = ?6, is_open = ?7, updated_on_ms = ?8 \
         WHERE issue_id = ?1",
        params![
            id,
            issue.issue_title,
            issue.issue_text,
            issue.created_by,
            issue.assigned_to,
            issue.status_text,
            i64::from(issue.open),
            updated_on.timestamp_millis()
        ],
    )?;
    tx.commit()?;

    Ok(Some(issue))
}

/// Delete an issue, returning the row as it was.
///
/// Returns `None` when no issue has this id.
///
/// # Errors
///
/// Returns an error if the read or the delete fails.
pub fn delete_issue(conn: &mut Connection, id: &RecordId) -> Result<Option<Issue>, StoreError> {
    let tx = conn.transaction()?;
    let Some(issue) = get_issue(&tx, id)? else {
        return Ok(None);
    };

    tx.execute("DELETE FROM issues WHERE issue_id = ?1", params![id])?;
    tx.commit()?;

    Ok(Some(issue))
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn filter_param(value: &FilterValue) -> Box<dyn ToSql> {
    match value {
        FilterValue::Id(id) => Box::new(id.clone()),
        FilterValue::Text(text) => Box::new(text.clone()),
        FilterValue::Flag(flag) => Box::new(i64::from(*flag)),
        FilterValue::Timestamp(at) => Box::new(at.timestamp_millis()),
    }
}

fn millis_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {ms}").into(),
        )
    })
}

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        created_on: millis_column(row, 2)?,
    })
}

fn row_to_issue(row: &rusqlite::Row<'_>) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: row.get(0)?,
        project_id: row.get(1)?,
        issue_title: row.get(2)?,
        issue_text: row.get(3)?,
        created_by: row.get(4)?,
        assigned_to: row.get(5)?,
        status_text: row.get(6)?,
        open: row.get::<_, i64>(7)? != 0,
        created_on: millis_column(row, 8)?,
        updated_on: millis_column(row, 9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;
    use crate::model::IssueField;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).expect("valid millis")
    }

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.pragma_update(None, "foreign_keys", "ON")
            .expect("enable foreign keys");
        schema::ensure_schema(&conn).expect("create schema");
        conn
    }

    fn new_issue(project: &Project, title: &str, assigned_to: &str, ms: i64) -> NewIssue {
        NewIssue {
            project_id: project.id.clone(),
            issue_title: title.into(),
            issue_text: format!("Text for {title}"),
            created_by: "alice".into(),
            assigned_to: assigned_to.into(),
            status_text: String::new(),
            created_on: at(ms),
        }
    }

    #[test]
    fn upsert_project_is_get_or_create() {
        let mut conn = test_db();
        assert!(
            get_project_by_name(&conn, "apitest")
                .expect("lookup")
                .is_none()
        );

        let first = upsert_project(&mut conn, "apitest", at(1_000)).expect("create");
        let second = upsert_project(&mut conn, "apitest", at(2_000)).expect("reuse");
        assert_eq!(first, second);
        assert_eq!(second.created_on, at(1_000));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1);
    }

    #[test]
    fn project_lookup_is_exact() {
        let mut conn = test_db();
        upsert_project(&mut conn, "apitest", at(1_000)).expect("create");
        assert!(
            get_project_by_name(&conn, "APITEST")
                .expect("lookup")
                .is_none()
        );
        assert!(
            get_project_by_name(&conn, "apitest")
                .expect("lookup")
                .is_some()
        );
    }

    #[test]
    fn insert_returns_stored_record() {
        let mut conn = test_db();
        let project = upsert_project(&mut conn, "apitest", at(1_000)).expect("project");

        let issue = insert_issue(&conn, &new_issue(&project, "First", "", 5_000)).expect("insert");
        assert_eq!(issue.project_id, project.id);
        assert!(issue.open);
        assert_eq!(issue.created_on, at(5_000));
        assert_eq!(issue.updated_on, at(5_000));
        assert_eq!(get_issue(&conn, &issue.id).expect("get"), Some(issue));
    }

    #[test]
    fn insert_into_unknown_project_fails() {
        let conn = test_db();
        let ghost = Project {
            id: RecordId::generate(),
            name: "ghost".into(),
            created_on: at(0),
        };
        let result = insert_issue(&conn, &new_issue(&ghost, "Orphan", "", 1));
        assert!(matches!(result, Err(StoreError::Sqlite(_))));
    }

    #[test]
    fn list_filters_are_anded_and_scoped_to_project() {
        let mut conn = test_db();
        let a = upsert_project(&mut conn, "a", at(1)).expect("a");
        let b = upsert_project(&mut conn, "b", at(1)).expect("b");

        let one = insert_issue(&conn, &new_issue(&a, "one", "bob", 10)).expect("one");
        let two = insert_issue(&conn, &new_issue(&a, "two", "carol", 20)).expect("two");
        insert_issue(&conn, &new_issue(&b, "other", "bob", 30)).expect("other");

        let all = list_issues(&conn, &a.id, &IssueFilter::default()).expect("list");
        assert_eq!(all, vec![one.clone(), two.clone()]);

        let bob = IssueFilter::from_pairs([("assigned_to", "bob")]).expect("filter");
        assert_eq!(list_issues(&conn, &a.id, &bob).expect("list"), vec![one]);

        let none = IssueFilter::from_pairs([("assigned_to", "carol"), ("issue_title", "one")])
            .expect("filter");
        assert!(list_issues(&conn, &a.id, &none).expect("list").is_empty());

        let by_id = IssueFilter::default().with(IssueField::Id, FilterValue::Id(two.id.clone()));
        assert_eq!(list_issues(&conn, &a.id, &by_id).expect("list"), vec![two]);
    }

    #[test]
    fn list_filters_on_open_and_timestamps() {
        let mut conn = test_db();
        let p = upsert_project(&mut conn, "p", at(1)).expect("p");
        let open = insert_issue(&conn, &new_issue(&p, "open", "", 100)).expect("open");
        let closed = insert_issue(&conn, &new_issue(&p, "closed", "", 200)).expect("closed");
        let patch = IssuePatch {
            open: Some(false),
            ..IssuePatch::default()
        };
        update_issue(&mut conn, &closed.id, &patch, at(300)).expect("close");

        let only_open = IssueFilter::from_pairs([("open", "true")]).expect("filter");
        assert_eq!(
            list_issues(&conn, &p.id, &only_open).expect("list"),
            vec![open.clone()]
        );

        let created = IssueFilter::default()
            .with(IssueField::CreatedOn, FilterValue::Timestamp(at(100)));
        assert_eq!(
            list_issues(&conn, &p.id, &created).expect("list"),
            vec![open]
        );
    }

    #[test]
    fn unsatisfiable_filter_returns_nothing() {
        let mut conn = test_db();
        let p = upsert_project(&mut conn, "p", at(1)).expect("p");
        insert_issue(&conn, &new_issue(&p, "x", "", 1)).expect("insert");

        let filter = IssueFilter::from_pairs([("priority", "high")]).expect("filter");
        assert!(list_issues(&conn, &p.id, &filter).expect("list").is_empty());
    }

    #[test]
    fn update_merges_and_stamps() {
        let mut conn = test_db();
        let p = upsert_project(&mut conn, "p", at(1)).expect("p");
        let issue = insert_issue(&conn, &new_issue(&p, "before", "bob", 1_000)).expect("insert");

        let patch = IssuePatch {
            issue_title: Some("after".into()),
            ..IssuePatch::default()
        };
        let updated = update_issue(&mut conn, &issue.id, &patch, at(2_000))
            .expect("update")
            .expect("found");

        assert_eq!(updated.issue_title, "after");
        assert_eq!(updated.assigned_to, "bob");
        assert_eq!(updated.created_on, at(1_000));
        assert_eq!(updated.updated_on, at(2_000));
        assert_eq!(get_issue(&conn, &issue.id).expect("get"), Some(updated));
    }

    #[test]
    fn update_missing_issue_is_none() {
        let mut conn = test_db();
        let result = update_issue(
            &mut conn,
            &RecordId::generate(),
            &IssuePatch::default(),
            at(1),
        )
        .expect("update");
        assert!(result.is_none());
    }

    #[test]
    fn delete_returns_row_once() {
        let mut conn = test_db();
        let p = upsert_project(&mut conn, "p", at(1)).expect("p");
        let issue = insert_issue(&conn, &new_issue(&p, "gone", "", 1)).expect("insert");

        let deleted = delete_issue(&mut conn, &issue.id).expect("delete");
        assert_eq!(deleted, Some(issue.clone()));
        assert!(delete_issue(&mut conn, &issue.id).expect("delete").is_none());
        assert!(get_issue(&conn, &issue.id).expect("get").is_none());
    }

    #[test]
    fn corrupt_timestamp_surfaces_as_error() {
        let mut conn = test_db();
        let p = upsert_project(&mut conn, "p", at(1)).expect("p");
        let issue = insert_issue(&conn, &new_issue(&p, "x", "", 1)).expect("insert");
        conn.execute(
            "UPDATE issues SET created_on_ms = ?1 WHERE issue_id = ?2",
            params![i64::MAX, issue.id],
        )
        .expect("corrupt row");

        assert!(get_issue(&conn, &issue.id).is_err());
    }
}
