//! The record store seam.
//!
//! [`crate::service::IssueService`] only talks to persistence through this
//! trait. Calls are blocking; async callers are expected to move them onto a
//! blocking thread.

use crate::error::StoreError;
use crate::model::{Issue, IssueFilter, IssuePatch, NewIssue, Project, RecordId};
use chrono::{DateTime, Utc};

pub trait RecordStore: Send + Sync {
    /// Exact-name project lookup.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the lookup itself fails.
    fn find_project(&self, name: &str) -> Result<Option<Project>, StoreError>;

    /// Insert the project if no project has this name, then return the stored
    /// one. Must be atomic: concurrent callers for the same unseen name all
    /// observe a single project.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the upsert fails.
    fn get_or_create_project(&self, name: &str) -> Result<Project, StoreError>;

    /// Issues of `project` matching every predicate in `filter`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn find_issues(
        &self,
        project: &RecordId,
        filter: &IssueFilter,
    ) -> Result<Vec<Issue>, StoreError>;

    /// Persist a new issue under a freshly assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    fn insert_issue(&self, issue: &NewIssue) -> Result<Issue, StoreError>;

    /// Merge `patch` into the issue and set `updated_on`. Returns the updated
    /// record, or `None` when no issue has this id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn update_issue(
        &self,
        id: &RecordId,
        patch: &IssuePatch,
        updated_on: DateTime<Utc>,
    ) -> Result<Option<Issue>, StoreError>;

    /// Remove the issue. Returns the deleted record, or `None` when no issue
    /// has this id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails.
    fn delete_issue(&self, id: &RecordId) -> Result<Option<Issue>, StoreError>;
}
