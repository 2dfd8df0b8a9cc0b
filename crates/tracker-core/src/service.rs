//! Request handling for the `/api/issues/:project` resource.
//!
//! Each operation is a flat validate → look up or create → mutate → respond
//! sequence against a [`RecordStore`]. Results are typed; turning an
//! [`IssueError`] into the public `{error, _id}` payload is the HTTP layer's
//! job.

use crate::error::{ErrorClass, IssueError, NotFound, ValidationError, Verb};
use crate::model::fields::{CastError, coerce_flag, coerce_text};
use crate::model::issue::now_millis;
use crate::model::{Issue, IssueField, IssueFilter, IssuePatch, NewIssue, RecordId};
use crate::store::RecordStore;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

/// Decoded request body: a JSON object, or a form converted to string values.
pub type Fields = Map<String, Value>;

/// The issue resource handler.
#[derive(Debug)]
pub struct IssueService<S> {
    store: S,
}

impl<S: RecordStore> IssueService<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// List the issues of `project` matching every filter pair.
    ///
    /// # Errors
    ///
    /// - [`NotFound::Project`] when no project has this name
    /// - [`ValidationError::Cast`] when a filter value has the wrong type
    /// - [`IssueError::Store`] when the store fails
    #[instrument(skip_all, fields(project = %project))]
    pub fn list<K, V>(
        &self,
        project: &str,
        filters: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Vec<Issue>, IssueError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        observe(Verb::List, self.list_inner(project, filters))
    }

    /// Create an issue under `project`, creating the project on first use.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::RequiredFieldsMissing`] when `issue_title`,
    ///   `issue_text` or `created_by` is missing or empty
    /// - [`ValidationError::Cast`] when a field value is an array or object
    /// - [`IssueError::Store`] when the store fails
    #[instrument(skip_all, fields(project = %project))]
    pub fn create(&self, project: &str, body: &Fields) -> Result<Issue, IssueError> {
        observe(Verb::Create, self.create_inner(project, body))
    }

    /// Apply the fields in `body` to the issue named by its `_id`.
    ///
    /// Returns the `_id` exactly as the caller sent it, JSON type included.
    ///
    /// # Errors
    ///
    /// In check order:
    /// - [`ValidationError::MissingId`] when `_id` is absent or empty
    /// - [`ValidationError::NoUpdateFields`] when nothing besides `_id` was sent
    /// - [`ValidationError::Cast`] when a field value has the wrong type
    /// - [`NotFound::Issue`] when no issue has this id, or it is malformed
    /// - [`IssueError::Store`] when the store fails
    #[instrument(skip_all)]
    pub fn update(&self, body: &Fields) -> Result<Value, IssueError> {
        observe(Verb::Update, self.update_inner(body))
    }

    /// Delete the issue named by the body's `_id`.
    ///
    /// Returns the `_id` exactly as the caller sent it, JSON type included.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::MissingId`] when `_id` is absent or empty
    /// - [`NotFound::Issue`] when no issue has this id, or it is malformed
    /// - [`IssueError::Store`] when the store fails
    #[instrument(skip_all)]
    pub fn delete(&self, body: &Fields) -> Result<Value, IssueError> {
        observe(Verb::Delete, self.delete_inner(body))
    }

    fn list_inner<K, V>(
        &self,
        project: &str,
        filters: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Vec<Issue>, IssueError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let found = self
            .store
            .find_project(project)
            .map_err(|e| IssueError::store(Verb::List, None, e))?
            .ok_or_else(|| NotFound::Project {
                name: project.to_string(),
            })?;

        let filter = IssueFilter::from_pairs(filters).map_err(|source| ValidationError::Cast {
            verb: Verb::List,
            id: None,
            source,
        })?;

        if filter.is_unsatisfiable() {
            debug!(keys = ?filter.unmatchable_keys(), "filter can never match");
            return Ok(Vec::new());
        }

        self.store
            .find_issues(&found.id, &filter)
            .map_err(|e| IssueError::store(Verb::List, None, e))
    }

    fn create_inner(&self, project: &str, body: &Fields) -> Result<Issue, IssueError> {
        let text = |field: IssueField| {
            text_or_empty(body, field).map_err(|source| ValidationError::Cast {
                verb: Verb::Create,
                id: None,
                source,
            })
        };
        let required = |field: IssueField| {
            if body.get(field.key()).is_some_and(is_falsy) {
                Ok(String::new())
            } else {
                text(field)
            }
        };

        let issue_title = required(IssueField::IssueTitle)?;
        let issue_text = required(IssueField::IssueText)?;
        let created_by = required(IssueField::CreatedBy)?;

        let missing: Vec<&'static str> = [
            (IssueField::IssueTitle, &issue_title),
            (IssueField::IssueText, &issue_text),
            (IssueField::CreatedBy, &created_by),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| field.key())
        .collect();
        if !missing.is_empty() {
            return Err(ValidationError::RequiredFieldsMissing { fields: missing }.into());
        }

        let assigned_to = text(IssueField::AssignedTo)?;
        let status_text = text(IssueField::StatusText)?;

        let owner = self
            .store
            .get_or_create_project(project)
            .map_err(|e| IssueError::store(Verb::Create, None, e))?;

        let new = NewIssue {
            project_id: owner.id,
            issue_title,
            issue_text,
            created_by,
            assigned_to,
            status_text,
            created_on: now_millis(),
        };

        self.store
            .insert_issue(&new)
            .map_err(|e| IssueError::store(Verb::Create, None, e))
    }

    fn update_inner(&self, body: &Fields) -> Result<Value, IssueError> {
        let raw_id = raw_id(body).ok_or(ValidationError::MissingId)?;

        if body.keys().all(|key| key == IssueField::Id.key()) {
            return Err(ValidationError::NoUpdateFields { id: raw_id }.into());
        }

        let patch = match build_patch(body) {
            Ok(patch) => patch,
            Err(source) => {
                return Err(ValidationError::Cast {
                    verb: Verb::Update,
                    id: Some(raw_id),
                    source,
                }
                .into());
            }
        };

        let Some(id) = record_id(&raw_id) else {
            return Err(issue_not_found(Verb::Update, raw_id));
        };
        if patch.is_empty() {
            debug!(id = %raw_id, "no writable fields sent, only updated_on changes");
        }

        match self.store.update_issue(&id, &patch, now_millis()) {
            Ok(Some(_)) => Ok(raw_id),
            Ok(None) => Err(issue_not_found(Verb::Update, raw_id)),
            Err(e) => Err(IssueError::store(Verb::Update, Some(raw_id), e)),
        }
    }

    fn delete_inner(&self, body: &Fields) -> Result<Value, IssueError> {
        let raw_id = raw_id(body).ok_or(ValidationError::MissingId)?;

        let Some(id) = record_id(&raw_id) else {
            return Err(issue_not_found(Verb::Delete, raw_id));
        };

        match self.store.delete_issue(&id) {
            Ok(Some(_)) => Ok(raw_id),
            Ok(None) => Err(issue_not_found(Verb::Delete, raw_id)),
            Err(e) => Err(IssueError::store(Verb::Delete, Some(raw_id), e)),
        }
    }
}

const fn issue_not_found(verb: Verb, id: Value) -> IssueError {
    IssueError::NotFound(NotFound::Issue { verb, id })
}

/// `false` and zero read as absent for a required field, like `null`.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => !flag,
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Text value of `field`; absent reads as empty.
fn text_or_empty(body: &Fields, field: IssueField) -> Result<String, CastError> {
    body.get(field.key())
        .map_or_else(|| Ok(String::new()), |value| coerce_text(field.key(), value))
}

/// The `_id` as sent, or `None` when absent, `null`, or empty.
fn raw_id(body: &Fields) -> Option<Value> {
    match body.get(IssueField::Id.key())? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        other => Some(other.clone()),
    }
}

/// Only a string can name a stored record.
fn record_id(raw: &Value) -> Option<RecordId> {
    raw.as_str()?.parse().ok()
}

fn build_patch(body: &Fields) -> Result<IssuePatch, CastError> {
    let mut patch = IssuePatch::default();

    for (key, value) in body {
        let Some(field) = IssueField::from_key(key) else {
            debug!(%key, "ignoring unknown update field");
            continue;
        };
        if !field.is_writable() {
            if field != IssueField::Id {
                debug!(%key, "ignoring read-only update field");
            }
            continue;
        }

        match field {
            IssueField::Open => patch.open = Some(coerce_flag(key, value)?),
            IssueField::IssueTitle => patch.issue_title = Some(coerce_text(key, value)?),
            IssueField::IssueText => patch.issue_text = Some(coerce_text(key, value)?),
            IssueField::CreatedBy => patch.created_by = Some(coerce_text(key, value)?),
            IssueField::AssignedTo => patch.assigned_to = Some(coerce_text(key, value)?),
            IssueField::StatusText => patch.status_text = Some(coerce_text(key, value)?),
            IssueField::Id
            | IssueField::ProjectId
            | IssueField::CreatedOn
            | IssueField::UpdatedOn => {}
        }
    }

    Ok(patch)
}

fn observe<T>(verb: Verb, outcome: Result<T, IssueError>) -> Result<T, IssueError> {
    if let Err(ref error) = outcome {
        match error.class() {
            ErrorClass::Store => warn!(%verb, code = %error.code(), %error, "store failure"),
            ErrorClass::Validation | ErrorClass::NotFound => {
                debug!(%verb, code = %error.code(), %error, "request rejected");
            }
        }
    }
    outcome
}
