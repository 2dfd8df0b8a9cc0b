//! Error taxonomy for the issue resource.
//!
//! Failures stay typed all the way to the HTTP boundary: a request fails with
//! a validation error, a not-found error, or a store error, and only the
//! boundary flattens that into the public `{error, _id}` payload using
//! [`IssueError::public_message`].

use crate::model::CastError;
use serde_json::Value;
use std::fmt;

/// Machine-readable error codes for logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    InvalidDatabaseUri,
    RequiredFieldMissing,
    MissingId,
    EmptyUpdate,
    FieldCast,
    ProjectNotFound,
    IssueNotFound,
    StoreUnavailable,
    StoreCorrupt,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::InvalidDatabaseUri => "E1002",
            Self::RequiredFieldMissing => "E2001",
            Self::MissingId => "E2002",
            Self::EmptyUpdate => "E2003",
            Self::FieldCast => "E2004",
            Self::ProjectNotFound => "E3001",
            Self::IssueNotFound => "E3002",
            Self::StoreUnavailable => "E5001",
            Self::StoreCorrupt => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidDatabaseUri => "Unsupported database URI",
            Self::RequiredFieldMissing => "Required field missing",
            Self::MissingId => "Missing record id",
            Self::EmptyUpdate => "Update carries no fields",
            Self::FieldCast => "Field value has the wrong type",
            Self::ProjectNotFound => "Project not found",
            Self::IssueNotFound => "Issue not found",
            Self::StoreUnavailable => "Record store call failed",
            Self::StoreCorrupt => "Stored record is unreadable",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The four operations on the issue resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    List,
    Create,
    Update,
    Delete,
}

impl Verb {
    /// Generic public message for a failure during this verb.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::List => "could not get",
            Self::Create => "could not post",
            Self::Update => "could not update",
            Self::Delete => "could not delete",
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse class of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    NotFound,
    Store,
}

/// Failures raised by a [`crate::store::RecordStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("corrupt stored record: {0}")]
    Corrupt(String),

    #[error("store task failed: {0}")]
    Task(String),
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Sqlite(_) | Self::LockPoisoned => ErrorCode::StoreUnavailable,
            Self::Corrupt(_) => ErrorCode::StoreCorrupt,
            Self::Task(_) => ErrorCode::InternalUnexpected,
        }
    }
}

/// Caller input failed a precondition. Detected before the store is touched
/// (except for casts, which surface while building the query or patch).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("required field(s) missing: {}", .fields.join(", "))]
    RequiredFieldsMissing { fields: Vec<&'static str> },

    #[error("missing _id")]
    MissingId,

    #[error("no update field(s) sent for {id}")]
    NoUpdateFields { id: Value },

    #[error("{verb}: {source}")]
    Cast {
        verb: Verb,
        id: Option<Value>,
        #[source]
        source: CastError,
    },
}

/// The target of a request does not exist (or its id is malformed).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFound {
    #[error("project '{name}' not found")]
    Project { name: String },

    #[error("{verb}: issue {id} not found")]
    Issue { verb: Verb, id: Value },
}

/// Any failure of an issue resource request.
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error("{verb}: {source}")]
    Store {
        verb: Verb,
        id: Option<Value>,
        #[source]
        source: StoreError,
    },
}

impl IssueError {
    pub(crate) const fn store(verb: Verb, id: Option<Value>, source: StoreError) -> Self {
        Self::Store { verb, id, source }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) => ErrorClass::Validation,
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::Store { .. } => ErrorClass::Store,
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(ValidationError::RequiredFieldsMissing { .. }) => {
                ErrorCode::RequiredFieldMissing
            }
            Self::Validation(ValidationError::MissingId) => ErrorCode::MissingId,
            Self::Validation(ValidationError::NoUpdateFields { .. }) => ErrorCode::EmptyUpdate,
            Self::Validation(ValidationError::Cast { .. }) => ErrorCode::FieldCast,
            Self::NotFound(NotFound::Project { .. }) => ErrorCode::ProjectNotFound,
            Self::NotFound(NotFound::Issue { .. }) => ErrorCode::IssueNotFound,
            Self::Store { source, .. } => source.code(),
        }
    }

    /// The flat message a client sees in the `error` key.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::Validation(ValidationError::RequiredFieldsMissing { .. }) => {
                "required field(s) missing"
            }
            Self::Validation(ValidationError::MissingId) => "missing _id",
            Self::Validation(ValidationError::NoUpdateFields { .. }) => "no update field(s) sent",
            Self::Validation(ValidationError::Cast { verb, .. })
            | Self::NotFound(NotFound::Issue { verb, .. })
            | Self::Store { verb, .. } => verb.failure_message(),
            Self::NotFound(NotFound::Project { .. }) => "project not found",
        }
    }

    /// The caller-supplied `_id` echoed alongside the error, if any. It keeps
    /// the JSON type it arrived with.
    #[must_use]
    pub const fn id(&self) -> Option<&Value> {
        match self {
            Self::Validation(ValidationError::NoUpdateFields { id })
            | Self::NotFound(NotFound::Issue { id, .. }) => Some(id),
            Self::Validation(ValidationError::Cast { id, .. }) | Self::Store { id, .. } => {
                id.as_ref()
            }
            Self::Validation(
                ValidationError::RequiredFieldsMissing { .. } | ValidationError::MissingId,
            )
            | Self::NotFound(NotFound::Project { .. }) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::InvalidDatabaseUri,
            ErrorCode::RequiredFieldMissing,
            ErrorCode::MissingId,
            ErrorCode::EmptyUpdate,
            ErrorCode::FieldCast,
            ErrorCode::ProjectNotFound,
            ErrorCode::IssueNotFound,
            ErrorCode::StoreUnavailable,
            ErrorCode::StoreCorrupt,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::EmptyUpdate.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn store_failures_flatten_to_verb_message() {
        for (verb, expected) in [
            (Verb::List, "could not get"),
            (Verb::Create, "could not post"),
            (Verb::Update, "could not update"),
            (Verb::Delete, "could not delete"),
        ] {
            let err = IssueError::store(verb, None, StoreError::LockPoisoned);
            assert_eq!(err.public_message(), expected);
            assert_eq!(err.class(), ErrorClass::Store);
        }
    }

    #[test]
    fn not_found_issue_echoes_id() {
        let err = IssueError::from(NotFound::Issue {
            verb: Verb::Delete,
            id: "invalidId".into(),
        });
        assert_eq!(err.public_message(), "could not delete");
        assert_eq!(err.id(), Some(&json!("invalidId")));
        assert_eq!(err.code(), ErrorCode::IssueNotFound);
    }

    #[test]
    fn project_not_found_has_no_id() {
        let err = IssueError::from(NotFound::Project {
            name: "ghost".into(),
        });
        assert_eq!(err.public_message(), "project not found");
        assert_eq!(err.id(), None);
        assert_eq!(err.class(), ErrorClass::NotFound);
    }

    #[test]
    fn cast_failure_reports_verb_message_and_keeps_class() {
        let err = IssueError::from(ValidationError::Cast {
            verb: Verb::Update,
            id: Some(json!("abc")),
            source: CastError {
                field: "open".into(),
                expected: "boolean",
                value: "\"maybe\"".into(),
            },
        });
        assert_eq!(err.public_message(), "could not update");
        assert_eq!(err.class(), ErrorClass::Validation);
        assert_eq!(err.id(), Some(&json!("abc")));
    }
}
