//! The enumerated issue fields and coercion of caller-supplied values.
//!
//! Request bodies arrive as JSON objects or urlencoded forms, so every value
//! is a [`serde_json::Value`] by the time it reaches this module. Scalars
//! coerce leniently; arrays and objects never do.

use serde_json::Value;
use std::fmt;

/// A field of the issue record, as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueField {
    Id,
    ProjectId,
    IssueTitle,
    IssueText,
    CreatedBy,
    AssignedTo,
    StatusText,
    Open,
    CreatedOn,
    UpdatedOn,
}

impl IssueField {
    /// Every field, in record order.
    pub const ALL: [Self; 10] = [
        Self::Id,
        Self::ProjectId,
        Self::IssueTitle,
        Self::IssueText,
        Self::CreatedOn,
        Self::UpdatedOn,
        Self::CreatedBy,
        Self::AssignedTo,
        Self::Open,
        Self::StatusText,
    ];

    /// Wire name used in JSON bodies, forms, and query strings.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Id => "_id",
            Self::ProjectId => "projectId",
            Self::IssueTitle => "issue_title",
            Self::IssueText => "issue_text",
            Self::CreatedBy => "created_by",
            Self::AssignedTo => "assigned_to",
            Self::StatusText => "status_text",
            Self::Open => "open",
            Self::CreatedOn => "created_on",
            Self::UpdatedOn => "updated_on",
        }
    }

    /// Resolve a wire name. Matching is exact and case-sensitive.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    /// Whether an update request may change this field.
    ///
    /// Identity, ownership and timestamps are fixed by the store.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(
            self,
            Self::IssueTitle
                | Self::IssueText
                | Self::CreatedBy
                | Self::AssignedTo
                | Self::StatusText
                | Self::Open
        )
    }

    /// Backing column in the `issues` table.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Id => "issue_id",
            Self::ProjectId => "project_id",
            Self::IssueTitle => "issue_title",
            Self::IssueText => "issue_text",
            Self::CreatedBy => "created_by",
            Self::AssignedTo => "assigned_to",
            Self::StatusText => "status_text",
            Self::Open => "is_open",
            Self::CreatedOn => "created_on_ms",
            Self::UpdatedOn => "updated_on_ms",
        }
    }
}

impl fmt::Display for IssueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A supplied value could not be converted to the field's type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot cast {value} to {expected} for field '{field}'")]
pub struct CastError {
    pub field: String,
    pub expected: &'static str,
    pub value: String,
}

impl CastError {
    pub(crate) fn new(
        field: impl Into<String>,
        expected: &'static str,
        value: impl fmt::Display,
    ) -> Self {
        Self {
            field: field.into(),
            expected,
            value: value.to_string(),
        }
    }
}

/// Coerce a value to text.
///
/// Strings pass through, numbers and booleans use their canonical text,
/// `null` becomes the empty string. Arrays and objects fail.
///
/// # Errors
///
/// Returns [`CastError`] for arrays and objects.
pub fn coerce_text(field: &str, value: &Value) -> Result<String, CastError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => Err(CastError::new(field, "text", value)),
    }
}

/// Parse the textual boolean spellings accepted for `open`.
#[must_use]
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Coerce a value to a boolean.
///
/// # Errors
///
/// Returns [`CastError`] for anything other than a boolean, the numbers
/// `0`/`1`, or a string accepted by [`parse_flag`].
pub fn coerce_flag(field: &str, value: &Value) -> Result<bool, CastError> {
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => parse_flag(s),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    parsed.ok_or_else(|| CastError::new(field, "boolean", value))
}
