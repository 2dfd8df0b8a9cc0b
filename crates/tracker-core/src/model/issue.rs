use super::id::RecordId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// A named grouping of issues. Created on the first issue posted under an
/// unseen name and never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: RecordId,
    pub name: String,
    pub created_on: DateTime<Utc>,
}

/// A stored issue, serialized in its wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(rename = "projectId")]
    pub project_id: RecordId,
    pub issue_title: String,
    pub issue_text: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_on: DateTime<Utc>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub updated_on: DateTime<Utc>,
    pub created_by: String,
    pub assigned_to: String,
    pub open: bool,
    pub status_text: String,
}

/// A validated issue ready for insertion. The store assigns the id and
/// stamps both timestamps with `created_on`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub project_id: RecordId,
    pub issue_title: String,
    pub issue_text: String,
    pub created_by: String,
    pub assigned_to: String,
    pub status_text: String,
    pub created_on: DateTime<Utc>,
}

/// Shallow partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuePatch {
    pub issue_title: Option<String>,
    pub issue_text: Option<String>,
    pub created_by: Option<String>,
    pub assigned_to: Option<String>,
    pub status_text: Option<String>,
    pub open: Option<bool>,
}

impl IssuePatch {
    /// True when no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.issue_title.is_none()
            && self.issue_text.is_none()
            && self.created_by.is_none()
            && self.assigned_to.is_none()
            && self.status_text.is_none()
            && self.open.is_none()
    }

    /// Apply the patch to an in-memory record.
    pub fn apply_to(&self, issue: &mut Issue) {
        if let Some(ref v) = self.issue_title {
            issue.issue_title.clone_from(v);
        }
        if let Some(ref v) = self.issue_text {
            issue.issue_text.clone_from(v);
        }
        if let Some(ref v) = self.created_by {
            issue.created_by.clone_from(v);
        }
        if let Some(ref v) = self.assigned_to {
            issue.assigned_to.clone_from(v);
        }
        if let Some(ref v) = self.status_text {
            issue.status_text.clone_from(v);
        }
        if let Some(open) = self.open {
            issue.open = open;
        }
    }
}

/// Current time truncated to millisecond precision, the resolution every
/// stored timestamp carries.
#[must_use]
pub fn now_millis() -> DateTime<Utc> {
    truncate_to_millis(Utc::now())
}

#[must_use]
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

/// RFC 3339 with milliseconds and a `Z` suffix, e.g. `2024-01-12T16:03:42.123Z`.
#[must_use]
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_timestamp<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format_timestamp(at))
}
