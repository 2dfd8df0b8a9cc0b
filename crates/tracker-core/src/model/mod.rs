//! Record types and request-field handling.

pub mod fields;
pub mod filter;
pub mod id;
pub mod issue;

pub use fields::{CastError, IssueField};
pub use filter::{FilterValue, IssueFilter, Predicate};
pub use id::{InvalidRecordId, RecordId};
pub use issue::{Issue, IssuePatch, NewIssue, Project};
