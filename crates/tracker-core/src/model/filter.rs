//! Equality filters for issue listings.
//!
//! Query parameters are checked against the [`IssueField`] whitelist at the
//! boundary. A key outside the whitelist, or a `projectId` that is not a
//! well-formed id, can never match a stored record; instead of reaching SQL it
//! marks the whole filter unsatisfiable. A malformed `_id` is a cast failure
//! like a bad `open` value.

use super::fields::{CastError, IssueField, parse_flag};
use super::id::RecordId;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Typed comparison value for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Id(RecordId),
    Text(String),
    Flag(bool),
    Timestamp(DateTime<Utc>),
}

/// `field = value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: IssueField,
    pub value: FilterValue,
}

/// AND of equality predicates over issue fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    predicates: Vec<Predicate>,
    unmatchable: Vec<String>,
}

impl IssueFilter {
    /// Build a filter from raw query pairs. Repeated keys keep the last value.
    ///
    /// # Errors
    ///
    /// Returns [`CastError`] when `_id` is not a well-formed id, `open` is not
    /// a recognised boolean spelling, or a timestamp field is not RFC 3339.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, CastError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let collapsed: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut filter = Self::default();
        for (key, raw) in collapsed {
            let Some(field) = IssueField::from_key(&key) else {
                filter.unmatchable.push(key);
                continue;
            };

            let value = match field {
                IssueField::Id => FilterValue::Id(
                    raw.parse::<RecordId>()
                        .map_err(|_| CastError::new(&key, "record id", &raw))?,
                ),
                IssueField::ProjectId => match raw.parse::<RecordId>() {
                    Ok(id) => FilterValue::Id(id),
                    Err(_) => {
                        filter.unmatchable.push(key);
                        continue;
                    }
                },
                IssueField::Open => FilterValue::Flag(
                    parse_flag(&raw).ok_or_else(|| CastError::new(&key, "boolean", &raw))?,
                ),
                IssueField::CreatedOn | IssueField::UpdatedOn => FilterValue::Timestamp(
                    DateTime::parse_from_rfc3339(&raw)
                        .map_err(|_| CastError::new(&key, "timestamp", &raw))?
                        .with_timezone(&Utc),
                ),
                IssueField::IssueTitle
                | IssueField::IssueText
                | IssueField::CreatedBy
                | IssueField::AssignedTo
                | IssueField::StatusText => FilterValue::Text(raw),
            };
            filter.predicates.push(Predicate { field, value });
        }

        Ok(filter)
    }

    /// Add a single predicate.
    #[must_use]
    pub fn with(mut self, field: IssueField, value: FilterValue) -> Self {
        self.predicates.push(Predicate { field, value });
        self
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Keys that made this filter unsatisfiable, in sorted order.
    #[must_use]
    pub fn unmatchable_keys(&self) -> &[String] {
        &self.unmatchable
    }

    /// True when no stored issue can match.
    #[must_use]
    pub fn is_unsatisfiable(&self) -> bool {
        !self.unmatchable.is_empty()
    }
}
