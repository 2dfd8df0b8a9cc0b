//! Store-assigned record identifiers.
//!
//! An id is 24 lowercase hex characters: a 4-byte big-endian creation
//! timestamp (seconds) followed by 8 random bytes. Parsing accepts upper-case
//! hex and normalizes it; every other shape is rejected.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Length of the textual id form.
pub const RECORD_ID_LEN: usize = 24;

/// Opaque identifier for projects and issues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

/// The input was not a well-formed [`RecordId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed record id '{0}'")]
pub struct InvalidRecordId(pub String);

impl RecordId {
    /// Generate a fresh id stamped with the current time.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generate a fresh id stamped with `now`.
    ///
    /// Times before the epoch or past 2106 clamp to the representable range.
    #[must_use]
    pub fn generate_at(now: DateTime<Utc>) -> Self {
        let secs = u32::try_from(now.timestamp().max(0)).unwrap_or(u32::MAX);
        let tail: [u8; 8] = rand::random();
        Self(format!("{secs:08x}{:016x}", u64::from_be_bytes(tail)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Seconds timestamp embedded in the first four bytes.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn timestamp_secs(&self) -> u32 {
        u32::from_str_radix(&self.0[..8], 16).unwrap_or_default()
    }
}

impl FromStr for RecordId {
    type Err = InvalidRecordId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == RECORD_ID_LEN && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(InvalidRecordId(s.to_string()))
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ToSql for RecordId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for RecordId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: InvalidRecordId| FromSqlError::Other(Box::new(error)))
    }
}
