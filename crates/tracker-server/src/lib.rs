//! tracker-server library.
//!
//! The axum [`router`] for the issue resource, the request body extractor,
//! and the flat response payloads. The `trackerd` binary wires these to a
//! [`tracker_core::db::SqliteStore`] and a TCP listener.

pub mod api;
pub mod extract;
pub mod response;

pub use api::{AppState, ISSUES_ROUTE, router};
