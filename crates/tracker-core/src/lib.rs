//! tracker-core library.
//!
//! Issue and project records, the [`store::RecordStore`] seam with its
//! `SQLite` implementation, and [`service::IssueService`], which carries the
//! validation and response rules for the `/api/issues/:project` resource.

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod service;
pub mod store;

// Conventions
//
// - Errors: typed `thiserror` enums on the request path, `anyhow::Result`
//   for startup and configuration.
// - Logging: `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub use error::{IssueError, StoreError};
pub use service::IssueService;
pub use store::RecordStore;
