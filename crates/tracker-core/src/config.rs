use crate::error::ErrorCode;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File consulted when no `--config` path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tracker.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    #[serde(default = "default_database_uri")]
    pub database_uri: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            database_uri: default_database_uri(),
        }
    }
}

impl ServerConfig {
    /// Apply environment overrides.
    ///
    /// `TRACKER_BIND` wins over `PORT`; `PORT` alone binds `0.0.0.0:<PORT>`.
    /// `TRACKER_DATABASE_URI` replaces the database URI.
    ///
    /// # Errors
    ///
    /// Returns an error if a bind address or port cannot be parsed.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(bind) = lookup("TRACKER_BIND") {
            self.bind = bind
                .parse()
                .with_context(|| format!("parse TRACKER_BIND '{bind}'"))?;
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .parse()
                .with_context(|| format!("parse PORT '{port}'"))?;
            self.bind = SocketAddr::from(([0, 0, 0, 0], port));
        }

        if let Some(uri) = lookup("TRACKER_DATABASE_URI") {
            self.database_uri = uri;
        }
        Ok(())
    }

    /// Parsed form of [`Self::database_uri`].
    ///
    /// # Errors
    ///
    /// Returns an error if the URI scheme is not supported.
    pub fn database(&self) -> Result<DatabaseUri> {
        self.database_uri.parse()
    }
}

/// Where the record store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUri {
    /// `sqlite::memory:`
    Memory,
    /// `sqlite://<path>` or `sqlite:<path>`
    File(PathBuf),
}

impl FromStr for DatabaseUri {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed == "sqlite::memory:" {
            return Ok(Self::Memory);
        }

        let path = trimmed
            .strip_prefix("sqlite://")
            .or_else(|| trimmed.strip_prefix("sqlite:"));
        match path {
            Some(path) if !path.is_empty() => Ok(Self::File(PathBuf::from(path))),
            _ => bail!(
                "{}: {} '{s}': expected sqlite::memory: or sqlite://<path>",
                ErrorCode::InvalidDatabaseUri,
                ErrorCode::InvalidDatabaseUri.message()
            ),
        }
    }
}

impl fmt::Display for DatabaseUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("sqlite::memory:"),
            Self::File(path) => write!(f, "sqlite://{}", path.display()),
        }
    }
}

/// Load the server config file.
///
/// With an explicit `path` the file must exist. Without one,
/// [`DEFAULT_CONFIG_FILE`] under `dir` is read when present and defaults are
/// used otherwise.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_server_config(path: Option<&Path>, dir: &Path) -> Result<ServerConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = dir.join(DEFAULT_CONFIG_FILE);
            if !fallback.exists() {
                return Ok(ServerConfig::default());
            }
            fallback
        }
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ServerConfig>(&content).with_context(|| {
        format!(
            "{}: Failed to parse {}",
            ErrorCode::ConfigParseError,
            path.display()
        )
    })
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_database_uri() -> String {
    "sqlite://tracker.sqlite3".to_string()
}
