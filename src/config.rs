//! Configuration management for gcamreader.
//!
//! Handles loading configuration from TOML files and environment variables,
//! and describes the two kinds of scenario database connection.

use crate::error::{GcamError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Default BaseX HTTP port.
pub const DEFAULT_PORT: u16 = 8984;

/// Default remote host.
pub const DEFAULT_HOSTNAME: &str = "localhost";

/// Main configuration structure for gcamreader.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Query engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Defaults for the `remote` command.
    #[serde(default)]
    pub remote: RemoteDefaults,

    /// Result file settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Settings for the external query engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Java executable used to run the local engine.
    pub java: Option<String>,

    /// Classpath holding ModelInterface.jar and the BaseX jars.
    pub classpath: Option<String>,

    /// Maximum JVM heap (passed as `-Xmx`).
    #[serde(default = "default_max_memory")]
    pub max_memory: String,

    /// Per-query timeout in seconds, for both local and remote engines.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_max_memory() -> String {
    "4g".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            java: None,
            classpath: None,
            max_memory: default_max_memory(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EngineConfig {
    /// Returns the java executable to spawn.
    pub fn java(&self) -> &str {
        self.java.as_deref().unwrap_or("java")
    }

    /// Returns the engine classpath.
    pub fn classpath(&self) -> &str {
        self.classpath.as_deref().unwrap_or("ModelInterface.jar")
    }

    /// Applies environment variables (GCAMREADER_JAVA, GCAMREADER_CLASSPATH) as defaults.
    pub fn apply_env_defaults(&mut self) {
        if self.java.is_none() {
            self.java = std::env::var("GCAMREADER_JAVA").ok();
        }
        if self.classpath.is_none() {
            self.classpath = std::env::var("GCAMREADER_CLASSPATH").ok();
        }
    }
}

/// Config-file defaults for remote connections.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RemoteDefaults {
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
}

/// Result file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Field delimiter for result files.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    '|'
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gcamreader")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| GcamError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            GcamError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;

        if !config.output.delimiter.is_ascii() {
            return Err(GcamError::config(format!(
                "output.delimiter must be a single ASCII character, got '{}'",
                config.output.delimiter
            )));
        }

        Ok(config)
    }
}

/// Connection to a scenario database, chosen by the CLI subcommand.
#[derive(Debug, Clone)]
pub enum ConnectionConfig {
    /// On-disk BaseX database driven through the local engine.
    Local(LocalConfig),
    /// BaseX server reached over its REST interface.
    Remote(RemoteConfig),
}

/// Local scenario database.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// Database directory (the one holding the `*.basex` files).
    pub database_path: PathBuf,
}

impl LocalConfig {
    /// Directory BaseX treats as its database root.
    pub fn db_root(&self) -> PathBuf {
        match self.database_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Database name as BaseX knows it.
    pub fn db_name(&self) -> String {
        self.database_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Remote scenario database.
#[derive(Clone)]
pub struct RemoteConfig {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database_name: String,
}

impl RemoteConfig {
    /// REST endpoint for the target database, e.g. `http://localhost:8984/rest/gcam`.
    pub fn rest_url(&self) -> Result<Url> {
        let base = Url::parse(&format!("http://{}:{}/rest/", self.hostname, self.port))
            .map_err(|e| GcamError::config(format!("Invalid server address: {e}")))?;
        base.join(&self.database_name)
            .map_err(|e| GcamError::config(format!("Invalid database name: {e}")))
    }

    /// Returns a display-safe string (no password).
    pub fn display_string(&self) -> String {
        format!(
            "{} @ {}:{} as {}",
            self.database_name, self.hostname, self.port, self.username
        )
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .finish()
    }
}
