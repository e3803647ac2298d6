//! Client configuration.
//!
//! Validated at load time, with defaults matching a stock chronyd install.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChronyError, ConfigError};

/// Socket paths probed when none is configured, in order.
pub const DEFAULT_SOCKET_PATHS: [&str; 2] =
    ["/run/chrony/chronyd.sock", "/var/run/chrony/chronyd.sock"];

/// Library names tried by the native binding, in order.
pub const DEFAULT_LIBRARY_NAMES: [&str; 2] = ["libchrony.so.0", "libchrony.so"];

/// Connection settings shared by every report call.
///
/// ```rust
/// use std::time::Duration;
/// use chronyscope_core::config::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .socket_path("/run/chrony/chronyd.sock")
///     .timeout(Duration::from_secs(2))
///     .build();
/// assert_eq!(config.timeout, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Explicit chronyd socket. Used as given, without probing.
    #[serde(default)]
    pub socket_path: Option<PathBuf>,

    /// Candidates probed when `socket_path` is unset.
    #[serde(default = "default_socket_paths")]
    pub default_socket_paths: Vec<PathBuf>,

    /// Shared object names for libchrony.
    #[serde(default = "default_library_names")]
    pub library_names: Vec<String>,

    /// Upper bound for the time-bounded async wrappers.
    #[serde(default = "default_timeout")]
    #[serde(with = "duration_text")]
    pub timeout: Duration,
}

fn default_socket_paths() -> Vec<PathBuf> {
    DEFAULT_SOCKET_PATHS.iter().map(PathBuf::from).collect()
}

fn default_library_names() -> Vec<String> {
    DEFAULT_LIBRARY_NAMES.iter().map(ToString::to_string).collect()
}

const fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            default_socket_paths: default_socket_paths(),
            library_names: default_library_names(),
            timeout: default_timeout(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Configuration for an optional explicit socket path.
    #[must_use]
    pub fn for_socket(socket_path: Option<&str>) -> Self {
        Self {
            socket_path: socket_path.map(PathBuf::from),
            ..Self::default()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if no library name is configured or the timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.library_names.is_empty() {
            return Err(ConfigError::invalid("library_names cannot be empty"));
        }
        if self.library_names.iter().any(String::is_empty) {
            return Err(ConfigError::invalid("library_names cannot contain empty names"));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::invalid("timeout must be greater than zero"));
        }
        Ok(())
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded client config");
        Ok(config)
    }

    /// Resolves the socket to connect to.
    ///
    /// An explicit `socket_path` is returned unchanged. Otherwise the first
    /// existing default candidate wins.
    ///
    /// # Errors
    /// Returns a connection error listing every probed path if none exists.
    pub fn resolve_target(&self) -> Result<String, ChronyError> {
        if let Some(path) = &self.socket_path {
            return Ok(path.to_string_lossy().into_owned());
        }

        if let Some(found) = self.default_socket_paths.iter().find(|p| p.exists()) {
            tracing::debug!(socket = %found.display(), "found chronyd socket");
            return Ok(found.to_string_lossy().into_owned());
        }

        let tried = self
            .default_socket_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(ChronyError::connection(format!(
            "chronyd socket not found. Tried: {tried}. Is chronyd running?"
        )))
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Sets an explicit socket path.
    #[must_use]
    pub fn socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.socket_path = Some(path.into());
        self
    }

    /// Replaces the probed socket candidates.
    #[must_use]
    pub fn default_socket_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config.default_socket_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the library names.
    #[must_use]
    pub fn library_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.library_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the async wrapper timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Durations as humantime strings ("5s", "1m 30s").
mod duration_text {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
