//! Error types for the report pipeline.
//!
//! Every stage either yields a value or exactly one of four error kinds.
//! Errors are terminal for the operation that produced them: nothing is
//! retried and no partial result is attached.

use std::fmt;

/// Result type alias for report operations.
pub type Result<T> = std::result::Result<T, ChronyError>;

/// The four terminal error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// libchrony is missing, failed to load, or does not know a descriptor field.
    Library,
    /// No reachable chronyd socket.
    Connection,
    /// The socket exists but access is denied.
    Permission,
    /// Connected, but a request failed or the returned data is invalid.
    Data,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Library => "library",
            Self::Connection => "connection",
            Self::Permission => "permission",
            Self::Data => "data",
        };
        f.write_str(name)
    }
}

/// Sub-reason of a [`ChronyError::Data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataReason {
    /// Issuing a request to the native library failed.
    RequestFailed,
    /// The response could not be processed, or its contents make no sense
    /// (for example a negative record count).
    MalformedResponse,
    /// A field's introspected type differs from the descriptor.
    TypeMismatch,
    /// A decoded value is out of range, non-finite or empty.
    InvalidValue,
    /// An optional singleton report is not available on this daemon.
    Unavailable,
    /// A request was attempted on a session that was already closed.
    SessionClosed,
}

impl fmt::Display for DataReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::RequestFailed => "request failed",
            Self::MalformedResponse => "malformed response",
            Self::TypeMismatch => "type mismatch",
            Self::InvalidValue => "invalid value",
            Self::Unavailable => "unavailable",
            Self::SessionClosed => "session closed",
        };
        f.write_str(reason)
    }
}

/// Where an error happened and what it was looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Report name, e.g. `"sources"`.
    pub report: Option<&'static str>,
    /// Native field name, e.g. `"stratum"`.
    pub field: Option<&'static str>,
    /// Offending value rendered as text.
    pub value: Option<String>,
    /// Record index within a multi-record report.
    pub record: Option<usize>,
    /// Raw status code returned by libchrony or the socket layer.
    pub code: Option<i32>,
}

impl ErrorContext {
    fn code_suffix(&self) -> String {
        self.code
            .map(|code| format!(" (error code: {code})"))
            .unwrap_or_default()
    }
}

/// Error returned by every chronyscope operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChronyError {
    /// libchrony could not be loaded, or a field name is unknown to it.
    #[error("libchrony error: {message}{}", .context.code_suffix())]
    Library {
        /// Human-readable description.
        message: String,
        /// Offending field or symbol, if any.
        context: ErrorContext,
    },

    /// chronyd is not running or its socket cannot be found.
    #[error("connection error: {message}{}", .context.code_suffix())]
    Connection {
        /// Human-readable description.
        message: String,
        /// Native status, if any.
        context: ErrorContext,
    },

    /// The process lacks the rights to talk to chronyd.
    #[error("permission error: {message}{}", .context.code_suffix())]
    Permission {
        /// Human-readable description.
        message: String,
        /// Native status, if any.
        context: ErrorContext,
    },

    /// A request failed after connecting, or the data failed validation.
    #[error("data error ({reason}): {message}{}", .context.code_suffix())]
    Data {
        /// Sub-reason.
        reason: DataReason,
        /// Human-readable description.
        message: String,
        /// Report, field, value and record involved.
        context: ErrorContext,
    },
}

impl ChronyError {
    /// Creates a library error.
    #[must_use]
    pub fn library(message: impl Into<String>) -> Self {
        Self::Library {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Creates a permission error.
    #[must_use]
    pub fn permission(message: impl Into<String>) -> Self {
        Self::Permission {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Creates a data error with the given sub-reason.
    #[must_use]
    pub fn data(reason: DataReason, message: impl Into<String>) -> Self {
        Self::Data {
            reason,
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Creates an invalid-value data error naming the field and value.
    #[must_use]
    pub fn invalid_value(field: &'static str, value: impl fmt::Display, rule: &str) -> Self {
        let value = value.to_string();
        Self::data(DataReason::InvalidValue, format!("invalid {field}: {value} ({rule})"))
            .with_field(field)
            .with_value(value)
    }

    /// Attaches the report name.
    #[must_use]
    pub fn with_report(mut self, report: &'static str) -> Self {
        self.context_mut().report = Some(report);
        self
    }

    /// Attaches the field name.
    #[must_use]
    pub fn with_field(mut self, field: &'static str) -> Self {
        self.context_mut().field = Some(field);
        self
    }

    /// Attaches the offending value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.context_mut().value = Some(value.into());
        self
    }

    /// Attaches the record index.
    #[must_use]
    pub fn with_record(mut self, record: usize) -> Self {
        self.context_mut().record = Some(record);
        self
    }

    /// Attaches a native status code.
    #[must_use]
    pub fn with_code(mut self, code: i32) -> Self {
        self.context_mut().code = Some(code);
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Library { .. } => ErrorKind::Library,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Permission { .. } => ErrorKind::Permission,
            Self::Data { .. } => ErrorKind::Data,
        }
    }

    /// Returns the data sub-reason, for data errors.
    #[must_use]
    pub const fn data_reason(&self) -> Option<DataReason> {
        match self {
            Self::Data { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Returns the human-readable message without the kind prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Library { message, .. }
            | Self::Connection { message, .. }
            | Self::Permission { message, .. }
            | Self::Data { message, .. } => message,
        }
    }

    /// Returns the attached context.
    #[must_use]
    pub const fn context(&self) -> &ErrorContext {
        match self {
            Self::Library { context, .. }
            | Self::Connection { context, .. }
            | Self::Permission { context, .. }
            | Self::Data { context, .. } => context,
        }
    }

    /// Returns the native status code, if one was reported.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        self.context().code
    }

    /// Returns the report involved, if known.
    #[must_use]
    pub const fn report(&self) -> Option<&'static str> {
        self.context().report
    }

    /// Returns the field involved, if known.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        self.context().field
    }

    /// Returns the record index involved, if known.
    #[must_use]
    pub const fn record(&self) -> Option<usize> {
        self.context().record
    }

    /// Returns true if an optional report is not available.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Data {
                reason: DataReason::Unavailable,
                ..
            }
        )
    }

    const fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Library { context, .. }
            | Self::Connection { context, .. }
            | Self::Permission { context, .. }
            | Self::Data { context, .. } => context,
        }
    }
}

/// Error loading or validating a [`ClientConfig`](crate::config::ClientConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File path.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}
