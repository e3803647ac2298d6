//! Maps native failure outcomes onto the four error kinds.
//!
//! The mapping is fixed: callers never build a [`ChronyError`] for a native
//! failure by hand, they describe what happened and at which stage and let
//! [`classify`] decide the kind.

use std::fmt;

use crate::descriptor::FieldType;
use crate::error::{ChronyError, DataReason};
use crate::native::{NativeStatus, TypeTag};

/// Pipeline stage at which a failure was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Loading libchrony and resolving its symbols.
    Load,
    /// Opening the socket and initializing the session.
    Connect,
    /// Issuing a request.
    Request,
    /// Draining a response.
    Response,
    /// Looking a field up by name.
    Introspect,
    /// Reading a field value.
    Decode,
    /// Checking decoded values against snapshot invariants.
    Validate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::Load => "load",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Response => "response",
            Self::Introspect => "introspect",
            Self::Decode => "decode",
            Self::Validate => "validate",
        };
        f.write_str(stage)
    }
}

/// A non-success outcome reported by libchrony or observed around it.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeFailure {
    /// No candidate library could be opened.
    LibraryMissing {
        /// Loader diagnostics.
        detail: String,
    },
    /// The library was opened but lacks a required symbol.
    SymbolMissing {
        /// Symbol name.
        symbol: &'static str,
    },
    /// The socket does not exist or nothing listens on it.
    TargetMissing {
        /// Socket path that was tried.
        target: String,
        /// Value returned by `chrony_open_socket`, if any.
        code: Option<i32>,
    },
    /// The socket exists but the process may not use it.
    AccessDenied {
        /// Socket path that was tried.
        target: String,
        /// Value returned by `chrony_open_socket`, if any.
        code: Option<i32>,
    },
    /// `chrony_init_session` failed on an open socket.
    SessionInit(NativeStatus),
    /// A request or response call returned a non-zero status.
    Status(NativeStatus),
    /// Field introspection does not know a descriptor field.
    UnknownField {
        /// Field name.
        field: &'static str,
    },
    /// The introspected type differs from the descriptor.
    TypeMismatch {
        /// Field name.
        field: &'static str,
        /// Type declared by the descriptor.
        expected: FieldType,
        /// Type reported by libchrony.
        found: TypeTag,
    },
    /// A decoded value violates a snapshot invariant.
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: String,
        /// The rule that was violated.
        rule: &'static str,
    },
    /// The record count response is negative.
    BadRecordCount(i64),
    /// An optional singleton report is not configured on the daemon.
    Unavailable,
    /// The session was closed before the request.
    SessionClosed,
}

/// Maps a failure observed at `stage` to exactly one [`ChronyError`].
#[must_use]
pub fn classify(stage: Stage, failure: NativeFailure) -> ChronyError {
    tracing::debug!(%stage, ?failure, "classifying native failure");

    match failure {
        NativeFailure::LibraryMissing { detail } => ChronyError::library(format!(
            "libchrony not available: {detail}. Ensure libchrony is installed"
        )),
        NativeFailure::SymbolMissing { symbol } => ChronyError::library(format!(
            "libchrony does not export {symbol} (unsupported libchrony version?)"
        ))
        .with_field(symbol),
        NativeFailure::TargetMissing { target, code } => {
            let err = ChronyError::connection(format!(
                "failed to connect to chronyd at {target}. Is chronyd running?"
            ));
            with_optional_code(err, code)
        }
        NativeFailure::AccessDenied { target, code } => {
            let err = ChronyError::permission(format!(
                "permission denied accessing {target}. Run as root or add user to chrony group"
            ));
            with_optional_code(err, code)
        }
        NativeFailure::SessionInit(status) => {
            ChronyError::connection("failed to initialize chrony session").with_code(status.code())
        }
        NativeFailure::Status(status) => {
            let (reason, what) = match stage {
                Stage::Request => (DataReason::RequestFailed, "failed to send request"),
                _ => (DataReason::MalformedResponse, "failed to process response"),
            };
            ChronyError::data(reason, what).with_code(status.code())
        }
        NativeFailure::UnknownField { field } => ChronyError::library(format!(
            "field '{field}' not found (libchrony version mismatch?)"
        ))
        .with_field(field),
        NativeFailure::TypeMismatch {
            field,
            expected,
            found,
        } => ChronyError::data(
            DataReason::TypeMismatch,
            format!("field '{field}' has type {found}, expected {expected}"),
        )
        .with_field(field),
        NativeFailure::InvalidValue { field, value, rule } => {
            ChronyError::invalid_value(field, value, rule)
        }
        NativeFailure::BadRecordCount(count) => ChronyError::data(
            DataReason::MalformedResponse,
            format!("negative record count {count}"),
        )
        .with_value(count.to_string()),
        NativeFailure::Unavailable => {
            ChronyError::data(DataReason::Unavailable, "report is not available")
        }
        NativeFailure::SessionClosed => ChronyError::data(
            DataReason::SessionClosed,
            "request issued on a closed session",
        ),
    }
}

fn with_optional_code(err: ChronyError, code: Option<i32>) -> ChronyError {
    match code {
        Some(code) => err.with_code(code),
        None => err,
    }
}
