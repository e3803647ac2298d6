//! The seam between the report pipeline and libchrony.
//!
//! [`ChronyLibrary`] and [`ChronyConnection`] mirror the libchrony client ABI
//! one call at a time. The pipeline only ever reads fields through
//! [`ChronyConnection::field_index`] and the typed accessors; field names and
//! type tags are the stable surface, field positions are not.

use std::fmt;

use crate::classify::NativeFailure;

/// Non-zero status returned by a libchrony call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeStatus(pub i32);

impl NativeStatus {
    /// Raw status value.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }
}

impl fmt::Display for NativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "libchrony status {}", self.0)
    }
}

/// Position of a field within the current record, as returned by
/// `chrony_get_field_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldIndex(pub i32);

/// Type tag reported by field introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Signed 64-bit integer.
    Integer,
    /// Unsigned 64-bit integer.
    UInteger,
    /// Double-precision float.
    Float,
    /// `struct timespec`.
    Timespec,
    /// NUL-terminated string.
    String,
    /// A tag this crate does not decode (records, unknown future types).
    Unknown(i32),
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => f.write_str("integer"),
            Self::UInteger => f.write_str("unsigned integer"),
            Self::Float => f.write_str("float"),
            Self::Timespec => f.write_str("timespec"),
            Self::String => f.write_str("string"),
            Self::Unknown(raw) => write!(f, "unknown type tag {raw}"),
        }
    }
}

/// A `struct timespec` as returned by `chrony_get_field_timespec`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timespec {
    /// Whole seconds since the epoch.
    pub sec: i64,
    /// Nanoseconds within the second.
    pub nsec: i64,
}

/// A loaded native client library.
pub trait ChronyLibrary {
    /// Connection type produced by [`ChronyLibrary::connect`].
    type Connection: ChronyConnection;

    /// Opens the socket at `target` and initializes a client session on it.
    ///
    /// Implementations classify their own failures (missing socket versus
    /// access denied) because only they can see the platform error codes.
    fn connect(&self, target: &str) -> Result<Self::Connection, NativeFailure>;
}

/// One connected libchrony session.
///
/// The protocol is a strict synchronous state machine: after any request the
/// caller must call [`ChronyConnection::process_response`] until
/// [`ChronyConnection::needs_response`] returns false before issuing the next
/// request.
pub trait ChronyConnection {
    /// `chrony_request_report_number_records`.
    fn request_record_count(&mut self, report: &str) -> Result<(), NativeStatus>;

    /// `chrony_get_report_number_records`, valid after the count response was drained.
    fn record_count(&self) -> i64;

    /// `chrony_request_record`.
    fn request_record(&mut self, report: &str, index: u32) -> Result<(), NativeStatus>;

    /// `chrony_needs_response`.
    fn needs_response(&self) -> bool;

    /// `chrony_process_response`.
    fn process_response(&mut self) -> Result<(), NativeStatus>;

    /// `chrony_get_field_index`; `None` when the name is unknown.
    fn field_index(&self, name: &str) -> Option<FieldIndex>;

    /// `chrony_get_field_type`.
    fn field_type(&self, index: FieldIndex) -> TypeTag;

    /// `chrony_get_field_integer`.
    fn integer(&self, index: FieldIndex) -> i64;

    /// `chrony_get_field_uinteger`.
    fn uinteger(&self, index: FieldIndex) -> u64;

    /// `chrony_get_field_float`.
    fn float(&self, index: FieldIndex) -> f64;

    /// `chrony_get_field_timespec`.
    fn timespec(&self, index: FieldIndex) -> Timespec;

    /// `chrony_get_field_string`; `None` for a NULL pointer.
    fn string(&self, index: FieldIndex) -> Option<String>;

    /// Deinitializes the session and closes the socket.
    ///
    /// Must be idempotent: a second call is a no-op.
    fn close(&mut self);
}
