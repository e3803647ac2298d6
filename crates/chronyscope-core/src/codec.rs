//! Field codec: turns libchrony's (name, type tag, value) triples into Rust values.

use std::fmt;

use crate::classify::{NativeFailure, Stage, classify};
use crate::descriptor::{FieldSpec, FieldType};
use crate::error::Result;
use crate::native::{ChronyConnection, FieldIndex, Timespec, TypeTag};

/// Nanoseconds per second, for timespec conversion.
pub const NANOSECONDS_PER_SECOND: f64 = 1e9;

/// A decoded field value.
///
/// Signedness and width follow libchrony: no variant narrows what the
/// native accessor returned.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// From `chrony_get_field_integer`.
    Integer(i64),
    /// From `chrony_get_field_uinteger`.
    UInteger(u64),
    /// From `chrony_get_field_float`.
    Float(f64),
    /// From `chrony_get_field_timespec`, as seconds since the epoch.
    Time(f64),
    /// From `chrony_get_field_string`.
    String(String),
}

impl FieldValue {
    /// The descriptor type this value decodes.
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::Integer(_) => FieldType::Integer,
            Self::UInteger(_) => FieldType::UInteger,
            Self::Float(_) => FieldType::Float,
            Self::Time(_) => FieldType::Time,
            Self::String(_) => FieldType::String,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::UInteger(v) => write!(f, "{v}"),
            Self::Float(v) | Self::Time(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
        }
    }
}

/// Type tag libchrony must report for a descriptor type.
#[must_use]
pub const fn expected_tag(ty: FieldType) -> TypeTag {
    match ty {
        FieldType::Integer => TypeTag::Integer,
        FieldType::UInteger => TypeTag::UInteger,
        FieldType::Float => TypeTag::Float,
        FieldType::Time => TypeTag::Timespec,
        FieldType::String => TypeTag::String,
    }
}

/// Converts a timespec to floating seconds since the epoch.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn timespec_to_seconds(ts: Timespec) -> f64 {
    ts.sec as f64 + ts.nsec as f64 / NANOSECONDS_PER_SECOND
}

/// Decodes the field at `index` with the accessor matching its type tag.
///
/// Fails with a type-mismatch data error if the introspected tag is not the
/// one `spec` declares.
pub fn decode_field<C: ChronyConnection + ?Sized>(
    conn: &C,
    index: FieldIndex,
    spec: &FieldSpec,
) -> Result<FieldValue> {
    let found = conn.field_type(index);
    if found != expected_tag(spec.ty) {
        return Err(classify(
            Stage::Introspect,
            NativeFailure::TypeMismatch {
                field: spec.name,
                expected: spec.ty,
                found,
            },
        ));
    }

    let value = match spec.ty {
        FieldType::Integer => FieldValue::Integer(conn.integer(index)),
        FieldType::UInteger => FieldValue::UInteger(conn.uinteger(index)),
        FieldType::Float => FieldValue::Float(conn.float(index)),
        FieldType::Time => FieldValue::Time(timespec_to_seconds(conn.timespec(index))),
        FieldType::String => FieldValue::String(conn.string(index).unwrap_or_default()),
    };
    tracing::trace!(field = spec.name, %value, "decoded field");
    Ok(value)
}
