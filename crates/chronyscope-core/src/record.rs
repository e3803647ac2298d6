//! Record reader: decodes the current record of a report into a [`FieldMap`].

use std::collections::BTreeMap;

use crate::classify::{NativeFailure, Stage, classify};
use crate::codec::{FieldValue, decode_field};
use crate::descriptor::{FieldType, ReportDescriptor};
use crate::error::{ChronyError, Result};
use crate::native::{ChronyConnection, FieldIndex};

/// Decoded fields of exactly one record, keyed by native field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    values: BTreeMap<&'static str, FieldValue>,
}

impl FieldMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a value.
    pub fn insert(&mut self, name: &'static str, value: FieldValue) {
        self.values.insert(name, value);
    }

    /// Returns the raw value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Number of decoded fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing was decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over (name, value) pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    /// Signed integer field.
    pub fn integer(&self, name: &'static str) -> Result<i64> {
        match self.lookup(name)? {
            FieldValue::Integer(v) => Ok(*v),
            other => Err(mismatch(name, FieldType::Integer, other)),
        }
    }

    /// Unsigned integer field.
    pub fn uinteger(&self, name: &'static str) -> Result<u64> {
        match self.lookup(name)? {
            FieldValue::UInteger(v) => Ok(*v),
            other => Err(mismatch(name, FieldType::UInteger, other)),
        }
    }

    /// Float field.
    pub fn float(&self, name: &'static str) -> Result<f64> {
        match self.lookup(name)? {
            FieldValue::Float(v) => Ok(*v),
            other => Err(mismatch(name, FieldType::Float, other)),
        }
    }

    /// Time field, in epoch seconds.
    pub fn time(&self, name: &'static str) -> Result<f64> {
        match self.lookup(name)? {
            FieldValue::Time(v) => Ok(*v),
            other => Err(mismatch(name, FieldType::Time, other)),
        }
    }

    /// String field.
    pub fn string(&self, name: &'static str) -> Result<&str> {
        match self.lookup(name)? {
            FieldValue::String(v) => Ok(v),
            other => Err(mismatch(name, FieldType::String, other)),
        }
    }

    fn lookup(&self, name: &'static str) -> Result<&FieldValue> {
        self.values
            .get(name)
            .ok_or_else(|| classify(Stage::Decode, NativeFailure::UnknownField { field: name }))
    }
}

fn mismatch(field: &'static str, expected: FieldType, found: &FieldValue) -> ChronyError {
    classify(
        Stage::Decode,
        NativeFailure::TypeMismatch {
            field,
            expected,
            found: crate::codec::expected_tag(found.field_type()),
        },
    )
}

/// Reads records of one report.
///
/// Field indices are resolved by name on the first record and reused for the
/// following records of the same report; type tags are checked on every record.
#[derive(Debug)]
pub struct RecordReader<'d> {
    descriptor: &'d ReportDescriptor,
    layout: Option<Vec<FieldIndex>>,
}

impl<'d> RecordReader<'d> {
    /// Creates a reader for `descriptor`.
    #[must_use]
    pub const fn new(descriptor: &'d ReportDescriptor) -> Self {
        Self {
            descriptor,
            layout: None,
        }
    }

    /// Descriptor this reader decodes.
    #[must_use]
    pub const fn descriptor(&self) -> &'d ReportDescriptor {
        self.descriptor
    }

    /// Decodes the record whose response was just drained.
    ///
    /// # Errors
    ///
    /// A field libchrony does not know is a library error; a field whose type
    /// tag differs from the descriptor is a type-mismatch data error.
    pub fn decode<C: ChronyConnection + ?Sized>(&mut self, conn: &C) -> Result<FieldMap> {
        let descriptor = self.descriptor;
        let layout = match self.layout.take() {
            Some(layout) => layout,
            None => resolve_layout(conn, descriptor)?,
        };

        let mut map = FieldMap::new();
        for (spec, index) in descriptor.fields.iter().zip(&layout) {
            let value =
                decode_field(conn, *index, spec).map_err(|e| e.with_report(descriptor.name))?;
            map.insert(spec.name, value);
        }

        self.layout = Some(layout);
        Ok(map)
    }
}

fn resolve_layout<C: ChronyConnection + ?Sized>(
    conn: &C,
    descriptor: &ReportDescriptor,
) -> Result<Vec<FieldIndex>> {
    descriptor
        .fields
        .iter()
        .map(|spec| {
            conn.field_index(spec.name).ok_or_else(|| {
                classify(
                    Stage::Introspect,
                    NativeFailure::UnknownField { field: spec.name },
                )
                .with_report(descriptor.name)
            })
        })
        .collect()
}
