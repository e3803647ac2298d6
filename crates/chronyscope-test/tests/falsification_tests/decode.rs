//! Falsification Tests: Category A - Field Decoding (F001-F010)
//!
//! Every descriptor field is looked up by name and decoded with the accessor
//! its type tag calls for.

use chronyscope_core::codec::timespec_to_seconds;
use chronyscope_core::testing::{FakeChrony, FakeRecord, FakeValue};
use chronyscope_core::{
    DataReason, ErrorKind, FieldType, FieldValue, ReportKind, Timespec, TypeTag,
};
use chronyscope_test::faults::report_name;
use chronyscope_test::healthy_records;
use proptest::prelude::*;

use super::drive;

/// Known value of the declared type, as scripted and as expected decoded.
fn sample(ty: FieldType, seed: u32) -> (FakeValue, FieldValue) {
    match ty {
        FieldType::Integer => (
            FakeValue::Integer(-i64::from(seed) - 3),
            FieldValue::Integer(-i64::from(seed) - 3),
        ),
        FieldType::UInteger => (
            FakeValue::UInteger(u64::from(seed) + 7),
            FieldValue::UInteger(u64::from(seed) + 7),
        ),
        FieldType::Float => (
            FakeValue::Float(f64::from(seed) * 0.125),
            FieldValue::Float(f64::from(seed) * 0.125),
        ),
        FieldType::Time => (
            FakeValue::Timespec(1_700_000_000 + i64::from(seed), 250_000_000),
            FieldValue::Time(timespec_to_seconds(Timespec {
                sec: 1_700_000_000 + i64::from(seed),
                nsec: 250_000_000,
            })),
        ),
        FieldType::String => (
            FakeValue::String(format!("field-{seed}")),
            FieldValue::String(format!("field-{seed}")),
        ),
    }
}

fn decode_one(kind: ReportKind, record: FakeRecord) -> chronyscope_core::Result<chronyscope_core::FieldMap> {
    let fake = FakeChrony::new().with_report(report_name(kind), vec![record]);
    let mut maps = drive(&fake, kind)?;
    assert_eq!(maps.len(), 1);
    Ok(maps.remove(0))
}

fn base(kind: ReportKind) -> FakeRecord {
    healthy_records(kind).remove(0)
}

// =============================================================================
// F001-F007: Round-trip decode
// =============================================================================

/// F001: Every field of every descriptor decodes to the value libchrony returned
///
/// # Falsification Attempt
/// Script a distinct known value for each field and compare the field map.
#[test]
fn f001_every_field_round_trips() {
    for kind in ReportKind::ALL {
        let descriptor = kind.descriptor();
        let mut record = FakeRecord::new();
        let mut expected = Vec::new();
        for (seed, spec) in (1..).zip(descriptor.fields) {
            let (fake, value) = sample(spec.ty, seed);
            record = record.with(spec.name, fake);
            expected.push((spec.name, value));
        }

        let map = decode_one(kind, record).unwrap();
        assert_eq!(map.len(), descriptor.fields.len(), "F001 FALSIFIED: {kind} map size");
        for (name, value) in expected {
            assert_eq!(
                map.get(name),
                Some(&value),
                "F001 FALSIFIED: {kind}.{name} did not round-trip"
            );
        }
    }
}

/// F002: Field lookup does not depend on position
///
/// # Falsification Attempt
/// Serve the fields in reverse descriptor order.
#[test]
fn f002_lookup_is_by_name() {
    for kind in ReportKind::ALL {
        let descriptor = kind.descriptor();
        let mut record = FakeRecord::new();
        for (seed, spec) in (1..).zip(descriptor.fields.iter().rev()) {
            record = record.with(spec.name, sample(spec.ty, seed).0);
        }
        let map = decode_one(kind, record).unwrap();
        for (seed, spec) in (1..).zip(descriptor.fields.iter().rev()) {
            assert_eq!(
                map.get(spec.name),
                Some(&sample(spec.ty, seed).1),
                "F002 FALSIFIED: {kind}.{} read from the wrong position",
                spec.name
            );
        }
    }
}

/// F003: A NULL string decodes as empty, never as an error or garbage
///
/// # Falsification Attempt
/// Make libchrony return NULL for the tracking address.
#[test]
fn f003_null_string_is_empty() {
    let record = base(ReportKind::Tracking).with("address", FakeValue::NullString);
    let map = decode_one(ReportKind::Tracking, record).unwrap();
    assert_eq!(
        map.string("address").unwrap(),
        "",
        "F003 FALSIFIED: NULL string not decoded as empty"
    );
}

/// F004: Timespec fields decode to fractional epoch seconds
///
/// # Falsification Attempt
/// Half a second past a known epoch.
#[test]
fn f004_timespec_is_epoch_seconds() {
    let record = base(ReportKind::RtcData)
        .with("reference time", FakeValue::Timespec(1_705_320_000, 500_000_000));
    let map = decode_one(ReportKind::RtcData, record).unwrap();
    assert!(
        (map.time("reference time").unwrap() - 1_705_320_000.5).abs() < 1e-6,
        "F004 FALSIFIED: timespec not converted to seconds"
    );
}

proptest! {
    /// F005: Signed integers survive decoding unchanged
    #[test]
    fn f005_signed_integers_round_trip(poll in any::<i64>()) {
        let record = base(ReportKind::Sources).with("poll", FakeValue::Integer(poll));
        let map = decode_one(ReportKind::Sources, record).unwrap();
        prop_assert_eq!(map.integer("poll").unwrap(), poll, "F005 FALSIFIED");
    }

    /// F006: Unsigned integers survive decoding unchanged, full width
    #[test]
    fn f006_unsigned_integers_round_trip(flags in any::<u64>()) {
        let record = base(ReportKind::Sources).with("flags", FakeValue::UInteger(flags));
        let map = decode_one(ReportKind::Sources, record).unwrap();
        prop_assert_eq!(map.uinteger("flags").unwrap(), flags, "F006 FALSIFIED");
    }

    /// F007: Floats and strings survive decoding unchanged
    #[test]
    fn f007_floats_and_strings_round_trip(
        skew in prop::num::f64::NORMAL | prop::num::f64::ZERO,
        address in "[ -~]{1,40}",
    ) {
        let record = base(ReportKind::SourceStats)
            .with("skew", FakeValue::Float(skew))
            .with("address", FakeValue::String(address.clone()));
        let map = decode_one(ReportKind::SourceStats, record).unwrap();
        prop_assert_eq!(map.float("skew").unwrap(), skew, "F007 FALSIFIED: float");
        prop_assert_eq!(map.string("address").unwrap(), address.as_str(), "F007 FALSIFIED: string");
    }
}

// =============================================================================
// F008-F010: Introspection failures
// =============================================================================

/// F008: A wrong type tag is a type-mismatch data error naming the field
///
/// # Falsification Attempt
/// Mis-tag each field of each report in turn.
#[test]
fn f008_type_mismatch_names_field() {
    for kind in ReportKind::ALL {
        for spec in kind.descriptor().fields {
            let wrong = if spec.ty == FieldType::String {
                TypeTag::Float
            } else {
                TypeTag::String
            };
            let record = base(kind).with_tag(spec.name, wrong);
            let err = decode_one(kind, record).unwrap_err();
            assert_eq!(
                err.data_reason(),
                Some(DataReason::TypeMismatch),
                "F008 FALSIFIED: {kind}.{} mis-tag not a type mismatch",
                spec.name
            );
            assert_eq!(err.field(), Some(spec.name), "F008 FALSIFIED: field not named");
        }
    }
}

/// F009: A field libchrony does not know is a library error, not missing data
///
/// # Falsification Attempt
/// Remove each field of each report in turn.
#[test]
fn f009_unknown_field_is_library_error() {
    for kind in ReportKind::ALL {
        for spec in kind.descriptor().fields {
            let record = base(kind).without(spec.name);
            let err = decode_one(kind, record).unwrap_err();
            assert_eq!(
                err.kind(),
                ErrorKind::Library,
                "F009 FALSIFIED: missing {kind}.{} classified as {}",
                spec.name,
                err.kind()
            );
            assert_eq!(err.field(), Some(spec.name));
        }
    }
}

/// F010: Field names are case-sensitive
///
/// # Falsification Attempt
/// Serve "rms offset" instead of "RMS offset".
#[test]
fn f010_field_names_are_case_sensitive() {
    let record = base(ReportKind::Tracking)
        .without("RMS offset")
        .with("rms offset", FakeValue::Float(0.0001));
    let err = decode_one(ReportKind::Tracking, record).unwrap_err();
    assert_eq!(
        err.kind(),
        ErrorKind::Library,
        "F010 FALSIFIED: lowercase field name accepted"
    );
}
