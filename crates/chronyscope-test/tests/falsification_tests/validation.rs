//! Falsification Tests: Category B - Validation (F011-F025)
//!
//! Every bounded field accepts its extremes and rejects one step past them;
//! every float rejects NaN and infinity, naming the field.

use chronyscope_core::testing::{FakeChrony, FakeRecord, FakeValue};
use chronyscope_core::{ChronyError, DataReason, ErrorKind, FieldType, ReportKind};
use chronyscope_test::faults::report_name;
use chronyscope_test::healthy_records;
use proptest::prelude::*;

use super::client;

/// Runs the public operation for `kind` with one field of the first record
/// replaced.
fn with_field(kind: ReportKind, name: &str, value: FakeValue) -> Result<(), ChronyError> {
    let mut records = healthy_records(kind);
    records[0] = records[0].clone().with(name, value);
    run(kind, records)
}

fn run(kind: ReportKind, records: Vec<FakeRecord>) -> Result<(), ChronyError> {
    let fake = FakeChrony::new().with_report(report_name(kind), records);
    let client = client(&fake);
    match kind {
        ReportKind::Tracking => client.tracking().map(drop),
        ReportKind::Sources => client.sources().map(drop),
        ReportKind::SourceStats => client.source_stats().map(drop),
        ReportKind::RtcData => client.rtc_data().map(drop),
    }
}

fn assert_invalid(result: Result<(), ChronyError>, field: &str, id: &str) {
    let Err(err) = result else {
        panic!("{id} FALSIFIED: {field} accepted");
    };
    assert_eq!(err.kind(), ErrorKind::Data, "{id} FALSIFIED: {field} not a data error");
    assert_eq!(
        err.data_reason(),
        Some(DataReason::InvalidValue),
        "{id} FALSIFIED: {field} wrong reason"
    );
    assert_eq!(err.field(), Some(field), "{id} FALSIFIED: error does not name {field}");
}

// =============================================================================
// F011-F016: Boundaries
// =============================================================================

/// F011: Stratum 0 and 15 validate, 16 does not
///
/// # Falsification Attempt
/// Probe both reports that carry a stratum.
#[test]
fn f011_stratum_bounds() {
    for kind in [ReportKind::Tracking, ReportKind::Sources] {
        for ok in [0, 15] {
            assert!(
                with_field(kind, "stratum", FakeValue::UInteger(ok)).is_ok(),
                "F011 FALSIFIED: {kind} stratum {ok} rejected"
            );
        }
        assert_invalid(with_field(kind, "stratum", FakeValue::UInteger(16)), "stratum", "F011");
    }
}

/// F012: Reachability 0 and 255 validate, 256 does not
///
/// # Falsification Attempt
/// Probe the 8-bit register boundary.
#[test]
fn f012_reachability_bounds() {
    for ok in [0, 255] {
        assert!(
            with_field(ReportKind::Sources, "reachability", FakeValue::UInteger(ok)).is_ok(),
            "F012 FALSIFIED: reachability {ok} rejected"
        );
    }
    assert_invalid(
        with_field(ReportKind::Sources, "reachability", FakeValue::UInteger(256)),
        "reachability",
        "F012",
    );
}

/// F013: Leap status 0..=3 validates, 4 does not
///
/// # Falsification Attempt
/// Walk every legal code and the first illegal one.
#[test]
fn f013_leap_status_bounds() {
    for ok in 0..=3 {
        assert!(
            with_field(ReportKind::Tracking, "leap status", FakeValue::UInteger(ok)).is_ok(),
            "F013 FALSIFIED: leap status {ok} rejected"
        );
    }
    assert_invalid(
        with_field(ReportKind::Tracking, "leap status", FakeValue::UInteger(4)),
        "leap status",
        "F013",
    );
}

/// F014: Source state 0..=5 and mode 0..=2 validate, one past does not
///
/// # Falsification Attempt
/// Walk both enumerations.
#[test]
fn f014_state_and_mode_bounds() {
    for ok in 0..=5 {
        assert!(
            with_field(ReportKind::Sources, "state", FakeValue::UInteger(ok)).is_ok(),
            "F014 FALSIFIED: state {ok} rejected"
        );
    }
    assert_invalid(with_field(ReportKind::Sources, "state", FakeValue::UInteger(6)), "state", "F014");

    for ok in 0..=2 {
        assert!(
            with_field(ReportKind::Sources, "mode", FakeValue::UInteger(ok)).is_ok(),
            "F014 FALSIFIED: mode {ok} rejected"
        );
    }
    assert_invalid(with_field(ReportKind::Sources, "mode", FakeValue::UInteger(3)), "mode", "F014");
}

/// F015: Non-negative fields accept zero and reject the smallest negative
///
/// # Falsification Attempt
/// Probe every magnitude field with 0.0 and -f64::MIN_POSITIVE.
#[test]
fn f015_non_negative_bounds() {
    let fields = [
        (ReportKind::Tracking, "RMS offset"),
        (ReportKind::Tracking, "skew"),
        (ReportKind::Tracking, "root delay"),
        (ReportKind::Tracking, "root dispersion"),
        (ReportKind::Tracking, "last update interval"),
        (ReportKind::Sources, "last sample error"),
        (ReportKind::SourceStats, "standard deviation"),
        (ReportKind::SourceStats, "skew"),
        (ReportKind::SourceStats, "offset error"),
    ];
    for (kind, field) in fields {
        assert!(
            with_field(kind, field, FakeValue::Float(0.0)).is_ok(),
            "F015 FALSIFIED: {kind}.{field} = 0 rejected"
        );
        assert_invalid(
            with_field(kind, field, FakeValue::Float(-f64::MIN_POSITIVE)),
            field,
            "F015",
        );
    }
}

/// F016: Values wider than the snapshot field are rejected, not truncated
///
/// # Falsification Attempt
/// One past u32 for reference ID and sample counts, one past i32 for poll.
#[test]
fn f016_narrowing_is_checked() {
    let too_wide = FakeValue::UInteger(u64::from(u32::MAX) + 1);
    assert_invalid(
        with_field(ReportKind::Tracking, "reference ID", too_wide.clone()),
        "reference ID",
        "F016",
    );
    for field in ["samples", "runs", "span"] {
        assert_invalid(with_field(ReportKind::SourceStats, field, too_wide.clone()), field, "F016");
        assert_invalid(with_field(ReportKind::RtcData, field, too_wide.clone()), field, "F016");
    }
    assert_invalid(
        with_field(ReportKind::Sources, "poll", FakeValue::Integer(i64::from(i32::MAX) + 1)),
        "poll",
        "F016",
    );
    assert!(
        with_field(ReportKind::Sources, "poll", FakeValue::Integer(i64::from(i32::MIN))).is_ok(),
        "F016 FALSIFIED: i32::MIN poll rejected"
    );
}

// =============================================================================
// F017-F019: Non-finite rejection
// =============================================================================

fn float_fields(kind: ReportKind) -> impl Iterator<Item = &'static str> {
    kind.descriptor()
        .fields
        .iter()
        .filter(|spec| spec.ty == FieldType::Float)
        .map(|spec| spec.name)
}

/// F017: NaN is rejected in every float field of every report
///
/// # Falsification Attempt
/// Plant NaN in each float field in turn.
#[test]
fn f017_nan_rejected_everywhere() {
    for kind in ReportKind::ALL {
        for field in float_fields(kind) {
            assert_invalid(with_field(kind, field, FakeValue::Float(f64::NAN)), field, "F017");
        }
    }
}

/// F018: Positive and negative infinity are rejected in every float field
///
/// # Falsification Attempt
/// Plant both infinities in each float field in turn.
#[test]
fn f018_infinity_rejected_everywhere() {
    for kind in ReportKind::ALL {
        for field in float_fields(kind) {
            for value in [f64::INFINITY, f64::NEG_INFINITY] {
                assert_invalid(with_field(kind, field, FakeValue::Float(value)), field, "F018");
            }
        }
    }
}

/// F019: Every report kind has at least one float field under test
///
/// # Falsification Attempt
/// Guard F017/F018 against vacuous success.
#[test]
fn f019_float_coverage_is_not_vacuous() {
    for kind in ReportKind::ALL {
        assert!(
            float_fields(kind).count() > 0,
            "F019 FALSIFIED: {kind} has no float field"
        );
    }
}

// =============================================================================
// F020-F022: Record-level rules
// =============================================================================

/// F020: A reference clock with an empty address is named after its ID
///
/// # Falsification Attempt
/// Serve a GPS refclock with no address, then one with no name either.
#[test]
fn f020_refclock_address_fallback() {
    let fake = FakeChrony::new().with_report(
        "sources",
        vec![FakeRecord::source("").with("reference ID", FakeValue::UInteger(0x4750_5300))],
    );
    let sources = client(&fake).sources().unwrap();
    assert_eq!(sources[0].address(), "GPS", "F020 FALSIFIED: refclock name not used");

    let result = with_field(ReportKind::Sources, "address", FakeValue::String(String::new()));
    assert_invalid(result, "address", "F020");
}

/// F021: One invalid record does not hide the validity of its siblings
///
/// # Falsification Attempt
/// Middle source invalid; inspect per-record outcomes.
#[test]
fn f021_invalid_record_is_isolated() {
    let fake = FakeChrony::new().with_report(
        "sources",
        vec![
            FakeRecord::source("10.0.0.1"),
            FakeRecord::source("10.0.0.2").with("stratum", FakeValue::UInteger(99)),
            FakeRecord::source("10.0.0.3"),
        ],
    );
    let outcomes = client(&fake).sources_each().unwrap();
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_ok(), "F021 FALSIFIED: first source poisoned");
    assert_eq!(outcomes[1].as_ref().unwrap_err().record(), Some(1));
    assert!(outcomes[2].is_ok(), "F021 FALSIFIED: last source poisoned");

    let err = client(&fake).sources().unwrap_err();
    assert_eq!(err.field(), Some("stratum"), "F021 FALSIFIED: aggregate error lost field");
}

/// F022: Source stats may carry an empty address
///
/// # Falsification Attempt
/// Empty address on a sourcestats record.
#[test]
fn f022_source_stats_address_may_be_empty() {
    let result = with_field(ReportKind::SourceStats, "address", FakeValue::String(String::new()));
    assert!(result.is_ok(), "F022 FALSIFIED: empty sourcestats address rejected");
}

// =============================================================================
// F023-F025: Properties
// =============================================================================

proptest! {
    /// F023: Stratum validates exactly when it is at most 15
    #[test]
    fn f023_stratum_property(stratum in 0u64..64) {
        let result = with_field(ReportKind::Tracking, "stratum", FakeValue::UInteger(stratum));
        prop_assert_eq!(result.is_ok(), stratum <= 15, "F023 FALSIFIED at {}", stratum);
    }

    /// F024: Any finite signed offset validates
    #[test]
    fn f024_finite_offsets_validate(offset in -1.0e6f64..1.0e6) {
        for (kind, field) in [
            (ReportKind::Tracking, "current correction"),
            (ReportKind::Tracking, "frequency offset"),
            (ReportKind::Sources, "adjusted last sample offset"),
            (ReportKind::SourceStats, "offset"),
            (ReportKind::RtcData, "frequency offset"),
        ] {
            prop_assert!(
                with_field(kind, field, FakeValue::Float(offset)).is_ok(),
                "F024 FALSIFIED: {}.{} = {} rejected", kind, field, offset
            );
        }
    }

    /// F025: Reachability validates exactly when it fits eight bits
    #[test]
    fn f025_reachability_property(reach in 0u64..1024) {
        let result = with_field(ReportKind::Sources, "reachability", FakeValue::UInteger(reach));
        prop_assert_eq!(result.is_ok(), reach <= 255, "F025 FALSIFIED at {}", reach);
    }
}
