//! Falsification Tests: Category E - Error Classification (F046-F055)
//!
//! Every failure lands in exactly one of four kinds: library, connection,
//! permission, data.

use std::io::Write;
use std::time::Duration;

use chronyscope_core::testing::{ConnectFault, ExchangeFault};
use chronyscope_core::{
    ChronyError, Client, ClientConfig, ConfigError, DataReason, ErrorKind, ReportKind,
};
use chronyscope_sys::LibChrony;
use chronyscope_test::{Expected, Fault, FaultHarness, Outcome, healthy_fake};

use super::client;

// =============================================================================
// F046-F049: Boundaries before the first request
// =============================================================================

/// F046: A missing libchrony is a library error naming what was tried
///
/// # Falsification Attempt
/// Load a library name that cannot exist.
#[test]
fn f046_missing_library() {
    let err = LibChrony::load(&["libchronyscope-f046-missing.so.0"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Library, "F046 FALSIFIED");
    assert!(
        err.message().contains("libchronyscope-f046-missing.so.0"),
        "F046 FALSIFIED: message does not name the library: {err}"
    );
}

/// F047: A missing socket is a connection error
///
/// # Falsification Attempt
/// Connect fault "missing".
#[test]
fn f047_missing_socket() {
    let fake = healthy_fake().fail_connect(ConnectFault::Missing);
    let err = client(&fake).tracking().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection, "F047 FALSIFIED");
    assert!(err.to_string().contains("Is chronyd running?"));
}

/// F048: A denied socket is a permission error with remediation advice
///
/// # Falsification Attempt
/// Connect fault "denied".
#[test]
fn f048_denied_socket() {
    let fake = healthy_fake().fail_connect(ConnectFault::Denied);
    let err = client(&fake).sources().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission, "F048 FALSIFIED");
    assert!(err.to_string().contains("chrony group"));
}

/// F049: No socket found on any default path is a connection error
///
/// # Falsification Attempt
/// Point the default candidates into an empty directory.
#[test]
fn f049_no_socket_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.sock");
    let b = dir.path().join("b.sock");
    let config = ClientConfig::builder()
        .default_socket_paths([a.clone(), b.clone()])
        .build();
    let err = Client::new(healthy_fake(), config).tracking().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection, "F049 FALSIFIED");
    assert!(err.message().contains(&a.display().to_string()));
    assert!(err.message().contains(&b.display().to_string()));
}

// =============================================================================
// F050-F052: Boundaries after connect
// =============================================================================

/// F050: Every exchange failure is a data error
///
/// # Falsification Attempt
/// Fail each exchange step of the sources report.
#[test]
fn f050_exchange_failures_are_data_errors() {
    for fault in [
        ExchangeFault::CountRequest,
        ExchangeFault::CountResponse,
        ExchangeFault::RecordRequest(0),
        ExchangeFault::RecordResponse(1),
    ] {
        let fake = healthy_fake().fail_exchange("sources", fault);
        let err = client(&fake).sources().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data, "F050 FALSIFIED: {fault:?}");
        assert_eq!(err.report(), Some("sources"));
        assert!(err.code().is_some(), "F050 FALSIFIED: {fault:?} lost the native code");
    }
}

/// F051: Request and response failures are told apart
///
/// # Falsification Attempt
/// Compare the two halves of one exchange.
#[test]
fn f051_request_vs_response() {
    let request = healthy_fake().fail_exchange("tracking", ExchangeFault::RecordRequest(0));
    let response = healthy_fake().fail_exchange("tracking", ExchangeFault::RecordResponse(0));
    assert_eq!(
        client(&request).tracking().unwrap_err().data_reason(),
        Some(DataReason::RequestFailed),
        "F051 FALSIFIED: request"
    );
    assert_eq!(
        client(&response).tracking().unwrap_err().data_reason(),
        Some(DataReason::MalformedResponse),
        "F051 FALSIFIED: response"
    );
}

/// F052: Multi-record errors say which record failed
///
/// # Falsification Attempt
/// Fail record 1's response.
#[test]
fn f052_record_context() {
    let fake = healthy_fake().fail_exchange("sourcestats", ExchangeFault::RecordResponse(1));
    let err = client(&fake).source_stats().unwrap_err();
    assert_eq!(err.record(), Some(1), "F052 FALSIFIED");
    assert_eq!(err.report(), Some("sourcestats"));
}

// =============================================================================
// F053-F055: Exhaustiveness
// =============================================================================

fn kind_of(expected: Expected) -> Option<ErrorKind> {
    match expected {
        Expected::Success => None,
        Expected::Kind(kind) => Some(kind),
        Expected::Data(_) => Some(ErrorKind::Data),
    }
}

/// F053: Each injected fault yields exactly the expected kind and no other
///
/// # Falsification Attempt
/// Every report under every fault, checking the kind alone.
#[test]
fn f053_error_kind_exhaustiveness() {
    let harness = FaultHarness::new();
    for kind in ReportKind::ALL {
        for fault in Fault::ALL {
            let observation = harness.run(kind, fault);
            let got = match &observation.outcome {
                Outcome::Success { .. } => None,
                Outcome::Failed { kind, .. } => Some(*kind),
            };
            assert_eq!(
                got,
                kind_of(fault.expected(kind)),
                "F053 FALSIFIED: {kind} under {fault:?}"
            );
        }
    }
}

/// F054: Only data errors carry a data reason
///
/// # Falsification Attempt
/// Inspect every failed outcome of the sweep.
#[test]
fn f054_reason_only_on_data_errors() {
    for observation in FaultHarness::new().sweep().unwrap() {
        if let Outcome::Failed { kind, reason, .. } = observation.outcome {
            assert_eq!(
                reason.is_some(),
                kind == ErrorKind::Data,
                "F054 FALSIFIED: {} under {:?}",
                observation.kind,
                observation.fault
            );
        }
    }
}

/// F055: Configuration problems never masquerade as chrony errors
///
/// # Falsification Attempt
/// Broken TOML, a zero timeout and an empty library list.
#[test]
fn f055_config_errors() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "timeout = [not toml").unwrap();
    assert!(
        matches!(ClientConfig::load(file.path()), Err(ConfigError::Parse(_))),
        "F055 FALSIFIED: parse"
    );

    let zero = ClientConfig::builder().timeout(Duration::ZERO).build();
    assert!(matches!(zero.validate(), Err(ConfigError::Invalid(_))), "F055 FALSIFIED: timeout");

    let empty = ClientConfig::builder()
        .library_names(Vec::<String>::new())
        .build();
    assert!(matches!(empty.validate(), Err(ConfigError::Invalid(_))), "F055 FALSIFIED: names");

    let missing = ClientConfig::load("/nonexistent/chronyscope.toml");
    assert!(matches!(missing, Err(ConfigError::Read { .. })), "F055 FALSIFIED: read");

    // Kinds stay closed: a library error converts into no other kind.
    let err = ChronyError::library("x");
    assert_eq!(err.kind(), ErrorKind::Library);
    assert_eq!(err.data_reason(), None);
}
