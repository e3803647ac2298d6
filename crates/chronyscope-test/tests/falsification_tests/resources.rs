//! Falsification Tests: Category D - Resource Safety (F036-F045)
//!
//! Every call opens its own session and closes it exactly once, whatever
//! the outcome.

use chronyscope_core::testing::{ConnectFault, FakeChrony, FakeRecord, FakeValue};
use chronyscope_core::{ChronyConnection, DataReason, ReportKind, Session};
use chronyscope_test::{Fault, FaultHarness, healthy_fake};

use super::{SOCKET, client};

// =============================================================================
// F036-F039: Fault sweep
// =============================================================================

/// F036: No fault at any stage leaks or double-closes a connection
///
/// # Falsification Attempt
/// Every report kind under every fault.
#[test]
fn f036_fault_sweep_is_clean() {
    let observations = FaultHarness::new().sweep().unwrap();
    assert_eq!(observations.len(), ReportKind::ALL.len() * Fault::ALL.len());
    for observation in &observations {
        assert!(
            observation.is_clean(),
            "F036 FALSIFIED: {} under {:?}: {observation:?}",
            observation.kind,
            observation.fault
        );
    }
}

/// F037: The sweep also holds with multi-part responses
///
/// # Falsification Attempt
/// Three response parts per request.
#[test]
fn f037_fault_sweep_multipart() {
    let result = FaultHarness::new().with_responses_per_request(3).sweep();
    assert!(result.is_ok(), "F037 FALSIFIED: {result:?}");
}

/// F038: A failed connect opens nothing that needs closing
///
/// # Falsification Attempt
/// All three connect faults.
#[test]
fn f038_connect_failure_opens_nothing() {
    let harness = FaultHarness::new();
    for fault in [Fault::ConnectMissing, Fault::ConnectDenied, Fault::SessionInit] {
        let observation = harness.run(ReportKind::Tracking, fault);
        assert_eq!(observation.opened, 0, "F038 FALSIFIED: {fault:?}");
        assert_eq!(observation.closed, 0, "F038 FALSIFIED: {fault:?}");
    }
}

/// F039: A validation failure still closes the session
///
/// # Falsification Attempt
/// NaN offset in tracking.
#[test]
fn f039_validation_failure_closes() {
    let fake = FakeChrony::new().with_report(
        "tracking",
        vec![FakeRecord::tracking().with("current correction", FakeValue::Float(f64::NAN))],
    );
    let err = client(&fake).tracking().unwrap_err();
    assert_eq!(err.data_reason(), Some(DataReason::InvalidValue));
    assert_eq!(fake.ledger().opened(), 1);
    assert_eq!(fake.ledger().closed(), 1, "F039 FALSIFIED: session left open");
}

// =============================================================================
// F040-F042: Session lifecycle
// =============================================================================

/// F040: Closing twice closes once
///
/// # Falsification Attempt
/// Explicit close, then drop.
#[test]
fn f040_close_is_idempotent() {
    let fake = healthy_fake();
    let mut session = Session::open(&fake, SOCKET).unwrap();
    session.close();
    session.close();
    drop(session);
    assert_eq!(fake.ledger().closed(), 1);
    assert_eq!(fake.ledger().double_closes(), 0, "F040 FALSIFIED: double close");
}

/// F041: Dropping an open session closes it
///
/// # Falsification Attempt
/// Drop without calling close.
#[test]
fn f041_drop_closes() {
    let fake = healthy_fake();
    drop(Session::open(&fake, SOCKET).unwrap());
    assert_eq!(fake.ledger().closed(), 1, "F041 FALSIFIED: drop did not close");
    assert_eq!(fake.ledger().leaked(), 0);
}

/// F042: A closed session refuses further requests without touching libchrony
///
/// # Falsification Attempt
/// Ask for a connection after close.
#[test]
fn f042_closed_session_refuses_requests() {
    let fake = healthy_fake();
    let mut session = Session::open(&fake, SOCKET).unwrap();
    session.connection().unwrap().request_record("tracking", 0).unwrap();
    while session.connection().unwrap().needs_response() {
        session.connection().unwrap().process_response().unwrap();
    }
    session.close();
    let err = session.connection().unwrap_err();
    assert_eq!(
        err.data_reason(),
        Some(DataReason::SessionClosed),
        "F042 FALSIFIED"
    );
    assert_eq!(fake.ledger().used_after_close(), 0);
}

// =============================================================================
// F043-F045: Independent snapshots
// =============================================================================

/// F043: Sequential calls each open and tear down their own session
///
/// # Falsification Attempt
/// Two tracking calls back to back.
#[test]
fn f043_sequential_calls_are_independent() {
    let fake = healthy_fake();
    let client = client(&fake);
    let first = client.tracking().unwrap();
    let second = client.tracking().unwrap();
    assert_eq!(first, second);
    assert_eq!(fake.ledger().opened(), 2, "F043 FALSIFIED: session reused");
    assert_eq!(fake.ledger().closed(), 2);
}

/// F044: Concurrent calls neither block nor share a session
///
/// # Falsification Attempt
/// Eight threads reading sources at once.
#[test]
fn f044_concurrent_calls() {
    let fake = healthy_fake().responses_per_request(2);
    let client = client(&fake);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| client.sources().map(|s| s.len())))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), 3, "F044 FALSIFIED");
        }
    });
    assert_eq!(fake.ledger().opened(), 8);
    assert!(fake.ledger().is_clean(), "F044 FALSIFIED: {:?}", fake.ledger());
}

/// F045: Snapshots outlive the session they were read on
///
/// # Falsification Attempt
/// Keep a snapshot after a later call fails.
#[test]
fn f045_snapshots_are_owned() {
    let fake = healthy_fake();
    let sources = client(&fake).sources().unwrap();
    let broken = fake.clone().fail_connect(ConnectFault::Missing);
    assert!(client(&broken).sources().is_err());
    assert_eq!(sources.len(), 3, "F045 FALSIFIED: snapshot changed");
    assert_eq!(sources[0].address(), "10.0.0.1");
}
