//! Fault harness.
//!
//! Runs every public report operation against a [`FakeChrony`] with one
//! [`Fault`] planted, then checks two things: the operation produced the
//! outcome the fault calls for, and the connection was opened and closed
//! exactly once with the request/response protocol intact.

use chronyscope_core::testing::FakeChrony;
use chronyscope_core::{ChronyError, Client, ClientConfig, DataReason, ErrorKind, ReportKind};

use crate::error::{Result, TestError};
use crate::faults::{Expected, Fault};

/// What one operation returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Snapshots were returned.
    Success {
        /// Number of snapshots.
        records: usize,
    },
    /// The operation failed.
    Failed {
        /// Error category.
        kind: ErrorKind,
        /// Data reason, for data errors.
        reason: Option<DataReason>,
        /// Rendered message.
        message: String,
    },
}

impl Outcome {
    fn from_result(result: std::result::Result<usize, ChronyError>) -> Self {
        match result {
            Ok(records) => Self::Success { records },
            Err(err) => Self::Failed {
                kind: err.kind(),
                reason: err.data_reason(),
                message: err.to_string(),
            },
        }
    }

    /// True if the outcome is what `expected` calls for.
    #[must_use]
    pub fn matches(&self, expected: Expected) -> bool {
        match (self, expected) {
            (Self::Success { .. }, Expected::Success) => true,
            (Self::Failed { kind, .. }, Expected::Kind(want)) => *kind == want,
            (Self::Failed { reason, .. }, Expected::Data(want)) => *reason == Some(want),
            _ => false,
        }
    }
}

/// One run: the operation's outcome plus what the handle ledger saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Report exercised.
    pub kind: ReportKind,
    /// Fault planted.
    pub fault: Fault,
    /// What the operation returned.
    pub outcome: Outcome,
    /// Connections opened.
    pub opened: usize,
    /// Connections closed.
    pub closed: usize,
    /// Connections dropped without close.
    pub leaked: usize,
    /// Repeated closes.
    pub double_closes: usize,
    /// Requests sent while a response was pending.
    pub pipelined: usize,
    /// Calls on a closed connection.
    pub used_after_close: usize,
}

impl Observation {
    /// True if every opened connection was closed exactly once and the
    /// protocol was never violated.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.opened == self.closed
            && self.leaked == 0
            && self.double_closes == 0
            && self.pipelined == 0
            && self.used_after_close == 0
    }
}

/// Runs report operations under planted faults.
#[derive(Debug, Clone)]
pub struct FaultHarness {
    socket: String,
    responses_per_request: u32,
}

impl Default for FaultHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultHarness {
    /// Harness with single-part responses.
    #[must_use]
    pub fn new() -> Self {
        Self {
            socket: "/run/chrony/chronyd.sock".to_string(),
            responses_per_request: 1,
        }
    }

    /// Splits every response into `n` parts.
    #[must_use]
    pub const fn with_responses_per_request(mut self, n: u32) -> Self {
        self.responses_per_request = n;
        self
    }

    /// Socket path handed to the client.
    #[must_use]
    pub fn socket(&self) -> &str {
        &self.socket
    }

    /// Runs the public operation for `kind` once with `fault` planted.
    #[must_use]
    pub fn run(&self, kind: ReportKind, fault: Fault) -> Observation {
        let fake = fault
            .plant(kind)
            .responses_per_request(self.responses_per_request);
        let client = Client::new(fake.clone(), ClientConfig::for_socket(Some(self.socket.as_str())));
        let outcome = Outcome::from_result(call(&client, kind));
        let ledger = fake.ledger();

        let observation = Observation {
            kind,
            fault,
            outcome,
            opened: ledger.opened(),
            closed: ledger.closed(),
            leaked: ledger.leaked(),
            double_closes: ledger.double_closes(),
            pipelined: ledger.pipelined(),
            used_after_close: ledger.used_after_close(),
        };
        tracing::debug!(
            report = %kind,
            ?fault,
            outcome = ?observation.outcome,
            clean = observation.is_clean(),
            "fault run"
        );
        observation
    }

    /// Runs `kind` under `fault` and verifies the outcome and the ledger.
    ///
    /// # Errors
    /// Returns a resource error for a leak or protocol violation, an outcome
    /// error for the wrong result.
    pub fn check(&self, kind: ReportKind, fault: Fault) -> Result<Observation> {
        let observation = self.run(kind, fault);
        verify(&observation)?;
        Ok(observation)
    }

    /// Checks every report kind under every fault.
    ///
    /// # Errors
    /// Returns the first failed check.
    pub fn sweep(&self) -> Result<Vec<Observation>> {
        let mut observations = Vec::with_capacity(ReportKind::ALL.len() * Fault::ALL.len());
        for kind in ReportKind::ALL {
            for fault in Fault::ALL {
                observations.push(self.check(kind, fault)?);
            }
        }
        Ok(observations)
    }
}

/// Verifies one observation.
///
/// # Errors
/// See [`FaultHarness::check`].
pub fn verify(observation: &Observation) -> Result<()> {
    let Observation { kind, fault, .. } = observation;

    if !observation.is_clean() {
        return Err(TestError::resource(format!(
            "{kind} under {fault:?}: opened {} closed {} leaked {} double closes {} pipelined {} used after close {}",
            observation.opened,
            observation.closed,
            observation.leaked,
            observation.double_closes,
            observation.pipelined,
            observation.used_after_close,
        )));
    }

    let expected_opens = usize::from(!fault.before_open());
    if observation.opened != expected_opens {
        return Err(TestError::resource(format!(
            "{kind} under {fault:?}: {} connections opened, expected {expected_opens}",
            observation.opened
        )));
    }

    let expected = fault.expected(*kind);
    if !observation.outcome.matches(expected) {
        return Err(TestError::outcome(format!(
            "{kind} under {fault:?}: got {:?}, expected {expected:?}",
            observation.outcome
        )));
    }
    Ok(())
}

fn call(client: &Client<FakeChrony>, kind: ReportKind) -> std::result::Result<usize, ChronyError> {
    match kind {
        ReportKind::Tracking => client.tracking().map(|_| 1),
        ReportKind::Sources => client.sources().map(|s| s.len()),
        ReportKind::SourceStats => client.source_stats().map(|s| s.len()),
        ReportKind::RtcData => client.rtc_data().map(|_| 1),
    }
}
