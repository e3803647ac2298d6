//! In-memory libchrony double for tests.
//!
//! [`FakeChrony`] serves scripted report records through the same
//! request/response state machine as the real library, can fail at any stage,
//! and keeps a [`HandleLedger`] so tests can prove that every connection was
//! closed exactly once and that no request was pipelined.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::classify::NativeFailure;
use crate::native::{
    ChronyConnection, ChronyLibrary, FieldIndex, NativeStatus, Timespec, TypeTag,
};

const ENOENT: i32 = 2;
const EACCES: i32 = 13;

/// Status for a report name the fake does not serve.
pub const STATUS_UNKNOWN_REPORT: i32 = 4;
/// Status for a record index past the end of the report.
pub const STATUS_UNKNOWN_RECORD: i32 = 5;
/// Status for an injected failure.
pub const STATUS_INJECTED: i32 = 6;
/// Status for a request issued while a response was still pending.
pub const STATUS_PIPELINED: i32 = 8;
/// Status for data the daemon does not have (RTC tracking disabled).
pub const STATUS_UNAVAILABLE: i32 = 10;

/// A scripted field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FakeValue {
    /// Signed integer.
    Integer(i64),
    /// Unsigned integer.
    UInteger(u64),
    /// Float.
    Float(f64),
    /// Timespec.
    Timespec(i64, i64),
    /// String.
    String(String),
    /// String accessor returning NULL.
    NullString,
}

impl FakeValue {
    /// Tag the fake reports for this value.
    #[must_use]
    pub const fn tag(&self) -> TypeTag {
        match self {
            Self::Integer(_) => TypeTag::Integer,
            Self::UInteger(_) => TypeTag::UInteger,
            Self::Float(_) => TypeTag::Float,
            Self::Timespec(..) => TypeTag::Timespec,
            Self::String(_) | Self::NullString => TypeTag::String,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FakeField {
    name: String,
    value: FakeValue,
    tag: TypeTag,
}

/// One scripted record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeRecord {
    fields: Vec<FakeField>,
}

impl FakeRecord {
    /// Empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, with the tag matching the value.
    #[must_use]
    pub fn with(mut self, name: &str, value: FakeValue) -> Self {
        let tag = value.tag();
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.value = value;
            field.tag = tag;
        } else {
            self.fields.push(FakeField {
                name: name.to_string(),
                value,
                tag,
            });
        }
        self
    }

    /// Overrides the introspected tag of `name` without touching its value.
    #[must_use]
    pub fn with_tag(mut self, name: &str, tag: TypeTag) -> Self {
        if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
            field.tag = tag;
        }
        self
    }

    /// Removes `name`, so introspection no longer knows it.
    #[must_use]
    pub fn without(mut self, name: &str) -> Self {
        self.fields.retain(|f| f.name != name);
        self
    }

    /// A synchronized `tracking` record.
    #[must_use]
    pub fn tracking() -> Self {
        Self::new()
            .with("reference ID", FakeValue::UInteger(0xC0A8_0101))
            .with("address", FakeValue::String("192.168.1.1".into()))
            .with("stratum", FakeValue::UInteger(2))
            .with("leap status", FakeValue::UInteger(0))
            .with("reference time", FakeValue::Timespec(1_705_320_000, 500_000_000))
            .with("current correction", FakeValue::Float(0.000_123_456))
            .with("last offset", FakeValue::Float(0.000_111_222))
            .with("RMS offset", FakeValue::Float(0.000_1))
            .with("frequency offset", FakeValue::Float(1.234))
            .with("residual frequency", FakeValue::Float(0.001))
            .with("skew", FakeValue::Float(0.005))
            .with("root delay", FakeValue::Float(0.001_234))
            .with("root dispersion", FakeValue::Float(0.002_345))
            .with("last update interval", FakeValue::Float(64.0))
    }

    /// A selected, reachable NTP client `sources` record.
    #[must_use]
    pub fn source(address: &str) -> Self {
        Self::new()
            .with("address", FakeValue::String(address.to_string()))
            .with("reference ID", FakeValue::UInteger(0))
            .with("poll", FakeValue::Integer(6))
            .with("stratum", FakeValue::UInteger(2))
            .with("state", FakeValue::UInteger(0))
            .with("mode", FakeValue::UInteger(0))
            .with("flags", FakeValue::UInteger(0))
            .with("reachability", FakeValue::UInteger(255))
            .with("last sample ago", FakeValue::UInteger(32))
            .with("original last sample offset", FakeValue::Float(0.000_123))
            .with("adjusted last sample offset", FakeValue::Float(0.000_120))
            .with("last sample error", FakeValue::Float(0.000_010))
    }

    /// A `sourcestats` record.
    #[must_use]
    pub fn source_stats(address: &str) -> Self {
        Self::new()
            .with("reference ID", FakeValue::UInteger(0x0A00_0001))
            .with("address", FakeValue::String(address.to_string()))
            .with("samples", FakeValue::UInteger(8))
            .with("runs", FakeValue::UInteger(3))
            .with("span", FakeValue::UInteger(512))
            .with("standard deviation", FakeValue::Float(0.000_1))
            .with("residual frequency", FakeValue::Float(0.01))
            .with("skew", FakeValue::Float(0.05))
            .with("offset", FakeValue::Float(0.000_123))
            .with("offset error", FakeValue::Float(0.000_01))
    }

    /// An `rtcdata` record.
    #[must_use]
    pub fn rtc() -> Self {
        Self::new()
            .with("reference time", FakeValue::Timespec(1_705_320_000, 0))
            .with("samples", FakeValue::UInteger(10))
            .with("runs", FakeValue::UInteger(4))
            .with("span", FakeValue::UInteger(86_400))
            .with("offset", FakeValue::Float(0.012_345))
            .with("frequency offset", FakeValue::Float(-1.23))
    }

    fn field(&self, index: FieldIndex) -> Option<&FakeField> {
        usize::try_from(index.0).ok().and_then(|i| self.fields.get(i))
    }
}

/// How [`ChronyLibrary::connect`] should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFault {
    /// Socket missing.
    Missing,
    /// Socket present, access denied.
    Denied,
    /// Socket opened, `chrony_init_session` failed.
    SessionInit,
}

/// Request/response step at which a scripted failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeFault {
    /// `chrony_request_report_number_records` fails.
    CountRequest,
    /// Draining the record count response fails.
    CountResponse,
    /// `chrony_request_record` for the index fails.
    RecordRequest(u32),
    /// Draining the record response for the index fails.
    RecordResponse(u32),
}

#[derive(Debug, Clone, Default)]
struct Script {
    reports: HashMap<String, Vec<FakeRecord>>,
    count_overrides: HashMap<String, i64>,
    unavailable: Vec<String>,
    faults: Vec<(String, ExchangeFault)>,
    connect_fault: Option<ConnectFault>,
    responses_per_request: u32,
}

impl Script {
    fn fault(&self, report: &str, fault: ExchangeFault) -> bool {
        self.faults.iter().any(|(r, f)| r == report && *f == fault)
    }
}

#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    double_closes: AtomicUsize,
    leaked: AtomicUsize,
    pipelined: AtomicUsize,
    after_close: AtomicUsize,
    requests: AtomicUsize,
}

/// Shared counters describing how connections were used.
#[derive(Debug, Clone, Default)]
pub struct HandleLedger {
    counters: Arc<Counters>,
}

impl HandleLedger {
    /// Connections successfully opened.
    #[must_use]
    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// Connections closed (first close only).
    #[must_use]
    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    /// Opened minus closed.
    #[must_use]
    pub fn live(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }

    /// `close` calls on an already closed connection.
    #[must_use]
    pub fn double_closes(&self) -> usize {
        self.counters.double_closes.load(Ordering::SeqCst)
    }

    /// Connections dropped without `close`.
    #[must_use]
    pub fn leaked(&self) -> usize {
        self.counters.leaked.load(Ordering::SeqCst)
    }

    /// Requests issued while a response was still pending.
    #[must_use]
    pub fn pipelined(&self) -> usize {
        self.counters.pipelined.load(Ordering::SeqCst)
    }

    /// Calls made on a closed connection.
    #[must_use]
    pub fn used_after_close(&self) -> usize {
        self.counters.after_close.load(Ordering::SeqCst)
    }

    /// Requests issued in total.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.counters.requests.load(Ordering::SeqCst)
    }

    /// True when every opened connection was closed exactly once and the
    /// protocol was never violated.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.live() == 0
            && self.double_closes() == 0
            && self.leaked() == 0
            && self.pipelined() == 0
            && self.used_after_close() == 0
    }
}

/// In-memory [`ChronyLibrary`].
#[derive(Debug, Clone)]
pub struct FakeChrony {
    script: Arc<Script>,
    ledger: HandleLedger,
}

impl Default for FakeChrony {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeChrony {
    /// A fake serving no reports.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Arc::new(Script {
                responses_per_request: 1,
                ..Script::default()
            }),
            ledger: HandleLedger::default(),
        }
    }

    /// A fake serving one record of every report and two sources.
    #[must_use]
    pub fn healthy() -> Self {
        Self::new()
            .with_report("tracking", vec![FakeRecord::tracking()])
            .with_report(
                "sources",
                vec![FakeRecord::source("10.0.0.1"), FakeRecord::source("10.0.0.2")],
            )
            .with_report(
                "sourcestats",
                vec![
                    FakeRecord::source_stats("10.0.0.1"),
                    FakeRecord::source_stats("10.0.0.2"),
                ],
            )
            .with_report("rtcdata", vec![FakeRecord::rtc()])
    }

    fn script_mut(&mut self) -> &mut Script {
        Arc::make_mut(&mut self.script)
    }

    /// Serves `records` for `report`.
    #[must_use]
    pub fn with_report(mut self, report: &str, records: Vec<FakeRecord>) -> Self {
        self.script_mut().reports.insert(report.to_string(), records);
        self
    }

    /// Reports `count` records for `report` regardless of how many exist.
    #[must_use]
    pub fn with_record_count(mut self, report: &str, count: i64) -> Self {
        self.script_mut()
            .count_overrides
            .insert(report.to_string(), count);
        self
    }

    /// Makes `report` unavailable: record responses fail with
    /// [`STATUS_UNAVAILABLE`].
    #[must_use]
    pub fn unavailable(mut self, report: &str) -> Self {
        self.script_mut().unavailable.push(report.to_string());
        self
    }

    /// Fails `report` at the given exchange step with [`STATUS_INJECTED`].
    #[must_use]
    pub fn fail_exchange(mut self, report: &str, fault: ExchangeFault) -> Self {
        self.script_mut().faults.push((report.to_string(), fault));
        self
    }

    /// Fails every connect attempt.
    #[must_use]
    pub fn fail_connect(mut self, fault: ConnectFault) -> Self {
        self.script_mut().connect_fault = Some(fault);
        self
    }

    /// Splits every response into `n` parts that must each be processed.
    #[must_use]
    pub fn responses_per_request(mut self, n: u32) -> Self {
        self.script_mut().responses_per_request = n.max(1);
        self
    }

    /// Handle ledger shared by every connection of this fake.
    #[must_use]
    pub fn ledger(&self) -> &HandleLedger {
        &self.ledger
    }
}

impl ChronyLibrary for FakeChrony {
    type Connection = FakeConnection;

    fn connect(&self, target: &str) -> Result<FakeConnection, NativeFailure> {
        match self.script.connect_fault {
            Some(ConnectFault::Missing) => Err(NativeFailure::TargetMissing {
                target: target.to_string(),
                code: Some(-ENOENT),
            }),
            Some(ConnectFault::Denied) => Err(NativeFailure::AccessDenied {
                target: target.to_string(),
                code: Some(-EACCES),
            }),
            Some(ConnectFault::SessionInit) => {
                Err(NativeFailure::SessionInit(NativeStatus(STATUS_INJECTED)))
            }
            None => {
                self.ledger.counters.opened.fetch_add(1, Ordering::SeqCst);
                Ok(FakeConnection {
                    script: Arc::clone(&self.script),
                    ledger: self.ledger.clone(),
                    pending: None,
                    count: 0,
                    current: None,
                    closed: false,
                })
            }
        }
    }
}

#[derive(Debug)]
enum Pending {
    Count {
        report: String,
        remaining: u32,
        fail: Option<i32>,
    },
    Record {
        report: String,
        index: u32,
        remaining: u32,
        fail: Option<i32>,
    },
}

/// Connection handed out by [`FakeChrony`].
#[derive(Debug)]
pub struct FakeConnection {
    script: Arc<Script>,
    ledger: HandleLedger,
    pending: Option<Pending>,
    count: i64,
    current: Option<FakeRecord>,
    closed: bool,
}

impl FakeConnection {
    fn begin_request(&self) -> Result<(), NativeStatus> {
        self.ledger.counters.requests.fetch_add(1, Ordering::SeqCst);
        if self.closed {
            self.ledger.counters.after_close.fetch_add(1, Ordering::SeqCst);
            return Err(NativeStatus(STATUS_INJECTED));
        }
        if self.pending.is_some() {
            self.ledger.counters.pipelined.fetch_add(1, Ordering::SeqCst);
            return Err(NativeStatus(STATUS_PIPELINED));
        }
        Ok(())
    }

    fn current_field(&self, index: FieldIndex) -> Option<&FakeField> {
        self.current.as_ref().and_then(|record| record.field(index))
    }
}

impl ChronyConnection for FakeConnection {
    fn request_record_count(&mut self, report: &str) -> Result<(), NativeStatus> {
        self.begin_request()?;
        if self.script.fault(report, ExchangeFault::CountRequest) {
            return Err(NativeStatus(STATUS_INJECTED));
        }
        if !self.script.reports.contains_key(report) {
            return Err(NativeStatus(STATUS_UNKNOWN_REPORT));
        }
        let fail = self
            .script
            .fault(report, ExchangeFault::CountResponse)
            .then_some(STATUS_INJECTED);
        self.pending = Some(Pending::Count {
            report: report.to_string(),
            remaining: self.script.responses_per_request,
            fail,
        });
        Ok(())
    }

    fn record_count(&self) -> i64 {
        self.count
    }

    fn request_record(&mut self, report: &str, index: u32) -> Result<(), NativeStatus> {
        self.begin_request()?;
        if self.script.fault(report, ExchangeFault::RecordRequest(index)) {
            return Err(NativeStatus(STATUS_INJECTED));
        }
        if !self.script.reports.contains_key(report) {
            return Err(NativeStatus(STATUS_UNKNOWN_REPORT));
        }
        let fail = if self.script.fault(report, ExchangeFault::RecordResponse(index)) {
            Some(STATUS_INJECTED)
        } else if self.script.unavailable.iter().any(|r| r == report) {
            Some(STATUS_UNAVAILABLE)
        } else {
            None
        };
        self.current = None;
        self.pending = Some(Pending::Record {
            report: report.to_string(),
            index,
            remaining: self.script.responses_per_request,
            fail,
        });
        Ok(())
    }

    fn needs_response(&self) -> bool {
        !self.closed && self.pending.is_some()
    }

    fn process_response(&mut self) -> Result<(), NativeStatus> {
        if self.closed {
            self.ledger.counters.after_close.fetch_add(1, Ordering::SeqCst);
            return Err(NativeStatus(STATUS_INJECTED));
        }
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        match pending {
            Pending::Count {
                report,
                remaining,
                fail,
            } => {
                if let Some(status) = fail {
                    return Err(NativeStatus(status));
                }
                if remaining > 1 {
                    self.pending = Some(Pending::Count {
                        report,
                        remaining: remaining - 1,
                        fail,
                    });
                    return Ok(());
                }
                let served = self.script.reports.get(&report).map_or(0, Vec::len);
                self.count = self
                    .script
                    .count_overrides
                    .get(&report)
                    .copied()
                    .unwrap_or_else(|| i64::try_from(served).unwrap_or(i64::MAX));
                Ok(())
            }
            Pending::Record {
                report,
                index,
                remaining,
                fail,
            } => {
                if let Some(status) = fail {
                    return Err(NativeStatus(status));
                }
                if remaining > 1 {
                    self.pending = Some(Pending::Record {
                        report,
                        index,
                        remaining: remaining - 1,
                        fail,
                    });
                    return Ok(());
                }
                let record = self
                    .script
                    .reports
                    .get(&report)
                    .and_then(|records| records.get(usize::try_from(index).ok()?))
                    .cloned();
                match record {
                    Some(record) => {
                        self.current = Some(record);
                        Ok(())
                    }
                    None => Err(NativeStatus(STATUS_UNKNOWN_RECORD)),
                }
            }
        }
    }

    fn field_index(&self, name: &str) -> Option<FieldIndex> {
        let record = self.current.as_ref()?;
        record
            .fields
            .iter()
            .position(|f| f.name == name)
            .and_then(|i| i32::try_from(i).ok())
            .map(FieldIndex)
    }

    fn field_type(&self, index: FieldIndex) -> TypeTag {
        self.current_field(index)
            .map_or(TypeTag::Unknown(0), |f| f.tag)
    }

    fn integer(&self, index: FieldIndex) -> i64 {
        match self.current_field(index).map(|f| &f.value) {
            Some(FakeValue::Integer(v)) => *v,
            _ => 0,
        }
    }

    fn uinteger(&self, index: FieldIndex) -> u64 {
        match self.current_field(index).map(|f| &f.value) {
            Some(FakeValue::UInteger(v)) => *v,
            _ => 0,
        }
    }

    fn float(&self, index: FieldIndex) -> f64 {
        match self.current_field(index).map(|f| &f.value) {
            Some(FakeValue::Float(v)) => *v,
            _ => 0.0,
        }
    }

    fn timespec(&self, index: FieldIndex) -> Timespec {
        match self.current_field(index).map(|f| &f.value) {
            Some(FakeValue::Timespec(sec, nsec)) => Timespec {
                sec: *sec,
                nsec: *nsec,
            },
            _ => Timespec::default(),
        }
    }

    fn string(&self, index: FieldIndex) -> Option<String> {
        match self.current_field(index).map(|f| &f.value) {
            Some(FakeValue::String(v)) => Some(v.clone()),
            _ => None,
        }
    }

    fn close(&mut self) {
        if self.closed {
            self.ledger
                .counters
                .double_closes
                .fetch_add(1, Ordering::SeqCst);
            return;
        }
        self.closed = true;
        self.pending = None;
        self.current = None;
        self.ledger.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        if !self.closed {
            self.ledger.counters.leaked.fetch_add(1, Ordering::SeqCst);
        }
    }
}
