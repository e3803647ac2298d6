//! Fault catalogue: one failure per pipeline stage.
//!
//! Each [`Fault`] knows how to plant itself into a healthy [`FakeChrony`]
//! and which outcome the public operation must then produce.

use chronyscope_core::testing::{ConnectFault, ExchangeFault, FakeChrony, FakeRecord, FakeValue};
use chronyscope_core::{Cardinality, DataReason, ErrorKind, FieldType, ReportKind};

/// A failure injected at one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// Nothing fails.
    None,
    /// The socket does not exist.
    ConnectMissing,
    /// The socket exists but access is denied.
    ConnectDenied,
    /// `chrony_init_session` fails.
    SessionInit,
    /// Requesting the record count fails.
    CountRequest,
    /// Draining the record count response fails.
    CountResponse,
    /// Requesting the last record fails.
    RecordRequest,
    /// Draining the last record's response fails.
    RecordResponse,
    /// The daemon reports the report as unavailable.
    Unavailable,
    /// libchrony does not know the first descriptor field.
    UnknownField,
    /// The first descriptor field has the wrong type tag.
    WrongType,
    /// The first float field of the last record is NaN.
    NonFinite,
}

impl Fault {
    /// Every fault, `None` first.
    pub const ALL: [Self; 12] = [
        Self::None,
        Self::ConnectMissing,
        Self::ConnectDenied,
        Self::SessionInit,
        Self::CountRequest,
        Self::CountResponse,
        Self::RecordRequest,
        Self::RecordResponse,
        Self::Unavailable,
        Self::UnknownField,
        Self::WrongType,
        Self::NonFinite,
    ];

    /// Builds a fake serving healthy data for every report, with this fault
    /// planted in `kind`.
    #[must_use]
    pub fn plant(self, kind: ReportKind) -> FakeChrony {
        let name = report_name(kind);
        let mut records = healthy_records(kind);
        let last = u32::try_from(records.len().saturating_sub(1)).unwrap_or(0);

        match self {
            Self::UnknownField => {
                let field = first_field(kind);
                records = records.into_iter().map(|r| r.without(field)).collect();
            }
            Self::WrongType => {
                let (field, ty) = first_field_spec(kind);
                let value = match ty {
                    FieldType::Float => FakeValue::UInteger(1),
                    _ => FakeValue::Float(1.0),
                };
                records = records.into_iter().map(|r| r.with(field, value.clone())).collect();
            }
            Self::NonFinite => {
                if let (Some(field), Some(record)) = (first_float(kind), records.last_mut()) {
                    *record = record.clone().with(field, FakeValue::Float(f64::NAN));
                }
            }
            _ => {}
        }

        let fake = healthy_fake().with_report(name, records);
        match self {
            Self::ConnectMissing => fake.fail_connect(ConnectFault::Missing),
            Self::ConnectDenied => fake.fail_connect(ConnectFault::Denied),
            Self::SessionInit => fake.fail_connect(ConnectFault::SessionInit),
            Self::CountRequest => fake.fail_exchange(name, ExchangeFault::CountRequest),
            Self::CountResponse => fake.fail_exchange(name, ExchangeFault::CountResponse),
            Self::RecordRequest => fake.fail_exchange(name, ExchangeFault::RecordRequest(last)),
            Self::RecordResponse => fake.fail_exchange(name, ExchangeFault::RecordResponse(last)),
            Self::Unavailable => fake.unavailable(name),
            Self::None | Self::UnknownField | Self::WrongType | Self::NonFinite => fake,
        }
    }

    /// Outcome the public operation for `kind` must produce under this fault.
    #[must_use]
    pub fn expected(self, kind: ReportKind) -> Expected {
        let descriptor = kind.descriptor();
        let singleton = descriptor.is_singleton();
        let optional = matches!(
            descriptor.cardinality,
            Cardinality::Singleton { optional: true }
        );

        match self {
            Self::None => Expected::Success,
            Self::ConnectMissing | Self::SessionInit => Expected::Kind(ErrorKind::Connection),
            Self::ConnectDenied => Expected::Kind(ErrorKind::Permission),
            // Singletons never ask for a record count.
            Self::CountRequest | Self::CountResponse if singleton => Expected::Success,
            Self::CountRequest => Expected::Data(DataReason::RequestFailed),
            Self::CountResponse => Expected::Data(DataReason::MalformedResponse),
            Self::RecordRequest | Self::RecordResponse | Self::Unavailable if optional => {
                Expected::Data(DataReason::Unavailable)
            }
            Self::RecordRequest => Expected::Data(DataReason::RequestFailed),
            Self::RecordResponse | Self::Unavailable => {
                Expected::Data(DataReason::MalformedResponse)
            }
            Self::UnknownField => Expected::Kind(ErrorKind::Library),
            Self::WrongType => Expected::Data(DataReason::TypeMismatch),
            Self::NonFinite => Expected::Data(DataReason::InvalidValue),
        }
    }

    /// True if the fault fires before a session exists.
    #[must_use]
    pub const fn before_open(self) -> bool {
        matches!(
            self,
            Self::ConnectMissing | Self::ConnectDenied | Self::SessionInit
        )
    }
}

/// What an operation must produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// A snapshot or a list of snapshots.
    Success,
    /// An error of this kind.
    Kind(ErrorKind),
    /// A data error with this reason.
    Data(DataReason),
}

/// Report name for `kind`.
#[must_use]
pub fn report_name(kind: ReportKind) -> &'static str {
    kind.descriptor().name
}

/// Healthy records for one report.
#[must_use]
pub fn healthy_records(kind: ReportKind) -> Vec<FakeRecord> {
    match kind {
        ReportKind::Tracking => vec![FakeRecord::tracking()],
        ReportKind::Sources => vec![
            FakeRecord::source("10.0.0.1"),
            FakeRecord::source("10.0.0.2"),
            FakeRecord::source("10.0.0.3"),
        ],
        ReportKind::SourceStats => vec![
            FakeRecord::source_stats("10.0.0.1"),
            FakeRecord::source_stats("10.0.0.2"),
            FakeRecord::source_stats("10.0.0.3"),
        ],
        ReportKind::RtcData => vec![FakeRecord::rtc()],
    }
}

/// A fake serving [`healthy_records`] for every report.
#[must_use]
pub fn healthy_fake() -> FakeChrony {
    ReportKind::ALL
        .into_iter()
        .fold(FakeChrony::new(), |fake, kind| {
            fake.with_report(report_name(kind), healthy_records(kind))
        })
}

fn first_field(kind: ReportKind) -> &'static str {
    first_field_spec(kind).0
}

fn first_field_spec(kind: ReportKind) -> (&'static str, FieldType) {
    let descriptor = kind.descriptor();
    descriptor
        .fields
        .first()
        .map_or(("", FieldType::String), |spec| (spec.name, spec.ty))
}

fn first_float(kind: ReportKind) -> Option<&'static str> {
    kind.descriptor()
        .fields
        .iter()
        .find(|spec| spec.ty == FieldType::Float)
        .map(|spec| spec.name)
}
