//! Report driver: runs the singleton and multi-record request protocols.
//!
//! libchrony is a strict request/response state machine. Every request is
//! followed by draining all of its responses before anything else is sent on
//! the connection, including after a failure, which aborts the report.

use crate::classify::{NativeFailure, Stage, classify};
use crate::descriptor::{Cardinality, DescriptorTable, ReportDescriptor, ReportKind};
use crate::error::{ChronyError, Result};
use crate::native::{ChronyConnection, NativeStatus};
use crate::record::{FieldMap, RecordReader};
use crate::session::Session;

/// Drives report requests against an open session.
///
/// Owns the immutable descriptor table it reads reports with.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportDriver {
    table: DescriptorTable,
}

impl ReportDriver {
    /// Creates a driver over `table`.
    #[must_use]
    pub const fn new(table: DescriptorTable) -> Self {
        Self { table }
    }

    /// Descriptor table in use.
    #[must_use]
    pub const fn table(&self) -> &DescriptorTable {
        &self.table
    }

    /// Requests every record of `kind` and decodes each into a [`FieldMap`].
    ///
    /// Singleton reports yield exactly one map. Multi-record reports yield
    /// one map per record in libchrony's order, possibly none.
    ///
    /// # Errors
    ///
    /// Any request or response failure aborts the whole report with a data
    /// error; no partial list is returned. An unavailable optional singleton
    /// fails with [`DataReason::Unavailable`](crate::error::DataReason::Unavailable).
    pub fn request<C: ChronyConnection>(
        &self,
        session: &mut Session<C>,
        kind: ReportKind,
    ) -> Result<Vec<FieldMap>> {
        let descriptor = self.table.get(kind);
        let conn = session.connection()?;
        tracing::debug!(report = descriptor.name, "requesting report");

        let records = match descriptor.cardinality {
            Cardinality::Singleton { optional } => {
                vec![request_singleton(conn, descriptor, optional)?]
            }
            Cardinality::Multi => request_multi(conn, descriptor)?,
        };

        tracing::debug!(
            report = descriptor.name,
            records = records.len(),
            "report complete"
        );
        Ok(records)
    }
}

/// Drains every pending response for the last request.
fn drain<C: ChronyConnection + ?Sized>(conn: &mut C) -> std::result::Result<(), NativeStatus> {
    while conn.needs_response() {
        conn.process_response()?;
    }
    Ok(())
}

fn status_error(stage: Stage, status: NativeStatus, report: &'static str) -> ChronyError {
    classify(stage, NativeFailure::Status(status)).with_report(report)
}

fn request_singleton<C: ChronyConnection + ?Sized>(
    conn: &mut C,
    descriptor: &ReportDescriptor,
    optional: bool,
) -> Result<FieldMap> {
    let exchange = conn
        .request_record(descriptor.name, 0)
        .map_err(|status| (Stage::Request, status))
        .and_then(|()| drain(conn).map_err(|status| (Stage::Response, status)));

    if let Err((stage, status)) = exchange {
        if optional {
            tracing::debug!(report = descriptor.name, %status, "optional report unavailable");
            return Err(classify(stage, NativeFailure::Unavailable)
                .with_report(descriptor.name)
                .with_code(status.code()));
        }
        return Err(status_error(stage, status, descriptor.name));
    }

    RecordReader::new(descriptor).decode(conn)
}

fn request_multi<C: ChronyConnection + ?Sized>(
    conn: &mut C,
    descriptor: &ReportDescriptor,
) -> Result<Vec<FieldMap>> {
    conn.request_record_count(descriptor.name)
        .map_err(|status| status_error(Stage::Request, status, descriptor.name))?;
    drain(conn).map_err(|status| status_error(Stage::Response, status, descriptor.name))?;

    let raw_count = conn.record_count();
    let count = u32::try_from(raw_count).map_err(|_| {
        classify(Stage::Response, NativeFailure::BadRecordCount(raw_count))
            .with_report(descriptor.name)
    })?;
    tracing::debug!(report = descriptor.name, count, "record count");

    let mut reader = RecordReader::new(descriptor);
    // The count comes from the daemon; records accumulate as they arrive.
    let mut records = Vec::new();
    for index in 0..count {
        let record = records.len();
        conn.request_record(descriptor.name, index)
            .map_err(|status| status_error(Stage::Request, status, descriptor.name).with_record(record))?;
        drain(conn).map_err(|status| {
            status_error(Stage::Response, status, descriptor.name).with_record(record)
        })?;
        records.push(reader.decode(conn).map_err(|e| e.with_record(record))?);
    }
    Ok(records)
}
