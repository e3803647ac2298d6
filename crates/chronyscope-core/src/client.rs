//! Report client: one session per call, driver, validators, snapshots.

use crate::config::ClientConfig;
use crate::descriptor::{DescriptorTable, ReportKind};
use crate::driver::ReportDriver;
use crate::error::{ChronyError, DataReason, Result};
use crate::native::ChronyLibrary;
use crate::record::FieldMap;
use crate::session::Session;
use crate::snapshot::{RtcData, Source, SourceStats, TrackingStatus};
use crate::validate;

/// Reads chrony reports through a native library.
///
/// Holds no connection: every call resolves the target, opens its own
/// session and closes it before returning, so calls never share state.
#[derive(Debug, Clone)]
pub struct Client<L: ChronyLibrary> {
    library: L,
    config: ClientConfig,
    driver: ReportDriver,
}

impl<L: ChronyLibrary> Client<L> {
    /// Creates a client with the builtin descriptor table.
    #[must_use]
    pub fn new(library: L, config: ClientConfig) -> Self {
        Self::with_table(library, config, DescriptorTable::builtin())
    }

    /// Creates a client with a custom descriptor table.
    #[must_use]
    pub const fn with_table(library: L, config: ClientConfig, table: DescriptorTable) -> Self {
        Self {
            library,
            config,
            driver: ReportDriver::new(table),
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Native library in use.
    #[must_use]
    pub const fn library(&self) -> &L {
        &self.library
    }

    /// Current synchronization state.
    ///
    /// # Errors
    /// Connection, permission, library or data error.
    pub fn tracking(&self) -> Result<TrackingStatus> {
        let maps = self.fetch(ReportKind::Tracking)?;
        single(self.report_name(ReportKind::Tracking), &maps, validate::tracking)
    }

    /// All configured time sources, in chronyd's order. Empty is not an error.
    ///
    /// # Errors
    /// Fails on the first record that does not validate, after checking all.
    pub fn sources(&self) -> Result<Vec<Source>> {
        all_valid(self.sources_each()?)
    }

    /// Like [`Client::sources`], but keeps each record's validation outcome.
    ///
    /// The outer error is a protocol failure that aborted the whole report;
    /// inner errors belong to one record only.
    ///
    /// # Errors
    /// Connection, permission, library or request error.
    pub fn sources_each(&self) -> Result<Vec<Result<Source>>> {
        let maps = self.fetch(ReportKind::Sources)?;
        Ok(each(self.report_name(ReportKind::Sources), &maps, validate::source))
    }

    /// Statistics for every source, in chronyd's order.
    ///
    /// # Errors
    /// Fails on the first record that does not validate, after checking all.
    pub fn source_stats(&self) -> Result<Vec<SourceStats>> {
        all_valid(self.source_stats_each()?)
    }

    /// Like [`Client::source_stats`], but keeps each record's outcome.
    ///
    /// # Errors
    /// Connection, permission, library or request error.
    pub fn source_stats_each(&self) -> Result<Vec<Result<SourceStats>>> {
        let maps = self.fetch(ReportKind::SourceStats)?;
        Ok(each(self.report_name(ReportKind::SourceStats), &maps, validate::source_stats))
    }

    /// RTC calibration data.
    ///
    /// # Errors
    /// Data error with the unavailable reason when chronyd does not track
    /// the RTC.
    pub fn rtc_data(&self) -> Result<RtcData> {
        let maps = self.fetch(ReportKind::RtcData)?;
        single(self.report_name(ReportKind::RtcData), &maps, validate::rtc_data)
    }

    fn report_name(&self, kind: ReportKind) -> &'static str {
        self.driver.table().get(kind).name
    }

    fn fetch(&self, kind: ReportKind) -> Result<Vec<FieldMap>> {
        let target = self.config.resolve_target()?;
        Session::scoped(&self.library, &target, |session| {
            self.driver.request(session, kind)
        })
    }
}

fn single<T>(report: &'static str, maps: &[FieldMap], check: fn(&FieldMap) -> Result<T>) -> Result<T> {
    match maps {
        [map] => check(map).map_err(|e| e.with_report(report)),
        _ => Err(ChronyError::data(
            DataReason::MalformedResponse,
            format!("expected one {report} record, got {}", maps.len()),
        )
        .with_report(report)),
    }
}

fn each<T>(
    report: &'static str,
    maps: &[FieldMap],
    check: fn(&FieldMap) -> Result<T>,
) -> Vec<Result<T>> {
    maps.iter()
        .enumerate()
        .map(|(record, map)| {
            check(map).map_err(|e| e.with_report(report).with_record(record))
        })
        .collect()
}

fn all_valid<T>(outcomes: Vec<Result<T>>) -> Result<Vec<T>> {
    outcomes.into_iter().collect()
}
