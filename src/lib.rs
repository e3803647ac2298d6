// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! chronyscope: read-only chronyd monitoring through libchrony.
//!
//! One call per report. Each call loads libchrony, opens a session on the
//! chronyd socket, reads and validates the report, and closes the session
//! before returning.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! fn main() -> chronyscope::Result<()> {
//!     let status = chronyscope::tracking(None)?;
//!     println!(
//!         "{} stratum {} offset {:+.9}s",
//!         status.reference_id_name(),
//!         status.stratum(),
//!         status.offset()
//!     );
//!
//!     for source in chronyscope::sources(Some("/run/chrony/chronyd.sock"))? {
//!         println!("{:<24} {} {}", source.address(), source.state_name(), source.reachability());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! With an explicit configuration, for example loaded from TOML:
//!
//! ```rust,no_run
//! use chronyscope::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::load("/etc/chronyscope.toml")?;
//! match chronyscope::rtc_data_with(&config) {
//!     Ok(rtc) => println!("RTC offset {:+.6}s", rtc.offset()),
//!     Err(e) if e.is_unavailable() => println!("RTC tracking disabled"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "tokio")]
mod timeout;

pub use chronyscope_core as core;
pub use chronyscope_sys as sys;

pub use chronyscope_core::{
    ChronyError, ClientConfig, ConfigError, DataReason, ErrorKind, LeapStatus, Result, RtcData,
    Source, SourceMode, SourceState, SourceStats, TrackingStatus,
};
#[cfg(feature = "tokio")]
pub use timeout::{rtc_data_within, source_stats_within, sources_within, tracking_within};

use chronyscope_core::Client;
use chronyscope_sys::LibChrony;

/// Prelude module for common imports.
pub mod prelude {
    pub use chronyscope_core::{
        ChronyError, Client, ClientConfig, ErrorKind, LeapStatus, RtcData, Source, SourceMode,
        SourceState, SourceStats, TrackingStatus,
    };
    pub use chronyscope_sys::LibChrony;
}

fn client(config: &ClientConfig) -> Result<Client<LibChrony>> {
    let library = LibChrony::load(config.library_names.as_slice())?;
    tracing::debug!(library = library.name(), "using libchrony");
    Ok(Client::new(library, config.clone()))
}

/// Reads the `tracking` report.
///
/// `socket_path` overrides the default socket candidates.
///
/// # Errors
/// Library, connection, permission or data error.
pub fn tracking(socket_path: Option<&str>) -> Result<TrackingStatus> {
    tracking_with(&ClientConfig::for_socket(socket_path))
}

/// Reads the `tracking` report with an explicit configuration.
///
/// # Errors
/// See [`tracking`].
pub fn tracking_with(config: &ClientConfig) -> Result<TrackingStatus> {
    client(config)?.tracking()
}

/// Reads the `sources` report. An empty list is not an error.
///
/// # Errors
/// Library, connection, permission or data error. A record that fails
/// validation fails the whole call.
pub fn sources(socket_path: Option<&str>) -> Result<Vec<Source>> {
    sources_with(&ClientConfig::for_socket(socket_path))
}

/// Reads the `sources` report with an explicit configuration.
///
/// # Errors
/// See [`sources`].
pub fn sources_with(config: &ClientConfig) -> Result<Vec<Source>> {
    client(config)?.sources()
}

/// Reads the `sourcestats` report. An empty list is not an error.
///
/// # Errors
/// See [`sources`].
pub fn source_stats(socket_path: Option<&str>) -> Result<Vec<SourceStats>> {
    source_stats_with(&ClientConfig::for_socket(socket_path))
}

/// Reads the `sourcestats` report with an explicit configuration.
///
/// # Errors
/// See [`sources`].
pub fn source_stats_with(config: &ClientConfig) -> Result<Vec<SourceStats>> {
    client(config)?.source_stats()
}

/// Reads the `rtcdata` report.
///
/// # Errors
/// A daemon without RTC tracking yields a data error for which
/// [`ChronyError::is_unavailable`] is true; otherwise as [`tracking`].
pub fn rtc_data(socket_path: Option<&str>) -> Result<RtcData> {
    rtc_data_with(&ClientConfig::for_socket(socket_path))
}

/// Reads the `rtcdata` report with an explicit configuration.
///
/// # Errors
/// See [`rtc_data`].
pub fn rtc_data_with(config: &ClientConfig) -> Result<RtcData> {
    client(config)?.rtc_data()
}
