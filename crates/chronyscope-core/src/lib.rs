// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # chronyscope-core
//!
//! Report pipeline for reading chronyd monitoring data through libchrony.
//!
//! The native library is reached through the [`ChronyLibrary`] and
//! [`ChronyConnection`] traits; `chronyscope-sys` implements them over the
//! real shared object. On top of that seam:
//!
//! - [`Session`] owns one connection for the length of one call
//! - [`ReportDriver`] runs the singleton and multi-record protocols
//! - [`RecordReader`] and the field codec decode one record into a [`FieldMap`]
//! - [`validate`] checks each record and builds its snapshot
//! - [`classify`](classify::classify) maps every native failure to one
//!   [`ChronyError`]
//!
//! [`Client`] ties these together: one public call per report kind.
//!
//! ## Example
//!
//! ```rust,ignore
//! use chronyscope_core::{Client, ClientConfig};
//! use chronyscope_sys::LibChrony;
//!
//! let library = LibChrony::load(&ClientConfig::default().library_names)?;
//! let client = Client::new(library, ClientConfig::default());
//! let status = client.tracking()?;
//! println!("stratum {} offset {:.9}s", status.stratum(), status.offset());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod classify;
pub mod client;
pub mod codec;
pub mod config;
pub mod descriptor;
pub mod driver;
pub mod error;
pub mod native;
pub mod record;
pub mod session;
pub mod snapshot;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod validate;

pub use classify::{NativeFailure, Stage};
pub use client::Client;
pub use codec::FieldValue;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use descriptor::{
    Cardinality, DescriptorTable, FieldSpec, FieldType, ReportDescriptor, ReportKind,
};
pub use driver::ReportDriver;
pub use error::{ChronyError, ConfigError, DataReason, ErrorContext, ErrorKind, Result};
pub use native::{ChronyConnection, ChronyLibrary, FieldIndex, NativeStatus, Timespec, TypeTag};
pub use record::{FieldMap, RecordReader};
pub use session::Session;
pub use snapshot::{
    DEFAULT_MIN_SAMPLES, LeapStatus, RtcData, Source, SourceMode, SourceState, SourceStats,
    TrackingStatus, ref_id_to_name,
};
