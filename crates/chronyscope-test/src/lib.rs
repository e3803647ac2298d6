// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # chronyscope-test
//!
//! Testing infrastructure for chronyscope.
//!
//! This crate provides:
//! - **Fault catalogue**: one injectable failure per pipeline stage
//! - **Fault harness**: runs every report under every fault and checks both
//!   the error category and that no connection leaked
//! - **Falsification tests**: tests written to refute the behavioral claims
//!   of the report pipeline
//!
//! ## Example
//!
//! ```rust,ignore
//! use chronyscope_core::ReportKind;
//! use chronyscope_test::{Fault, FaultHarness};
//!
//! let harness = FaultHarness::new().with_responses_per_request(3);
//! harness.check(ReportKind::Sources, Fault::RecordResponse)?;
//! assert_eq!(harness.sweep()?.len(), 48);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod faults;
pub mod harness;

pub use error::{Result, TestError};
pub use faults::{Expected, Fault, healthy_fake, healthy_records};
pub use harness::{FaultHarness, Observation, Outcome};
