//! Popperian Falsification Tests for chronyscope
//!
//! Categories:
//! - A: Field decoding (F001-F010)
//! - B: Validation (F011-F025)
//! - C: Request protocol (F026-F035, F056)
//! - D: Resource safety (F036-F045)
//! - E: Error classification (F046-F055)

// Allow test-specific patterns that are denied in production code
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::float_cmp)]

mod decode;
mod errors;
mod resources;
mod validation;

use chronyscope_core::testing::FakeChrony;
use chronyscope_core::{Client, ClientConfig, FieldMap, ReportDriver, ReportKind, Result, Session};

/// Socket path the fakes are reached through.
pub const SOCKET: &str = "/run/chrony/chronyd.sock";

/// Client over `fake` with an explicit socket.
pub fn client(fake: &FakeChrony) -> Client<FakeChrony> {
    Client::new(fake.clone(), ClientConfig::for_socket(Some(SOCKET)))
}

/// Runs the raw driver for `kind` in its own session.
pub fn drive(fake: &FakeChrony, kind: ReportKind) -> Result<Vec<FieldMap>> {
    Session::scoped(fake, SOCKET, |session| {
        ReportDriver::default().request(session, kind)
    })
}
