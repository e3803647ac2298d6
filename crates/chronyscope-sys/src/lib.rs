// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! chronyscope-sys - libchrony runtime binding
//!
//! Loads `libchrony` with `dlopen` and implements the
//! [`ChronyLibrary`](chronyscope_core::ChronyLibrary) and
//! [`ChronyConnection`](chronyscope_core::ChronyConnection) traits over it.
//!
//! ```rust,no_run
//! use chronyscope_core::{Client, ClientConfig};
//! use chronyscope_sys::LibChrony;
//!
//! fn main() -> Result<(), chronyscope_core::ChronyError> {
//!     let library = LibChrony::load_default()?;
//!     let status = Client::new(library, ClientConfig::default()).tracking()?;
//!     println!("synchronized: {}", status.is_synchronized());
//!     Ok(())
//! }
//! ```
//!
//! # Native interface
//!
//! Only the client calls of `chrony.h` are used: socket open/close, session
//! init/deinit, record count and record requests, response draining, field
//! introspection by name and the typed field accessors. The library stays
//! mapped as long as any [`LibChrony`] clone or [`Connection`] is alive.

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

mod connection;
mod ffi;
mod library;

pub use connection::Connection;
pub use library::LibChrony;
