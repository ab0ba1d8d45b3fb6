#![doc = include_str!("../README.md")]
#![forbid(unsafe_op_in_unsafe_fn)]

mod api;
mod handle;
mod ret;

pub mod logging;
pub mod qos;

pub use api::*;
pub use handle::*;
pub use logging::LogSeverity;
pub use qos::QosProfile;
pub use ret::*;

pub use tether_core::{Config, Loan, ServiceConfig};

/// Transport every handle of this crate is built on.
pub type Backend = tether_core::transport::mem::MemTransport;

/// Identifier stamped on every handle created here.
pub const IMPLEMENTATION_IDENTIFIER: &str = "tether_rs";
