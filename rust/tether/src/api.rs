//! Entry points.
//!
//! Each function checks its handles, calls into `tether_core` and collapses
//! any error into a [`RetCode`](crate::RetCode), logging it on the way out.

mod context;
mod guard_condition;
mod node;
mod publisher;
mod subscription;
mod wait_set;

pub use context::*;
pub use guard_condition::*;
pub use node::*;
pub use publisher::*;
pub use subscription::*;
pub use wait_set::*;

use crate::IMPLEMENTATION_IDENTIFIER;
use crate::logging::{self, LogSeverity};
use crate::ret::RetResult;

pub fn get_implementation_identifier() -> &'static str {
    IMPLEMENTATION_IDENTIFIER
}

pub fn set_log_severity(severity: LogSeverity) -> RetResult {
    logging::set_log_severity(severity)
}
