#![doc = include_str!("../README.md")]
#![forbid(unsafe_op_in_unsafe_fn)]

mod config;
mod context;
mod error;
mod guard;
mod loan;
mod node;
mod publisher;
mod subscriber;
mod waitset;

pub mod names;
pub mod transport;

pub use config::*;
pub use context::*;
pub use error::*;
pub use guard::*;
pub use loan::*;
pub use node::*;
pub use publisher::*;
pub use subscriber::*;
pub use waitset::*;
