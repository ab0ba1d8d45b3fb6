//! Log output and runtime severity control.
//!
//! [`init`] installs a `fmt` subscriber whose filter sits behind a reload
//! layer; [`set_log_severity`] swaps that filter. The initial filter comes
//! from `RUST_LOG`, falling back to `warn`.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use crate::ret::{RetCode, RetResult};

static FILTER: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();
static SEVERITY: AtomicU8 = AtomicU8::new(LogSeverity::Warn as u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogSeverity {
    Debug = 10,
    Info = 20,
    Warn = 30,
    Error = 40,
    Fatal = 50,
}

impl LogSeverity {
    /// Filter directive for this severity. `tracing` has no level above
    /// error, so fatal shares it.
    pub fn directive(self) -> &'static str {
        match self {
            LogSeverity::Debug => "debug",
            LogSeverity::Info => "info",
            LogSeverity::Warn => "warn",
            LogSeverity::Error | LogSeverity::Fatal => "error",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            10 => LogSeverity::Debug,
            20 => LogSeverity::Info,
            30 => LogSeverity::Warn,
            40 => LogSeverity::Error,
            _ => LogSeverity::Fatal,
        }
    }
}

/// Install the global subscriber. Returns false if one is already set, in
/// which case severity changes are only recorded.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LogSeverity::Warn.directive()));
    let (filter, handle) = reload::Layer::new(filter);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok();
    if installed {
        let _ = FILTER.set(handle);
    }
    installed
}

pub fn set_log_severity(severity: LogSeverity) -> RetResult {
    SEVERITY.store(severity as u8, Ordering::Relaxed);
    if let Some(handle) = FILTER.get() {
        handle
            .reload(EnvFilter::new(severity.directive()))
            .map_err(|e| {
                tracing::error!(error = %e, ?severity, "failed to change log severity");
                RetCode::Error
            })?;
    }
    Ok(())
}

/// Severity last set with [`set_log_severity`].
pub fn log_severity() -> LogSeverity {
    LogSeverity::from_u8(SEVERITY.load(Ordering::Relaxed))
}
