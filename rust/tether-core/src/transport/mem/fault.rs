//! Fault injection for testing.
//!
//! Arms a number of failures per transport call. Each armed failure makes
//! exactly one call of that kind return a [`TransportError`], after which
//! calls succeed again.
//!
//! ```rust
//! use tether_core::transport::mem::{FaultOp, MemTransport};
//!
//! let transport = MemTransport::new();
//! transport.faults().fail_next(FaultOp::Notify, 1);
//! assert_eq!(transport.faults().armed(FaultOp::Notify), 1);
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

use crate::transport::TransportError;

/// Transport call a fault can be armed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultOp {
    OpenService,
    CreatePort,
    Send,
    Loan,
    Receive,
    Notify,
    Listen,
    Wait,
}

impl FaultOp {
    const COUNT: usize = 8;

    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            FaultOp::OpenService => "open service",
            FaultOp::CreatePort => "create port",
            FaultOp::Send => "send",
            FaultOp::Loan => "loan",
            FaultOp::Receive => "receive",
            FaultOp::Notify => "notify",
            FaultOp::Listen => "listen",
            FaultOp::Wait => "wait",
        }
    }
}

pub struct FaultInjector {
    /// Failures still armed, per operation.
    armed: [AtomicU32; FaultOp::COUNT],
}

impl Default for FaultInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultInjector {
    /// Create a fault injector with nothing armed.
    pub fn new() -> Self {
        FaultInjector {
            armed: std::array::from_fn(|_| AtomicU32::new(0)),
        }
    }

    /// Make the next `count` calls of `op` fail.
    pub fn fail_next(&self, op: FaultOp, count: u32) {
        self.armed[op.index()].fetch_add(count, Ordering::AcqRel);
    }

    /// Number of failures still armed for `op`.
    pub fn armed(&self, op: FaultOp) -> u32 {
        self.armed[op.index()].load(Ordering::Acquire)
    }

    /// Disarm everything.
    pub fn clear(&self) {
        for slot in &self.armed {
            slot.store(0, Ordering::Release);
        }
    }

    /// Consume one armed failure for `op`, if any.
    pub fn check(&self, op: FaultOp) -> Result<(), TransportError> {
        let fired = self.armed[op.index()]
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if fired {
            tracing::debug!(op = op.name(), "injecting transport fault");
            return Err(TransportError::new(op.name(), "injected fault"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn armed_faults_fire_once_each() {
        let injector = FaultInjector::new();
        assert!(injector.check(FaultOp::Send).is_ok());

        injector.fail_next(FaultOp::Send, 2);
        assert!(injector.check(FaultOp::Receive).is_ok());
        assert!(injector.check(FaultOp::Send).is_err());
        assert!(injector.check(FaultOp::Send).is_err());
        assert!(injector.check(FaultOp::Send).is_ok());
    }

    #[test]
    fn clear_disarms() {
        let injector = FaultInjector::new();
        injector.fail_next(FaultOp::Notify, 5);
        injector.fail_next(FaultOp::Wait, 1);
        injector.clear();
        assert_eq!(injector.armed(FaultOp::Notify), 0);
        assert!(injector.check(FaultOp::Wait).is_ok());
    }

    #[test]
    fn error_names_the_operation() {
        let injector = FaultInjector::new();
        injector.fail_next(FaultOp::Listen, 1);
        let err = injector.check(FaultOp::Listen).unwrap_err();
        assert_eq!(err.op(), "listen");
    }
}
