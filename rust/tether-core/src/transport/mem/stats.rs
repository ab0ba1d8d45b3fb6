use std::sync::atomic::{AtomicU64, Ordering};

/// Transport-wide counters.
#[derive(Default)]
pub struct MemStats {
    pub samples_sent: AtomicU64,
    pub samples_received: AtomicU64,
    /// Received samples dropped by their holder.
    pub samples_released: AtomicU64,
    /// Samples evicted from a full subscriber queue before being received.
    pub samples_dropped: AtomicU64,
    pub notifications: AtomicU64,
}

/// Non-atomic snapshot of [`MemStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemStatsSnapshot {
    pub samples_sent: u64,
    pub samples_received: u64,
    pub samples_released: u64,
    pub samples_dropped: u64,
    pub notifications: u64,
}

impl MemStatsSnapshot {
    /// Received samples not yet released.
    pub fn samples_outstanding(&self) -> u64 {
        self.samples_received.saturating_sub(self.samples_released)
    }
}

impl MemStats {
    pub fn snapshot(&self) -> MemStatsSnapshot {
        MemStatsSnapshot {
            samples_sent: self.samples_sent.load(Ordering::Relaxed),
            samples_received: self.samples_received.load(Ordering::Relaxed),
            samples_released: self.samples_released.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
        }
    }
}
