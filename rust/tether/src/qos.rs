//! Quality-of-service profiles.
//!
//! The in-process transport delivers reliably to a bounded per-subscriber
//! queue and keeps no history for late joiners, so the only policy that
//! changes behavior is the history depth. Everything else is reported back
//! as what is actually provided.

use tether_core::ServiceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum History {
    SystemDefault,
    KeepLast,
    KeepAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reliability {
    SystemDefault,
    Reliable,
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    SystemDefault,
    Volatile,
    TransientLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QosProfile {
    pub history: History,
    /// Samples kept per subscriber with [`History::KeepLast`]. Zero keeps
    /// the configured buffer size.
    pub depth: usize,
    pub reliability: Reliability,
    pub durability: Durability,
}

impl Default for QosProfile {
    fn default() -> Self {
        Self {
            history: History::KeepLast,
            depth: 10,
            reliability: Reliability::Reliable,
            durability: Durability::Volatile,
        }
    }
}

impl QosProfile {
    /// Service parameters for an endpoint requesting this profile.
    pub fn service_config(&self, base: &ServiceConfig) -> ServiceConfig {
        let mut config = base.clone();
        if self.history != History::KeepAll && self.depth > 0 {
            config.subscriber_buffer_size = self.depth;
        }
        config
    }

    /// The profile an endpoint created with `applied` actually provides.
    pub fn provided(applied: &ServiceConfig) -> QosProfile {
        QosProfile {
            history: History::KeepLast,
            depth: applied.subscriber_buffer_size,
            reliability: Reliability::Reliable,
            durability: Durability::Volatile,
        }
    }
}
