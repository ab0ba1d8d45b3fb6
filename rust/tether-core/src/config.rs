//! Configuration.

/// Parameters used when opening or creating a publish-subscribe service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Maximum number of publishers attached to one service.
    pub max_publishers: usize,
    /// Maximum number of subscribers attached to one service.
    pub max_subscribers: usize,
    /// Samples buffered per subscriber before the oldest is dropped.
    pub subscriber_buffer_size: usize,
    /// Alignment of every payload slot, in bytes.
    pub payload_alignment: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_publishers: 64,
            max_subscribers: 64,
            subscriber_buffer_size: 16,
            payload_alignment: 8,
        }
    }
}

/// Configuration of one [`Context`](crate::Context).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub service: ServiceConfig,
    /// Keep a wait set's listener across calls that attach the same channels.
    pub listener_reuse: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            listener_reuse: true,
        }
    }
}
