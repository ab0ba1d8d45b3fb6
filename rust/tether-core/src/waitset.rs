//! Wait multiplexer.
//!
//! A [`WaitSet`] owns no sources. Each call to [`WaitSet::wait`] blocks on
//! whatever was attached since the previous call, then forgets the
//! attachments. The transport listener built for one call is kept and
//! reused when the next call attaches exactly the same channels.
//!
//! Readiness is edge-triggered on the source's event channel, plus
//! level-triggered for sources that report [`Waitable::pending`] at attach
//! time, so a subscriber with samples still queued is ready without a
//! fresh notification.

use std::time::Duration;

use crate::error::{Error, Operation, Result};
use crate::names::ChannelName;
use crate::transport::{EventId, FiredEvent, ListenPort, Transport, Wakeup};

/// Something a [`WaitSet`] can block on.
pub trait Waitable {
    /// Event channel whose notifications make this source ready.
    fn wait_channel(&self) -> &ChannelName;

    /// Event id to report if the source is ready right now without a
    /// notification.
    fn pending(&self) -> Option<EventId> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    Triggered(ReadySet),
    TimedOut,
}

/// Events observed by one [`WaitSet::wait`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadySet {
    fired: Vec<FiredEvent>,
}

impl ReadySet {
    /// True if any event was observed on `source`'s channel.
    pub fn is_ready(&self, source: &impl Waitable) -> bool {
        let channel = source.wait_channel();
        self.fired.iter().any(|f| &f.channel == channel)
    }

    /// Raw ids in the order they were observed.
    pub fn event_ids(&self) -> impl Iterator<Item = EventId> + '_ {
        self.fired.iter().map(|f| f.id)
    }

    pub fn fired(&self) -> &[FiredEvent] {
        &self.fired
    }

    pub fn len(&self) -> usize {
        self.fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }
}

pub struct WaitSet<T: Transport> {
    transport: T,
    reuse_listener: bool,
    attached: Vec<ChannelName>,
    /// Sources found ready when they were attached.
    levels: Vec<FiredEvent>,
    listener: Option<T::Listener>,
}

impl<T: Transport> std::fmt::Debug for WaitSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitSet")
            .field("attached", &self.attached)
            .field("has_listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> WaitSet<T> {
    pub fn new(transport: T, reuse_listener: bool) -> Self {
        Self {
            transport,
            reuse_listener,
            attached: Vec::new(),
            levels: Vec::new(),
            listener: None,
        }
    }

    /// Attach `source` for the next [`wait`](Self::wait). Attaching the same
    /// channel twice has no further effect.
    pub fn attach(&mut self, source: &impl Waitable) {
        let channel = source.wait_channel();
        if !self.attached.contains(channel) {
            self.attached.push(channel.clone());
        }
        if let Some(id) = source.pending() {
            let level = FiredEvent {
                channel: channel.clone(),
                id,
            };
            if !self.levels.contains(&level) {
                self.levels.push(level);
            }
        }
    }

    /// Number of distinct channels attached for the next wait.
    pub fn attached(&self) -> usize {
        self.attached.len()
    }

    /// Block until an attached source fires or `timeout` elapses.
    ///
    /// A zero timeout polls and `None` blocks indefinitely. If a source was
    /// already ready when attached, the call only polls. Attachments are
    /// cleared before returning, whatever the outcome.
    ///
    /// With nothing attached there is no listener to wake, so a finite
    /// timeout is slept through in full.
    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<WaitOutcome> {
        let levels = std::mem::take(&mut self.levels);
        let mut channels = std::mem::take(&mut self.attached);
        channels.sort();
        channels.dedup();

        if channels.is_empty() {
            match timeout {
                Some(timeout) => std::thread::sleep(timeout),
                None => tracing::warn!("waiting forever on an empty wait set; returning at once"),
            }
            return Ok(WaitOutcome::TimedOut);
        }

        let timeout = if levels.is_empty() {
            timeout
        } else {
            Some(Duration::ZERO)
        };
        let listener = self.listener_for(&channels)?;
        let wakeup = listener
            .block(timeout)
            .map_err(Error::transport(Operation::Wait))?;

        let mut fired = match wakeup {
            Wakeup::Triggered(fired) => fired,
            Wakeup::TimedOut => Vec::new(),
        };
        for level in levels {
            if !fired.contains(&level) {
                fired.push(level);
            }
        }

        if fired.is_empty() {
            tracing::trace!(channels = channels.len(), ?timeout, "wait timed out");
            return Ok(WaitOutcome::TimedOut);
        }
        tracing::trace!(channels = channels.len(), fired = fired.len(), "wait triggered");
        Ok(WaitOutcome::Triggered(ReadySet { fired }))
    }

    /// The cached listener if it covers exactly `channels`, else a new one.
    fn listener_for(&mut self, channels: &[ChannelName]) -> Result<&T::Listener> {
        if let Some(listener) = self.listener.take() {
            if self.reuse_listener && listener.channels() == channels {
                return Ok(self.listener.insert(listener));
            }
            // Gone before the replacement registers, so undrained events
            // carry over to it.
            drop(listener);
        }
        let listener = self
            .transport
            .listen(channels)
            .map_err(Error::transport(Operation::Listen))?;
        tracing::trace!(channels = channels.len(), "built listener");
        Ok(self.listener.insert(listener))
    }
}
