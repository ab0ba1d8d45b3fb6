//! Transport contract.
//!
//! The adapter never implements delivery itself. It consumes a transport
//! through the traits below: open-or-create a named publish-subscribe or
//! event service, create ports on it, send/receive samples, fire/listen on
//! events. Every call can fail with an opaque [`TransportError`].
//!
//! Backends live in their own module under `transport/` and are selected
//! with cargo features. `mem` (default) is an in-process backend.

use std::fmt;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::names::ChannelName;

/// Opaque failure reported by a transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    op: &'static str,
    detail: String,
}

impl TransportError {
    pub fn new(op: &'static str, detail: impl Into<String>) -> Self {
        Self {
            op,
            detail: detail.into(),
        }
    }

    /// Transport call that failed.
    pub fn op(&self) -> &'static str {
        self.op
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport {}: {}", self.op, self.detail)
    }
}

impl std::error::Error for TransportError {}

/// Identifier carried by a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

impl From<u32> for EventId {
    fn from(id: u32) -> Self {
        EventId(id as u64)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One notification observed by a listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredEvent {
    pub channel: ChannelName,
    pub id: EventId,
}

/// Result of blocking on a listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wakeup {
    /// At least one event was pending or arrived before the deadline.
    Triggered(Vec<FiredEvent>),
    TimedOut,
}

/// Read access to a transport-owned payload.
///
/// The address of `payload()` must be stable and non-null for as long as
/// the value lives, and distinct among the live samples of one port.
/// Dropping the value returns its slot to the transport.
pub trait Payload: Send + 'static {
    fn payload(&self) -> &[u8];
}

/// A writable payload borrowed from a publisher.
pub trait PayloadMut: Payload {
    fn payload_mut(&mut self) -> &mut [u8];
}

pub trait Transport: Clone + Send + Sync + 'static {
    type Service: PubSubService;
    type Event: EventService;
    type Listener: ListenPort;

    /// Open the named publish-subscribe service, creating it if needed.
    fn open_pubsub(
        &self,
        name: &ChannelName,
        config: &ServiceConfig,
    ) -> Result<Self::Service, TransportError>;

    /// Open the named event service, creating it if needed.
    fn open_event(&self, name: &ChannelName) -> Result<Self::Event, TransportError>;

    /// Build one listener over a set of event channels.
    fn listen(&self, channels: &[ChannelName]) -> Result<Self::Listener, TransportError>;
}

pub trait PubSubService: Send + Sync {
    type Publisher: PublishPort;
    type Subscriber: SubscribePort;

    fn publisher(&self) -> Result<Self::Publisher, TransportError>;
    fn subscriber(&self) -> Result<Self::Subscriber, TransportError>;
}

pub trait EventService: Send + Sync {
    type Notifier: NotifyPort;

    fn notifier(&self) -> Result<Self::Notifier, TransportError>;
}

pub trait PublishPort: Send + Sync + 'static {
    type Loan: PayloadMut;

    fn send_copy(&self, payload: &[u8]) -> Result<(), TransportError>;

    /// Borrow a zeroed, writable payload of `len` bytes.
    fn loan(&self, len: usize) -> Result<Self::Loan, TransportError>;

    fn send(&self, loan: Self::Loan) -> Result<(), TransportError>;
}

pub trait SubscribePort: Send + 'static {
    type Sample: Payload;

    /// True while at least one sample is waiting to be received.
    fn has_pending(&self) -> bool;

    /// `Ok(None)` means the channel is empty, which is not an error.
    fn receive(&self) -> Result<Option<Self::Sample>, TransportError>;
}

pub trait NotifyPort: Send + Sync + 'static {
    fn notify(&self, id: EventId) -> Result<(), TransportError>;
}

pub trait ListenPort: Send + 'static {
    fn channels(&self) -> &[ChannelName];

    /// Block until an event is pending or `timeout` elapses. `None` blocks
    /// indefinitely, zero polls.
    fn block(&self, timeout: Option<Duration>) -> Result<Wakeup, TransportError>;
}

pub type PublisherPort<T> = <<T as Transport>::Service as PubSubService>::Publisher;
pub type SubscriberPort<T> = <<T as Transport>::Service as PubSubService>::Subscriber;
pub type NotifierPort<T> = <<T as Transport>::Event as EventService>::Notifier;
pub type LoanOf<T> = <PublisherPort<T> as PublishPort>::Loan;
pub type SampleOf<T> = <SubscriberPort<T> as SubscribePort>::Sample;

#[cfg(feature = "mem")]
pub mod mem;
