//! Subscriber with copy and zero-copy receive paths.
//!
//! Each receive attempt goes `Idle -> Received(sample) -> {Loaned | Dropped}`:
//!
//! - [`take_copy`](Subscriber::take_copy) copies the payload out and drops
//!   the sample immediately. The loan registry is never touched.
//! - [`take_loan`](Subscriber::take_loan) parks the sample in the registry
//!   and hands out its payload address until
//!   [`return_loan`](Subscriber::return_loan).
//!
//! Dropping the subscriber releases every loan still outstanding.

use crate::config::ServiceConfig;
use crate::error::{Error, Operation, ProtocolViolation, Result};
use crate::loan::{Loan, LoanRegistry};
use crate::names::{self, ChannelName, EntityKind};
use crate::publisher::DATA_EVENT_ID;
use crate::transport::{
    EventId, Payload, PubSubService, SampleOf, SubscribePort, SubscriberPort, Transport,
};
use crate::waitset::Waitable;

pub struct Subscriber<T: Transport> {
    topic: String,
    type_name: String,
    service_name: ChannelName,
    events_name: ChannelName,
    port: SubscriberPort<T>,
    loans: LoanRegistry<SampleOf<T>>,
}

impl<T: Transport> std::fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("topic", &self.topic)
            .field("type_name", &self.type_name)
            .field("loans", &self.loans)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Subscriber<T> {
    pub fn create(
        transport: &T,
        config: &ServiceConfig,
        topic: &str,
        type_name: &str,
    ) -> Result<Self> {
        const KIND: EntityKind = EntityKind::Subscriber;

        let service_name = names::topic(topic).map_err(|e| Error::name(KIND, e))?;
        let events_name = names::topic_events(topic).map_err(|e| Error::name(KIND, e))?;

        let service = transport
            .open_pubsub(&service_name, config)
            .map_err(|e| Error::service(KIND, e))?;
        let port = service.subscriber().map_err(|e| Error::port(KIND, e))?;

        tracing::debug!(%topic, %type_name, "created subscriber");
        Ok(Self {
            topic: topic.to_owned(),
            type_name: type_name.to_owned(),
            service_name,
            events_name,
            port,
            loans: LoanRegistry::new(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn service_name(&self) -> &ChannelName {
        &self.service_name
    }

    /// Loans handed out and not yet returned.
    pub fn outstanding_loans(&self) -> usize {
        self.loans.len()
    }

    /// Receive one sample and copy its payload into the front of `dest`.
    ///
    /// Returns the number of bytes copied, or `None` if nothing was pending.
    pub fn take_copy(&self, dest: &mut [u8]) -> Result<Option<usize>> {
        let Some(sample) = self.receive()? else {
            return Ok(None);
        };
        let payload = sample.payload();
        if payload.len() > dest.len() {
            return Err(ProtocolViolation::BufferTooSmall {
                needed: payload.len(),
                available: dest.len(),
            }
            .into());
        }
        dest[..payload.len()].copy_from_slice(payload);
        Ok(Some(payload.len()))
    }

    /// Receive one sample and loan out its payload.
    ///
    /// `Ok(None)` means the channel was empty.
    pub fn take_loan(&mut self) -> Result<Option<Loan>> {
        let Some(sample) = self.receive()? else {
            return Ok(None);
        };
        let loan = self.loans.store(sample);
        tracing::trace!(topic = %self.topic, addr = format_args!("{:#x}", loan.addr()), "loaned sample");
        Ok(Some(loan))
    }

    /// Give back a payload address obtained from [`take_loan`](Self::take_loan).
    pub fn return_loan(&mut self, ptr: *const u8) -> Result<()> {
        self.loans.release(ptr)?;
        Ok(())
    }

    fn receive(&self) -> Result<Option<SampleOf<T>>> {
        self.port
            .receive()
            .map_err(Error::transport(Operation::Receive))
    }
}

impl<T: Transport> Waitable for Subscriber<T> {
    fn wait_channel(&self) -> &ChannelName {
        &self.events_name
    }

    /// Ready for as long as samples are queued, notified or not.
    fn pending(&self) -> Option<EventId> {
        self.port.has_pending().then_some(DATA_EVENT_ID)
    }
}
