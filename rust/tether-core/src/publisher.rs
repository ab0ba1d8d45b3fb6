//! Publisher.

use crate::config::ServiceConfig;
use crate::error::{Error, Operation, Result};
use crate::loan::{Loan, LoanRegistry};
use crate::names::{self, ChannelName, EntityKind};
use crate::transport::{
    EventId, EventService, LoanOf, NotifierPort, NotifyPort, PubSubService, PublishPort,
    PublisherPort, Transport,
};

/// Id fired on a topic's data-event channel after every publish.
pub const DATA_EVENT_ID: EventId = EventId(0);

/// Sends samples on one topic, by copy or by loan.
///
/// Every successful publish also fires the topic's data-event channel so
/// subscribers attached to a wait set wake up.
pub struct Publisher<T: Transport> {
    topic: String,
    type_name: String,
    service_name: ChannelName,
    port: PublisherPort<T>,
    data_events: NotifierPort<T>,
    loans: LoanRegistry<LoanOf<T>>,
}

impl<T: Transport> std::fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("topic", &self.topic)
            .field("type_name", &self.type_name)
            .field("loans", &self.loans)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Publisher<T> {
    pub fn create(
        transport: &T,
        config: &ServiceConfig,
        topic: &str,
        type_name: &str,
    ) -> Result<Self> {
        const KIND: EntityKind = EntityKind::Publisher;

        let service_name = names::topic(topic).map_err(|e| Error::name(KIND, e))?;
        let events_name = names::topic_events(topic).map_err(|e| Error::name(KIND, e))?;

        let service = transport
            .open_pubsub(&service_name, config)
            .map_err(|e| Error::service(KIND, e))?;
        let events = transport
            .open_event(&events_name)
            .map_err(|e| Error::service(KIND, e))?;

        let port = service.publisher().map_err(|e| Error::port(KIND, e))?;
        let data_events = events.notifier().map_err(|e| Error::port(KIND, e))?;

        tracing::debug!(%topic, %type_name, "created publisher");
        Ok(Self {
            topic: topic.to_owned(),
            type_name: type_name.to_owned(),
            service_name,
            port,
            data_events,
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

    /// Borrowed buffers not yet published or returned.
    pub fn outstanding_loans(&self) -> usize {
        self.loans.len()
    }

    /// Publish a copy of `payload`.
    pub fn publish(&self, payload: &[u8]) -> Result<()> {
        self.port
            .send_copy(payload)
            .map_err(Error::transport(Operation::Send))?;
        self.announce();
        Ok(())
    }

    /// Borrow a zeroed, writable buffer of `len` bytes from the transport.
    pub fn borrow_loan(&mut self, len: usize) -> Result<Loan> {
        let loan = self
            .port
            .loan(len)
            .map_err(Error::transport(Operation::Loan))?;
        Ok(self.loans.store_mut(loan))
    }

    /// Publish a buffer obtained from [`borrow_loan`](Self::borrow_loan).
    ///
    /// The loan is consumed whether or not the send succeeds.
    pub fn publish_loan(&mut self, ptr: *const u8) -> Result<()> {
        let loan = self.loans.take(ptr)?;
        self.port
            .send(loan)
            .map_err(Error::transport(Operation::Send))?;
        self.announce();
        Ok(())
    }

    /// Give back a borrowed buffer without publishing it.
    pub fn return_loan(&mut self, ptr: *const u8) -> Result<()> {
        self.loans.release(ptr)?;
        Ok(())
    }

    fn announce(&self) {
        // The sample is already delivered; a lost wakeup is not a failed publish.
        if let Err(e) = self.data_events.notify(DATA_EVENT_ID) {
            tracing::warn!(topic = %self.topic, error = %e, "failed to signal data availability");
        }
    }
}
