//! Guard conditions: software-triggered wakeups.

use crate::error::{Error, Operation, Result};
use crate::names::{self, ChannelName, ContextId, EntityKind};
use crate::transport::{EventId, EventService, NotifierPort, NotifyPort, Transport};
use crate::waitset::Waitable;

/// A user-triggerable event source backed by one transport notifier.
///
/// Identified by (context id, condition id); that pair names its event
/// channel. Triggering is fire-and-forget and safe to call from any thread,
/// including concurrently with a wait set blocked on this condition.
pub struct GuardCondition<T: Transport> {
    context_id: ContextId,
    id: u32,
    channel: ChannelName,
    notifier: NotifierPort<T>,
}

impl<T: Transport> std::fmt::Debug for GuardCondition<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardCondition")
            .field("context_id", &self.context_id)
            .field("id", &self.id)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> GuardCondition<T> {
    pub fn create(transport: &T, context_id: ContextId, id: u32) -> Result<Self> {
        const KIND: EntityKind = EntityKind::GuardCondition;

        let channel = names::guard_condition(context_id, id).map_err(|e| Error::name(KIND, e))?;
        let service = transport
            .open_event(&channel)
            .map_err(|e| Error::service(KIND, e))?;
        let notifier = service.notifier().map_err(|e| Error::port(KIND, e))?;

        tracing::debug!(%channel, "created guard condition");
        Ok(Self {
            context_id,
            id,
            channel,
            notifier,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// Event id fired by [`trigger`](Self::trigger).
    pub fn event_id(&self) -> EventId {
        EventId::from(self.id)
    }

    pub fn trigger(&self) -> Result<()> {
        self.trigger_with(None)
    }

    /// Fire with `id` instead of this condition's own id, once.
    ///
    /// The id is what a waiter reads back, so it must not collide with the
    /// id of another condition attached to the same wait set.
    pub fn trigger_with(&self, id: Option<EventId>) -> Result<()> {
        let id = id.unwrap_or_else(|| self.event_id());
        self.notifier
            .notify(id)
            .map_err(Error::transport(Operation::Notify))?;
        tracing::trace!(channel = %self.channel, %id, "triggered guard condition");
        Ok(())
    }
}

impl<T: Transport> Waitable for GuardCondition<T> {
    fn wait_channel(&self) -> &ChannelName {
        &self.channel
    }
}
