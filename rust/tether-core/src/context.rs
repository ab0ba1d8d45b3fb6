//! Context: the root every other entity is created from.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::guard::GuardCondition;
use crate::names::{self, ChannelName, ContextId, EntityKind, NameError};
use crate::node::Node;
use crate::transport::Transport;
use crate::waitset::WaitSet;

/// Carries the context id, the transport and the configuration, and hands
/// out guard condition ids. There is no process-wide state; two contexts on
/// one transport only share what they name alike.
pub struct Context<T: Transport> {
    id: ContextId,
    channel: ChannelName,
    transport: T,
    config: Config,
    next_guard_condition_id: AtomicU32,
}

impl<T: Transport> std::fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Context<T> {
    pub fn new(id: ContextId, transport: T, config: Config) -> Self {
        let channel = names::context(id);
        tracing::debug!(%channel, "created context");
        Self {
            id,
            channel,
            transport,
            config,
            next_guard_condition_id: AtomicU32::new(0),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Allocate the next guard condition id. Ids are never reused within a
    /// context; `None` once the id space is used up.
    pub fn next_guard_condition_id(&self) -> Option<u32> {
        self.next_guard_condition_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| id.checked_add(1))
            .ok()
    }

    pub fn create_guard_condition(&self) -> Result<GuardCondition<T>> {
        let id = self.next_guard_condition_id().ok_or_else(|| {
            Error::name(EntityKind::GuardCondition, NameError::IdsExhausted)
        })?;
        GuardCondition::create(&self.transport, self.id, id)
    }

    pub fn create_wait_set(&self) -> WaitSet<T> {
        WaitSet::new(self.transport.clone(), self.config.listener_reuse)
    }

    pub fn create_node(&self, name: &str, namespace: &str) -> Result<Node<T>> {
        Node::create(self, name, namespace)
    }
}

impl<T: Transport> Drop for Context<T> {
    fn drop(&mut self) {
        tracing::debug!(channel = %self.channel, "context shut down");
    }
}
