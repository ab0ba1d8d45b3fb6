//! Nodes group publishers and subscribers under a validated name.

use crate::config::ServiceConfig;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::names::{self, ChannelName, ContextId, EntityKind};
use crate::publisher::Publisher;
use crate::subscriber::Subscriber;
use crate::transport::Transport;

pub struct Node<T: Transport> {
    context_id: ContextId,
    name: String,
    namespace: String,
    channel: ChannelName,
    transport: T,
    service_config: ServiceConfig,
}

impl<T: Transport> std::fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("context_id", &self.context_id)
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Node<T> {
    pub(crate) fn create(context: &Context<T>, name: &str, namespace: &str) -> Result<Self> {
        let channel = names::node(context.id(), name, namespace)
            .map_err(|e| Error::name(EntityKind::Node, e))?;
        tracing::debug!(%channel, "created node");
        Ok(Self {
            context_id: context.id(),
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            channel,
            transport: context.transport().clone(),
            service_config: context.config().service.clone(),
        })
    }

    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    pub fn fully_qualified_name(&self) -> String {
        names::fully_qualified_node_name(&self.name, &self.namespace)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Service parameters inherited from the context.
    pub fn service_config(&self) -> &ServiceConfig {
        &self.service_config
    }

    pub fn create_publisher(&self, topic: &str, type_name: &str) -> Result<Publisher<T>> {
        Publisher::create(&self.transport, &self.service_config, topic, type_name)
    }

    pub fn create_subscriber(&self, topic: &str, type_name: &str) -> Result<Subscriber<T>> {
        Subscriber::create(&self.transport, &self.service_config, topic, type_name)
    }
}

#[cfg(all(test, feature = "mem"))]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::CreationStage;
    use crate::transport::mem::MemTransport;

    #[test]
    fn names_are_validated() {
        let context = Context::new(1, MemTransport::new(), Config::default());

        let node = context.create_node("talker", "/demo").unwrap();
        assert_eq!(node.fully_qualified_name(), "/demo/talker");
        assert_eq!(node.channel().as_str(), "ros2://context/1/nodes//demo/talker");

        let err = context.create_node("bad/name", "").unwrap_err();
        assert!(matches!(
            err,
            Error::Creation {
                entity: EntityKind::Node,
                stage: CreationStage::ServiceName,
                ..
            }
        ));
    }

    #[test]
    fn publisher_and_subscriber_share_a_topic() {
        let context = Context::new(1, MemTransport::new(), Config::default());
        let node = context.create_node("relay", "").unwrap();

        let publisher = node.create_publisher("/relay", "Bytes").unwrap();
        let subscriber = node.create_subscriber("/relay", "Bytes").unwrap();
        assert_eq!(publisher.service_name(), subscriber.service_name());

        publisher.publish(b"ok").unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(subscriber.take_copy(&mut buf).unwrap(), Some(2));
    }
}
