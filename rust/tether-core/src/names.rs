//! Channel naming.
//!
//! Every transport endpoint is opened by name, and independent processes
//! rendezvous only if they derive the same name from the same logical
//! identifiers. All functions here are pure: the same inputs always produce
//! the same [`ChannelName`], and distinct (context, kind, id) tuples never
//! collide.
//!
//! ```text
//! ros2://context/{ctx}
//! ros2://context/{ctx}/nodes/{namespace}/{name}
//! ros2://context/{ctx}/guard_conditions/{id}
//! ros2://topics{topic}
//! ros2://topic_events{topic}
//! ```

use std::fmt;

/// Identifier of one middleware context.
pub type ContextId = u32;

/// Maximum length of a channel name in bytes.
pub const MAX_CHANNEL_NAME_LEN: usize = 255;

const SCHEME: &str = "ros2://";

/// A validated transport channel name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelName(String);

impl ChannelName {
    /// Validate and wrap a raw name.
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if name.len() > MAX_CHANNEL_NAME_LEN {
            return Err(NameError::TooLong { len: name.len() });
        }
        if name.contains('\0') {
            return Err(NameError::InteriorNul);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChannelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Kinds of entities that own a channel derived from a numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Node,
    Publisher,
    Subscriber,
    GuardCondition,
    WaitSet,
}

impl EntityKind {
    /// Path segment used in channel names.
    pub fn segment(self) -> &'static str {
        match self {
            EntityKind::Node => "nodes",
            EntityKind::Publisher => "publishers",
            EntityKind::Subscriber => "subscribers",
            EntityKind::GuardCondition => "guard_conditions",
            EntityKind::WaitSet => "wait_sets",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Node => "node",
            EntityKind::Publisher => "publisher",
            EntityKind::Subscriber => "subscriber",
            EntityKind::GuardCondition => "guard condition",
            EntityKind::WaitSet => "wait set",
        };
        f.write_str(name)
    }
}

/// Why a name could not be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    Empty,
    TooLong { len: usize },
    InteriorNul,
    /// Node names are a single path segment.
    InvalidNodeName,
    /// Topic names are absolute.
    InvalidTopicName,
    /// Every id of this kind has been handed out.
    IdsExhausted,
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::Empty => write!(f, "channel name cannot be empty"),
            NameError::TooLong { len } => write!(
                f,
                "channel name is {} bytes, limit is {}",
                len, MAX_CHANNEL_NAME_LEN
            ),
            NameError::InteriorNul => write!(f, "channel name contains a NUL byte"),
            NameError::InvalidNodeName => {
                write!(f, "node name must be non-empty and must not contain '/'")
            }
            NameError::InvalidTopicName => write!(f, "topic name must start with '/'"),
            NameError::IdsExhausted => write!(f, "no ids left to name the channel with"),
        }
    }
}

impl std::error::Error for NameError {}

/// Root channel of a context. Always valid: a `u32` id keeps it short.
pub fn context(context_id: ContextId) -> ChannelName {
    ChannelName(format!("{SCHEME}context/{context_id}"))
}

/// Channel name of a node. An empty namespace is omitted.
pub fn node(context_id: ContextId, name: &str, namespace: &str) -> Result<ChannelName, NameError> {
    if name.is_empty() || name.contains('/') {
        return Err(NameError::InvalidNodeName);
    }
    let mut s = format!("{SCHEME}context/{context_id}/nodes/");
    if !namespace.is_empty() {
        s.push_str(namespace);
        s.push('/');
    }
    s.push_str(name);
    ChannelName::new(s)
}

/// Channel name of an id-addressed entity within a context.
pub fn entity(context_id: ContextId, kind: EntityKind, id: u32) -> Result<ChannelName, NameError> {
    ChannelName::new(format!(
        "{SCHEME}context/{context_id}/{}/{id}",
        kind.segment()
    ))
}

pub fn guard_condition(context_id: ContextId, id: u32) -> Result<ChannelName, NameError> {
    entity(context_id, EntityKind::GuardCondition, id)
}

/// Publish-subscribe channel of a topic. Topics are shared across contexts.
pub fn topic(topic: &str) -> Result<ChannelName, NameError> {
    if !topic.starts_with('/') {
        return Err(NameError::InvalidTopicName);
    }
    ChannelName::new(format!("{SCHEME}topics{topic}"))
}

/// Event channel fired whenever data is published on `topic`.
pub fn topic_events(topic: &str) -> Result<ChannelName, NameError> {
    if !topic.starts_with('/') {
        return Err(NameError::InvalidTopicName);
    }
    ChannelName::new(format!("{SCHEME}topic_events{topic}"))
}

/// `/namespace/name`, or `/name` for the root namespace.
pub fn fully_qualified_node_name(name: &str, namespace: &str) -> String {
    let mut s = String::from("/");
    let ns = namespace.trim_matches('/');
    if !ns.is_empty() {
        s.push_str(ns);
        s.push('/');
    }
    s.push_str(name);
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_names_are_deterministic() {
        let a = entity(3, EntityKind::GuardCondition, 7).unwrap();
        let b = entity(3, EntityKind::GuardCondition, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "ros2://context/3/guard_conditions/7");
        assert_eq!(guard_condition(3, 7).unwrap(), a);
    }

    #[test]
    fn varying_any_input_changes_the_name() {
        let base = entity(3, EntityKind::GuardCondition, 7).unwrap();
        assert_ne!(base, entity(4, EntityKind::GuardCondition, 7).unwrap());
        assert_ne!(base, entity(3, EntityKind::WaitSet, 7).unwrap());
        assert_ne!(base, entity(3, EntityKind::GuardCondition, 8).unwrap());
        // No prefix collisions between ids sharing leading digits.
        assert_ne!(
            entity(1, EntityKind::Node, 23).unwrap(),
            entity(12, EntityKind::Node, 3).unwrap()
        );
    }

    #[test]
    fn context_name() {
        assert_eq!(context(0).as_str(), "ros2://context/0");
        assert_eq!(context(u32::MAX).as_str(), "ros2://context/4294967295");
    }

    #[test]
    fn node_names() {
        assert_eq!(
            node(1, "talker", "").unwrap().as_str(),
            "ros2://context/1/nodes/talker"
        );
        assert_eq!(
            node(1, "talker", "/demo").unwrap().as_str(),
            "ros2://context/1/nodes//demo/talker"
        );
        assert_eq!(node(1, "a/b", ""), Err(NameError::InvalidNodeName));
        assert_eq!(node(1, "", "/demo"), Err(NameError::InvalidNodeName));
    }

    #[test]
    fn topic_names() {
        assert_eq!(topic("/chatter").unwrap().as_str(), "ros2://topics/chatter");
        assert_eq!(
            topic_events("/chatter").unwrap().as_str(),
            "ros2://topic_events/chatter"
        );
        assert_ne!(topic("/chatter").unwrap(), topic_events("/chatter").unwrap());
        // A topic whose last segment is `events` keeps its own channel.
        assert_ne!(topic("/a/events").unwrap(), topic_events("/a").unwrap());
        assert_ne!(topic_events("/a/events").unwrap(), topic("/a").unwrap());
        assert_eq!(topic("chatter"), Err(NameError::InvalidTopicName));
    }

    #[test]
    fn channel_name_validation() {
        assert_eq!(ChannelName::new(""), Err(NameError::Empty));
        assert_eq!(ChannelName::new("a\0b"), Err(NameError::InteriorNul));
        let long = "x".repeat(MAX_CHANNEL_NAME_LEN + 1);
        assert_eq!(
            ChannelName::new(long),
            Err(NameError::TooLong {
                len: MAX_CHANNEL_NAME_LEN + 1
            })
        );
        assert!(ChannelName::new("x".repeat(MAX_CHANNEL_NAME_LEN)).is_ok());
    }

    #[test]
    fn fully_qualified_names() {
        assert_eq!(fully_qualified_node_name("talker", ""), "/talker");
        assert_eq!(fully_qualified_node_name("talker", "/"), "/talker");
        assert_eq!(fully_qualified_node_name("talker", "/demo"), "/demo/talker");
    }
}
