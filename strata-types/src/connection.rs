//! Signal-routing edges between processors.

use serde::{Deserialize, Serialize};

use crate::GraphNodeId;

/// Channel index used for the MIDI lane of a processor.
pub const MIDI_CHANNEL: i32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionType {
    Audio,
    Midi,
}

impl ConnectionType {
    pub const BOTH: [ConnectionType; 2] = [ConnectionType::Audio, ConnectionType::Midi];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: GraphNodeId,
    pub channel: i32,
}

impl Endpoint {
    pub fn new(node: GraphNodeId, channel: i32) -> Self {
        Self { node, channel }
    }

    pub fn midi(node: GraphNodeId) -> Self {
        Self::new(node, MIDI_CHANNEL)
    }

    pub fn is_midi(&self) -> bool {
        self.channel == MIDI_CHANNEL
    }
}

/// A directed edge between two processor channels.
///
/// Ordering is source-major and defines the canonical order connections are
/// kept in. Two connections with the same endpoints but a different `custom`
/// flag are different edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub source: Endpoint,
    pub destination: Endpoint,
    pub custom: bool,
}

impl Connection {
    pub fn new(source: Endpoint, destination: Endpoint, custom: bool) -> Self {
        Self {
            source,
            destination,
            custom,
        }
    }

    pub fn audio(from: GraphNodeId, from_channel: i32, to: GraphNodeId, to_channel: i32) -> Self {
        Self::new(
            Endpoint::new(from, from_channel),
            Endpoint::new(to, to_channel),
            false,
        )
    }

    pub fn midi(from: GraphNodeId, to: GraphNodeId) -> Self {
        Self::new(Endpoint::midi(from), Endpoint::midi(to), false)
    }

    pub fn connection_type(&self) -> ConnectionType {
        if self.source.is_midi() {
            ConnectionType::Midi
        } else {
            ConnectionType::Audio
        }
    }

    pub fn is_default(&self) -> bool {
        !self.custom
    }

    pub fn with_custom(mut self, custom: bool) -> Self {
        self.custom = custom;
        self
    }

    /// Same endpoints, regardless of the custom flag.
    pub fn same_edge(&self, other: &Connection) -> bool {
        self.source == other.source && self.destination == other.destination
    }

    pub fn touches(&self, node: GraphNodeId) -> bool {
        self.source.node == node || self.destination.node == node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_follows_source_channel() {
        let a = GraphNodeId::new(1);
        let b = GraphNodeId::new(2);
        assert_eq!(Connection::audio(a, 0, b, 0).connection_type(), ConnectionType::Audio);
        assert_eq!(Connection::midi(a, b).connection_type(), ConnectionType::Midi);
    }

    #[test]
    fn custom_flag_distinguishes_but_same_edge_ignores_it() {
        let a = GraphNodeId::new(1);
        let b = GraphNodeId::new(2);
        let default = Connection::audio(a, 1, b, 1);
        let custom = default.with_custom(true);
        assert_ne!(default, custom);
        assert!(default.same_edge(&custom));
        assert!(default < custom);
    }
}
