//! # strata-types
//!
//! Plain data shared by the strata project core and its consumers: node
//! type tags, property values and identifiers, connection endpoints,
//! processor descriptions and slot masks.

pub mod connection;
pub mod ids;
mod node_type;
mod processor;
mod slot_mask;
mod var;
mod view;

pub use connection::{Connection, ConnectionType, Endpoint, MIDI_CHANNEL};
pub use node_type::{NodeType, ParseNodeTypeError};
pub use processor::ProcessorDescription;
pub use slot_mask::{SlotMask, MAX_SLOTS};
pub use var::Var;
pub use view::{ControlMode, FocusedPane};

/// Arena key for a node living in a state tree.
///
/// Keys are stable for the lifetime of a tree: a node detached by an undoable
/// edit keeps its key and gets it back when the edit is undone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier correlating a processor node with its audio-graph counterpart.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct GraphNodeId(u32);

impl GraphNodeId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for GraphNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
