//! Seam to the audio-graph engine.
//!
//! The engine itself lives elsewhere. The project state tells it when a
//! processor node starts or stops existing and when routing changes; the
//! engine answers whether it has a live processor for a graph node id.

use strata_types::{Connection, GraphNodeId, NodeId};

pub trait AudioGraphHost {
    /// A processor node entered the project. `node` is its tree node.
    fn on_processor_created(&mut self, id: GraphNodeId, node: NodeId);
    fn on_processor_destroyed(&mut self, id: GraphNodeId);
    fn has_processor(&self, id: GraphNodeId) -> bool;

    fn on_connection_added(&mut self, _connection: &Connection) {}
    fn on_connection_removed(&mut self, _connection: &Connection) {}
}

/// Host used when no engine is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedGraph;

impl AudioGraphHost for DetachedGraph {
    fn on_processor_created(&mut self, _id: GraphNodeId, _node: NodeId) {}

    fn on_processor_destroyed(&mut self, _id: GraphNodeId) {}

    fn has_processor(&self, _id: GraphNodeId) -> bool {
        false
    }
}
