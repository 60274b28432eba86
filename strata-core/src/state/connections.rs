use std::collections::HashSet;

use strata_types::{ids, Connection, ConnectionType, GraphNodeId, NodeId, NodeType, MIDI_CHANNEL};

use super::{ConnectionRef, ProjectState};
use crate::tree::ValueNode;

impl ProjectState {
    pub fn connections(&self) -> Vec<Connection> {
        self.tree
            .children(self.connections)
            .iter()
            .filter_map(|c| self.connection_at(*c))
            .collect()
    }

    pub fn connection_at(&self, node: NodeId) -> Option<Connection> {
        if !self.tree.has_type(node, NodeType::Connection) {
            return None;
        }
        Some(ConnectionRef(node).connection(&self.tree))
    }

    pub fn connection_value(connection: &Connection) -> ValueNode {
        let mut value = ValueNode::new(NodeType::Connection)
            .with_property(ids::SOURCE_NODE_ID, connection.source.node.get())
            .with_property(ids::SOURCE_CHANNEL, connection.source.channel)
            .with_property(ids::DESTINATION_NODE_ID, connection.destination.node.get())
            .with_property(ids::DESTINATION_CHANNEL, connection.destination.channel);
        if connection.custom {
            value.set_property(ids::IS_CUSTOM_CONNECTION, true);
        }
        value
    }

    /// Exact match, custom flag included.
    pub fn has_connection(&self, connection: &Connection) -> bool {
        self.connections().contains(connection)
    }

    pub fn is_connected(&self, from: GraphNodeId, to: GraphNodeId) -> bool {
        self.connections()
            .iter()
            .any(|c| c.source.node == from && c.destination.node == to)
    }

    pub fn connections_for(
        &self,
        node: GraphNodeId,
        connection_type: Option<ConnectionType>,
        incoming: bool,
        outgoing: bool,
    ) -> Vec<Connection> {
        self.connections()
            .into_iter()
            .filter(|c| connection_type.map_or(true, |t| c.connection_type() == t))
            .filter(|c| {
                (incoming && c.destination.node == node) || (outgoing && c.source.node == node)
            })
            .collect()
    }

    /// Whether a signal path leads from `from` to `to`.
    pub fn reaches(&self, from: GraphNodeId, to: GraphNodeId) -> bool {
        let connections = self.connections();
        let mut seen = HashSet::new();
        let mut stack = vec![from];
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if !seen.insert(node) {
                continue;
            }
            stack.extend(
                connections
                    .iter()
                    .filter(|c| c.source.node == node)
                    .map(|c| c.destination.node),
            );
        }
        false
    }

    /// Endpoints exist and have the channels, the edge is new, and it closes no loop.
    pub fn can_connect(&self, connection: &Connection) -> bool {
        let (src, dst) = (connection.source, connection.destination);
        if src.node == dst.node {
            return false;
        }
        let (Some(source), Some(destination)) = (
            self.processor_by_node_id(src.node),
            self.processor_by_node_id(dst.node),
        ) else {
            return false;
        };
        let channels_ok = match (src.channel == MIDI_CHANNEL, dst.channel == MIDI_CHANNEL) {
            (true, true) => {
                self.produces(source, ConnectionType::Midi)
                    && self.is_effect_for(destination, ConnectionType::Midi)
            }
            (false, false) => {
                src.channel >= 0
                    && dst.channel >= 0
                    && (src.channel as i64) < self.tree.get_int(source, ids::NUM_OUTPUT_CHANNELS)
                    && (dst.channel as i64) < self.tree.get_int(destination, ids::NUM_INPUT_CHANNELS)
            }
            _ => false,
        };
        channels_ok
            && !self.connections().iter().any(|c| c.same_edge(connection))
            && !self.reaches(dst.node, src.node)
    }

    /// Insert at its canonical position. Returns false if the exact connection
    /// exists or an endpoint is not a processor in the project.
    pub(crate) fn insert_connection(&mut self, connection: &Connection, notify_graph: bool) -> bool {
        if self.processor_by_node_id(connection.source.node).is_none()
            || self.processor_by_node_id(connection.destination.node).is_none()
        {
            log::warn!(target: "connections", "endpoint missing, not connecting {:?}", connection);
            return false;
        }
        let existing = self.connections();
        if existing.contains(connection) {
            log::warn!(target: "connections", "already connected: {:?}", connection);
            return false;
        }
        let index = existing.iter().filter(|c| *c < connection).count();
        let value = Self::connection_value(connection);
        if let Err(e) = self
            .tree
            .add_child(self.connections, value, Some(index), None)
        {
            log::error!(target: "connections", "could not add connection: {}", e);
            return false;
        }
        if notify_graph {
            self.graph.on_connection_added(connection);
        }
        true
    }

    pub(crate) fn erase_connection(&mut self, connection: &Connection, notify_graph: bool) -> bool {
        let Some(index) = self
            .connections()
            .iter()
            .position(|c| c == connection)
        else {
            log::warn!(target: "connections", "no such connection: {:?}", connection);
            return false;
        };
        if let Err(e) = self.tree.remove_child(self.connections, index, None) {
            log::error!(target: "connections", "could not remove connection: {}", e);
            return false;
        }
        if notify_graph {
            self.graph.on_connection_removed(connection);
        }
        true
    }

    /// Sort connection nodes into canonical order and drop dangling ones.
    pub(crate) fn normalise_connections(&mut self) {
        let live: HashSet<GraphNodeId> = self
            .all_processors()
            .into_iter()
            .filter_map(|p| self.processor_node_id(p))
            .collect();
        for (index, c) in self.connections().into_iter().enumerate().rev() {
            if !live.contains(&c.source.node) || !live.contains(&c.destination.node) {
                log::warn!(target: "connections", "dropping dangling connection {:?}", c);
                if let Err(e) = self.tree.remove_child(self.connections, index, None) {
                    log::error!(target: "connections", "could not drop connection: {}", e);
                }
            }
        }
        let n = self.tree.num_children(self.connections);
        for i in 0..n {
            let current = self.connections();
            let Some((min_index, _)) = current
                .iter()
                .enumerate()
                .skip(i)
                .min_by(|a, b| a.1.cmp(b.1))
            else {
                break;
            };
            if min_index != i {
                if let Err(e) = self.tree.move_child(self.connections, min_index, i, None) {
                    log::error!(target: "connections", "could not sort connections: {}", e);
                    break;
                }
            }
        }
    }

    /// Nearest processor downstream of `processor` that takes a default
    /// connection of this type: a later slot on the same track, then the
    /// master track, then (audio only) the device output.
    pub fn find_processor_to_flow_into(
        &self,
        track: NodeId,
        processor: NodeId,
        connection_type: ConnectionType,
    ) -> Option<NodeId> {
        if !self.allows_default_connections(processor) || !self.produces(processor, connection_type) {
            return None;
        }
        let takes = |p: NodeId| {
            p != processor
                && self.allows_default_connections(p)
                && self.is_effect_for(p, connection_type)
        };
        let slot = self.processor_slot(processor);
        if let Some(p) = self
            .processors(track)
            .into_iter()
            .filter(|p| self.processor_slot(*p) > slot)
            .find(|p| takes(*p))
        {
            return Some(p);
        }
        if let Some(master) = self.master_track().filter(|m| *m != track) {
            if let Some(p) = self.processors(master).into_iter().find(|p| takes(*p)) {
                return Some(p);
            }
        }
        match connection_type {
            ConnectionType::Audio => self.audio_output_processor().filter(|p| takes(*p)),
            ConnectionType::Midi => None,
        }
    }
}
