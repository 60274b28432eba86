//! Connection edits and the default-routing rules built on them.
//!
//! Every connection change is expressed as a [`CreateOrDeleteConnections`]:
//! a set of connections to add and a set to remove. Two of them fold into one,
//! and a create followed by a delete of the identical connection cancels out,
//! so dragging a cable around produces a single history entry.

use std::collections::HashSet;

use strata_types::{Connection, ConnectionType, GraphNodeId, NodeId};

use crate::state::ProjectState;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOrDeleteConnections {
    creates: Vec<Connection>,
    deletes: Vec<Connection>,
}

impl CreateOrDeleteConnections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn creates(&self) -> &[Connection] {
        &self.creates
    }

    pub fn deletes(&self) -> &[Connection] {
        &self.deletes
    }

    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.deletes.is_empty()
    }

    pub fn add_connection(&mut self, connection: Connection) {
        if let Some(i) = self.deletes.iter().position(|c| *c == connection) {
            self.deletes.remove(i);
        } else if !self.creates.contains(&connection) {
            self.creates.push(connection);
        }
    }

    pub fn remove_connection(&mut self, connection: Connection) {
        if let Some(i) = self.creates.iter().position(|c| *c == connection) {
            self.creates.remove(i);
        } else if !self.deletes.contains(&connection) {
            self.deletes.push(connection);
        }
    }

    /// Fold `other`'s edits in after this one's.
    pub fn coalesce_with(&mut self, other: &CreateOrDeleteConnections) {
        for c in &other.creates {
            self.add_connection(*c);
        }
        for c in &other.deletes {
            self.remove_connection(*c);
        }
    }

    pub fn perform(&self, state: &mut ProjectState) -> bool {
        self.apply(state, true, true)
    }

    pub fn undo(&self, state: &mut ProjectState) -> bool {
        self.apply(state, false, true)
    }

    pub(crate) fn apply(&self, state: &mut ProjectState, forward: bool, notify_graph: bool) -> bool {
        if self.is_empty() {
            return false;
        }
        let (add, remove) = if forward {
            (&self.creates, &self.deletes)
        } else {
            (&self.deletes, &self.creates)
        };
        for c in add {
            state.insert_connection(c, notify_graph);
        }
        for c in remove {
            state.erase_connection(c, notify_graph);
        }
        true
    }

    // ── constructors ──

    /// Connect, if the connection is legal. A default connection also needs
    /// both ends to accept default routing.
    pub fn create(state: &ProjectState, connection: Connection, is_default: bool) -> Self {
        let mut action = Self::new();
        let connection = connection.with_custom(!is_default);
        if !state.can_connect(&connection) {
            return action;
        }
        if is_default {
            let allows = |id: GraphNodeId| {
                state
                    .processor_by_node_id(id)
                    .map(|p| state.allows_default_connections(p))
                    .unwrap_or(false)
            };
            if !allows(connection.source.node) || !allows(connection.destination.node) {
                return action;
            }
        }
        action.add_connection(connection);
        action
    }

    /// Remove whatever occupies this edge, subject to the kind filter.
    pub fn delete(
        state: &ProjectState,
        connection: &Connection,
        allow_defaults: bool,
        allow_custom: bool,
    ) -> Self {
        let mut action = Self::new();
        for existing in state
            .connections()
            .into_iter()
            .filter(|c| c.same_edge(connection))
        {
            if (existing.custom && allow_custom) || (!existing.custom && allow_defaults) {
                action.remove_connection(existing);
            }
        }
        action
    }

    #[allow(clippy::too_many_arguments)]
    pub fn disconnect_processor(
        state: &ProjectState,
        processor: NodeId,
        connection_type: Option<ConnectionType>,
        defaults: bool,
        custom: bool,
        incoming: bool,
        outgoing: bool,
        exclude_destination: Option<GraphNodeId>,
    ) -> Self {
        let mut action = Self::new();
        let Some(node_id) = state.processor_node_id(processor) else {
            return action;
        };
        for c in state.connections_for(node_id, connection_type, incoming, outgoing) {
            if exclude_destination == Some(c.destination.node) {
                continue;
            }
            if (c.custom && custom) || (!c.custom && defaults) {
                action.remove_connection(c);
            }
        }
        action
    }

    pub fn disconnect_custom(state: &ProjectState, processor: NodeId) -> Self {
        Self::disconnect_processor(state, processor, None, false, true, true, true, None)
    }

    /// Default-route `from` into `to`: stereo for audio, one edge for MIDI.
    pub fn default_connect(
        state: &ProjectState,
        from: NodeId,
        to: NodeId,
        connection_type: ConnectionType,
    ) -> Self {
        let mut action = Self::new();
        let (Some(source), Some(destination)) =
            (state.processor_node_id(from), state.processor_node_id(to))
        else {
            return action;
        };
        match connection_type {
            ConnectionType::Audio => {
                for channel in 0..2 {
                    let c = Connection::audio(source, channel, destination, channel);
                    action.coalesce_with(&Self::create(state, c, true));
                }
            }
            ConnectionType::Midi => {
                action.coalesce_with(&Self::create(state, Connection::midi(source, destination), true));
            }
        }
        action
    }

    /// Re-point the default outputs of a track processor at whatever it
    /// should now flow into. With `make_invalid_defaults_into_custom`, default
    /// edges that would be dropped are kept as custom edges instead.
    pub fn update_processor_default_connections(
        state: &ProjectState,
        processor: NodeId,
        make_invalid_defaults_into_custom: bool,
    ) -> Self {
        let mut action = Self::new();
        let Some(track) = state.track_for_processor(processor) else {
            return action;
        };
        for connection_type in ConnectionType::BOTH {
            let target = state.find_processor_to_flow_into(track, processor, connection_type);
            let target_id = target.and_then(|t| state.processor_node_id(t));
            let disconnect = Self::disconnect_processor(
                state,
                processor,
                Some(connection_type),
                true,
                false,
                false,
                true,
                target_id,
            );
            action.coalesce_with(&disconnect);
            if make_invalid_defaults_into_custom && !disconnect.deletes.is_empty() {
                for c in &disconnect.deletes {
                    action.creates.push(c.with_custom(true));
                }
            } else if let Some(target) = target {
                action.coalesce_with(&Self::default_connect(state, processor, target, connection_type));
            }
        }
        action
    }

    pub fn update_all_default_connections(
        state: &ProjectState,
        make_invalid_defaults_into_custom: bool,
    ) -> Self {
        let mut action = Self::new();
        for track in state.tracks() {
            for processor in state.processors(track) {
                action.coalesce_with(&Self::update_processor_default_connections(
                    state,
                    processor,
                    make_invalid_defaults_into_custom,
                ));
            }
        }
        action.coalesce_with(&Self::reset_default_external_inputs(state, state.focused_track()));
        action
    }

    /// Route the device inputs into the focused track: for each signal type,
    /// into the most upstream processor feeding the track's topmost effect.
    pub fn reset_default_external_inputs(state: &ProjectState, focused_track: Option<NodeId>) -> Self {
        let mut action = Self::new();
        for connection_type in ConnectionType::BOTH {
            let target = focused_track.and_then(|t| default_input_target(state, t, connection_type));
            let target_id = target.and_then(|t| state.processor_node_id(t));
            for input in state.input_processors() {
                if !state.produces(input, connection_type) {
                    continue;
                }
                action.coalesce_with(&Self::disconnect_processor(
                    state,
                    input,
                    Some(connection_type),
                    true,
                    false,
                    false,
                    true,
                    target_id,
                ));
                if let Some(target) = target {
                    action.coalesce_with(&Self::default_connect(state, input, target, connection_type));
                }
            }
        }
        action
    }
}

fn default_input_target(
    state: &ProjectState,
    track: NodeId,
    connection_type: ConnectionType,
) -> Option<NodeId> {
    let processors = state.processors(track);
    let topmost = processors.iter().copied().find(|p| {
        state.allows_default_connections(*p) && state.is_effect_for(*p, connection_type)
    })?;

    let mut current = topmost;
    let mut seen = HashSet::from([topmost]);
    loop {
        let Some(id) = state.processor_node_id(current) else {
            return Some(current);
        };
        let upstream = state
            .connections_for(id, Some(connection_type), true, false)
            .into_iter()
            .filter_map(|c| state.processor_by_node_id(c.source.node))
            .find(|p| processors.contains(p) && !seen.contains(p));
        match upstream {
            Some(p) => {
                seen.insert(p);
                current = p;
            }
            None => return Some(current),
        }
    }
}
