//! The project tree and read access to its parts.
//!
//! A project tree always has this shape:
//!
//! ```text
//! PROJECT
//!   INPUT        device-facing source processors
//!   OUTPUT       device-facing sink processors
//!   TRACKS       TRACK* (master last), each with a PROCESSOR_LANE and CLIP*
//!   CONNECTIONS  CONNECTION*, kept in canonical order
//!   VIEW_STATE   slot counts, focus, modes
//! ```

mod connections;
pub(crate) mod copied;
mod io;
mod tracks;
pub mod typed;
mod view;

use std::fmt;

use strata_types::{ids, GraphNodeId, NodeId, NodeType, ProcessorDescription};
use uuid::Uuid;

use crate::catalog::{PluginCatalog, AUDIO_INPUT, AUDIO_OUTPUT};
use crate::config::Config;
use crate::graph::AudioGraphHost;
use crate::tree::{StateTree, ValueNode};

pub use copied::CopiedState;
pub use typed::{ClipRef, ConnectionRef, ProcessorRef, TrackRef, TypedNode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    NotAProject(NodeType),
    MissingNode(NodeType),
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::NotAProject(t) => write!(f, "root node is {}, expected PROJECT", t),
            StateError::MissingNode(t) => write!(f, "project has no {} node", t),
        }
    }
}

impl std::error::Error for StateError {}

pub struct ProjectState {
    tree: StateTree,
    project: NodeId,
    input: NodeId,
    output: NodeId,
    tracks: NodeId,
    connections: NodeId,
    view: NodeId,
    graph: Box<dyn AudioGraphHost>,
    catalog: PluginCatalog,
    next_graph_node_id: u32,
}

impl ProjectState {
    /// Empty project: device I/O processors, no tracks.
    pub fn new(config: &Config, graph: Box<dyn AudioGraphHost>) -> Self {
        let mut tree = StateTree::new(NodeType::Project);
        let project = tree.root();
        tree.set_property(project, ids::UUID, Uuid::new_v4().to_string(), None);

        let input = add_container(&mut tree, ValueNode::new(NodeType::Input));
        let output = add_container(&mut tree, ValueNode::new(NodeType::Output));
        let tracks = add_container(&mut tree, ValueNode::new(NodeType::Tracks));
        let connections = add_container(&mut tree, ValueNode::new(NodeType::Connections));
        let view = add_container(
            &mut tree,
            ValueNode::new(NodeType::ViewState)
                .with_property(ids::NUM_PROCESSOR_SLOTS, config.processor_slots())
                .with_property(ids::NUM_MASTER_PROCESSOR_SLOTS, config.master_processor_slots())
                .with_property(ids::FOCUSED_TRACK_INDEX, 0)
                .with_property(ids::FOCUSED_PROCESSOR_SLOT, 0)
                .with_property(ids::CONTROL_MODE, strata_types::ControlMode::default().as_str())
                .with_property(ids::FOCUSED_PANE, strata_types::FocusedPane::default().as_str()),
        );

        let mut state = Self {
            tree,
            project,
            input,
            output,
            tracks,
            connections,
            view,
            graph,
            catalog: PluginCatalog::new(),
            next_graph_node_id: 1,
        };
        state.add_io_processor(input, AUDIO_INPUT, None);
        state.add_io_processor(output, AUDIO_OUTPUT, None);
        state
    }

    /// Adopt an existing tree, e.g. one read from disk.
    pub fn from_tree(tree: StateTree, graph: Box<dyn AudioGraphHost>) -> Result<Self, StateError> {
        let project = tree.root();
        match tree.node_type(project) {
            Some(NodeType::Project) => {}
            Some(other) => return Err(StateError::NotAProject(other)),
            None => return Err(StateError::MissingNode(NodeType::Project)),
        }
        let find = |t: NodeType| tree.child_of_type(project, t).ok_or(StateError::MissingNode(t));
        let input = find(NodeType::Input)?;
        let output = find(NodeType::Output)?;
        let tracks = find(NodeType::Tracks)?;
        let connections = find(NodeType::Connections)?;
        let view = find(NodeType::ViewState)?;

        let mut state = Self {
            tree,
            project,
            input,
            output,
            tracks,
            connections,
            view,
            graph,
            catalog: PluginCatalog::new(),
            next_graph_node_id: 1,
        };
        let processors = state.all_processors();
        let max_id = processors
            .iter()
            .filter_map(|p| state.processor_node_id(*p))
            .map(GraphNodeId::get)
            .max()
            .unwrap_or(0);
        state.next_graph_node_id = max_id + 1;
        state.normalise_connections();
        for p in processors {
            if let Some(id) = state.processor_node_id(p) {
                state.graph.on_processor_created(id, p);
            }
        }
        Ok(state)
    }

    pub fn tree(&self) -> &StateTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut StateTree {
        &mut self.tree
    }

    pub fn project_node(&self) -> NodeId {
        self.project
    }

    pub fn input_node(&self) -> NodeId {
        self.input
    }

    pub fn output_node(&self) -> NodeId {
        self.output
    }

    pub fn tracks_node(&self) -> NodeId {
        self.tracks
    }

    pub fn connections_node(&self) -> NodeId {
        self.connections
    }

    pub fn view_node(&self) -> NodeId {
        self.view
    }

    pub fn graph(&self) -> &dyn AudioGraphHost {
        self.graph.as_ref()
    }

    pub fn graph_mut(&mut self) -> &mut dyn AudioGraphHost {
        self.graph.as_mut()
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut PluginCatalog {
        &mut self.catalog
    }

    pub fn allocate_graph_node_id(&mut self) -> GraphNodeId {
        let id = GraphNodeId::new(self.next_graph_node_id);
        self.next_graph_node_id += 1;
        id
    }

    /// Fresh processor node for `description`, with its own graph node id.
    pub fn processor_value(&mut self, description: &ProcessorDescription) -> ValueNode {
        let node_id = self.allocate_graph_node_id();
        ValueNode::new(NodeType::Processor)
            .with_property(ids::UUID, Uuid::new_v4().to_string())
            .with_property(ids::ID, description.identifier.as_str())
            .with_property(ids::NAME, description.name.as_str())
            .with_property(ids::NODE_ID, node_id.get())
            .with_property(ids::NUM_INPUT_CHANNELS, description.num_input_channels)
            .with_property(ids::NUM_OUTPUT_CHANNELS, description.num_output_channels)
            .with_property(ids::ACCEPTS_MIDI, description.accepts_midi)
            .with_property(ids::PRODUCES_MIDI, description.produces_midi)
            .with_property(ids::ALLOW_DEFAULT_CONNECTIONS, true)
            .with_property(ids::BYPASSED, false)
    }

    /// Copy of a processor that can live next to the original.
    pub fn copy_processor_value(&mut self, source: &ValueNode) -> ValueNode {
        let node_id = self.allocate_graph_node_id();
        let mut copy = source.detached_copy();
        copy.set_property(ids::UUID, Uuid::new_v4().to_string());
        copy.set_property(ids::NODE_ID, node_id.get());
        copy
    }

    /// Fresh track node with an empty processor lane.
    pub fn track_value(&self, name: &str, colour: &str, is_master: bool) -> ValueNode {
        let mut track = ValueNode::new(NodeType::Track)
            .with_property(ids::UUID, Uuid::new_v4().to_string())
            .with_property(ids::NAME, name)
            .with_property(ids::COLOUR, colour)
            .with_property(ids::SELECTED, false);
        if is_master {
            track.set_property(ids::IS_MASTER_TRACK, true);
        }
        track.with_child(
            ValueNode::new(NodeType::ProcessorLane)
                .with_property(ids::SELECTED_SLOTS_MASK, strata_types::SlotMask::new().to_binary_string()),
        )
    }

    pub fn clip_value(&self, name: &str, start: f64, length: f64) -> ValueNode {
        ValueNode::new(NodeType::Clip)
            .with_property(ids::UUID, Uuid::new_v4().to_string())
            .with_property(ids::NAME, name)
            .with_property(ids::START, start)
            .with_property(ids::LENGTH, length)
            .with_property(ids::SELECTED, false)
    }

    /// Graph node id the engine knows this processor by, if it has one live.
    pub fn audio_processor_for(&self, processor: NodeId) -> Option<GraphNodeId> {
        self.processor_node_id(processor)
            .filter(|id| self.graph.has_processor(*id))
    }
}

fn add_container(tree: &mut StateTree, mut value: ValueNode) -> NodeId {
    let root = tree.root();
    let id = tree.reserve_ids(&mut value);
    if let Err(e) = tree.add_child(root, value, None, None) {
        log::error!(target: "tree", "could not build project skeleton: {}", e);
    }
    id
}

/// HSV to an ARGB hex string, as track colours are stored.
pub(crate) fn hsv_colour(hue: f64, saturation: f64, value: f64) -> String {
    let h = hue.rem_euclid(1.0) * 6.0;
    let c = value * saturation;
    let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    let byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    format!("ff{:02x}{:02x}{:02x}", byte(r), byte(g), byte(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DetachedGraph;

    #[test]
    fn new_project_has_skeleton() {
        let state = ProjectState::new(&Config::default(), Box::new(DetachedGraph));
        let tree = state.tree();
        let root = tree.root();
        let types: Vec<NodeType> = tree
            .children(root)
            .iter()
            .filter_map(|c| tree.node_type(*c))
            .collect();
        assert_eq!(
            types,
            vec![
                NodeType::Input,
                NodeType::Output,
                NodeType::Tracks,
                NodeType::Connections,
                NodeType::ViewState
            ]
        );
        assert_eq!(state.num_processor_slots(), 7);
        assert!(state.audio_input_processor().is_some());
        assert!(state.audio_output_processor().is_some());
        assert_eq!(state.num_tracks(), 0);
    }

    #[test]
    fn from_tree_requires_all_containers() {
        let mut tree = StateTree::new(NodeType::Project);
        let root = tree.root();
        tree.add_child(root, ValueNode::new(NodeType::Input), None, None)
            .unwrap();
        let err = ProjectState::from_tree(tree, Box::new(DetachedGraph)).err();
        assert_eq!(err, Some(StateError::MissingNode(NodeType::Output)));

        let tree = StateTree::new(NodeType::Track);
        let err = ProjectState::from_tree(tree, Box::new(DetachedGraph)).err();
        assert_eq!(err, Some(StateError::NotAProject(NodeType::Track)));
    }

    #[test]
    fn from_tree_continues_graph_ids() {
        let state = ProjectState::new(&Config::default(), Box::new(DetachedGraph));
        let value = state.tree().snapshot(state.project_node()).unwrap();
        let mut loaded =
            ProjectState::from_tree(StateTree::from_value(&value), Box::new(DetachedGraph))
                .unwrap();
        assert_eq!(loaded.allocate_graph_node_id(), GraphNodeId::new(3));
    }

    #[test]
    fn colours() {
        assert_eq!(hsv_colour(0.0, 1.0, 1.0), "ffff0000");
        assert_eq!(hsv_colour(1.0 / 3.0, 1.0, 1.0), "ff00ff00");
        assert_eq!(hsv_colour(0.5, 0.0, 0.5), "ff808080");
    }
}
