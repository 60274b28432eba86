//! Typed views over tree nodes.
//!
//! A node's type tag picks one of a closed set of wrappers; the wrappers are
//! plain ids with accessors that read through a `&StateTree`.

use strata_types::{ids, Connection, Endpoint, GraphNodeId, NodeId, NodeType};

use crate::tree::StateTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedNode {
    Project(NodeId),
    Track(TrackRef),
    Processor(ProcessorRef),
    Clip(ClipRef),
    Connection(ConnectionRef),
    /// Containers, lanes and view state.
    Other(NodeType, NodeId),
}

impl TypedNode {
    pub fn of(tree: &StateTree, node: NodeId) -> Option<TypedNode> {
        let typed = match tree.node_type(node)? {
            NodeType::Project => TypedNode::Project(node),
            NodeType::Track => TypedNode::Track(TrackRef(node)),
            NodeType::Processor => TypedNode::Processor(ProcessorRef(node)),
            NodeType::Clip => TypedNode::Clip(ClipRef(node)),
            NodeType::Connection => TypedNode::Connection(ConnectionRef(node)),
            other => TypedNode::Other(other, node),
        };
        Some(typed)
    }

    pub fn id(&self) -> NodeId {
        match *self {
            TypedNode::Project(id) | TypedNode::Other(_, id) => id,
            TypedNode::Track(t) => t.0,
            TypedNode::Processor(p) => p.0,
            TypedNode::Clip(c) => c.0,
            TypedNode::Connection(c) => c.0,
        }
    }

    /// Display name for items that have one.
    pub fn name(&self, tree: &StateTree) -> Option<String> {
        match self {
            TypedNode::Track(t) => Some(t.name(tree)),
            TypedNode::Processor(p) => Some(p.name(tree)),
            TypedNode::Clip(c) => Some(c.name(tree)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackRef(pub NodeId);

impl TrackRef {
    pub fn name(self, tree: &StateTree) -> String {
        tree.get_string(self.0, ids::NAME)
    }

    pub fn colour(self, tree: &StateTree) -> String {
        tree.get_string(self.0, ids::COLOUR)
    }

    pub fn uuid(self, tree: &StateTree) -> String {
        tree.get_string(self.0, ids::UUID)
    }

    pub fn is_master(self, tree: &StateTree) -> bool {
        tree.get_bool(self.0, ids::IS_MASTER_TRACK)
    }

    pub fn is_selected(self, tree: &StateTree) -> bool {
        tree.get_bool(self.0, ids::SELECTED)
    }

    pub fn lane(self, tree: &StateTree) -> Option<NodeId> {
        tree.child_of_type(self.0, NodeType::ProcessorLane)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorRef(pub NodeId);

impl ProcessorRef {
    pub fn name(self, tree: &StateTree) -> String {
        tree.get_string(self.0, ids::NAME)
    }

    pub fn identifier(self, tree: &StateTree) -> String {
        tree.get_string(self.0, ids::ID)
    }

    pub fn node_id(self, tree: &StateTree) -> GraphNodeId {
        GraphNodeId::new(tree.get_int(self.0, ids::NODE_ID).max(0) as u32)
    }

    pub fn slot(self, tree: &StateTree) -> usize {
        tree.get_int(self.0, ids::PROCESSOR_SLOT).max(0) as usize
    }

    pub fn is_bypassed(self, tree: &StateTree) -> bool {
        tree.get_bool(self.0, ids::BYPASSED)
    }

    pub fn allows_default_connections(self, tree: &StateTree) -> bool {
        tree.get_bool(self.0, ids::ALLOW_DEFAULT_CONNECTIONS)
    }

    /// Track owning the lane this processor sits in.
    pub fn track(self, tree: &StateTree) -> Option<TrackRef> {
        let lane = tree.parent(self.0)?;
        let track = tree.parent(lane)?;
        tree.has_type(track, NodeType::Track).then_some(TrackRef(track))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRef(pub NodeId);

impl ClipRef {
    pub fn name(self, tree: &StateTree) -> String {
        tree.get_string(self.0, ids::NAME)
    }

    pub fn start(self, tree: &StateTree) -> f64 {
        tree.get_property(self.0, ids::START).as_float()
    }

    pub fn length(self, tree: &StateTree) -> f64 {
        tree.get_property(self.0, ids::LENGTH).as_float()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionRef(pub NodeId);

impl ConnectionRef {
    pub fn connection(self, tree: &StateTree) -> Connection {
        let node_id = |key| GraphNodeId::new(tree.get_int(self.0, key).max(0) as u32);
        let channel = |key| tree.get_int(self.0, key) as i32;
        Connection::new(
            Endpoint::new(node_id(ids::SOURCE_NODE_ID), channel(ids::SOURCE_CHANNEL)),
            Endpoint::new(
                node_id(ids::DESTINATION_NODE_ID),
                channel(ids::DESTINATION_CHANNEL),
            ),
            tree.get_bool(self.0, ids::IS_CUSTOM_CONNECTION),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ValueNode;

    #[test]
    fn factory_picks_variant_from_tag() {
        let mut tree = StateTree::new(NodeType::Project);
        let root = tree.root();
        let track = tree
            .add_child(
                root,
                ValueNode::new(NodeType::Track).with_property(ids::NAME, "Bass"),
                None,
                None,
            )
            .unwrap();
        let lane = tree
            .add_child(track, ValueNode::new(NodeType::ProcessorLane), None, None)
            .unwrap();
        let proc_ = tree
            .add_child(
                lane,
                ValueNode::new(NodeType::Processor).with_property(ids::PROCESSOR_SLOT, 3),
                None,
                None,
            )
            .unwrap();

        assert_eq!(TypedNode::of(&tree, root), Some(TypedNode::Project(root)));
        assert_eq!(
            TypedNode::of(&tree, lane),
            Some(TypedNode::Other(NodeType::ProcessorLane, lane))
        );
        let Some(TypedNode::Processor(p)) = TypedNode::of(&tree, proc_) else {
            panic!("expected a processor");
        };
        assert_eq!(p.slot(&tree), 3);
        assert_eq!(p.track(&tree), Some(TrackRef(track)));
        assert_eq!(
            TypedNode::of(&tree, track).and_then(|t| t.name(&tree)),
            Some("Bass".to_string())
        );
    }
}
