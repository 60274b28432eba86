//! Observable hierarchical key-value store.
//!
//! Live nodes sit in an arena keyed by [`NodeId`]; a parent owns the ordered
//! list of its children and a child only keeps the id of its parent. A
//! subtree taken out of the tree becomes a [`ValueNode`], an owned value that
//! keeps its ids so that putting it back restores the exact same nodes.

use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strata_types::{NodeId, NodeType, Var};

use crate::action::TreeEdit;
use crate::notify::{ListenerFilter, MoveInfo, Notification, NotificationBus, Subscription};

/// Receives every edit made through a tree method that was handed a handle.
///
/// Passing `None` instead makes the edit permanent.
pub trait UndoHandle {
    fn record(&mut self, edit: TreeEdit);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    UnknownNode(NodeId),
    NotAChild { parent: NodeId, child: NodeId },
    IndexOutOfRange { parent: NodeId, index: usize, len: usize },
    WouldCreateCycle { node: NodeId, new_parent: NodeId },
    DuplicateNode(NodeId),
    RootCannotMove,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::UnknownNode(id) => write!(f, "node {} is not in the tree", id),
            TreeError::NotAChild { parent, child } => {
                write!(f, "node {} is not a child of {}", child, parent)
            }
            TreeError::IndexOutOfRange { parent, index, len } => write!(
                f,
                "index {} out of range for {} ({} children)",
                index, parent, len
            ),
            TreeError::WouldCreateCycle { node, new_parent } => write!(
                f,
                "moving {} under {} would make it its own ancestor",
                node, new_parent
            ),
            TreeError::DuplicateNode(id) => write!(f, "node {} is already in the tree", id),
            TreeError::RootCannotMove => write!(f, "the root node cannot be moved or removed"),
        }
    }
}

impl std::error::Error for TreeError {}

/// Owned, detached node with its whole subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueNode {
    #[serde(skip)]
    id: Option<NodeId>,
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(default, with = "ordered_properties")]
    properties: Vec<(String, Var)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<ValueNode>,
}

impl ValueNode {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            id: None,
            node_type,
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Var>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn with_child(mut self, child: ValueNode) -> Self {
        self.children.push(child);
        self
    }

    /// Arena id this value had (or will get) in a tree.
    pub fn id(&self) -> Option<NodeId> {
        self.id
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn has_type(&self, node_type: NodeType) -> bool {
        self.node_type == node_type
    }

    pub fn property(&self, key: &str) -> Option<&Var> {
        self.properties.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get(&self, key: &str) -> Var {
        self.property(key).cloned().unwrap_or_default()
    }

    pub fn properties(&self) -> &[(String, Var)] {
        &self.properties
    }

    pub fn set_property(&mut self, key: &str, value: impl Into<Var>) {
        let value = value.into();
        match self.properties.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.properties.push((key.to_string(), value)),
        }
    }

    pub fn remove_property(&mut self, key: &str) -> Option<Var> {
        let pos = self.properties.iter().position(|(k, _)| k == key)?;
        Some(self.properties.remove(pos).1)
    }

    pub fn children(&self) -> &[ValueNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<ValueNode> {
        &mut self.children
    }

    pub fn child(&self, index: usize) -> Option<&ValueNode> {
        self.children.get(index)
    }

    pub fn child_of_type(&self, node_type: NodeType) -> Option<&ValueNode> {
        self.children.iter().find(|c| c.node_type == node_type)
    }

    pub fn child_of_type_mut(&mut self, node_type: NodeType) -> Option<&mut ValueNode> {
        self.children.iter_mut().find(|c| c.node_type == node_type)
    }

    /// A copy that will get fresh ids when added to a tree.
    pub fn detached_copy(&self) -> ValueNode {
        ValueNode {
            id: None,
            node_type: self.node_type,
            properties: self.properties.clone(),
            children: self.children.iter().map(ValueNode::detached_copy).collect(),
        }
    }

    fn collect_ids(&self, out: &mut Vec<NodeId>) {
        if let Some(id) = self.id {
            out.push(id);
        }
        for child in &self.children {
            child.collect_ids(out);
        }
    }
}

/// Structural equality: type, properties and children, recursively. Arena ids
/// are bookkeeping and take no part in it.
impl PartialEq for ValueNode {
    fn eq(&self, other: &Self) -> bool {
        self.node_type == other.node_type
            && self.properties == other.properties
            && self.children == other.children
    }
}

mod ordered_properties {
    use super::*;

    pub fn serialize<S: Serializer>(props: &[(String, Var)], s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(props.len()))?;
        for (k, v) in props {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<(String, Var)>, D::Error> {
        struct PropsVisitor;

        impl<'de> Visitor<'de> for PropsVisitor {
            type Value = Vec<(String, Var)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of property values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut props = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((k, v)) = map.next_entry::<String, Var>()? {
                    props.push((k, v));
                }
                Ok(props)
            }
        }

        d.deserialize_map(PropsVisitor)
    }
}

struct NodeData {
    node_type: NodeType,
    parent: Option<NodeId>,
    properties: Vec<(String, Var)>,
    children: Vec<NodeId>,
}

pub struct StateTree {
    nodes: HashMap<NodeId, NodeData>,
    root: NodeId,
    next_id: u64,
    bus: NotificationBus,
}

impl StateTree {
    pub fn new(root_type: NodeType) -> Self {
        let root = NodeId::new(1);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            NodeData {
                node_type: root_type,
                parent: None,
                properties: Vec::new(),
                children: Vec::new(),
            },
        );
        Self {
            nodes,
            root,
            next_id: 2,
            bus: NotificationBus::new(),
        }
    }

    /// Build a tree whose root is `value`. Ids carried by `value` are ignored.
    pub fn from_value(value: &ValueNode) -> Self {
        let mut tree = Self::new(value.node_type);
        let root = tree.root;
        if let Some(data) = tree.nodes.get_mut(&root) {
            data.properties = value.properties.clone();
        }
        for child in &value.children {
            let mut child = child.detached_copy();
            tree.reserve_ids(&mut child);
            let id = tree.attach(root, child);
            if let Some(data) = tree.nodes.get_mut(&root) {
                data.children.push(id);
            }
        }
        tree
    }

    pub fn create_node(&self, node_type: NodeType) -> ValueNode {
        ValueNode::new(node_type)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn node_type(&self, node: NodeId) -> Option<NodeType> {
        self.nodes.get(&node).map(|d| d.node_type)
    }

    pub fn has_type(&self, node: NodeId, node_type: NodeType) -> bool {
        self.node_type(node) == Some(node_type)
    }

    pub fn property(&self, node: NodeId, key: &str) -> Option<&Var> {
        self.nodes
            .get(&node)?
            .properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Property value, or `Var::Void` when unset.
    pub fn get_property(&self, node: NodeId, key: &str) -> Var {
        self.property(node, key).cloned().unwrap_or_default()
    }

    pub fn get_bool(&self, node: NodeId, key: &str) -> bool {
        self.property(node, key).map(Var::as_bool).unwrap_or(false)
    }

    pub fn get_int(&self, node: NodeId, key: &str) -> i64 {
        self.property(node, key).map(Var::as_int).unwrap_or(0)
    }

    pub fn get_string(&self, node: NodeId, key: &str) -> String {
        self.property(node, key)
            .map(|v| v.to_string())
            .unwrap_or_default()
    }

    pub fn properties(&self, node: NodeId) -> &[(String, Var)] {
        self.nodes
            .get(&node)
            .map(|d| d.properties.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node)?.parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(&node)
            .map(|d| d.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn num_children(&self, node: NodeId) -> usize {
        self.children(node).len()
    }

    pub fn child(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.children(node).get(index).copied()
    }

    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == child)
    }

    pub fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        self.index_of(self.parent(node)?, node)
    }

    /// True when `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    pub fn child_of_type(&self, parent: NodeId, node_type: NodeType) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.has_type(*c, node_type))
    }

    pub fn child_with_property(&self, parent: NodeId, key: &str, value: &Var) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.property(*c, key) == Some(value))
    }

    /// All nodes below `node`, depth first, parents before children.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Copy of the subtree rooted at `node`, ids included.
    pub fn snapshot(&self, node: NodeId) -> Option<ValueNode> {
        let data = self.nodes.get(&node)?;
        Some(ValueNode {
            id: Some(node),
            node_type: data.node_type,
            properties: data.properties.clone(),
            children: data
                .children
                .iter()
                .filter_map(|c| self.snapshot(*c))
                .collect(),
        })
    }

    /// Give every node in `value` without an id a fresh one. Returns the root's id.
    pub fn reserve_ids(&mut self, value: &mut ValueNode) -> NodeId {
        let id = match value.id {
            Some(id) => id,
            None => {
                let id = NodeId::new(self.next_id);
                self.next_id += 1;
                value.id = Some(id);
                id
            }
        };
        for child in &mut value.children {
            self.reserve_ids(child);
        }
        id
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn subscribe<F>(&self, filter: ListenerFilter, callback: F) -> Subscription
    where
        F: FnMut(&Notification, &StateTree) + 'static,
    {
        self.bus.subscribe(filter, callback)
    }

    // ── mutation ──

    /// Returns false when the node already had this value.
    pub fn set_property(
        &mut self,
        node: NodeId,
        key: &str,
        value: impl Into<Var>,
        undo: Option<&mut dyn UndoHandle>,
    ) -> bool {
        self.write_property(node, key, value.into(), None, undo)
    }

    /// Like `set_property`, but a missing key goes back in at `index`.
    pub(crate) fn restore_property(&mut self, node: NodeId, key: &str, value: Var, index: usize) -> bool {
        self.write_property(node, key, value, Some(index), None)
    }

    fn write_property(
        &mut self,
        node: NodeId,
        key: &str,
        value: Var,
        position: Option<usize>,
        undo: Option<&mut dyn UndoHandle>,
    ) -> bool {
        let Some(data) = self.nodes.get_mut(&node) else {
            log::warn!(target: "tree", "set_property {} on missing node {}", key, node);
            return false;
        };
        let (index, old) = match data.properties.iter().position(|(k, _)| k == key) {
            Some(pos) if data.properties[pos].1 == value => return false,
            Some(pos) => (pos, Some(std::mem::replace(&mut data.properties[pos].1, value.clone()))),
            None => {
                let pos = position
                    .unwrap_or(data.properties.len())
                    .min(data.properties.len());
                data.properties.insert(pos, (key.to_string(), value.clone()));
                (pos, None)
            }
        };
        let node_type = data.node_type;
        let selected_now = key == strata_types::ids::SELECTED && value.as_bool();

        self.emit(Notification::PropertyChanged {
            node,
            key: key.to_string(),
        });
        if selected_now && node_type.is_project_item() {
            self.emit(Notification::ItemSelected { node });
        }
        if let Some(undo) = undo {
            undo.record(TreeEdit::SetProperty {
                node,
                key: key.to_string(),
                index,
                old,
                new: Some(value),
            });
        }
        true
    }

    pub fn remove_property(
        &mut self,
        node: NodeId,
        key: &str,
        undo: Option<&mut dyn UndoHandle>,
    ) -> bool {
        let Some(data) = self.nodes.get_mut(&node) else {
            return false;
        };
        let Some(pos) = data.properties.iter().position(|(k, _)| k == key) else {
            return false;
        };
        let (_, old) = data.properties.remove(pos);
        self.emit(Notification::PropertyChanged {
            node,
            key: key.to_string(),
        });
        if let Some(undo) = undo {
            undo.record(TreeEdit::SetProperty {
                node,
                key: key.to_string(),
                index: pos,
                old: Some(old),
                new: None,
            });
        }
        true
    }

    /// Attach `child` under `parent` at `index` (`None` appends).
    pub fn add_child(
        &mut self,
        parent: NodeId,
        mut child: ValueNode,
        index: Option<usize>,
        undo: Option<&mut dyn UndoHandle>,
    ) -> Result<NodeId, TreeError> {
        let len = self.checked(parent)?.children.len();
        let index = index.unwrap_or(len);
        if index > len {
            return Err(self.reject(TreeError::IndexOutOfRange { parent, index, len }));
        }
        let mut ids = Vec::new();
        child.collect_ids(&mut ids);
        if let Some(dup) = ids.into_iter().find(|id| self.nodes.contains_key(id)) {
            return Err(self.reject(TreeError::DuplicateNode(dup)));
        }
        self.reserve_ids(&mut child);
        let recorded = undo.is_some().then(|| child.clone());
        let node_type = child.node_type;

        let id = self.attach(parent, child);
        if let Some(data) = self.nodes.get_mut(&parent) {
            data.children.insert(index, id);
        }

        self.emit(Notification::ChildAdded {
            parent,
            child: id,
            index,
        });
        if node_type.is_project_item() {
            self.emit(Notification::ItemSelected { node: id });
        }
        if let (Some(undo), Some(child)) = (undo, recorded) {
            undo.record(TreeEdit::AddChild {
                parent,
                index,
                child,
            });
        }
        Ok(id)
    }

    /// Detach the child at `index`. Listeners hear about the removal while the
    /// child is still readable.
    pub fn remove_child(
        &mut self,
        parent: NodeId,
        index: usize,
        undo: Option<&mut dyn UndoHandle>,
    ) -> Result<ValueNode, TreeError> {
        let len = self.checked(parent)?.children.len();
        if index >= len {
            return Err(self.reject(TreeError::IndexOutOfRange { parent, index, len }));
        }
        let child = match self.nodes.get_mut(&parent) {
            Some(data) => data.children.remove(index),
            None => return Err(TreeError::UnknownNode(parent)),
        };
        let is_item = self
            .node_type(child)
            .map(NodeType::is_project_item)
            .unwrap_or(false);

        self.emit(Notification::ChildRemoved {
            parent,
            child,
            index,
        });
        if is_item {
            self.emit(Notification::ItemRemoved { node: child });
        }

        let value = self.detach(child);
        if let Some(undo) = undo {
            undo.record(TreeEdit::RemoveChild {
                parent,
                index,
                child: value.clone(),
            });
        }
        Ok(value)
    }

    pub fn remove_node(
        &mut self,
        node: NodeId,
        undo: Option<&mut dyn UndoHandle>,
    ) -> Result<ValueNode, TreeError> {
        let parent = self.parent(node).ok_or(TreeError::RootCannotMove)?;
        let index = self
            .index_of(parent, node)
            .ok_or(TreeError::NotAChild { parent, child: node })?;
        self.remove_child(parent, index, undo)
    }

    /// Reorder within one parent. Fires a single `ChildOrderChanged`.
    pub fn move_child(
        &mut self,
        parent: NodeId,
        from: usize,
        to: usize,
        undo: Option<&mut dyn UndoHandle>,
    ) -> Result<(), TreeError> {
        let len = self.checked(parent)?.children.len();
        if from >= len || to >= len {
            let index = from.max(to);
            return Err(self.reject(TreeError::IndexOutOfRange { parent, index, len }));
        }
        if from == to {
            return Ok(());
        }
        if let Some(data) = self.nodes.get_mut(&parent) {
            let id = data.children.remove(from);
            data.children.insert(to, id);
        }
        self.emit(Notification::ChildOrderChanged {
            parent,
            old_index: from,
            new_index: to,
        });
        if let Some(undo) = undo {
            undo.record(TreeEdit::MoveChild { parent, from, to });
        }
        Ok(())
    }

    /// Re-parent `node` without tearing it down. Listeners get a will-move and
    /// a has-moved notification instead of a remove/add pair.
    pub fn move_to_new_parent(
        &mut self,
        node: NodeId,
        new_parent: NodeId,
        index: Option<usize>,
        undo: Option<&mut dyn UndoHandle>,
    ) -> Result<(), TreeError> {
        self.checked(node)?;
        let new_len = self.checked(new_parent)?.children.len();
        let Some(old_parent) = self.parent(node) else {
            return Err(self.reject(TreeError::RootCannotMove));
        };
        if new_parent == node || self.is_ancestor_of(node, new_parent) {
            return Err(self.reject(TreeError::WouldCreateCycle { node, new_parent }));
        }
        let old_index = self
            .index_of(old_parent, node)
            .ok_or(TreeError::NotAChild {
                parent: old_parent,
                child: node,
            })?;

        if old_parent == new_parent {
            let to = index.unwrap_or(new_len - 1).min(new_len - 1);
            return self.move_child(old_parent, old_index, to, undo);
        }

        let new_index = index.unwrap_or(new_len);
        if new_index > new_len {
            return Err(self.reject(TreeError::IndexOutOfRange {
                parent: new_parent,
                index: new_index,
                len: new_len,
            }));
        }
        let info = MoveInfo {
            child: node,
            old_parent,
            old_index,
            new_parent,
            new_index,
        };

        self.emit(Notification::ChildWillMoveToNewParent(info));
        if let Some(data) = self.nodes.get_mut(&old_parent) {
            data.children.remove(old_index);
        }
        if let Some(data) = self.nodes.get_mut(&new_parent) {
            data.children.insert(new_index, node);
        }
        if let Some(data) = self.nodes.get_mut(&node) {
            data.parent = Some(new_parent);
        }
        self.emit(Notification::ChildMovedToNewParent(info));

        if let Some(undo) = undo {
            undo.record(TreeEdit::Reparent(info));
        }
        Ok(())
    }

    // ── internals ──

    fn checked(&self, node: NodeId) -> Result<&NodeData, TreeError> {
        match self.nodes.get(&node) {
            Some(data) => Ok(data),
            None => Err(self.reject(TreeError::UnknownNode(node))),
        }
    }

    fn reject(&self, err: TreeError) -> TreeError {
        log::error!(target: "tree", "rejected edit: {}", err);
        err
    }

    fn emit(&self, notification: Notification) {
        self.bus.dispatch(&notification, self);
    }

    /// Insert `value`'s subtree into the arena. Does not touch `parent`'s child list.
    fn attach(&mut self, parent: NodeId, value: ValueNode) -> NodeId {
        let id = match value.id {
            Some(id) => id,
            None => {
                let id = NodeId::new(self.next_id);
                self.next_id += 1;
                id
            }
        };
        let children: Vec<NodeId> = value
            .children
            .into_iter()
            .map(|c| self.attach(id, c))
            .collect();
        self.nodes.insert(
            id,
            NodeData {
                node_type: value.node_type,
                parent: Some(parent),
                properties: value.properties,
                children,
            },
        );
        id
    }

    fn detach(&mut self, node: NodeId) -> ValueNode {
        let data = self.nodes.remove(&node);
        match data {
            Some(data) => ValueNode {
                id: Some(node),
                node_type: data.node_type,
                properties: data.properties,
                children: data.children.into_iter().map(|c| self.detach(c)).collect(),
            },
            None => ValueNode::new(NodeType::Project),
        }
    }
}

impl fmt::Debug for StateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTree")
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
