use strata_types::{NodeId, Var};

use crate::notify::MoveInfo;
use crate::tree::{StateTree, UndoHandle, ValueNode};

/// One recorded tree mutation, replayable in either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEdit {
    /// `None` means the property was absent. `index` is the key's position
    /// in the node's property list.
    SetProperty {
        node: NodeId,
        key: String,
        index: usize,
        old: Option<Var>,
        new: Option<Var>,
    },
    AddChild {
        parent: NodeId,
        index: usize,
        child: ValueNode,
    },
    RemoveChild {
        parent: NodeId,
        index: usize,
        child: ValueNode,
    },
    MoveChild {
        parent: NodeId,
        from: usize,
        to: usize,
    },
    Reparent(MoveInfo),
}

impl TreeEdit {
    /// Re-apply (`forward`) or revert the edit. Never records.
    pub fn apply(&self, tree: &mut StateTree, forward: bool) -> bool {
        let result = match self {
            TreeEdit::SetProperty {
                node,
                key,
                index,
                old,
                new,
            } => {
                let target = if forward { new } else { old };
                return match target {
                    Some(value) => tree.restore_property(*node, key, value.clone(), *index),
                    None => tree.remove_property(*node, key, None),
                };
            }
            TreeEdit::AddChild {
                parent,
                index,
                child,
            } => insert_or_remove(tree, *parent, *index, child, forward),
            TreeEdit::RemoveChild {
                parent,
                index,
                child,
            } => insert_or_remove(tree, *parent, *index, child, !forward),
            TreeEdit::MoveChild { parent, from, to } => {
                let (from, to) = if forward { (*from, *to) } else { (*to, *from) };
                tree.move_child(*parent, from, to, None)
            }
            TreeEdit::Reparent(info) => {
                let (parent, index) = if forward {
                    (info.new_parent, info.new_index)
                } else {
                    (info.old_parent, info.old_index)
                };
                tree.move_to_new_parent(info.child, parent, Some(index), None)
            }
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                log::error!(target: "undo", "could not replay {}: {}", self.name(), e);
                false
            }
        }
    }

    /// Fold a later edit of the same property into this one.
    pub fn coalesce_with(&mut self, next: &TreeEdit) -> bool {
        match (self, next) {
            (
                TreeEdit::SetProperty { node, key, new, .. },
                TreeEdit::SetProperty {
                    node: next_node,
                    key: next_key,
                    new: next_new,
                    ..
                },
            ) if node == next_node && key == next_key => {
                *new = next_new.clone();
                true
            }
            _ => false,
        }
    }

    /// A property edit that ends where it started.
    pub fn is_empty(&self) -> bool {
        matches!(self, TreeEdit::SetProperty { old, new, .. } if old == new)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TreeEdit::SetProperty { .. } => "set property",
            TreeEdit::AddChild { .. } => "add child",
            TreeEdit::RemoveChild { .. } => "remove child",
            TreeEdit::MoveChild { .. } => "move child",
            TreeEdit::Reparent(_) => "move to new parent",
        }
    }
}

fn insert_or_remove(
    tree: &mut StateTree,
    parent: NodeId,
    index: usize,
    child: &ValueNode,
    insert: bool,
) -> Result<(), crate::tree::TreeError> {
    if insert {
        tree.add_child(parent, child.clone(), Some(index), None).map(|_| ())
    } else {
        tree.remove_child(parent, index, None).map(|_| ())
    }
}

/// Edits captured while a composite action runs for the first time, so that
/// later runs replay exactly the same changes.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    edits: Vec<TreeEdit>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn redo(&self, tree: &mut StateTree) -> bool {
        let mut changed = false;
        for edit in &self.edits {
            changed |= edit.apply(tree, true);
        }
        changed
    }

    pub fn undo(&self, tree: &mut StateTree) -> bool {
        let mut changed = false;
        for edit in self.edits.iter().rev() {
            changed |= edit.apply(tree, false);
        }
        changed
    }
}

impl UndoHandle for Journal {
    fn record(&mut self, edit: TreeEdit) {
        self.edits.push(edit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_types::NodeType;

    #[test]
    fn journal_reverts_and_replays() {
        let mut tree = StateTree::new(NodeType::Project);
        let root = tree.root();
        let before = tree.snapshot(root);

        let mut journal = Journal::new();
        let tracks = tree
            .add_child(root, ValueNode::new(NodeType::Tracks), None, Some(&mut journal))
            .unwrap();
        let a = tree
            .add_child(tracks, ValueNode::new(NodeType::Track), None, Some(&mut journal))
            .unwrap();
        let b = tree
            .add_child(tracks, ValueNode::new(NodeType::Track), None, Some(&mut journal))
            .unwrap();
        tree.set_property(a, "name", "A", Some(&mut journal));
        tree.move_to_new_parent(b, a, None, Some(&mut journal))
            .unwrap();
        let after = tree.snapshot(root);
        assert_eq!(journal.len(), 5);

        assert!(journal.undo(&mut tree));
        assert_eq!(tree.snapshot(root), before);
        assert!(!tree.contains(a));

        assert!(journal.redo(&mut tree));
        assert_eq!(tree.snapshot(root), after);
        assert_eq!(tree.parent(b), Some(a));
    }

    #[test]
    fn removed_property_returns_to_its_place() {
        let mut tree = StateTree::new(NodeType::Project);
        let root = tree.root();
        let track = tree
            .add_child(root, ValueNode::new(NodeType::Track), None, None)
            .unwrap();
        tree.set_property(track, "a", 1_i32, None);
        tree.set_property(track, "b", 2_i32, None);
        let before = tree.snapshot(root);

        let mut journal = Journal::new();
        assert!(tree.remove_property(track, "a", Some(&mut journal)));
        assert!(journal.undo(&mut tree));
        assert_eq!(tree.snapshot(root), before);

        assert!(journal.redo(&mut tree));
        assert!(tree.property(track, "a").is_none());
        assert!(journal.undo(&mut tree));
        assert_eq!(tree.snapshot(root), before);
    }

    #[test]
    fn property_edits_fold() {
        let node = NodeId::new(7);
        let mut first = TreeEdit::SetProperty {
            node,
            key: "name".into(),
            index: 0,
            old: None,
            new: Some(Var::from("a")),
        };
        let second = TreeEdit::SetProperty {
            node,
            key: "name".into(),
            index: 0,
            old: Some(Var::from("a")),
            new: None,
        };
        let other = TreeEdit::SetProperty {
            node,
            key: "colour".into(),
            index: 1,
            old: None,
            new: Some(Var::from("ff000000")),
        };
        assert!(!first.coalesce_with(&other));
        assert!(first.coalesce_with(&second));
        assert!(first.is_empty());
    }
}
