//! Undoable edits.
//!
//! Every structural or routing change is an [`Action`]. Constructors validate
//! against the current state and return `ActionError` when the edit makes no
//! sense; `perform` and `undo` then report whether anything changed.
//!
//! Composite actions (insert, delete selection, move selection) compute their
//! parts by running them for real while being built and rolling them back, so
//! later parts see the ids and slots earlier parts produce.

mod connections;
mod delete;
mod insert;
mod move_items;
mod processor;
mod select;
mod track;
mod tree_edit;

use std::fmt;

use strata_types::NodeId;

use crate::state::ProjectState;
use crate::tree::TreeError;

pub use connections::CreateOrDeleteConnections;
pub use delete::DeleteSelectedItems;
pub use insert::{CreateItem, Insert};
pub use move_items::MoveSelectedItems;
pub use processor::{CreateProcessor, DeleteProcessor, InsertProcessor};
pub use select::{Select, Selection};
pub use track::{CreateTrack, DeleteTrack, MoveTrack};
pub use tree_edit::{Journal, TreeEdit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    NothingSelected,
    NothingCopied,
    UnknownTrack(usize),
    UnknownNode(NodeId),
    UnknownProcessor(NodeId),
    UnknownDescription(String),
    SlotOutOfRange(usize),
    MasterTrackExists,
    MoveOutOfRange,
    /// `node` cannot live under `parent`.
    CannotMoveInto { node: NodeId, parent: NodeId },
    Tree(TreeError),
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::NothingSelected => write!(f, "nothing is selected"),
            ActionError::NothingCopied => write!(f, "nothing has been copied"),
            ActionError::UnknownTrack(i) => write!(f, "no track at index {}", i),
            ActionError::UnknownNode(id) => write!(f, "node {} is not in the project", id),
            ActionError::UnknownProcessor(id) => write!(f, "node {} is not a processor", id),
            ActionError::UnknownDescription(name) => write!(f, "unknown processor type '{}'", name),
            ActionError::SlotOutOfRange(slot) => write!(f, "slot {} is out of range", slot),
            ActionError::MasterTrackExists => write!(f, "the project already has a master track"),
            ActionError::MoveOutOfRange => write!(f, "move would leave the grid"),
            ActionError::CannotMoveInto { node, parent } => {
                write!(f, "node {} cannot be moved into {}", node, parent)
            }
            ActionError::Tree(e) => write!(f, "tree edit rejected: {}", e),
        }
    }
}

impl std::error::Error for ActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ActionError::Tree(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TreeError> for ActionError {
    fn from(e: TreeError) -> Self {
        ActionError::Tree(e)
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    /// A single edit made through the tree with an undo handle.
    Tree(TreeEdit),
    Connections(CreateOrDeleteConnections),
    CreateTrack(CreateTrack),
    DeleteTrack(DeleteTrack),
    MoveTrack(MoveTrack),
    InsertProcessor(InsertProcessor),
    CreateProcessor(CreateProcessor),
    DeleteProcessor(DeleteProcessor),
    Insert(Insert),
    DeleteSelectedItems(DeleteSelectedItems),
    MoveSelectedItems(MoveSelectedItems),
    Select(Select),
}

impl Action {
    pub fn perform(&mut self, state: &mut ProjectState) -> bool {
        match self {
            Action::Tree(edit) => edit.apply(state.tree_mut(), true),
            Action::Connections(a) => a.perform(state),
            Action::CreateTrack(a) => a.perform(state),
            Action::DeleteTrack(a) => a.perform(state),
            Action::MoveTrack(a) => a.perform(state),
            Action::InsertProcessor(a) => a.perform(state),
            Action::CreateProcessor(a) => a.perform(state),
            Action::DeleteProcessor(a) => a.perform(state),
            Action::Insert(a) => a.perform(state),
            Action::DeleteSelectedItems(a) => a.perform(state),
            Action::MoveSelectedItems(a) => a.perform(state),
            Action::Select(a) => a.perform(state),
        }
    }

    pub fn undo(&mut self, state: &mut ProjectState) -> bool {
        match self {
            Action::Tree(edit) => edit.apply(state.tree_mut(), false),
            Action::Connections(a) => a.undo(state),
            Action::CreateTrack(a) => a.undo(state),
            Action::DeleteTrack(a) => a.undo(state),
            Action::MoveTrack(a) => a.undo(state),
            Action::InsertProcessor(a) => a.undo(state),
            Action::CreateProcessor(a) => a.undo(state),
            Action::DeleteProcessor(a) => a.undo(state),
            Action::Insert(a) => a.undo(state),
            Action::DeleteSelectedItems(a) => a.undo(state),
            Action::MoveSelectedItems(a) => a.undo(state),
            Action::Select(a) => a.undo(state),
        }
    }

    pub fn supports_temporary_perform(&self) -> bool {
        matches!(
            self,
            Action::CreateProcessor(_) | Action::DeleteProcessor(_) | Action::DeleteTrack(_)
        )
    }

    /// Tree edits without telling the audio graph, for dry runs.
    pub fn perform_temporary(&mut self, state: &mut ProjectState) -> bool {
        match self {
            Action::CreateProcessor(a) => a.perform_temporary(state),
            Action::DeleteProcessor(a) => a.perform_temporary(state),
            Action::DeleteTrack(a) => a.perform_temporary(state),
            other => other.perform(state),
        }
    }

    pub fn undo_temporary(&mut self, state: &mut ProjectState) -> bool {
        match self {
            Action::CreateProcessor(a) => a.undo_temporary(state),
            Action::DeleteProcessor(a) => a.undo_temporary(state),
            Action::DeleteTrack(a) => a.undo_temporary(state),
            other => other.undo(state),
        }
    }

    /// Merge `next`, already performed, into this action.
    pub fn coalesce_with(&mut self, next: &Action) -> bool {
        match (self, next) {
            (Action::Tree(a), Action::Tree(b)) => a.coalesce_with(b),
            (Action::Connections(a), Action::Connections(b)) => {
                a.coalesce_with(b);
                true
            }
            _ => false,
        }
    }

    /// Merged down to nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Action::Tree(edit) => edit.is_empty(),
            Action::Connections(a) => a.is_empty(),
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Tree(edit) => edit.name(),
            Action::Connections(_) => "connections",
            Action::CreateTrack(_) => "create track",
            Action::DeleteTrack(_) => "delete track",
            Action::MoveTrack(_) => "move track",
            Action::InsertProcessor(_) => "insert processor",
            Action::CreateProcessor(_) => "create processor",
            Action::DeleteProcessor(_) => "delete processor",
            Action::Insert(_) => "insert",
            Action::DeleteSelectedItems(_) => "delete selected items",
            Action::MoveSelectedItems(_) => "move selected items",
            Action::Select(_) => "select",
        }
    }
}

macro_rules! impl_from_action {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Action {
                fn from(a: $variant) -> Self {
                    Action::$variant(a)
                }
            }
        )*
    };
}

impl_from_action!(
    CreateTrack,
    DeleteTrack,
    MoveTrack,
    InsertProcessor,
    CreateProcessor,
    DeleteProcessor,
    Insert,
    DeleteSelectedItems,
    MoveSelectedItems,
    Select,
);

impl From<TreeEdit> for Action {
    fn from(edit: TreeEdit) -> Self {
        Action::Tree(edit)
    }
}

impl From<CreateOrDeleteConnections> for Action {
    fn from(a: CreateOrDeleteConnections) -> Self {
        Action::Connections(a)
    }
}
