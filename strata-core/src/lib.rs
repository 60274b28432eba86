//! Project state core for the strata editor.
//!
//! The project lives in an observable [`tree::StateTree`]. Every structural or
//! topology edit goes through an [`action::Action`], performed and recorded by
//! the [`undo::UndoManager`]. [`project::Project`] bundles the pieces behind
//! the intent-level API that views and control surfaces call.

pub mod action;
pub mod catalog;
pub mod config;
pub mod graph;
pub mod mailbox;
pub mod notify;
pub mod persistence;
pub mod project;
pub mod slots;
pub mod state;
pub mod tree;
pub mod undo;

pub use action::{Action, ActionError};
pub use config::Config;
pub use notify::{ListenerFilter, Notification, Subscription};
pub use project::Project;
pub use state::ProjectState;
pub use tree::{StateTree, TreeError, UndoHandle, ValueNode};
pub use undo::UndoManager;

pub use strata_types::*;
