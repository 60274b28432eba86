use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::action::{Action, TreeEdit};
use crate::state::ProjectState;
use crate::tree::UndoHandle;

/// Default number of transactions kept.
pub const DEFAULT_MAX_TRANSACTIONS: usize = 500;

/// One undo/redo step: every action performed between two transaction boundaries.
#[derive(Debug)]
struct Transaction {
    name: String,
    actions: Vec<Action>,
}

pub struct UndoManager {
    undo_stack: VecDeque<Transaction>,
    redo_stack: Vec<Transaction>,
    max_transactions: usize,
    /// Idle time after which the next action opens a new transaction.
    coalesce_window: Option<Duration>,
    /// Set when the next action must open a new transaction.
    pending_name: Option<String>,
    last_push: Option<Instant>,
}

impl UndoManager {
    pub fn new(max_transactions: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_transactions: max_transactions.max(1),
            coalesce_window: None,
            pending_name: Some(String::new()),
            last_push: None,
        }
    }

    pub fn with_coalesce_window(mut self, window: Option<Duration>) -> Self {
        self.coalesce_window = window;
        self
    }

    /// Perform `action` and record it. Actions that change nothing are dropped.
    pub fn perform(&mut self, mut action: Action, state: &mut ProjectState) -> bool {
        if !action.perform(state) {
            log::debug!(target: "undo", "{} changed nothing, not recorded", action.name());
            return false;
        }
        log::debug!(target: "undo", "performed {}", action.name());
        self.push_performed(action);
        true
    }

    /// Record an action whose effects are already applied.
    pub fn push_performed(&mut self, action: Action) {
        self.redo_stack.clear();

        let now = Instant::now();
        let idle = match (self.coalesce_window, self.last_push) {
            (Some(window), Some(last)) => now.duration_since(last) > window,
            _ => false,
        };
        self.last_push = Some(now);

        if self.pending_name.is_some() || idle || self.undo_stack.is_empty() {
            let name = self.pending_name.take().unwrap_or_default();
            self.undo_stack.push_back(Transaction {
                name,
                actions: Vec::new(),
            });
            while self.undo_stack.len() > self.max_transactions {
                self.undo_stack.pop_front();
            }
        }

        let Some(transaction) = self.undo_stack.back_mut() else {
            return;
        };
        if let Some(last) = transaction.actions.last_mut() {
            if last.coalesce_with(&action) {
                if last.is_empty() {
                    log::debug!(target: "undo", "{} cancelled out", action.name());
                    transaction.actions.pop();
                }
                if transaction.actions.is_empty() {
                    if let Some(t) = self.undo_stack.pop_back() {
                        self.pending_name = Some(t.name);
                    }
                }
                return;
            }
        }
        transaction.actions.push(action);
    }

    /// Close the current transaction. The next recorded action starts a new one.
    pub fn begin_new_transaction(&mut self, name: impl Into<String>) {
        self.pending_name = Some(name.into());
    }

    /// A boundary is set and no action has been recorded after it yet.
    pub fn is_transaction_pending(&self) -> bool {
        self.pending_name.is_some()
    }

    pub fn undo(&mut self, state: &mut ProjectState) -> bool {
        let Some(mut transaction) = self.undo_stack.pop_back() else {
            return false;
        };
        let mut changed = false;
        for action in transaction.actions.iter_mut().rev() {
            changed |= action.undo(state);
        }
        log::debug!(target: "undo", "undid '{}' ({} actions)", transaction.name, transaction.actions.len());
        self.redo_stack.push(transaction);
        self.pending_name.get_or_insert_with(String::new);
        changed
    }

    pub fn redo(&mut self, state: &mut ProjectState) -> bool {
        let Some(mut transaction) = self.redo_stack.pop() else {
            return false;
        };
        let mut changed = false;
        for action in transaction.actions.iter_mut() {
            changed |= action.perform(state);
        }
        log::debug!(target: "undo", "redid '{}' ({} actions)", transaction.name, transaction.actions.len());
        self.undo_stack.push_back(transaction);
        self.pending_name.get_or_insert_with(String::new);
        changed
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|t| t.name.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|t| t.name.as_str())
    }

    pub fn num_transactions(&self) -> usize {
        self.undo_stack.len()
    }

    /// Actions recorded in the newest transaction.
    pub fn last_transaction_len(&self) -> usize {
        self.undo_stack.back().map(|t| t.actions.len()).unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending_name = Some(String::new());
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRANSACTIONS)
    }
}

impl UndoHandle for UndoManager {
    fn record(&mut self, edit: TreeEdit) {
        self.push_performed(Action::Tree(edit));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::graph::DetachedGraph;
    use strata_types::ids;

    fn state() -> ProjectState {
        ProjectState::new(&Config::default(), Box::new(DetachedGraph))
    }

    #[test]
    fn undo_and_redo_property_edit() {
        let mut state = state();
        let mut undo = UndoManager::default();
        let project = state.project_node();
        state
            .tree_mut()
            .set_property(project, ids::NAME, "Song", Some(&mut undo));
        assert!(undo.can_undo());

        assert!(undo.undo(&mut state));
        assert_eq!(state.tree().get_string(project, ids::NAME), "");
        assert!(undo.can_redo());

        assert!(undo.redo(&mut state));
        assert_eq!(state.tree().get_string(project, ids::NAME), "Song");
    }

    #[test]
    fn property_edits_in_one_transaction_coalesce() {
        let mut state = state();
        let mut undo = UndoManager::default();
        let project = state.project_node();
        undo.begin_new_transaction("rename");
        for name in ["a", "ab", "abc"] {
            state
                .tree_mut()
                .set_property(project, ids::NAME, name, Some(&mut undo));
        }
        assert_eq!(undo.num_transactions(), 1);
        assert_eq!(undo.last_transaction_len(), 1);
        assert_eq!(undo.undo_description(), Some("rename"));

        undo.undo(&mut state);
        assert_eq!(state.tree().get_property(project, ids::NAME), strata_types::Var::Void);
    }

    #[test]
    fn edits_that_net_to_nothing_leave_no_history() {
        let mut state = state();
        let mut undo = UndoManager::default();
        let project = state.project_node();
        state
            .tree_mut()
            .set_property(project, ids::NAME, "tmp", Some(&mut undo));
        state
            .tree_mut()
            .remove_property(project, ids::NAME, Some(&mut undo));
        assert!(!undo.can_undo());
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut state = state();
        let mut undo = UndoManager::default();
        let project = state.project_node();
        state
            .tree_mut()
            .set_property(project, ids::NAME, "one", Some(&mut undo));
        undo.undo(&mut state);
        assert!(undo.can_redo());
        state
            .tree_mut()
            .set_property(project, ids::NAME, "two", Some(&mut undo));
        assert!(!undo.can_redo());
    }

    #[test]
    fn oldest_transactions_fall_off() {
        let mut state = state();
        let mut undo = UndoManager::new(3);
        let project = state.project_node();
        for i in 0..5 {
            undo.begin_new_transaction(format!("t{}", i));
            state
                .tree_mut()
                .set_property(project, ids::NAME, format!("n{}", i), Some(&mut undo));
        }
        assert_eq!(undo.num_transactions(), 3);
        while undo.undo(&mut state) {}
        assert_eq!(state.tree().get_string(project, ids::NAME), "n1");
    }

    #[test]
    fn empty_history_is_a_no_op() {
        let mut state = state();
        let mut undo = UndoManager::default();
        assert!(!undo.undo(&mut state));
        assert!(!undo.redo(&mut state));
    }
}
