//! The editing facade.
//!
//! [`Project`] owns the state, the undo history, the coordination mailbox and
//! the clipboard. Views and control surfaces call its intent methods; each
//! intent builds the actions it needs, performs them through the undo manager
//! and keeps default routing up to date.

use std::path::Path;

use strata_types::{ids, Connection, ControlMode, FocusedPane, NodeId, NodeType};

use crate::action::{
    Action, ActionError, CreateOrDeleteConnections, CreateProcessor, CreateTrack,
    DeleteSelectedItems, Insert, MoveSelectedItems, MoveTrack, Select,
};
use crate::config::Config;
use crate::graph::{AudioGraphHost, DetachedGraph};
use crate::mailbox::{Mailbox, MailboxSender, Posted};
use crate::notify::{ListenerFilter, Notification, Subscription};
use crate::persistence::{self, PersistenceError};
use crate::state::{CopiedState, ProjectState};
use crate::tree::{StateTree, TreeError};
use crate::undo::UndoManager;

pub struct Project {
    state: ProjectState,
    undo: UndoManager,
    mailbox: Mailbox,
    copied: CopiedState,
    /// Edit gesture the current transaction belongs to, if any.
    gesture: Option<Gesture>,
}

/// Runs of the same gesture share one undo step.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Gesture {
    Routing,
    Property { node: NodeId, key: String },
}

impl Project {
    /// New project with the configured starting tracks and no engine attached.
    pub fn new(config: &Config) -> Self {
        Self::with_graph(config, Box::new(DetachedGraph))
    }

    pub fn with_graph(config: &Config, graph: Box<dyn AudioGraphHost>) -> Self {
        let mut state = ProjectState::new(config, graph);
        for _ in 0..config.default_track_count() {
            match CreateTrack::new(&mut state, None, false, None) {
                Ok(create) => {
                    create.perform(&mut state);
                }
                Err(e) => log::error!(target: "actions", "could not create starting track: {}", e),
            }
        }
        if config.create_master_track() {
            match CreateTrack::new(&mut state, None, true, None) {
                Ok(create) => {
                    create.perform(&mut state);
                }
                Err(e) => log::error!(target: "actions", "could not create master track: {}", e),
            }
        }
        CreateOrDeleteConnections::update_all_default_connections(&state, false).perform(&mut state);
        log::info!(target: "actions", "new project with {} tracks", state.num_tracks());
        Self::from_state(state, config)
    }

    /// Wrap an existing state with an empty history.
    pub fn from_state(state: ProjectState, config: &Config) -> Self {
        Self {
            state,
            undo: UndoManager::new(config.max_transactions())
                .with_coalesce_window(config.coalesce_window()),
            mailbox: Mailbox::new(),
            copied: CopiedState::new(),
            gesture: None,
        }
    }

    pub fn open(
        path: &Path,
        config: &Config,
        graph: Box<dyn AudioGraphHost>,
    ) -> Result<Self, PersistenceError> {
        let state = persistence::load_project(path, graph)?;
        Ok(Self::from_state(state, config))
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        persistence::save_project(path, &self.state)
    }

    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    pub fn tree(&self) -> &StateTree {
        self.state.tree()
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo
    }

    pub fn copied(&self) -> &CopiedState {
        &self.copied
    }

    pub fn subscribe<F>(&self, filter: ListenerFilter, callback: F) -> Subscription
    where
        F: FnMut(&Notification, &StateTree) + 'static,
    {
        self.state.tree().subscribe(filter, callback)
    }

    /// Handle for background threads to post to this project.
    pub fn mailbox_sender(&self) -> MailboxSender {
        self.mailbox.sender()
    }

    /// Apply everything posted since the last pump. Returns how many messages
    /// were handled.
    pub fn pump(&mut self) -> usize {
        let messages = self.mailbox.drain();
        let count = messages.len();
        for message in messages {
            match message {
                Posted::DevicesChanged {
                    midi_inputs,
                    midi_outputs,
                } => {
                    if self.state.sync_midi_devices(&midi_inputs, &midi_outputs) {
                        let focused = self.state.focused_track();
                        CreateOrDeleteConnections::reset_default_external_inputs(&self.state, focused)
                            .perform(&mut self.state);
                    }
                }
                Posted::BeginTransaction(name) => self.begin_transaction(name),
            }
        }
        count
    }

    // ── undo ──

    /// Perform and record. Returns false when nothing changed.
    pub fn perform(&mut self, action: impl Into<Action>) -> bool {
        self.undo.perform(action.into(), &mut self.state)
    }

    pub fn begin_transaction(&mut self, name: impl Into<String>) {
        self.gesture = None;
        self.undo.begin_new_transaction(name);
    }

    /// Open a transaction unless the last one was the same gesture or the
    /// caller already opened one.
    fn continue_gesture(&mut self, gesture: Gesture, name: &str) {
        if self.gesture.as_ref() != Some(&gesture) {
            if !self.undo.is_transaction_pending() {
                self.begin_transaction(name);
            }
            self.gesture = Some(gesture);
        }
    }

    pub fn undo(&mut self) -> bool {
        self.gesture = None;
        self.undo.undo(&mut self.state)
    }

    pub fn redo(&mut self) -> bool {
        self.gesture = None;
        self.undo.redo(&mut self.state)
    }

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    fn update_default_connections(&mut self, make_invalid_defaults_into_custom: bool) {
        let rewire = CreateOrDeleteConnections::update_all_default_connections(
            &self.state,
            make_invalid_defaults_into_custom,
        );
        self.perform(rewire);
    }

    // ── tracks and processors ──

    /// Append a track and select it.
    pub fn create_track(&mut self) -> Result<NodeId, ActionError> {
        self.begin_transaction("create track");
        let create = CreateTrack::new(&mut self.state, None, false, None)?;
        let (index, track) = (create.insert_index, create.track_id());
        self.perform(create);
        let select = Select::track(&self.state, index, true, true)?;
        self.perform(select);
        self.update_default_connections(false);
        Ok(track)
    }

    pub fn create_master_track(&mut self) -> Result<NodeId, ActionError> {
        self.begin_transaction("create master track");
        let create = CreateTrack::new(&mut self.state, None, true, None)?;
        let track = create.track_id();
        self.perform(create);
        self.update_default_connections(false);
        Ok(track)
    }

    /// Instantiate `identifier` on a track. A generator for a track that
    /// already has one goes onto a new track instead. `slot` defaults to the
    /// first free slot.
    pub fn create_processor(
        &mut self,
        identifier: &str,
        track_index: usize,
        slot: Option<usize>,
    ) -> Result<NodeId, ActionError> {
        let description = self
            .state
            .catalog()
            .find(identifier)
            .cloned()
            .ok_or_else(|| ActionError::UnknownDescription(identifier.to_string()))?;
        let track = self
            .state
            .track(track_index)
            .ok_or(ActionError::UnknownTrack(track_index))?;

        self.begin_transaction(format!("create {}", description.name));
        let (track_index, slot) = if description.is_generator_or_instrument()
            && self.state.track_has_generator_or_instrument(track)
        {
            let create = CreateTrack::new(&mut self.state, None, false, None)?;
            let index = create.insert_index;
            self.perform(create);
            (index, 0)
        } else {
            let slot = slot
                .or_else(|| self.state.first_free_slot(track))
                .unwrap_or(0);
            (track_index, slot)
        };

        let create = CreateProcessor::new(&mut self.state, &description, track_index, slot)?;
        let processor = create.processor();
        self.perform(create);
        let select = Select::processor_slot(&self.state, track_index, slot, true, true)?;
        self.perform(select);
        self.update_default_connections(false);
        Ok(processor)
    }

    pub fn delete_selected_items(&mut self) -> Result<bool, ActionError> {
        self.begin_transaction("delete");
        let delete = DeleteSelectedItems::new(&mut self.state)?;
        if !self.perform(delete) {
            return Ok(false);
        }
        self.update_default_connections(false);
        let clamp = Select::clamp_focus(&self.state);
        self.perform(clamp);
        Ok(true)
    }

    pub fn move_track(&mut self, from: usize, to: usize) -> Result<bool, ActionError> {
        self.begin_transaction("move track");
        let action = MoveTrack::new(&self.state, from, to)?;
        let moved = self.perform(action);
        if moved {
            self.update_default_connections(false);
        }
        Ok(moved)
    }

    pub fn move_selected_items(
        &mut self,
        track_delta: isize,
        slot_delta: isize,
    ) -> Result<bool, ActionError> {
        self.begin_transaction("move selection");
        let action = MoveSelectedItems::new(&mut self.state, track_delta, slot_delta)?;
        Ok(self.perform(action))
    }

    /// Drag-and-drop reparenting of clips between tracks, or of tracks within
    /// the track list. Items are placed at `index` under `new_parent`.
    pub fn move_items(
        &mut self,
        items: &[NodeId],
        new_parent: NodeId,
        index: usize,
    ) -> Result<bool, ActionError> {
        let tree = self.state.tree();
        let parent_type = tree
            .node_type(new_parent)
            .ok_or(ActionError::UnknownNode(new_parent))?;
        for &item in items {
            let item_type = tree.node_type(item).ok_or(ActionError::UnknownNode(item))?;
            if item == new_parent || tree.is_ancestor_of(item, new_parent) {
                return Err(TreeError::WouldCreateCycle {
                    node: item,
                    new_parent,
                }
                .into());
            }
            let fits = match item_type {
                NodeType::Clip => parent_type == NodeType::Track,
                NodeType::Track => {
                    parent_type == NodeType::Tracks && !self.state.is_master_track(item)
                }
                _ => false,
            };
            if !fits {
                return Err(ActionError::CannotMoveInto {
                    node: item,
                    parent: new_parent,
                });
            }
        }
        if items.is_empty() {
            return Ok(false);
        }

        self.begin_transaction("move items");
        let mut insert_index = index;
        if parent_type == NodeType::Tracks {
            insert_index = insert_index.min(self.state.num_non_master_tracks());
        }
        let mut changed = false;
        for &item in items.iter().rev() {
            let Some(old_parent) = self.state.tree().parent(item) else {
                continue;
            };
            let result = if old_parent == new_parent {
                let tree = self.state.tree();
                let Some(from) = tree.index_of(old_parent, item) else {
                    continue;
                };
                if from < insert_index {
                    insert_index -= 1;
                }
                let to = insert_index.min(tree.num_children(old_parent).saturating_sub(1));
                changed |= from != to;
                self.state
                    .tree_mut()
                    .move_child(old_parent, from, to, Some(&mut self.undo))
            } else {
                let len = self.state.tree().num_children(new_parent);
                changed = true;
                self.state.tree_mut().move_to_new_parent(
                    item,
                    new_parent,
                    Some(insert_index.min(len)),
                    Some(&mut self.undo),
                )
            };
            result?;
        }
        if changed && parent_type == NodeType::Tracks {
            self.update_default_connections(false);
        }
        Ok(changed)
    }

    // ── selection ──

    fn select(&mut self, select: Select) -> bool {
        self.begin_transaction("select");
        self.perform(select)
    }

    pub fn select_track(
        &mut self,
        index: usize,
        selected: bool,
        deselect_others: bool,
    ) -> Result<bool, ActionError> {
        let select = Select::track(&self.state, index, selected, deselect_others)?;
        Ok(self.select(select))
    }

    pub fn select_processor_slot(
        &mut self,
        track_index: usize,
        slot: usize,
        selected: bool,
        deselect_others: bool,
    ) -> Result<bool, ActionError> {
        let select =
            Select::processor_slot(&self.state, track_index, slot, selected, deselect_others)?;
        Ok(self.select(select))
    }

    pub fn select_all(&mut self) -> bool {
        let select = Select::all(&self.state);
        self.select(select)
    }

    pub fn deselect_all(&mut self) -> bool {
        let select = Select::none(&self.state);
        self.select(select)
    }

    pub fn select_rectangle(&mut self, from: (usize, usize), to: (usize, usize)) -> bool {
        let select = Select::rectangle(&self.state, from, to);
        self.select(select)
    }

    pub fn set_focus(&mut self, track_index: usize, slot: usize) -> Result<bool, ActionError> {
        let select = Select::focus(&self.state, track_index, slot)?;
        Ok(self.select(select))
    }

    // ── clipboard ──

    /// Returns false when nothing was selected.
    pub fn copy_selected(&mut self) -> bool {
        self.copied.copy_selected_items(&self.state);
        !self.copied.is_empty()
    }

    /// Insert the clipboard at the focused track and slot.
    pub fn paste(&mut self) -> Result<bool, ActionError> {
        let to = self.state.focused_track_and_slot();
        self.begin_transaction("paste");
        let insert = Insert::new(&mut self.state, false, &self.copied, to)?;
        let pasted = self.perform(insert);
        if pasted {
            self.update_default_connections(false);
        }
        Ok(pasted)
    }

    /// Copy the selection next to itself. The clipboard is left alone.
    pub fn duplicate_selected(&mut self) -> Result<bool, ActionError> {
        let mut copied = CopiedState::new();
        copied.copy_selected_items(&self.state);
        if copied.is_empty() {
            return Err(ActionError::NothingSelected);
        }
        let to = self.state.focused_track_and_slot();
        self.begin_transaction("duplicate");
        let insert = Insert::new(&mut self.state, true, &copied, to)?;
        let duplicated = self.perform(insert);
        if duplicated {
            self.update_default_connections(false);
        }
        Ok(duplicated)
    }

    // ── routing ──

    /// Add a custom connection. Illegal connections change nothing.
    ///
    /// Consecutive cable edits form one undo step.
    pub fn connect(&mut self, connection: Connection) -> bool {
        self.continue_gesture(Gesture::Routing, "patch");
        let create = CreateOrDeleteConnections::create(&self.state, connection, false);
        self.perform(create)
    }

    pub fn disconnect(&mut self, connection: &Connection) -> bool {
        self.continue_gesture(Gesture::Routing, "patch");
        let delete = CreateOrDeleteConnections::delete(&self.state, connection, true, true);
        self.perform(delete)
    }

    pub fn disconnect_custom(&mut self, processor: NodeId) -> bool {
        self.continue_gesture(Gesture::Routing, "patch");
        let delete = CreateOrDeleteConnections::disconnect_custom(&self.state, processor);
        self.perform(delete)
    }

    /// Opting a processor out of default routing keeps its current default
    /// outputs as custom connections.
    pub fn set_default_connections_allowed(
        &mut self,
        processor: NodeId,
        allowed: bool,
    ) -> Result<bool, ActionError> {
        if !self.state.tree().has_type(processor, NodeType::Processor) {
            return Err(ActionError::UnknownProcessor(processor));
        }
        self.begin_transaction("default connections");
        let changed = self.state.tree_mut().set_property(
            processor,
            ids::ALLOW_DEFAULT_CONNECTIONS,
            allowed,
            Some(&mut self.undo),
        );
        if !changed {
            return Ok(false);
        }
        if !allowed {
            let keep = CreateOrDeleteConnections::update_processor_default_connections(
                &self.state,
                processor,
                true,
            );
            self.perform(keep);
        }
        self.update_default_connections(false);
        Ok(true)
    }

    // ── item properties ──

    pub fn add_clip(
        &mut self,
        track: NodeId,
        name: &str,
        start: f64,
        length: f64,
    ) -> Result<NodeId, ActionError> {
        if !self.state.tree().has_type(track, NodeType::Track) {
            return Err(ActionError::UnknownNode(track));
        }
        let clip = self.state.clip_value(name, start, length);
        self.begin_transaction("add clip");
        let id = self
            .state
            .tree_mut()
            .add_child(track, clip, None, Some(&mut self.undo))?;
        Ok(id)
    }

    pub fn rename(&mut self, node: NodeId, name: &str) -> Result<bool, ActionError> {
        self.set_item_property(node, ids::NAME, name)
    }

    pub fn set_colour(&mut self, track: NodeId, colour: &str) -> Result<bool, ActionError> {
        if !self.state.tree().has_type(track, NodeType::Track) {
            return Err(ActionError::UnknownNode(track));
        }
        self.set_item_property(track, ids::COLOUR, colour)
    }

    pub fn set_processor_bypassed(
        &mut self,
        processor: NodeId,
        bypassed: bool,
    ) -> Result<bool, ActionError> {
        if !self.state.tree().has_type(processor, NodeType::Processor) {
            return Err(ActionError::UnknownProcessor(processor));
        }
        self.set_item_property(processor, ids::BYPASSED, bypassed)
    }

    /// Repeated edits of one property (a drag, typing) form one undo step.
    fn set_item_property(
        &mut self,
        node: NodeId,
        key: &str,
        value: impl Into<strata_types::Var>,
    ) -> Result<bool, ActionError> {
        if !self.state.tree().contains(node) {
            return Err(ActionError::UnknownNode(node));
        }
        self.continue_gesture(
            Gesture::Property {
                node,
                key: key.to_string(),
            },
            "edit",
        );
        Ok(self
            .state
            .tree_mut()
            .set_property(node, key, value, Some(&mut self.undo)))
    }

    // ── view ──

    pub fn toggle_control_mode(&mut self) -> ControlMode {
        let mode = self.state.control_mode().toggled();
        self.state.set_control_mode(mode);
        mode
    }

    pub fn set_focused_pane(&mut self, pane: FocusedPane) -> bool {
        self.state.set_focused_pane(pane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn config(tracks: usize, master: bool) -> Config {
        Config::default().with_starting_tracks(tracks, master)
    }

    #[test]
    fn new_project_has_starting_tracks_and_no_history() {
        let project = Project::new(&config(2, true));
        let state = project.state();
        assert_eq!(state.num_tracks(), 3);
        assert_eq!(state.num_non_master_tracks(), 2);
        assert!(state.master_track().is_some());
        assert!(!project.can_undo());
    }

    #[test]
    fn create_processor_routes_and_undoes_as_one_step() {
        let mut project = Project::new(&config(1, true));
        let before = project.tree().snapshot(project.state().project_node());

        let synth = project.create_processor("Sine Synth", 0, None).unwrap();
        let state = project.state();
        assert_eq!(state.processor_slot(synth), 0);
        assert!(state.is_processor_selected(synth));
        let synth_id = state.processor_node_id(synth).unwrap();
        assert!(state.connections().iter().any(|c| c.source.node == synth_id));
        assert_eq!(project.undo_manager().num_transactions(), 1);

        assert!(project.undo());
        assert_eq!(project.tree().snapshot(project.state().project_node()), before);
        assert!(project.redo());
        assert_eq!(project.state().track_for_processor(synth), project.state().track(0));
    }

    #[test]
    fn second_generator_opens_a_new_track() {
        let mut project = Project::new(&config(1, false));
        project.create_processor("Sine Synth", 0, None).unwrap();
        let second = project.create_processor("Sine Bank", 0, None).unwrap();
        let state = project.state();
        assert_eq!(state.num_tracks(), 2);
        assert_eq!(state.track_for_processor(second), state.track(1));
    }

    #[test]
    fn unknown_identifier_is_an_error() {
        let mut project = Project::new(&config(1, false));
        assert_eq!(
            project.create_processor("Theremin", 0, None),
            Err(ActionError::UnknownDescription("Theremin".to_string()))
        );
        assert!(!project.can_undo());
    }

    #[test]
    fn copy_then_paste_into_focus() {
        let mut project = Project::new(&config(2, false));
        project.create_processor("Gain", 0, Some(0)).unwrap();
        assert!(project.copy_selected());
        project.set_focus(1, 2).unwrap();
        assert!(project.paste().unwrap());
        let state = project.state();
        let track = state.track(1).unwrap();
        assert_eq!(state.processors(track).len(), 1);
        assert_eq!(state.processor_slot(state.processors(track)[0]), 2);
    }

    #[test]
    fn delete_selection_clamps_focus() {
        let mut project = Project::new(&config(3, false));
        project.select_track(2, true, true).unwrap();
        assert!(project.delete_selected_items().unwrap());
        assert_eq!(project.state().num_tracks(), 2);
        assert_eq!(project.state().focused_track_index(), 1);
        assert!(project.undo());
        assert_eq!(project.state().num_tracks(), 3);
    }

    #[test]
    fn property_edits_go_through_history() {
        let mut project = Project::new(&config(1, false));
        let track = project.state().track(0).unwrap();
        assert!(project.rename(track, "Drums").unwrap());
        assert!(!project.rename(track, "Drums").unwrap());
        assert_eq!(project.tree().get_string(track, ids::NAME), "Drums");
        project.undo();
        assert_eq!(project.tree().get_string(track, ids::NAME), "Track 1");
    }

    #[test]
    fn cable_edits_get_their_own_undo_step() {
        let mut project = Project::new(&config(1, false));
        let a = project.create_processor("Gain", 0, Some(0)).unwrap();
        let b = project.create_processor("Gain", 0, Some(2)).unwrap();
        let (a_id, b_id) = {
            let state = project.state();
            (state.processor_node_id(a).unwrap(), state.processor_node_id(b).unwrap())
        };
        let transactions = project.undo_manager().num_transactions();

        let cable = Connection::audio(a_id, 0, b_id, 1);
        assert!(project.connect(cable));
        assert!(project.connect(Connection::audio(a_id, 1, b_id, 0)));
        assert_eq!(project.undo_manager().num_transactions(), transactions + 1);

        assert!(project.undo());
        assert_eq!(project.undo_manager().num_transactions(), transactions);
        let state = project.state();
        assert!(!state.has_connection(&cable.with_custom(true)));
        assert_eq!(state.processors(state.track(0).unwrap()).len(), 2);
    }

    #[test]
    fn edits_of_one_property_merge_until_something_else_happens() {
        let mut project = Project::new(&config(1, false));
        let track = project.state().track(0).unwrap();
        let transactions = project.undo_manager().num_transactions();
        project.rename(track, "D").unwrap();
        project.rename(track, "Dr").unwrap();
        project.rename(track, "Drums").unwrap();
        assert_eq!(project.undo_manager().num_transactions(), transactions + 1);

        project.set_colour(track, "ff00ff00").unwrap();
        assert_eq!(project.undo_manager().num_transactions(), transactions + 2);

        project.undo();
        project.undo();
        assert_eq!(project.tree().get_string(track, ids::NAME), "Track 1");
    }

    #[test]
    fn clips_move_between_tracks() {
        let mut project = Project::new(&config(2, false));
        let first = project.state().track(0).unwrap();
        let second = project.state().track(1).unwrap();
        let clip = project.add_clip(first, "Verse", 0.0, 4.0).unwrap();

        let moves = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&moves);
        let _sub = project.subscribe(ListenerFilter::Everything, move |n, _| {
            if matches!(n, Notification::ChildMovedToNewParent(_)) {
                *seen.borrow_mut() += 1;
            }
        });
        project.begin_transaction("drag");
        assert!(project.move_items(&[clip], second, 0).unwrap());
        assert_eq!(project.tree().parent(clip), Some(second));
        assert_eq!(*moves.borrow(), 1);

        project.undo();
        assert_eq!(project.tree().parent(clip), Some(first));
        assert!(matches!(
            project.move_items(&[clip], clip, 0),
            Err(ActionError::Tree(TreeError::WouldCreateCycle { .. }))
        ));
        assert!(matches!(
            project.move_items(&[first], second, 0),
            Err(ActionError::CannotMoveInto { .. })
        ));
    }

    #[test]
    fn devices_arrive_through_the_mailbox() {
        let mut project = Project::new(&config(1, false));
        let sender = project.mailbox_sender();
        std::thread::spawn(move || {
            sender.post(Posted::DevicesChanged {
                midi_inputs: vec!["Keys".to_string()],
                midi_outputs: Vec::new(),
            });
        })
        .join()
        .unwrap();
        assert_eq!(project.pump(), 1);
        assert_eq!(project.state().midi_input_processors().len(), 1);
        assert!(!project.can_undo());
    }

    #[test]
    fn control_mode_is_not_recorded() {
        let mut project = Project::new(&config(1, false));
        let mode = project.toggle_control_mode();
        assert_eq!(project.state().control_mode(), mode);
        assert!(!project.can_undo());
    }
}
