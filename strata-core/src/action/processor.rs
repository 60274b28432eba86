use strata_types::{ids, GraphNodeId, NodeId, NodeType, ProcessorDescription, MAX_SLOTS};

use super::connections::CreateOrDeleteConnections;
use super::tree_edit::Journal;
use super::ActionError;
use crate::state::ProjectState;
use crate::tree::ValueNode;

/// Put a processor at a slot, pushing the contiguous run of processors that
/// starts there down by one. The inserted processor always keeps its slot.
/// Selection is left to the caller.
#[derive(Debug, Clone)]
pub struct InsertProcessor {
    processor: NodeId,
    /// Set while the processor is not in the tree yet.
    fresh: Option<ValueNode>,
    to_track: NodeId,
    to_slot: usize,
    journal: Option<Journal>,
}

impl InsertProcessor {
    /// Insert a new processor value. Its ids must already be reserved.
    pub fn add(
        state: &ProjectState,
        processor: ValueNode,
        to_track: NodeId,
        to_slot: usize,
    ) -> Result<Self, ActionError> {
        let id = processor
            .id()
            .ok_or_else(|| ActionError::UnknownDescription(processor.get(ids::ID).to_string()))?;
        validate_target(state, None, to_track, to_slot)?;
        Ok(Self {
            processor: id,
            fresh: Some(processor),
            to_track,
            to_slot,
            journal: None,
        })
    }

    /// Move a processor that is already in a lane.
    pub fn moving(
        state: &ProjectState,
        processor: NodeId,
        to_track: NodeId,
        to_slot: usize,
    ) -> Result<Self, ActionError> {
        if state.track_for_processor(processor).is_none() {
            return Err(ActionError::UnknownProcessor(processor));
        }
        validate_target(state, Some(processor), to_track, to_slot)?;
        Ok(Self {
            processor,
            fresh: None,
            to_track,
            to_slot,
            journal: None,
        })
    }

    pub fn processor(&self) -> NodeId {
        self.processor
    }

    pub fn perform(&mut self, state: &mut ProjectState) -> bool {
        match &self.journal {
            Some(journal) => journal.redo(state.tree_mut()),
            None => {
                let journal = self.first_perform(state);
                let changed = !journal.is_empty();
                self.journal = Some(journal);
                changed
            }
        }
    }

    pub fn undo(&mut self, state: &mut ProjectState) -> bool {
        self.journal
            .as_ref()
            .map(|j| j.undo(state.tree_mut()))
            .unwrap_or(false)
    }

    fn first_perform(&self, state: &mut ProjectState) -> Journal {
        let mut journal = Journal::new();
        let Some(lane) = state.lane(self.to_track) else {
            log::error!(target: "actions", "insert processor: track {} has no lane", self.to_track);
            return journal;
        };

        let run = occupied_run(state, self.to_track, self.to_slot, Some(self.processor));
        for p in run.iter().rev() {
            let slot = state.processor_slot(*p) + 1;
            state
                .tree_mut()
                .set_property(*p, ids::PROCESSOR_SLOT, slot, Some(&mut journal));
        }

        let highest = self.to_slot + run.len();
        let rows_key = if state.is_master_track(self.to_track) {
            ids::NUM_MASTER_PROCESSOR_SLOTS
        } else {
            ids::NUM_PROCESSOR_SLOTS
        };
        if highest >= state.num_slots_for_track(self.to_track) {
            let view = state.view_node();
            log::debug!(target: "actions", "adding processor rows up to {}", highest + 1);
            state
                .tree_mut()
                .set_property(view, rows_key, highest + 1, Some(&mut journal));
        }

        let tree = state.tree_mut();
        match &self.fresh {
            Some(value) if !tree.contains(self.processor) => {
                let mut value = value.clone();
                value.set_property(ids::PROCESSOR_SLOT, self.to_slot);
                if let Err(e) = tree.add_child(lane, value, None, Some(&mut journal)) {
                    log::error!(target: "actions", "insert processor: {}", e);
                }
            }
            _ => {
                if tree.parent(self.processor) != Some(lane) {
                    if let Err(e) = tree.move_to_new_parent(self.processor, lane, None, Some(&mut journal)) {
                        log::error!(target: "actions", "move processor: {}", e);
                        return journal;
                    }
                }
                tree.set_property(self.processor, ids::PROCESSOR_SLOT, self.to_slot, Some(&mut journal));
            }
        }
        sort_lane(state, lane, &mut journal);
        journal
    }
}

fn validate_target(
    state: &ProjectState,
    mover: Option<NodeId>,
    to_track: NodeId,
    to_slot: usize,
) -> Result<(), ActionError> {
    if state.lane(to_track).is_none() {
        return Err(ActionError::UnknownNode(to_track));
    }
    let run = occupied_run(state, to_track, to_slot, mover);
    if to_slot + run.len() >= MAX_SLOTS {
        return Err(ActionError::SlotOutOfRange(to_slot + run.len()));
    }
    Ok(())
}

/// Processors occupying `from`, `from + 1`, ... without a gap, `skip` aside.
fn occupied_run(state: &ProjectState, track: NodeId, from: usize, skip: Option<NodeId>) -> Vec<NodeId> {
    let lane: Vec<NodeId> = state
        .processors(track)
        .into_iter()
        .filter(|p| Some(*p) != skip)
        .collect();
    let mut run = Vec::new();
    let mut slot = from;
    while let Some(p) = lane.iter().copied().find(|p| state.processor_slot(*p) == slot) {
        run.push(p);
        slot += 1;
    }
    run
}

/// Restore ascending slot order among a lane's children.
fn sort_lane(state: &mut ProjectState, lane: NodeId, journal: &mut Journal) {
    let n = state.tree().num_children(lane);
    for i in 0..n {
        let children = state.tree().children(lane).to_vec();
        let Some((min_index, _)) = children
            .iter()
            .enumerate()
            .skip(i)
            .min_by_key(|(_, p)| state.processor_slot(**p))
        else {
            break;
        };
        if min_index != i {
            if let Err(e) = state
                .tree_mut()
                .move_child(lane, min_index, i, Some(&mut *journal))
            {
                log::error!(target: "actions", "could not sort lane {}: {}", lane, e);
                break;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateProcessor {
    pub(crate) track_index: usize,
    pub(crate) slot: usize,
    processor: NodeId,
    node_id: Option<GraphNodeId>,
    insert: InsertProcessor,
}

impl CreateProcessor {
    pub fn new(
        state: &mut ProjectState,
        description: &ProcessorDescription,
        track_index: usize,
        slot: usize,
    ) -> Result<Self, ActionError> {
        let value = state.processor_value(description);
        Self::from_value(state, value, track_index, slot)
    }

    /// A fresh copy of `source`, e.g. from the clipboard.
    pub fn from_copy(
        state: &mut ProjectState,
        source: &ValueNode,
        track_index: usize,
        slot: usize,
    ) -> Result<Self, ActionError> {
        let value = state.copy_processor_value(source);
        Self::from_value(state, value, track_index, slot)
    }

    fn from_value(
        state: &mut ProjectState,
        mut value: ValueNode,
        track_index: usize,
        slot: usize,
    ) -> Result<Self, ActionError> {
        let track = state
            .track(track_index)
            .ok_or(ActionError::UnknownTrack(track_index))?;
        let node_id = u32::try_from(value.get(ids::NODE_ID).as_int())
            .ok()
            .map(GraphNodeId::new);
        let processor = state.tree_mut().reserve_ids(&mut value);
        let insert = InsertProcessor::add(state, value, track, slot)?;
        Ok(Self {
            track_index,
            slot,
            processor,
            node_id,
            insert,
        })
    }

    pub fn processor(&self) -> NodeId {
        self.processor
    }

    pub fn node_id(&self) -> Option<GraphNodeId> {
        self.node_id
    }

    pub fn perform(&mut self, state: &mut ProjectState) -> bool {
        let changed = self.perform_temporary(state);
        if changed {
            if let Some(id) = self.node_id {
                state.graph_mut().on_processor_created(id, self.processor);
            }
        }
        changed
    }

    pub fn undo(&mut self, state: &mut ProjectState) -> bool {
        let changed = self.undo_temporary(state);
        if changed {
            if let Some(id) = self.node_id {
                state.graph_mut().on_processor_destroyed(id);
            }
        }
        changed
    }

    /// Tree edits only; the audio graph is not told.
    pub fn perform_temporary(&mut self, state: &mut ProjectState) -> bool {
        self.insert.perform(state)
    }

    pub fn undo_temporary(&mut self, state: &mut ProjectState) -> bool {
        self.insert.undo(state)
    }
}

/// Cut a processor out of the graph and its lane (or device container).
#[derive(Debug, Clone)]
pub struct DeleteProcessor {
    processor: NodeId,
    node_id: Option<GraphNodeId>,
    parent: NodeId,
    index: usize,
    removed: Option<ValueNode>,
    disconnect: CreateOrDeleteConnections,
}

impl DeleteProcessor {
    pub fn new(state: &ProjectState, processor: NodeId) -> Result<Self, ActionError> {
        let tree = state.tree();
        if !tree.has_type(processor, NodeType::Processor) {
            return Err(ActionError::UnknownProcessor(processor));
        }
        let parent = tree
            .parent(processor)
            .ok_or(ActionError::UnknownProcessor(processor))?;
        let index = tree.index_of(parent, processor).unwrap_or(0);
        let disconnect = CreateOrDeleteConnections::disconnect_processor(
            state, processor, None, true, true, true, true, None,
        );
        Ok(Self {
            processor,
            node_id: state.processor_node_id(processor),
            parent,
            index,
            removed: None,
            disconnect,
        })
    }

    pub fn processor(&self) -> NodeId {
        self.processor
    }

    pub fn perform(&mut self, state: &mut ProjectState) -> bool {
        self.remove(state, true)
    }

    pub fn undo(&mut self, state: &mut ProjectState) -> bool {
        self.restore(state, true)
    }

    pub fn perform_temporary(&mut self, state: &mut ProjectState) -> bool {
        self.remove(state, false)
    }

    pub fn undo_temporary(&mut self, state: &mut ProjectState) -> bool {
        self.restore(state, false)
    }

    fn remove(&mut self, state: &mut ProjectState, notify_graph: bool) -> bool {
        let Some(index) = state.tree().index_of(self.parent, self.processor) else {
            log::error!(target: "actions", "delete processor: {} is gone", self.processor);
            return false;
        };
        self.disconnect.apply(state, true, notify_graph);
        match state.tree_mut().remove_child(self.parent, index, None) {
            Ok(value) => {
                self.index = index;
                self.removed = Some(value);
                if notify_graph {
                    if let Some(id) = self.node_id {
                        state.graph_mut().on_processor_destroyed(id);
                    }
                }
                true
            }
            Err(e) => {
                log::error!(target: "actions", "delete processor: {}", e);
                false
            }
        }
    }

    fn restore(&mut self, state: &mut ProjectState, notify_graph: bool) -> bool {
        let Some(value) = self.removed.take() else {
            return false;
        };
        if let Err(e) = state
            .tree_mut()
            .add_child(self.parent, value, Some(self.index), None)
        {
            log::error!(target: "actions", "undo delete processor: {}", e);
            return false;
        }
        if notify_graph {
            if let Some(id) = self.node_id {
                state.graph_mut().on_processor_created(id, self.processor);
            }
        }
        self.disconnect.apply(state, false, notify_graph);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::track::CreateTrack;
    use crate::config::Config;
    use crate::graph::DetachedGraph;

    fn one_track() -> ProjectState {
        let mut state = ProjectState::new(&Config::default(), Box::new(DetachedGraph));
        CreateTrack::new(&mut state, None, false, None)
            .unwrap()
            .perform(&mut state);
        state
    }

    fn create(state: &mut ProjectState, name: &str, slot: usize) -> NodeId {
        let description = state.catalog().find(name).unwrap().clone();
        let mut action = CreateProcessor::new(state, &description, 0, slot).unwrap();
        assert!(action.perform(state));
        action.processor()
    }

    fn slots(state: &ProjectState) -> Vec<usize> {
        let track = state.track(0).unwrap();
        state
            .processors(track)
            .into_iter()
            .map(|p| state.processor_slot(p))
            .collect()
    }

    #[test]
    fn insert_pushes_contiguous_run() {
        let mut state = one_track();
        create(&mut state, "Gain", 1);
        create(&mut state, "Gain", 2);
        create(&mut state, "Gain", 5);
        let before = state.tree().snapshot(state.project_node());

        let description = state.catalog().find("Balance").unwrap().clone();
        let mut action = CreateProcessor::new(&mut state, &description, 0, 1).unwrap();
        assert!(action.perform(&mut state));
        assert_eq!(slots(&state), vec![1, 2, 3, 5]);
        assert_eq!(state.processor_slot(action.processor()), 1);

        assert!(action.undo(&mut state));
        assert_eq!(state.tree().snapshot(state.project_node()), before);
    }

    #[test]
    fn insert_past_capacity_adds_rows() {
        let mut state = one_track();
        let last = state.num_processor_slots() - 1;
        create(&mut state, "Gain", last);
        create(&mut state, "Gain", last);
        assert_eq!(state.num_processor_slots(), last + 2);
    }

    #[test]
    fn move_within_lane_keeps_order() {
        let mut state = one_track();
        let a = create(&mut state, "Gain", 0);
        create(&mut state, "Gain", 1);
        create(&mut state, "Gain", 2);
        let track = state.track(0).unwrap();

        let mut action = InsertProcessor::moving(&state, a, track, 2).unwrap();
        assert!(action.perform(&mut state));
        assert_eq!(slots(&state), vec![1, 2, 3]);
        assert_eq!(state.processor_slot(a), 2);
        action.undo(&mut state);
        assert_eq!(state.processor_slot(a), 0);
        assert_eq!(slots(&state), vec![0, 1, 2]);
    }

    #[test]
    fn delete_and_restore() {
        let mut state = one_track();
        let p = create(&mut state, "Gain", 0);
        let before = state.tree().snapshot(state.project_node());
        let mut action = DeleteProcessor::new(&state, p).unwrap();
        assert!(action.perform(&mut state));
        assert!(!state.tree().contains(p));
        assert!(action.undo(&mut state));
        assert_eq!(state.tree().snapshot(state.project_node()), before);
    }

    #[test]
    fn delete_of_a_moved_processor_keeps_its_connections() {
        let mut state = one_track();
        CreateTrack::new(&mut state, None, false, None)
            .unwrap()
            .perform(&mut state);
        let a = create(&mut state, "Gain", 0);
        create(&mut state, "Gain", 1);
        CreateOrDeleteConnections::update_all_default_connections(&state, false).perform(&mut state);
        let connections = state.connections();
        assert!(!connections.is_empty());

        let mut action = DeleteProcessor::new(&state, a).unwrap();
        let other_lane = state.lane(state.track(1).unwrap()).unwrap();
        state
            .tree_mut()
            .move_to_new_parent(a, other_lane, None, None)
            .unwrap();
        assert!(!action.perform(&mut state));
        assert_eq!(state.connections(), connections);
    }
}
