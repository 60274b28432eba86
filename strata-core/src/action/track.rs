use strata_types::{ids, NodeId};

use super::processor::DeleteProcessor;
use super::tree_edit::Journal;
use super::ActionError;
use crate::state::ProjectState;
use crate::tree::ValueNode;

#[derive(Debug, Clone)]
pub struct CreateTrack {
    pub(crate) insert_index: usize,
    track: ValueNode,
    track_id: NodeId,
}

impl CreateTrack {
    /// New empty track at `insert_index` (clamped to the non-master tracks;
    /// `None` appends). Name and colour come from `derive_from` when given.
    pub fn new(
        state: &mut ProjectState,
        insert_index: Option<usize>,
        is_master: bool,
        derive_from: Option<&ValueNode>,
    ) -> Result<Self, ActionError> {
        let insert_index = if is_master {
            if state.master_track().is_some() {
                return Err(ActionError::MasterTrackExists);
            }
            state.num_tracks()
        } else {
            let last = state.num_non_master_tracks();
            insert_index.unwrap_or(last).min(last)
        };

        let derived = |key: &str| {
            derive_from
                .and_then(|t| t.property(key))
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let name = if is_master {
            "Master".to_string()
        } else {
            derived(ids::NAME).unwrap_or_else(|| state.next_track_name())
        };
        let colour = derived(ids::COLOUR).unwrap_or_else(|| state.default_track_colour());

        let mut track = state.track_value(&name, &colour, is_master);
        let track_id = state.tree_mut().reserve_ids(&mut track);
        Ok(Self {
            insert_index,
            track,
            track_id,
        })
    }

    pub fn track_id(&self) -> NodeId {
        self.track_id
    }

    pub fn perform(&self, state: &mut ProjectState) -> bool {
        let tracks = state.tracks_node();
        match state
            .tree_mut()
            .add_child(tracks, self.track.clone(), Some(self.insert_index), None)
        {
            Ok(_) => true,
            Err(e) => {
                log::error!(target: "actions", "create track: {}", e);
                false
            }
        }
    }

    pub fn undo(&self, state: &mut ProjectState) -> bool {
        match state.tree_mut().remove_node(self.track_id, None) {
            Ok(_) => true,
            Err(e) => {
                log::error!(target: "actions", "undo create track: {}", e);
                false
            }
        }
    }
}

/// Deletes a track's processors one by one, then the emptied track.
#[derive(Debug, Clone)]
pub struct DeleteTrack {
    track: NodeId,
    index: usize,
    removed: Option<ValueNode>,
    processors: Vec<DeleteProcessor>,
}

impl DeleteTrack {
    pub fn new(state: &mut ProjectState, track: NodeId) -> Result<Self, ActionError> {
        let index = state
            .track_index(track)
            .ok_or(ActionError::UnknownNode(track))?;
        let mut processors: Vec<DeleteProcessor> = Vec::new();
        for processor in state.processors(track) {
            let mut delete = match DeleteProcessor::new(state, processor) {
                Ok(delete) => delete,
                Err(e) => {
                    for done in processors.iter_mut().rev() {
                        done.undo_temporary(state);
                    }
                    return Err(e);
                }
            };
            delete.perform_temporary(state);
            processors.push(delete);
        }
        for delete in processors.iter_mut().rev() {
            delete.undo_temporary(state);
        }
        Ok(Self {
            track,
            index,
            removed: None,
            processors,
        })
    }

    pub fn perform(&mut self, state: &mut ProjectState) -> bool {
        for p in &mut self.processors {
            p.perform(state);
        }
        self.remove_track(state)
    }

    pub fn undo(&mut self, state: &mut ProjectState) -> bool {
        let restored = self.restore_track(state);
        for p in self.processors.iter_mut().rev() {
            p.undo(state);
        }
        restored
    }

    pub fn perform_temporary(&mut self, state: &mut ProjectState) -> bool {
        for p in &mut self.processors {
            p.perform_temporary(state);
        }
        self.remove_track(state)
    }

    pub fn undo_temporary(&mut self, state: &mut ProjectState) -> bool {
        let restored = self.restore_track(state);
        for p in self.processors.iter_mut().rev() {
            p.undo_temporary(state);
        }
        restored
    }

    fn remove_track(&mut self, state: &mut ProjectState) -> bool {
        let Some(index) = state.track_index(self.track) else {
            log::error!(target: "actions", "delete track: {} is gone", self.track);
            return false;
        };
        let tracks = state.tracks_node();
        match state.tree_mut().remove_child(tracks, index, None) {
            Ok(value) => {
                self.index = index;
                self.removed = Some(value);
                true
            }
            Err(e) => {
                log::error!(target: "actions", "delete track: {}", e);
                false
            }
        }
    }

    fn restore_track(&mut self, state: &mut ProjectState) -> bool {
        let Some(value) = self.removed.take() else {
            return false;
        };
        let tracks = state.tracks_node();
        match state.tree_mut().add_child(tracks, value, Some(self.index), None) {
            Ok(_) => true,
            Err(e) => {
                log::error!(target: "actions", "undo delete track: {}", e);
                false
            }
        }
    }
}

/// Reorder a non-master track. Focus follows the moved track.
#[derive(Debug, Clone)]
pub struct MoveTrack {
    from: usize,
    to: usize,
    journal: Journal,
}

impl MoveTrack {
    pub fn new(state: &ProjectState, from: usize, to: usize) -> Result<Self, ActionError> {
        let len = state.num_non_master_tracks();
        if from >= len || to >= len {
            return Err(ActionError::MoveOutOfRange);
        }
        Ok(Self {
            from,
            to,
            journal: Journal::new(),
        })
    }

    pub fn perform(&mut self, state: &mut ProjectState) -> bool {
        if self.from == self.to {
            return false;
        }
        let mut journal = Journal::new();
        let tracks = state.tracks_node();
        let view = state.view_node();
        let focused = state.focused_track_index();
        let tree = state.tree_mut();
        if let Err(e) = tree.move_child(tracks, self.from, self.to, Some(&mut journal)) {
            log::error!(target: "actions", "move track: {}", e);
            return false;
        }
        let new_focus = if focused == self.from {
            Some(self.to)
        } else if self.from < focused && focused <= self.to {
            Some(focused - 1)
        } else if self.to <= focused && focused < self.from {
            Some(focused + 1)
        } else {
            None
        };
        if let Some(index) = new_focus {
            tree.set_property(view, ids::FOCUSED_TRACK_INDEX, index, Some(&mut journal));
        }
        self.journal = journal;
        true
    }

    pub fn undo(&mut self, state: &mut ProjectState) -> bool {
        self.journal.undo(state.tree_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::graph::DetachedGraph;

    fn with_tracks(n: usize) -> ProjectState {
        let mut state = ProjectState::new(&Config::default(), Box::new(DetachedGraph));
        for _ in 0..n {
            let create = CreateTrack::new(&mut state, None, false, None).unwrap();
            assert!(create.perform(&mut state));
        }
        state
    }

    #[test]
    fn create_names_and_clamps() {
        let mut state = with_tracks(2);
        let master = CreateTrack::new(&mut state, None, true, None).unwrap();
        master.perform(&mut state);
        assert!(state.master_track().is_some());
        assert!(matches!(
            CreateTrack::new(&mut state, None, true, None),
            Err(ActionError::MasterTrackExists)
        ));

        let create = CreateTrack::new(&mut state, Some(99), false, None).unwrap();
        assert_eq!(create.insert_index, 2);
        create.perform(&mut state);
        let names: Vec<String> = state
            .tracks()
            .into_iter()
            .map(|t| state.tree().get_string(t, ids::NAME))
            .collect();
        assert_eq!(names, ["Track 1", "Track 2", "Track 3", "Master"]);

        assert!(create.undo(&mut state));
        assert_eq!(state.num_tracks(), 3);
    }

    #[test]
    fn derived_track_keeps_name_and_colour() {
        let mut state = with_tracks(1);
        let source = ValueNode::new(strata_types::NodeType::Track)
            .with_property(ids::NAME, "Drums")
            .with_property(ids::COLOUR, "ff112233");
        let create = CreateTrack::new(&mut state, Some(0), false, Some(&source)).unwrap();
        create.perform(&mut state);
        let first = state.track(0).unwrap();
        assert_eq!(state.tree().get_string(first, ids::NAME), "Drums");
        assert_eq!(state.tree().get_string(first, ids::COLOUR), "ff112233");
    }

    #[test]
    fn move_track_drags_focus_along() {
        let mut state = with_tracks(4);
        let moved = state.track(0).unwrap();
        let mut action = MoveTrack::new(&state, 0, 3).unwrap();
        assert!(action.perform(&mut state));
        assert_eq!(state.track(3), Some(moved));
        assert_eq!(state.focused_track_index(), 3);

        assert!(action.undo(&mut state));
        assert_eq!(state.track(0), Some(moved));
        assert_eq!(state.focused_track_index(), 0);

        assert!(MoveTrack::new(&state, 0, 4).is_err());
    }
}
