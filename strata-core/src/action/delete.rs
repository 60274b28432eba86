use super::processor::DeleteProcessor;
use super::track::DeleteTrack;
use super::ActionError;
use crate::state::ProjectState;

/// Delete whole selected tracks and the selected processors of other tracks.
///
/// Each delete is built against the state the previous ones leave behind, so
/// construction runs them in a dry pass and rolls them back.
#[derive(Debug, Clone)]
pub struct DeleteSelectedItems {
    processors: Vec<DeleteProcessor>,
    tracks: Vec<DeleteTrack>,
}

impl DeleteSelectedItems {
    pub fn new(state: &mut ProjectState) -> Result<Self, ActionError> {
        let (tracks, processors) = state.find_all_selected_items();
        let mut action = Self {
            processors: Vec::new(),
            tracks: Vec::new(),
        };
        let result = action.dry_run(state, &tracks, &processors);
        for t in action.tracks.iter_mut().rev() {
            t.undo_temporary(state);
        }
        for p in action.processors.iter_mut().rev() {
            p.undo_temporary(state);
        }
        result.map(|()| action)
    }

    fn dry_run(
        &mut self,
        state: &mut ProjectState,
        tracks: &[strata_types::NodeId],
        processors: &[strata_types::NodeId],
    ) -> Result<(), ActionError> {
        for processor in processors {
            let mut delete = DeleteProcessor::new(state, *processor)?;
            delete.perform_temporary(state);
            self.processors.push(delete);
        }
        for track in tracks {
            let mut delete = DeleteTrack::new(state, *track)?;
            delete.perform_temporary(state);
            self.tracks.push(delete);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty() && self.tracks.is_empty()
    }

    pub fn perform(&mut self, state: &mut ProjectState) -> bool {
        for p in &mut self.processors {
            p.perform(state);
        }
        for t in &mut self.tracks {
            t.perform(state);
        }
        !self.is_empty()
    }

    pub fn undo(&mut self, state: &mut ProjectState) -> bool {
        for t in self.tracks.iter_mut().rev() {
            t.undo(state);
        }
        for p in self.processors.iter_mut().rev() {
            p.undo(state);
        }
        !self.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::connections::CreateOrDeleteConnections;
    use crate::action::processor::CreateProcessor;
    use crate::action::select::Select;
    use crate::action::track::CreateTrack;
    use crate::config::Config;
    use crate::graph::DetachedGraph;

    #[test]
    fn deletes_tracks_and_processors_and_restores_them() {
        let mut state = ProjectState::new(&Config::default(), Box::new(DetachedGraph));
        for _ in 0..3 {
            CreateTrack::new(&mut state, None, false, None)
                .unwrap()
                .perform(&mut state);
        }
        let gain = state.catalog().find("Gain").unwrap().clone();
        for (track, slot) in [(0, 0), (0, 1), (1, 0), (2, 0)] {
            CreateProcessor::new(&mut state, &gain, track, slot)
                .unwrap()
                .perform(&mut state);
        }
        CreateOrDeleteConnections::update_all_default_connections(&state, false).perform(&mut state);
        Select::slots(&state, &[(0, 1)], &[1], (0, 0)).perform(&mut state);
        let before = state.tree().snapshot(state.project_node());

        let mut action = DeleteSelectedItems::new(&mut state).unwrap();
        assert_eq!(state.tree().snapshot(state.project_node()), before);

        assert!(action.perform(&mut state));
        assert_eq!(state.num_tracks(), 2);
        assert_eq!(state.processors(state.track(0).unwrap()).len(), 1);
        let live: Vec<_> = state
            .all_processors()
            .into_iter()
            .filter_map(|p| state.processor_node_id(p))
            .collect();
        assert!(state
            .connections()
            .iter()
            .all(|c| live.contains(&c.source.node) && live.contains(&c.destination.node)));

        assert!(action.undo(&mut state));
        assert_eq!(state.tree().snapshot(state.project_node()), before);
    }

    #[test]
    fn nothing_selected_does_nothing() {
        let mut state = ProjectState::new(&Config::default(), Box::new(DetachedGraph));
        let mut action = DeleteSelectedItems::new(&mut state).unwrap();
        assert!(action.is_empty());
        assert!(!action.perform(&mut state));
    }
}
