use strata_types::{NodeId, MAX_SLOTS};

use super::connections::CreateOrDeleteConnections;
use super::processor::InsertProcessor;
use super::select::Select;
use super::track::MoveTrack;
use super::{Action, ActionError};
use crate::state::ProjectState;

/// Shift the selection by a number of tracks and slots.
///
/// Whole selected tracks move as tracks. Otherwise each selected processor is
/// re-inserted at its shifted position, the selection follows, and default
/// connections are recomputed.
#[derive(Debug, Clone)]
pub struct MoveSelectedItems {
    actions: Vec<Action>,
}

impl MoveSelectedItems {
    pub fn new(state: &mut ProjectState, track_delta: isize, slot_delta: isize) -> Result<Self, ActionError> {
        let mut actions = Vec::new();
        let result = if track_delta == 0 && slot_delta == 0 {
            Ok(())
        } else {
            build(state, track_delta, slot_delta, &mut actions)
        };
        for action in actions.iter_mut().rev() {
            action.undo(state);
        }
        result.map(|()| Self { actions })
    }

    pub fn perform(&mut self, state: &mut ProjectState) -> bool {
        let mut changed = false;
        for action in &mut self.actions {
            changed |= action.perform(state);
        }
        changed
    }

    pub fn undo(&mut self, state: &mut ProjectState) -> bool {
        let mut changed = false;
        for action in self.actions.iter_mut().rev() {
            changed |= action.undo(state);
        }
        changed
    }
}

fn shifted(index: usize, delta: isize) -> Option<usize> {
    usize::try_from(index as isize + delta).ok()
}

fn build(
    state: &mut ProjectState,
    track_delta: isize,
    slot_delta: isize,
    actions: &mut Vec<Action>,
) -> Result<(), ActionError> {
    let (tracks, processors) = state.find_all_selected_items();
    if tracks.is_empty() && processors.is_empty() {
        return Err(ActionError::NothingSelected);
    }

    if !tracks.is_empty() && processors.is_empty() {
        let mut indices: Vec<usize> = tracks
            .iter()
            .filter(|t| !state.is_master_track(**t))
            .filter_map(|t| state.track_index(*t))
            .collect();
        if track_delta > 0 {
            indices.reverse();
        }
        for from in indices {
            let to = shifted(from, track_delta).ok_or(ActionError::MoveOutOfRange)?;
            let mut action = Action::MoveTrack(MoveTrack::new(state, from, to)?);
            action.perform(state);
            actions.push(action);
        }
        return Ok(());
    }

    // (processor, from track, to track, to slot)
    let mut moves: Vec<(NodeId, usize, usize, usize)> = Vec::new();
    for processor in processors {
        let track = state
            .track_for_processor(processor)
            .ok_or(ActionError::UnknownProcessor(processor))?;
        let from_track = state
            .track_index(track)
            .ok_or(ActionError::UnknownProcessor(processor))?;
        let to_track = shifted(from_track, track_delta).ok_or(ActionError::MoveOutOfRange)?;
        let to_slot = shifted(state.processor_slot(processor), slot_delta)
            .filter(|s| *s < MAX_SLOTS)
            .ok_or(ActionError::MoveOutOfRange)?;
        let target = state.track(to_track).ok_or(ActionError::MoveOutOfRange)?;
        if track_delta != 0 && (state.is_master_track(track) || state.is_master_track(target)) {
            return Err(ActionError::MoveOutOfRange);
        }
        moves.push((processor, from_track, to_track, to_slot));
    }
    // Leading edge first, so no mover pushes another.
    moves.sort_by_key(|(_, from_track, _, to_slot)| {
        (
            *from_track as isize * -track_delta.signum(),
            *to_slot as isize * -slot_delta.signum(),
        )
    });

    let mut selected = Vec::with_capacity(moves.len());
    for (processor, _, to_track, to_slot) in moves {
        let target = state.track(to_track).ok_or(ActionError::MoveOutOfRange)?;
        let mut action = Action::InsertProcessor(InsertProcessor::moving(state, processor, target, to_slot)?);
        action.perform(state);
        actions.push(action);
        selected.push((to_track, to_slot));
    }

    let (focus_track, focus_slot) = state.focused_track_and_slot();
    let focus = (
        shifted(focus_track, track_delta)
            .unwrap_or(0)
            .min(state.num_tracks().saturating_sub(1)),
        shifted(focus_slot, slot_delta).unwrap_or(0),
    );
    let mut select = Action::Select(Select::slots(state, &selected, &[], focus));
    select.perform(state);
    actions.push(select);

    let mut rewire = Action::Connections(CreateOrDeleteConnections::update_all_default_connections(state, false));
    rewire.perform(state);
    actions.push(rewire);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::processor::CreateProcessor;
    use crate::action::track::CreateTrack;
    use crate::config::Config;
    use crate::graph::DetachedGraph;

    fn state_with(tracks: usize, processors: &[(usize, usize)]) -> (ProjectState, Vec<NodeId>) {
        let mut state = ProjectState::new(&Config::default(), Box::new(DetachedGraph));
        for _ in 0..tracks {
            CreateTrack::new(&mut state, None, false, None)
                .unwrap()
                .perform(&mut state);
        }
        let gain = state.catalog().find("Gain").unwrap().clone();
        let mut ids = Vec::new();
        for &(track, slot) in processors {
            let mut create = CreateProcessor::new(&mut state, &gain, track, slot).unwrap();
            create.perform(&mut state);
            ids.push(create.processor());
        }
        (state, ids)
    }

    #[test]
    fn processors_move_down_and_right() {
        let (mut state, ids) = state_with(2, &[(0, 0), (0, 1)]);
        Select::slots(&state, &[(0, 0), (0, 1)], &[], (0, 0)).perform(&mut state);
        let before = state.tree().snapshot(state.project_node());

        let mut action = MoveSelectedItems::new(&mut state, 1, 2).unwrap();
        assert_eq!(state.tree().snapshot(state.project_node()), before);
        assert!(action.perform(&mut state));

        let target = state.track(1).unwrap();
        assert_eq!(state.track_for_processor(ids[0]), Some(target));
        assert_eq!(state.processor_slot(ids[0]), 2);
        assert_eq!(state.processor_slot(ids[1]), 3);
        assert_eq!(state.slot_mask(target).slots(), vec![2, 3]);
        assert_eq!(state.focused_track_and_slot(), (1, 2));

        assert!(action.undo(&mut state));
        assert_eq!(state.tree().snapshot(state.project_node()), before);
    }

    #[test]
    fn selected_tracks_move_as_tracks() {
        let (mut state, _) = state_with(3, &[]);
        let first = state.track(0).unwrap();
        Select::track(&state, 0, true, true).unwrap().perform(&mut state);
        let mut action = MoveSelectedItems::new(&mut state, 2, 0).unwrap();
        action.perform(&mut state);
        assert_eq!(state.track(2), Some(first));
        assert!(MoveSelectedItems::new(&mut state, 1, 0).is_err());
    }

    #[test]
    fn moving_off_the_grid_is_rejected() {
        let (mut state, _) = state_with(1, &[(0, 0)]);
        Select::slots(&state, &[(0, 0)], &[], (0, 0)).perform(&mut state);
        let before = state.tree().snapshot(state.project_node());
        assert!(matches!(
            MoveSelectedItems::new(&mut state, 0, -1),
            Err(ActionError::MoveOutOfRange)
        ));
        assert_eq!(state.tree().snapshot(state.project_node()), before);
    }
}
