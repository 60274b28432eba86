use strata_types::{ids, SlotMask};

use super::connections::CreateOrDeleteConnections;
use super::ActionError;
use crate::state::ProjectState;

/// Selection and focus of every track, captured or proposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub tracks: Vec<bool>,
    pub masks: Vec<SlotMask>,
    /// (track index, slot)
    pub focus: (usize, usize),
}

impl Selection {
    pub fn capture(state: &ProjectState) -> Self {
        let tracks = state.tracks();
        Self {
            tracks: tracks.iter().map(|t| state.is_track_selected(*t)).collect(),
            masks: tracks.iter().map(|t| state.slot_mask(*t)).collect(),
            focus: state.focused_track_and_slot(),
        }
    }

    pub fn clear(&mut self) {
        self.tracks.iter_mut().for_each(|t| *t = false);
        self.masks.iter_mut().for_each(|m| *m = SlotMask::new());
    }

    /// Written without history: the owning action is the undo unit.
    fn apply(&self, state: &mut ProjectState) -> bool {
        let tracks = state.tracks();
        let lanes: Vec<_> = tracks.iter().map(|t| state.lane(*t)).collect();
        let view = state.view_node();
        let tree = state.tree_mut();
        let mut changed = false;
        for ((track, lane), (selected, mask)) in tracks
            .iter()
            .zip(lanes)
            .zip(self.tracks.iter().zip(&self.masks))
        {
            changed |= tree.set_property(*track, ids::SELECTED, *selected, None);
            if let Some(lane) = lane {
                changed |= tree.set_property(lane, ids::SELECTED_SLOTS_MASK, mask.to_binary_string(), None);
            }
        }
        changed |= tree.set_property(view, ids::FOCUSED_TRACK_INDEX, self.focus.0, None);
        changed |= tree.set_property(view, ids::FOCUSED_PROCESSOR_SLOT, self.focus.1, None);
        changed
    }
}

/// Change selection and focus. Moving focus to another track also re-routes
/// the device inputs into it.
#[derive(Debug, Clone)]
pub struct Select {
    old: Selection,
    new: Selection,
    reset_inputs: CreateOrDeleteConnections,
}

impl Select {
    pub fn to(state: &ProjectState, new: Selection) -> Self {
        let old = Selection::capture(state);
        let reset_inputs = if new.focus.0 != old.focus.0 {
            CreateOrDeleteConnections::reset_default_external_inputs(state, state.track(new.focus.0))
        } else {
            CreateOrDeleteConnections::new()
        };
        Self {
            old,
            new,
            reset_inputs,
        }
    }

    pub fn track(
        state: &ProjectState,
        index: usize,
        selected: bool,
        deselect_others: bool,
    ) -> Result<Self, ActionError> {
        let track = state.track(index).ok_or(ActionError::UnknownTrack(index))?;
        let mut new = Selection::capture(state);
        if selected && deselect_others {
            new.clear();
        }
        new.tracks[index] = selected;
        if selected {
            new.masks[index] = state.full_selection_mask(track);
            let slot = state
                .processors(track)
                .first()
                .map(|p| state.processor_slot(*p))
                .unwrap_or(0);
            new.focus = (index, slot);
        } else {
            new.masks[index] = SlotMask::new();
        }
        Ok(Self::to(state, new))
    }

    pub fn processor_slot(
        state: &ProjectState,
        track_index: usize,
        slot: usize,
        selected: bool,
        deselect_others: bool,
    ) -> Result<Self, ActionError> {
        let track = state
            .track(track_index)
            .ok_or(ActionError::UnknownTrack(track_index))?;
        if slot >= state.num_slots_for_track(track) {
            return Err(ActionError::SlotOutOfRange(slot));
        }
        let mut new = Selection::capture(state);
        if selected && deselect_others {
            new.clear();
        }
        new.masks[track_index].set(slot, selected);
        new.tracks[track_index] = new.masks[track_index] == state.full_selection_mask(track);
        if selected {
            new.focus = (track_index, slot);
        }
        Ok(Self::to(state, new))
    }

    pub fn all(state: &ProjectState) -> Self {
        let mut new = Selection::capture(state);
        for (i, track) in state.tracks().into_iter().enumerate() {
            new.tracks[i] = true;
            new.masks[i] = state.full_selection_mask(track);
        }
        Self::to(state, new)
    }

    pub fn none(state: &ProjectState) -> Self {
        let mut new = Selection::capture(state);
        new.clear();
        Self::to(state, new)
    }

    /// Select the slots between two corners, both inclusive. Tracks entirely
    /// covered count as selected.
    pub fn rectangle(state: &ProjectState, from: (usize, usize), to: (usize, usize)) -> Self {
        let mut new = Selection::capture(state);
        new.clear();
        let (first_track, last_track) = (from.0.min(to.0), from.0.max(to.0));
        let (first_slot, last_slot) = (from.1.min(to.1), from.1.max(to.1));
        for (i, track) in state.tracks().into_iter().enumerate() {
            if i < first_track || i > last_track {
                continue;
            }
            let full = state.full_selection_mask(track);
            let mask = SlotMask::from_slots((first_slot..=last_slot).filter(|s| full.get(*s)));
            new.tracks[i] = mask == full;
            new.masks[i] = mask;
        }
        Self::to(state, new)
    }

    pub fn focus(state: &ProjectState, track_index: usize, slot: usize) -> Result<Self, ActionError> {
        if state.track(track_index).is_none() {
            return Err(ActionError::UnknownTrack(track_index));
        }
        let mut new = Selection::capture(state);
        new.focus = (track_index, slot);
        Ok(Self::to(state, new))
    }

    /// Keep focus on an existing track and slot, e.g. after a delete.
    pub fn clamp_focus(state: &ProjectState) -> Self {
        let mut new = Selection::capture(state);
        let (track, slot) = new.focus;
        let track = track.min(state.num_tracks().saturating_sub(1));
        let slots = state
            .track(track)
            .map(|t| state.num_slots_for_track(t))
            .unwrap_or(1);
        new.focus = (track, slot.min(slots.saturating_sub(1)));
        Self::to(state, new)
    }

    /// Exactly these slots and tracks selected, nothing else.
    pub fn slots(
        state: &ProjectState,
        slots: &[(usize, usize)],
        tracks: &[usize],
        focus: (usize, usize),
    ) -> Self {
        let mut new = Selection::capture(state);
        new.clear();
        for &(track, slot) in slots {
            if let Some(mask) = new.masks.get_mut(track) {
                mask.set(slot, true);
            }
        }
        for &index in tracks {
            if let Some(track) = state.track(index) {
                new.tracks[index] = true;
                new.masks[index] = state.full_selection_mask(track);
            }
        }
        new.focus = focus;
        Self::to(state, new)
    }

    pub fn new_selection(&self) -> &Selection {
        &self.new
    }

    pub fn perform(&self, state: &mut ProjectState) -> bool {
        let changed = self.new.apply(state);
        self.reset_inputs.perform(state) || changed
    }

    pub fn undo(&self, state: &mut ProjectState) -> bool {
        let changed = self.reset_inputs.undo(state);
        self.old.apply(state) || changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::processor::CreateProcessor;
    use crate::action::track::CreateTrack;
    use crate::config::Config;
    use crate::graph::DetachedGraph;

    fn two_tracks() -> ProjectState {
        let mut state = ProjectState::new(&Config::default(), Box::new(DetachedGraph));
        for _ in 0..2 {
            CreateTrack::new(&mut state, None, false, None)
                .unwrap()
                .perform(&mut state);
        }
        state
    }

    #[test]
    fn select_track_takes_every_slot_and_focus() {
        let mut state = two_tracks();
        let gain = state.catalog().find("Gain").unwrap().clone();
        CreateProcessor::new(&mut state, &gain, 1, 3)
            .unwrap()
            .perform(&mut state);

        let select = Select::track(&state, 1, true, true).unwrap();
        assert!(select.perform(&mut state));
        let track = state.track(1).unwrap();
        assert!(state.is_track_selected(track));
        assert_eq!(state.slot_mask(track), state.full_selection_mask(track));
        assert_eq!(state.focused_track_and_slot(), (1, 3));

        assert!(select.undo(&mut state));
        assert!(!state.is_track_selected(track));
        assert_eq!(state.focused_track_and_slot(), (0, 0));
    }

    #[test]
    fn reselecting_changes_nothing() {
        let mut state = two_tracks();
        let select = Select::processor_slot(&state, 0, 2, true, true).unwrap();
        assert!(select.perform(&mut state));
        let again = Select::processor_slot(&state, 0, 2, true, true).unwrap();
        assert!(!again.perform(&mut state));
    }

    #[test]
    fn rectangle_selects_whole_columns_as_tracks() {
        let mut state = two_tracks();
        let last = state.num_processor_slots() - 1;
        Select::rectangle(&state, (1, 0), (0, last)).perform(&mut state);
        assert!(state.tracks().into_iter().all(|t| state.is_track_selected(t)));

        Select::rectangle(&state, (0, 1), (0, 2)).perform(&mut state);
        let first = state.track(0).unwrap();
        assert!(!state.is_track_selected(first));
        assert_eq!(state.slot_mask(first).slots(), vec![1, 2]);
        assert!(state.slot_mask(state.track(1).unwrap()).is_empty());
    }

    #[test]
    fn out_of_range_is_rejected() {
        let state = two_tracks();
        assert!(matches!(
            Select::track(&state, 5, true, true),
            Err(ActionError::UnknownTrack(5))
        ));
        assert!(matches!(
            Select::processor_slot(&state, 0, 99, true, true),
            Err(ActionError::SlotOutOfRange(99))
        ));
    }
}
