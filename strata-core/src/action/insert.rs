//! Paste and duplicate.
//!
//! The clipboard holds one copied track per project track. Copied tracks that
//! are not selected carry only their selected processors; selected tracks
//! carry everything. Inserting keeps the items' relative layout, anchored so
//! that the first copied selection lands at the target track and slot.

use strata_types::{ids, NodeType};

use super::processor::CreateProcessor;
use super::select::{Select, Selection};
use super::track::CreateTrack;
use super::ActionError;
use crate::slots::find_duplication_indices;
use crate::state::copied::{copied_slot_mask, copied_track_has_selection};
use crate::state::{CopiedState, ProjectState};
use crate::tree::ValueNode;

#[derive(Debug, Clone)]
pub enum CreateItem {
    Track(CreateTrack),
    Processor(CreateProcessor),
}

impl CreateItem {
    fn perform(&mut self, state: &mut ProjectState) -> bool {
        match self {
            CreateItem::Track(a) => a.perform(state),
            CreateItem::Processor(a) => a.perform(state),
        }
    }

    fn undo(&mut self, state: &mut ProjectState) -> bool {
        match self {
            CreateItem::Track(a) => a.undo(state),
            CreateItem::Processor(a) => a.undo(state),
        }
    }

    fn perform_temporary(&mut self, state: &mut ProjectState) -> bool {
        match self {
            CreateItem::Track(a) => a.perform(state),
            CreateItem::Processor(a) => a.perform_temporary(state),
        }
    }

    fn undo_temporary(&mut self, state: &mut ProjectState) -> bool {
        match self {
            CreateItem::Track(a) => a.undo(state),
            CreateItem::Processor(a) => a.undo_temporary(state),
        }
    }
}

/// Creates everything on the clipboard, then selects exactly what was created.
/// Default connections are not updated here.
#[derive(Debug, Clone)]
pub struct Insert {
    creates: Vec<CreateItem>,
    select: Option<Select>,
}

struct Builder<'a> {
    state: &'a mut ProjectState,
    creates: Vec<CreateItem>,
}

impl Insert {
    pub fn new(
        state: &mut ProjectState,
        duplicate: bool,
        copied: &CopiedState,
        to_track_and_slot: (usize, usize),
    ) -> Result<Self, ActionError> {
        let copied_tracks = copied.tracks().ok_or(ActionError::NothingCopied)?;
        let mut builder = Builder {
            state,
            creates: Vec::new(),
        };
        let result = builder.build(duplicate, copied_tracks, to_track_and_slot);
        let select = result.is_ok().then(|| {
            let selection = moved_selection(builder.state, &builder.creates);
            Select::to(builder.state, selection)
        });
        for create in builder.creates.iter_mut().rev() {
            create.undo_temporary(builder.state);
        }
        result?;
        Ok(Self {
            creates: builder.creates,
            select,
        })
    }

    pub fn perform(&mut self, state: &mut ProjectState) -> bool {
        if self.creates.is_empty() {
            return false;
        }
        let mut changed = false;
        for create in &mut self.creates {
            changed |= create.perform(state);
        }
        if let Some(select) = &self.select {
            changed |= select.perform(state);
        }
        changed
    }

    pub fn undo(&mut self, state: &mut ProjectState) -> bool {
        if self.creates.is_empty() {
            return false;
        }
        let mut changed = false;
        if let Some(select) = &self.select {
            changed |= select.undo(state);
        }
        for create in self.creates.iter_mut().rev() {
            changed |= create.undo(state);
        }
        changed
    }
}

impl Builder<'_> {
    fn build(
        &mut self,
        duplicate: bool,
        copied: &ValueNode,
        to_track_and_slot: (usize, usize),
    ) -> Result<(), ActionError> {
        let copied_tracks = copied.children();
        let from = from_track_and_slot(copied_tracks)?;
        let any_track_selected = copied_tracks.iter().any(is_selected);
        let to = (
            to_track_and_slot.0,
            if any_track_selected { 0 } else { to_track_and_slot.1 },
        );
        let track_diff = to.0 as isize - from.0 as isize;
        let slot_diff = to.1 as isize - from.1 as isize;

        let num_non_master = self.state.num_non_master_tracks();
        if !duplicate && self.state.master_track().is_some() && to_track_and_slot.0 == num_non_master {
            // Into the master track: only the first track with a selection.
            if let Some(track) = copied_tracks.get(from.0) {
                self.copy_processors_from_track(track, num_non_master, slot_diff)?;
            }
            return Ok(());
        }

        // Lone processors first; new tracks would shift the indices they refer to.
        for (copied_index, track) in copied_tracks.iter().enumerate() {
            if is_selected(track) {
                continue;
            }
            if duplicate {
                self.duplicate_selected_processors(track, copied_index)?;
            } else if is_master(track) {
                let master = self.state.master_track();
                if let Some(index) = master.and_then(|m| self.state.track_index(m)) {
                    self.copy_processors_from_track(track, index, slot_diff)?;
                }
            } else {
                let to_track = copied_index as isize + track_diff;
                if to_track < 0 {
                    continue;
                }
                let to_track = to_track as usize;
                if has_processors(track) {
                    while to_track >= self.state.num_non_master_tracks() {
                        let create = CreateTrack::new(self.state, None, false, None)?;
                        self.push(CreateItem::Track(create));
                    }
                }
                if to_track < self.state.num_non_master_tracks() {
                    self.copy_processors_from_track(track, to_track, slot_diff)?;
                }
            }
        }

        // Then whole tracks, with their processors.
        let selected: Vec<usize> = copied_tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| is_selected(t) && !is_master(t))
            .map(|(i, _)| i)
            .collect();
        let destinations: Vec<usize> = if duplicate {
            find_duplication_indices(&selected)
        } else {
            selected
                .iter()
                .map(|i| (*i as isize + track_diff + 1).max(0) as usize)
                .collect()
        };
        for (source, destination) in selected.iter().zip(destinations) {
            self.create_track_from(&copied_tracks[*source], destination)?;
        }
        Ok(())
    }

    fn push(&mut self, mut create: CreateItem) {
        create.perform_temporary(self.state);
        self.creates.push(create);
    }

    fn create_processor(&mut self, processor: &ValueNode, track: usize, slot: usize) -> Result<(), ActionError> {
        let create = CreateProcessor::from_copy(self.state, processor, track, slot)?;
        self.push(CreateItem::Processor(create));
        Ok(())
    }

    fn copy_processors_from_track(
        &mut self,
        from_track: &ValueNode,
        to_track: usize,
        slot_diff: isize,
    ) -> Result<(), ActionError> {
        for slot in copied_slot_mask(from_track).slots() {
            if let Some(processor) = copied_processor_at(from_track, slot) {
                let to_slot = (slot as isize + slot_diff).max(0) as usize;
                self.create_processor(processor, to_track, to_slot)?;
            }
        }
        Ok(())
    }

    fn duplicate_selected_processors(&mut self, track: &ValueNode, track_index: usize) -> Result<(), ActionError> {
        let num_slots = self
            .state
            .track(track_index)
            .map(|t| self.state.num_slots_for_track(t))
            .unwrap_or(0);
        let selected: Vec<usize> = copied_slot_mask(track)
            .slots()
            .into_iter()
            .filter(|s| *s < num_slots)
            .collect();
        let destinations = find_duplication_indices(&selected);
        for (slot, destination) in selected.into_iter().zip(destinations) {
            if let Some(processor) = copied_processor_at(track, slot) {
                self.create_processor(processor, track_index, destination)?;
            }
        }
        Ok(())
    }

    fn create_track_from(&mut self, track: &ValueNode, index: usize) -> Result<(), ActionError> {
        let create = CreateTrack::new(self.state, Some(index), false, Some(track))?;
        let index = create.insert_index;
        self.push(CreateItem::Track(create));
        for processor in copied_processors(track) {
            let slot = processor.get(ids::PROCESSOR_SLOT).as_int().max(0) as usize;
            self.create_processor(processor, index, slot)?;
        }
        Ok(())
    }
}

/// Nothing selected except what the insert created.
fn moved_selection(state: &ProjectState, creates: &[CreateItem]) -> Selection {
    let mut selection = Selection::capture(state);
    selection.clear();
    for create in creates {
        match create {
            CreateItem::Processor(p) => {
                if let Some(mask) = selection.masks.get_mut(p.track_index) {
                    mask.set(p.slot, true);
                }
            }
            CreateItem::Track(t) => {
                if let Some(track) = state.track(t.insert_index) {
                    selection.tracks[t.insert_index] = true;
                    selection.masks[t.insert_index] = state.full_selection_mask(track);
                }
            }
        }
    }
    selection
}

fn from_track_and_slot(copied_tracks: &[ValueNode]) -> Result<(usize, usize), ActionError> {
    let from_track = copied_tracks
        .iter()
        .position(copied_track_has_selection)
        .ok_or(ActionError::NothingCopied)?;
    if copied_tracks.iter().any(is_selected) {
        return Ok((from_track, 0));
    }
    let from_slot = copied_tracks
        .iter()
        .filter_map(|t| copied_slot_mask(t).lowest())
        .min()
        .ok_or(ActionError::NothingCopied)?;
    Ok((from_track, from_slot))
}

fn is_selected(track: &ValueNode) -> bool {
    track.get(ids::SELECTED).as_bool()
}

fn is_master(track: &ValueNode) -> bool {
    track.get(ids::IS_MASTER_TRACK).as_bool()
}

fn copied_processors(track: &ValueNode) -> &[ValueNode] {
    track
        .child_of_type(NodeType::ProcessorLane)
        .map(ValueNode::children)
        .unwrap_or(&[])
}

fn has_processors(track: &ValueNode) -> bool {
    !copied_processors(track).is_empty()
}

fn copied_processor_at(track: &ValueNode, slot: usize) -> Option<&ValueNode> {
    copied_processors(track)
        .iter()
        .find(|p| p.get(ids::PROCESSOR_SLOT).as_int() == slot as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::select::Select;
    use crate::config::Config;
    use crate::graph::DetachedGraph;

    fn state_with(tracks: usize, processors: &[(usize, usize)]) -> ProjectState {
        let mut state = ProjectState::new(&Config::default(), Box::new(DetachedGraph));
        for _ in 0..tracks {
            CreateTrack::new(&mut state, None, false, None)
                .unwrap()
                .perform(&mut state);
        }
        let gain = state.catalog().find("Gain").unwrap().clone();
        for &(track, slot) in processors {
            CreateProcessor::new(&mut state, &gain, track, slot)
                .unwrap()
                .perform(&mut state);
        }
        state
    }

    fn slots_of(state: &ProjectState, track: usize) -> Vec<usize> {
        let track = state.track(track).unwrap();
        state
            .processors(track)
            .into_iter()
            .map(|p| state.processor_slot(p))
            .collect()
    }

    #[test]
    fn duplicate_processors_in_place() {
        let mut state = state_with(1, &[(0, 1), (0, 2), (0, 5)]);
        Select::slots(&state, &[(0, 1), (0, 2), (0, 5)], &[], (0, 1)).perform(&mut state);
        let mut copied = CopiedState::new();
        copied.copy_selected_items(&state);

        let before = state.tree().snapshot(state.project_node());
        let mut insert = Insert::new(&mut state, true, &copied, (0, 1)).unwrap();
        assert_eq!(state.tree().snapshot(state.project_node()), before);

        assert!(insert.perform(&mut state));
        assert_eq!(slots_of(&state, 0), vec![1, 2, 3, 4, 5, 8]);
        let track = state.track(0).unwrap();
        assert_eq!(state.slot_mask(track).slots(), vec![3, 4, 8]);

        assert!(insert.undo(&mut state));
        assert_eq!(state.tree().snapshot(state.project_node()), before);
    }

    #[test]
    fn paste_track_creates_a_new_one_after_target() {
        let mut state = state_with(2, &[(0, 0), (0, 2)]);
        Select::track(&state, 0, true, true).unwrap().perform(&mut state);
        let mut copied = CopiedState::new();
        copied.copy_selected_items(&state);

        let mut insert = Insert::new(&mut state, false, &copied, (1, 4)).unwrap();
        assert!(insert.perform(&mut state));
        assert_eq!(state.num_tracks(), 3);
        assert_eq!(slots_of(&state, 2), vec![0, 2]);
        let pasted = state.track(2).unwrap();
        assert!(state.is_track_selected(pasted));
        assert!(!state.is_track_selected(state.track(0).unwrap()));

        // Already applied.
        assert!(!insert.perform(&mut state));
        assert_eq!(state.num_tracks(), 3);
    }

    #[test]
    fn paste_processors_past_the_last_track_adds_tracks() {
        let mut state = state_with(1, &[(0, 3)]);
        Select::slots(&state, &[(0, 3)], &[], (0, 3)).perform(&mut state);
        let mut copied = CopiedState::new();
        copied.copy_selected_items(&state);

        let mut insert = Insert::new(&mut state, false, &copied, (2, 0)).unwrap();
        assert_eq!(state.num_tracks(), 1);
        insert.perform(&mut state);
        assert_eq!(state.num_tracks(), 3);
        assert_eq!(slots_of(&state, 2), vec![0]);
        insert.undo(&mut state);
        assert_eq!(state.num_tracks(), 1);
    }

    #[test]
    fn empty_clipboard_is_an_error() {
        let mut state = state_with(1, &[]);
        let copied = CopiedState::new();
        assert!(matches!(
            Insert::new(&mut state, false, &copied, (0, 0)),
            Err(ActionError::NothingCopied)
        ));
        let mut copied = CopiedState::new();
        copied.copy_selected_items(&state);
        assert!(matches!(
            Insert::new(&mut state, false, &copied, (0, 0)),
            Err(ActionError::NothingCopied)
        ));
    }
}
