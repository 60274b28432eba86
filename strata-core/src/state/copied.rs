use strata_types::{ids, NodeType};

use super::ProjectState;
use crate::tree::ValueNode;

/// Clipboard for tracks and processors.
///
/// Holds one TRACK copy per project track, in project order, so that copied
/// track positions line up with the project. A selected track is copied
/// whole; any other track keeps only its selected processors.
#[derive(Debug, Clone, Default)]
pub struct CopiedState {
    tracks: Option<ValueNode>,
}

impl CopiedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copy_selected_items(&mut self, state: &ProjectState) {
        let tree = state.tree();
        let mut copied = ValueNode::new(NodeType::Tracks);
        for track in state.tracks() {
            let Some(snapshot) = tree.snapshot(track) else {
                continue;
            };
            let mut copy = snapshot.detached_copy();
            if !state.is_track_selected(track) {
                let mask = state.slot_mask(track);
                if let Some(lane) = copy.child_of_type_mut(NodeType::ProcessorLane) {
                    lane.children_mut()
                        .retain(|p| mask.get(p.get(ids::PROCESSOR_SLOT).as_int().max(0) as usize));
                }
            }
            copied = copied.with_child(copy);
        }
        self.tracks = Some(copied);
    }

    pub fn clear(&mut self) {
        self.tracks = None;
    }

    pub fn tracks(&self) -> Option<&ValueNode> {
        self.tracks.as_ref()
    }

    /// True when nothing selected was copied.
    pub fn is_empty(&self) -> bool {
        self.tracks
            .as_ref()
            .map(|t| !t.children().iter().any(copied_track_has_selection))
            .unwrap_or(true)
    }
}

pub(crate) fn copied_track_has_selection(track: &ValueNode) -> bool {
    track.get(ids::SELECTED).as_bool() || !copied_slot_mask(track).is_empty()
}

pub(crate) fn copied_slot_mask(track: &ValueNode) -> strata_types::SlotMask {
    track
        .child_of_type(NodeType::ProcessorLane)
        .and_then(|lane| lane.property(ids::SELECTED_SLOTS_MASK))
        .and_then(|v| v.as_str())
        .and_then(strata_types::SlotMask::parse_binary)
        .unwrap_or_default()
}
