use strata_types::{ids, ControlMode, FocusedPane, NodeId};

use super::ProjectState;

impl ProjectState {
    pub fn num_processor_slots(&self) -> usize {
        self.tree.get_int(self.view, ids::NUM_PROCESSOR_SLOTS).max(1) as usize
    }

    pub fn num_master_processor_slots(&self) -> usize {
        self.tree
            .get_int(self.view, ids::NUM_MASTER_PROCESSOR_SLOTS)
            .max(1) as usize
    }

    pub fn focused_track_index(&self) -> usize {
        self.tree.get_int(self.view, ids::FOCUSED_TRACK_INDEX).max(0) as usize
    }

    pub fn focused_slot(&self) -> usize {
        self.tree
            .get_int(self.view, ids::FOCUSED_PROCESSOR_SLOT)
            .max(0) as usize
    }

    pub fn focused_track_and_slot(&self) -> (usize, usize) {
        (self.focused_track_index(), self.focused_slot())
    }

    pub fn focused_track(&self) -> Option<NodeId> {
        self.track(self.focused_track_index())
    }

    pub fn control_mode(&self) -> ControlMode {
        ControlMode::parse(&self.tree.get_string(self.view, ids::CONTROL_MODE)).unwrap_or_default()
    }

    pub fn focused_pane(&self) -> FocusedPane {
        FocusedPane::parse(&self.tree.get_string(self.view, ids::FOCUSED_PANE)).unwrap_or_default()
    }

    /// View-only state; never recorded.
    pub fn set_control_mode(&mut self, mode: ControlMode) -> bool {
        self.tree
            .set_property(self.view, ids::CONTROL_MODE, mode.as_str(), None)
    }

    pub fn set_focused_pane(&mut self, pane: FocusedPane) -> bool {
        self.tree
            .set_property(self.view, ids::FOCUSED_PANE, pane.as_str(), None)
    }
}
