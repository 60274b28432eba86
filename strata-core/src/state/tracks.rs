use strata_types::{ids, ConnectionType, GraphNodeId, NodeId, NodeType, SlotMask, Var};

use super::{hsv_colour, ProjectState};

impl ProjectState {
    pub fn tracks(&self) -> Vec<NodeId> {
        self.tree.children(self.tracks).to_vec()
    }

    pub fn num_tracks(&self) -> usize {
        self.tree.num_children(self.tracks)
    }

    pub fn num_non_master_tracks(&self) -> usize {
        self.num_tracks() - usize::from(self.master_track().is_some())
    }

    pub fn track(&self, index: usize) -> Option<NodeId> {
        self.tree.child(self.tracks, index)
    }

    pub fn track_index(&self, track: NodeId) -> Option<usize> {
        self.tree.index_of(self.tracks, track)
    }

    /// The master track is always the last one.
    pub fn master_track(&self) -> Option<NodeId> {
        self.tree
            .children(self.tracks)
            .last()
            .copied()
            .filter(|t| self.is_master_track(*t))
    }

    pub fn is_master_track(&self, track: NodeId) -> bool {
        self.tree.get_bool(track, ids::IS_MASTER_TRACK)
    }

    pub fn lane(&self, track: NodeId) -> Option<NodeId> {
        self.tree.child_of_type(track, NodeType::ProcessorLane)
    }

    /// Processors of a track in slot order.
    pub fn processors(&self, track: NodeId) -> Vec<NodeId> {
        self.lane(track)
            .map(|lane| self.tree.children(lane).to_vec())
            .unwrap_or_default()
    }

    pub fn clips(&self, track: NodeId) -> Vec<NodeId> {
        self.tree
            .children(track)
            .iter()
            .copied()
            .filter(|c| self.tree.has_type(*c, NodeType::Clip))
            .collect()
    }

    pub fn processor_slot(&self, processor: NodeId) -> usize {
        self.tree.get_int(processor, ids::PROCESSOR_SLOT).max(0) as usize
    }

    pub fn processor_at_slot(&self, track: NodeId, slot: usize) -> Option<NodeId> {
        self.processors(track)
            .into_iter()
            .find(|p| self.processor_slot(*p) == slot)
    }

    /// Owning track of a lane processor; `None` for device I/O processors.
    pub fn track_for_processor(&self, processor: NodeId) -> Option<NodeId> {
        let lane = self.tree.parent(processor)?;
        if !self.tree.has_type(lane, NodeType::ProcessorLane) {
            return None;
        }
        self.tree.parent(lane)
    }

    pub fn num_slots_for_track(&self, track: NodeId) -> usize {
        if self.is_master_track(track) {
            self.num_master_processor_slots()
        } else {
            self.num_processor_slots()
        }
    }

    /// Occupied slots, derived from the lane's children.
    pub fn occupancy_mask(&self, track: NodeId) -> SlotMask {
        SlotMask::from_slots(self.processors(track).into_iter().map(|p| self.processor_slot(p)))
    }

    /// Selected slots of a track.
    pub fn slot_mask(&self, track: NodeId) -> SlotMask {
        self.lane(track)
            .and_then(|lane| self.tree.property(lane, ids::SELECTED_SLOTS_MASK))
            .and_then(Var::as_str)
            .and_then(SlotMask::parse_binary)
            .unwrap_or_default()
    }

    pub fn full_selection_mask(&self, track: NodeId) -> SlotMask {
        SlotMask::full(self.num_slots_for_track(track))
    }

    pub fn is_track_selected(&self, track: NodeId) -> bool {
        self.tree.get_bool(track, ids::SELECTED)
    }

    pub fn track_has_any_slot_selected(&self, track: NodeId) -> bool {
        !self.slot_mask(track).is_empty()
    }

    pub fn is_processor_selected(&self, processor: NodeId) -> bool {
        self.track_for_processor(processor)
            .map(|t| self.slot_mask(t).get(self.processor_slot(processor)))
            .unwrap_or(false)
    }

    /// Whole selected tracks, and selected processors of the other tracks.
    pub fn find_all_selected_items(&self) -> (Vec<NodeId>, Vec<NodeId>) {
        let mut tracks = Vec::new();
        let mut processors = Vec::new();
        for track in self.tracks() {
            if self.is_track_selected(track) {
                tracks.push(track);
            } else {
                let mask = self.slot_mask(track);
                processors.extend(
                    self.processors(track)
                        .into_iter()
                        .filter(|p| mask.get(self.processor_slot(*p))),
                );
            }
        }
        (tracks, processors)
    }

    pub fn first_free_slot(&self, track: NodeId) -> Option<usize> {
        let occupied = self.occupancy_mask(track);
        (0..self.num_slots_for_track(track)).find(|s| !occupied.get(*s))
    }

    pub fn track_has_generator_or_instrument(&self, track: NodeId) -> bool {
        self.processors(track).into_iter().any(|p| {
            let identifier = self.tree.get_string(p, ids::ID);
            self.catalog.is_generator_or_instrument(&identifier)
        })
    }

    pub fn next_track_name(&self) -> String {
        let taken: Vec<String> = self
            .tracks()
            .into_iter()
            .map(|t| self.tree.get_string(t, ids::NAME))
            .collect();
        let mut n = self.num_non_master_tracks() + 1;
        loop {
            let name = format!("Track {}", n);
            if !taken.contains(&name) {
                return name;
            }
            n += 1;
        }
    }

    pub fn default_track_colour(&self) -> String {
        hsv_colour((1.0 / 8.0) * self.num_tracks() as f64, 0.65, 0.65)
    }

    // ── processors anywhere in the project ──

    pub fn all_processors(&self) -> Vec<NodeId> {
        let mut out = self.input_processors();
        out.extend(self.output_processors());
        for track in self.tracks() {
            out.extend(self.processors(track));
        }
        out
    }

    pub fn processor_node_id(&self, processor: NodeId) -> Option<GraphNodeId> {
        match self.tree.property(processor, ids::NODE_ID)? {
            Var::Int(i) => u32::try_from(*i).ok().map(GraphNodeId::new),
            _ => None,
        }
    }

    pub fn processor_by_node_id(&self, id: GraphNodeId) -> Option<NodeId> {
        self.all_processors()
            .into_iter()
            .find(|p| self.processor_node_id(*p) == Some(id))
    }

    pub fn allows_default_connections(&self, processor: NodeId) -> bool {
        self.tree.get_bool(processor, ids::ALLOW_DEFAULT_CONNECTIONS)
    }

    /// Can receive a signal of this type.
    pub fn is_effect_for(&self, processor: NodeId, connection_type: ConnectionType) -> bool {
        match connection_type {
            ConnectionType::Audio => self.tree.get_int(processor, ids::NUM_INPUT_CHANNELS) > 0,
            ConnectionType::Midi => self.tree.get_bool(processor, ids::ACCEPTS_MIDI),
        }
    }

    /// Emits a signal of this type.
    pub fn produces(&self, processor: NodeId, connection_type: ConnectionType) -> bool {
        match connection_type {
            ConnectionType::Audio => self.tree.get_int(processor, ids::NUM_OUTPUT_CHANNELS) > 0,
            ConnectionType::Midi => self.tree.get_bool(processor, ids::PRODUCES_MIDI),
        }
    }
}
