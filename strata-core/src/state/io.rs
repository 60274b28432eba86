use strata_types::{ids, GraphNodeId, NodeId};

use super::ProjectState;
use crate::tree::ValueNode;
use crate::catalog::{AUDIO_INPUT, AUDIO_OUTPUT, MIDI_INPUT, MIDI_OUTPUT};

impl ProjectState {
    pub fn input_processors(&self) -> Vec<NodeId> {
        self.tree.children(self.input).to_vec()
    }

    pub fn output_processors(&self) -> Vec<NodeId> {
        self.tree.children(self.output).to_vec()
    }

    fn io_with_id(&self, container: NodeId, identifier: &str) -> Vec<NodeId> {
        self.tree
            .children(container)
            .iter()
            .copied()
            .filter(|p| self.tree.get_string(*p, ids::ID) == identifier)
            .collect()
    }

    pub fn audio_input_processor(&self) -> Option<NodeId> {
        self.io_with_id(self.input, AUDIO_INPUT).into_iter().next()
    }

    pub fn audio_output_processor(&self) -> Option<NodeId> {
        self.io_with_id(self.output, AUDIO_OUTPUT).into_iter().next()
    }

    pub fn midi_input_processors(&self) -> Vec<NodeId> {
        self.io_with_id(self.input, MIDI_INPUT)
    }

    pub fn midi_output_processors(&self) -> Vec<NodeId> {
        self.io_with_id(self.output, MIDI_OUTPUT)
    }

    pub(crate) fn add_io_processor(
        &mut self,
        container: NodeId,
        identifier: &str,
        device: Option<&str>,
    ) -> Option<NodeId> {
        let description = self.catalog.find(identifier)?.clone();
        let mut value = self.processor_value(&description);
        if let Some(device) = device {
            value.set_property(ids::DEVICE_NAME, device);
            value.set_property(ids::NAME, device);
        }
        let node_id = self.processor_node_id_of(&value);
        match self.tree.add_child(container, value, None, None) {
            Ok(node) => {
                if let Some(id) = node_id {
                    self.graph.on_processor_created(id, node);
                }
                Some(node)
            }
            Err(e) => {
                log::error!(target: "tree", "could not add {}: {}", identifier, e);
                None
            }
        }
    }

    fn processor_node_id_of(&self, value: &ValueNode) -> Option<GraphNodeId> {
        u32::try_from(value.get(ids::NODE_ID).as_int())
            .ok()
            .map(GraphNodeId::new)
    }

    fn remove_io_processor(&mut self, processor: NodeId) {
        let Some(node_id) = self.processor_node_id(processor) else {
            return;
        };
        for c in self.connections_for(node_id, None, true, true) {
            self.erase_connection(&c, true);
        }
        if let Err(e) = self.tree.remove_node(processor, None) {
            log::error!(target: "tree", "could not remove device processor: {}", e);
            return;
        }
        self.graph.on_processor_destroyed(node_id);
    }

    /// Make the MIDI device processors match the connected devices.
    /// Not undoable: devices come and go regardless of edit history.
    pub fn sync_midi_devices(&mut self, midi_inputs: &[String], midi_outputs: &[String]) -> bool {
        let mut changed = false;
        for (container, identifier, devices) in [
            (self.input, MIDI_INPUT, midi_inputs),
            (self.output, MIDI_OUTPUT, midi_outputs),
        ] {
            for processor in self.io_with_id(container, identifier) {
                let device = self.tree.get_string(processor, ids::DEVICE_NAME);
                if !devices.contains(&device) {
                    log::info!(target: "mailbox", "device gone: {}", device);
                    self.remove_io_processor(processor);
                    changed = true;
                }
            }
            for device in devices {
                let present = self
                    .io_with_id(container, identifier)
                    .into_iter()
                    .any(|p| self.tree.get_string(p, ids::DEVICE_NAME) == *device);
                if !present {
                    log::info!(target: "mailbox", "device added: {}", device);
                    changed |= self.add_io_processor(container, identifier, Some(device)).is_some();
                }
            }
        }
        changed
    }
}
