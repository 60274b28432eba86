use serde::{Deserialize, Serialize};

/// What the plugin catalog knows about a processor type before it is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorDescription {
    pub identifier: String,
    pub name: String,
    pub category: String,
    pub is_instrument: bool,
    pub num_input_channels: u32,
    pub num_output_channels: u32,
    pub accepts_midi: bool,
    pub produces_midi: bool,
    /// Device-facing processors that live on the project's input/output nodes.
    pub is_io: bool,
}

impl ProcessorDescription {
    pub fn effect(name: &str, inputs: u32, outputs: u32) -> Self {
        Self {
            identifier: name.to_string(),
            name: name.to_string(),
            category: "Effect".to_string(),
            is_instrument: false,
            num_input_channels: inputs,
            num_output_channels: outputs,
            accepts_midi: false,
            produces_midi: false,
            is_io: false,
        }
    }

    pub fn instrument(name: &str, outputs: u32) -> Self {
        Self {
            category: "Synth".to_string(),
            is_instrument: true,
            accepts_midi: true,
            ..Self::effect(name, 0, outputs)
        }
    }

    /// Sound sources, as opposed to effects that process an incoming signal.
    pub fn is_generator_or_instrument(&self) -> bool {
        self.is_instrument
            || (self.num_input_channels == 0 && self.num_output_channels > 0 && !self.is_io)
    }
}
