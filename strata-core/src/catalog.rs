//! Processor types the project can instantiate.

use strata_types::ProcessorDescription;

pub const AUDIO_INPUT: &str = "Audio Input";
pub const AUDIO_OUTPUT: &str = "Audio Output";
pub const MIDI_INPUT: &str = "MIDI Input";
pub const MIDI_OUTPUT: &str = "MIDI Output";

#[derive(Debug, Clone)]
pub struct PluginCatalog {
    internal: Vec<ProcessorDescription>,
    external: Vec<ProcessorDescription>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        let io = |name: &str, inputs: u32, outputs: u32, accepts: bool, produces: bool| {
            ProcessorDescription {
                category: "I/O".to_string(),
                accepts_midi: accepts,
                produces_midi: produces,
                is_io: true,
                ..ProcessorDescription::effect(name, inputs, outputs)
            }
        };
        let keyboard = ProcessorDescription {
            category: "MIDI".to_string(),
            produces_midi: true,
            ..ProcessorDescription::effect("MIDI Keyboard", 0, 0)
        };
        let sine_bank = ProcessorDescription {
            category: "Generator".to_string(),
            ..ProcessorDescription::effect("Sine Bank", 0, 2)
        };

        Self {
            internal: vec![
                io(AUDIO_INPUT, 0, 2, false, false),
                io(AUDIO_OUTPUT, 2, 0, false, false),
                io(MIDI_INPUT, 0, 0, false, true),
                io(MIDI_OUTPUT, 0, 0, true, false),
                ProcessorDescription::effect("Gain", 2, 2),
                ProcessorDescription::effect("Balance", 2, 2),
                sine_bank,
                ProcessorDescription::instrument("Sine Synth", 2),
                keyboard,
            ],
            external: Vec::new(),
        }
    }

    /// Add a scanned plugin. A second registration with the same identifier replaces the first.
    pub fn register(&mut self, description: ProcessorDescription) {
        self.external
            .retain(|d| d.identifier != description.identifier);
        self.external.push(description);
    }

    pub fn find(&self, identifier: &str) -> Option<&ProcessorDescription> {
        self.internal
            .iter()
            .chain(self.external.iter())
            .find(|d| d.identifier == identifier)
    }

    /// Types a user can pick from a menu: everything except device I/O.
    pub fn choosable(&self) -> Vec<&ProcessorDescription> {
        self.internal
            .iter()
            .chain(self.external.iter())
            .filter(|d| !d.is_io)
            .collect()
    }

    /// Menu index to description. Anything out of range is no choice at all.
    pub fn chosen_type(&self, menu_index: i32) -> Option<&ProcessorDescription> {
        let index = usize::try_from(menu_index).ok()?;
        self.choosable().get(index).copied()
    }

    pub fn is_generator_or_instrument(&self, identifier: &str) -> bool {
        self.find(identifier)
            .map(ProcessorDescription::is_generator_or_instrument)
            .unwrap_or(false)
    }
}

impl Default for PluginCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_and_menu_choice() {
        let catalog = PluginCatalog::new();
        assert!(catalog.find("Gain").is_some());
        assert!(catalog.find("Reverb").is_none());
        assert_eq!(catalog.chosen_type(0).map(|d| d.name.as_str()), Some("Gain"));
        assert!(catalog.chosen_type(-1).is_none());
        assert!(catalog.chosen_type(99).is_none());
    }

    #[test]
    fn generators() {
        let catalog = PluginCatalog::new();
        assert!(catalog.is_generator_or_instrument("Sine Bank"));
        assert!(catalog.is_generator_or_instrument("Sine Synth"));
        assert!(!catalog.is_generator_or_instrument("Gain"));
        assert!(!catalog.is_generator_or_instrument(AUDIO_INPUT));
        assert!(!catalog.is_generator_or_instrument("nope"));
    }

    #[test]
    fn external_registration_replaces() {
        let mut catalog = PluginCatalog::new();
        catalog.register(ProcessorDescription::effect("Delay", 2, 2));
        catalog.register(ProcessorDescription::effect("Delay", 1, 1));
        assert_eq!(catalog.find("Delay").map(|d| d.num_input_channels), Some(1));
        assert_eq!(catalog.choosable().len(), 6);
    }
}
