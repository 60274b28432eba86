//! Property keys used on project tree nodes.

pub const UUID: &str = "uuid";
pub const NAME: &str = "name";
pub const COLOUR: &str = "colour";
pub const SELECTED: &str = "selected";
pub const IS_MASTER_TRACK: &str = "isMasterTrack";

pub const SELECTED_SLOTS_MASK: &str = "selectedSlotsMask";

pub const ID: &str = "id";
pub const NODE_ID: &str = "nodeId";
pub const PROCESSOR_SLOT: &str = "processorSlot";
pub const NUM_INPUT_CHANNELS: &str = "numInputChannels";
pub const NUM_OUTPUT_CHANNELS: &str = "numOutputChannels";
pub const ACCEPTS_MIDI: &str = "acceptsMidi";
pub const PRODUCES_MIDI: &str = "producesMidi";
pub const ALLOW_DEFAULT_CONNECTIONS: &str = "allowDefaultConnections";
pub const BYPASSED: &str = "bypassed";
pub const DEVICE_NAME: &str = "deviceName";

pub const SOURCE_NODE_ID: &str = "sourceNodeId";
pub const SOURCE_CHANNEL: &str = "sourceChannel";
pub const DESTINATION_NODE_ID: &str = "destinationNodeId";
pub const DESTINATION_CHANNEL: &str = "destinationChannel";
pub const IS_CUSTOM_CONNECTION: &str = "isCustomConnection";

pub const START: &str = "start";
pub const LENGTH: &str = "length";

pub const NUM_PROCESSOR_SLOTS: &str = "numProcessorSlots";
pub const NUM_MASTER_PROCESSOR_SLOTS: &str = "numMasterProcessorSlots";
pub const FOCUSED_TRACK_INDEX: &str = "focusedTrackIndex";
pub const FOCUSED_PROCESSOR_SLOT: &str = "focusedProcessorSlot";
pub const CONTROL_MODE: &str = "controlMode";
pub const FOCUSED_PANE: &str = "focusedPane";
