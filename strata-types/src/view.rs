use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlMode {
    #[default]
    Note,
    Session,
}

impl ControlMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlMode::Note => "noteMode",
            ControlMode::Session => "sessionMode",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "noteMode" => Some(ControlMode::Note),
            "sessionMode" => Some(ControlMode::Session),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ControlMode::Note => ControlMode::Session,
            ControlMode::Session => ControlMode::Note,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FocusedPane {
    #[default]
    Editor,
    Mixer,
}

impl FocusedPane {
    pub fn as_str(self) -> &'static str {
        match self {
            FocusedPane::Editor => "editorPane",
            FocusedPane::Mixer => "mixerPane",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "editorPane" => Some(FocusedPane::Editor),
            "mixerPane" => Some(FocusedPane::Mixer),
            _ => None,
        }
    }
}
