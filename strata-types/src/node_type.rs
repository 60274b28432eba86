use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Type tag of a project tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Project,
    Input,
    Output,
    Tracks,
    Track,
    ProcessorLane,
    Processor,
    Clip,
    Connections,
    Connection,
    ViewState,
}

impl NodeType {
    pub const ALL: [NodeType; 11] = [
        NodeType::Project,
        NodeType::Input,
        NodeType::Output,
        NodeType::Tracks,
        NodeType::Track,
        NodeType::ProcessorLane,
        NodeType::Processor,
        NodeType::Clip,
        NodeType::Connections,
        NodeType::Connection,
        NodeType::ViewState,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Project => "PROJECT",
            NodeType::Input => "INPUT",
            NodeType::Output => "OUTPUT",
            NodeType::Tracks => "TRACKS",
            NodeType::Track => "TRACK",
            NodeType::ProcessorLane => "PROCESSOR_LANE",
            NodeType::Processor => "PROCESSOR",
            NodeType::Clip => "CLIP",
            NodeType::Connections => "CONNECTIONS",
            NodeType::Connection => "CONNECTION",
            NodeType::ViewState => "VIEW_STATE",
        }
    }

    /// Items the control-surface bridge hears about when they are selected or removed.
    pub fn is_project_item(self) -> bool {
        matches!(self, NodeType::Track | NodeType::Processor | NodeType::Clip)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNodeTypeError(pub String);

impl fmt::Display for ParseNodeTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown node type: {}", self.0)
    }
}

impl std::error::Error for ParseNodeTypeError {}

impl FromStr for NodeType {
    type Err = ParseNodeTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseNodeTypeError(s.to_string()))
    }
}
