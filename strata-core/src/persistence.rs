//! Project files: the whole tree as JSON, one object per node.

use std::fmt;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::graph::AudioGraphHost;
use crate::state::{ProjectState, StateError};
use crate::tree::{StateTree, ValueNode};

/// Current file format version.
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct ProjectFile {
    format_version: u32,
    project: ValueNode,
}

#[derive(Debug)]
pub enum PersistenceError {
    Io(io::Error),
    Json(serde_json::Error),
    Format(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Io(e) => write!(f, "project file I/O: {}", e),
            PersistenceError::Json(e) => write!(f, "project file is not valid: {}", e),
            PersistenceError::Format(msg) => write!(f, "unsupported project: {}", msg),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistenceError::Io(e) => Some(e),
            PersistenceError::Json(e) => Some(e),
            PersistenceError::Format(_) => None,
        }
    }
}

impl From<io::Error> for PersistenceError {
    fn from(e: io::Error) -> Self {
        PersistenceError::Io(e)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Json(e)
    }
}

impl From<StateError> for PersistenceError {
    fn from(e: StateError) -> Self {
        PersistenceError::Format(e.to_string())
    }
}

pub fn save_project(path: &Path, state: &ProjectState) -> Result<(), PersistenceError> {
    let project = state
        .tree()
        .snapshot(state.project_node())
        .ok_or_else(|| PersistenceError::Format("project root missing".to_string()))?;
    let file = ProjectFile {
        format_version: FORMAT_VERSION,
        project,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(&file)?;
    std::fs::write(path, json)?;
    log::info!(target: "persistence", "saved project to {}", path.display());
    Ok(())
}

pub fn load_project(path: &Path, graph: Box<dyn AudioGraphHost>) -> Result<ProjectState, PersistenceError> {
    let contents = std::fs::read_to_string(path)?;
    let file: ProjectFile = serde_json::from_str(&contents)?;
    if file.format_version > FORMAT_VERSION {
        return Err(PersistenceError::Format(format!(
            "format version {} is newer than supported ({})",
            file.format_version, FORMAT_VERSION
        )));
    }
    let state = ProjectState::from_tree(StateTree::from_value(&file.project), graph)?;
    log::info!(target: "persistence", "loaded project from {}", path.display());
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{CreateOrDeleteConnections, CreateProcessor, CreateTrack};
    use crate::config::Config;
    use crate::graph::DetachedGraph;

    fn sample() -> ProjectState {
        let mut state = ProjectState::new(&Config::default(), Box::new(DetachedGraph));
        CreateTrack::new(&mut state, None, false, None)
            .unwrap()
            .perform(&mut state);
        let synth = state.catalog().find("Sine Synth").unwrap().clone();
        let gain = state.catalog().find("Gain").unwrap().clone();
        CreateProcessor::new(&mut state, &synth, 0, 0)
            .unwrap()
            .perform(&mut state);
        CreateProcessor::new(&mut state, &gain, 0, 1)
            .unwrap()
            .perform(&mut state);
        CreateOrDeleteConnections::update_all_default_connections(&state, false).perform(&mut state);
        state
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.strata");
        let state = sample();
        save_project(&path, &state).unwrap();

        let loaded = load_project(&path, Box::new(DetachedGraph)).unwrap();
        assert_eq!(
            loaded.tree().snapshot(loaded.project_node()),
            state.tree().snapshot(state.project_node())
        );
        assert_eq!(loaded.connections(), state.connections());
        assert_eq!(loaded.num_tracks(), 1);
    }

    #[test]
    fn newer_format_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.strata");
        std::fs::write(
            &path,
            r#"{"format_version": 99, "project": {"type": "PROJECT", "properties": {}}}"#,
        )
        .unwrap();
        let err = load_project(&path, Box::new(DetachedGraph)).err().unwrap();
        assert!(matches!(err, PersistenceError::Format(_)));
    }

    #[test]
    fn missing_containers_and_garbage_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bare.strata");
        std::fs::write(
            &path,
            r#"{"format_version": 1, "project": {"type": "PROJECT", "properties": {}}}"#,
        )
        .unwrap();
        assert!(matches!(
            load_project(&path, Box::new(DetachedGraph)),
            Err(PersistenceError::Format(_))
        ));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            load_project(&path, Box::new(DetachedGraph)),
            Err(PersistenceError::Json(_))
        ));
        assert!(matches!(
            load_project(&dir.path().join("absent"), Box::new(DetachedGraph)),
            Err(PersistenceError::Io(_))
        ));
    }
}
