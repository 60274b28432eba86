#![allow(dead_code)]
//! Shared fixtures for strata-core integration tests.

use std::cell::RefCell;
use std::rc::Rc;

use strata_core::{Config, GraphNodeId, NodeId, Notification, Project, ValueNode};

/// Project with `tracks` regular tracks and no master.
pub fn project(tracks: usize) -> Project {
    Project::new(&Config::default().with_starting_tracks(tracks, false))
}

/// Add a processor of `identifier` at each (track, slot).
pub fn add_processors(project: &mut Project, identifier: &str, at: &[(usize, usize)]) -> Vec<NodeId> {
    at.iter()
        .map(|&(track, slot)| {
            project
                .create_processor(identifier, track, Some(slot))
                .unwrap()
        })
        .collect()
}

pub fn graph_id(project: &Project, processor: NodeId) -> GraphNodeId {
    project.state().processor_node_id(processor).unwrap()
}

pub fn snapshot(project: &Project) -> ValueNode {
    let state = project.state();
    state.tree().snapshot(state.project_node()).unwrap()
}

/// Every notification the callback sees, in order.
pub fn recorder() -> (Rc<RefCell<Vec<Notification>>>, impl FnMut(&Notification, &strata_core::StateTree)) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    (seen, move |n: &Notification, _: &strata_core::StateTree| {
        sink.borrow_mut().push(n.clone())
    })
}
