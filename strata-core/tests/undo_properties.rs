mod common;

use strata_core::action::{
    CreateOrDeleteConnections, CreateProcessor, CreateTrack, DeleteSelectedItems, Insert,
    MoveSelectedItems, Select,
};
use strata_core::graph::DetachedGraph;
use strata_core::state::CopiedState;
use strata_core::{Action, Config, Connection, ProjectState};

#[test]
fn perform_then_undo_restores_the_tree() {
    let mut project = common::project(3);
    common::add_processors(&mut project, "Gain", &[(0, 0), (0, 1), (1, 0), (2, 3)]);
    let before = common::snapshot(&project);
    let transactions = project.undo_manager().num_transactions();

    project.select_rectangle((0, 0), (1, 1));
    project.move_selected_items(0, 1).unwrap();
    project.duplicate_selected().unwrap();
    project.delete_selected_items().unwrap();
    assert_ne!(common::snapshot(&project), before);

    while project.undo_manager().num_transactions() > transactions {
        project.undo();
    }
    assert_eq!(common::snapshot(&project), before);
}

fn gain_grid(at: &[(usize, usize)]) -> ProjectState {
    let mut state = ProjectState::new(&Config::default(), Box::new(DetachedGraph));
    for _ in 0..2 {
        CreateTrack::new(&mut state, None, false, None)
            .unwrap()
            .perform(&mut state);
    }
    let gain = state.catalog().find("Gain").unwrap().clone();
    for &(track, slot) in at {
        CreateProcessor::new(&mut state, &gain, track, slot)
            .unwrap()
            .perform(&mut state);
    }
    CreateOrDeleteConnections::update_all_default_connections(&state, false).perform(&mut state);
    state
}

#[test]
fn composites_replay_to_the_same_state() {
    let mut state = gain_grid(&[(0, 0), (0, 1), (1, 2)]);
    Select::rectangle(&state, (0, 0), (1, 1)).perform(&mut state);
    let mut copied = CopiedState::new();
    copied.copy_selected_items(&state);

    let builders: Vec<Box<dyn Fn(&mut ProjectState) -> Action + '_>> = vec![
        Box::new(|s| Insert::new(s, true, &copied, (0, 0)).unwrap().into()),
        Box::new(|s| MoveSelectedItems::new(s, 0, 2).unwrap().into()),
        Box::new(|s| DeleteSelectedItems::new(s).unwrap().into()),
        Box::new(|s| Select::all(s).into()),
    ];
    for build in &builders {
        let before = state.tree().snapshot(state.project_node()).unwrap();
        let mut action = build(&mut state);
        assert_eq!(state.tree().snapshot(state.project_node()).unwrap(), before);

        assert!(action.perform(&mut state));
        let once = state.tree().snapshot(state.project_node()).unwrap();
        action.undo(&mut state);
        assert_eq!(state.tree().snapshot(state.project_node()).unwrap(), before);
        action.perform(&mut state);
        assert_eq!(state.tree().snapshot(state.project_node()).unwrap(), once);
        action.undo(&mut state);
    }
}

#[test]
fn create_then_delete_of_one_connection_cancels_out() {
    let mut project = common::project(1);
    let ids = common::add_processors(&mut project, "Gain", &[(0, 0), (0, 2)]);
    let (a, b) = (common::graph_id(&project, ids[0]), common::graph_id(&project, ids[1]));
    let c = Connection::audio(a, 0, b, 1);

    let mut create = CreateOrDeleteConnections::new();
    create.add_connection(c.with_custom(true));
    let mut delete = CreateOrDeleteConnections::new();
    delete.remove_connection(c.with_custom(true));
    create.coalesce_with(&delete);
    assert!(create.is_empty());
    assert!(create.creates().is_empty() && create.deletes().is_empty());

    let before = common::snapshot(&project);
    let transactions = project.undo_manager().num_transactions();
    assert!(!project.perform(Action::from(create)));
    assert_eq!(common::snapshot(&project), before);
    assert_eq!(project.undo_manager().num_transactions(), transactions);

    project.begin_transaction("drag cable");
    assert!(project.connect(c));
    assert!(project.disconnect(&c));
    assert_eq!(project.undo_manager().num_transactions(), transactions);
    assert!(!project.state().has_connection(&c.with_custom(true)));
}

#[test]
fn consecutive_connection_edits_share_one_undo_step() {
    let mut project = common::project(1);
    let ids = common::add_processors(&mut project, "Gain", &[(0, 0), (0, 2)]);
    let (a, b) = (common::graph_id(&project, ids[0]), common::graph_id(&project, ids[1]));

    project.begin_transaction("drag cable");
    assert!(project.connect(Connection::audio(a, 0, b, 1)));
    assert!(project.connect(Connection::audio(a, 1, b, 0)));
    assert_eq!(project.undo_manager().undo_description(), Some("drag cable"));
    assert_eq!(project.undo_manager().last_transaction_len(), 1);

    project.undo();
    assert!(!project.state().has_connection(&Connection::audio(a, 0, b, 1).with_custom(true)));
    assert!(!project.state().has_connection(&Connection::audio(a, 1, b, 0).with_custom(true)));
}
