mod common;

use std::cell::RefCell;
use std::rc::Rc;

use bt_action::{
    new_action_map, ActionExecutionInfo, ActionMap, Comparison, Cond, DurativeAction, Function,
    Predicate, ProblemClient, RequirementGuard, RequirementPhase, SnapAction, WorldState,
    ACTION_MAP, PROBLEM_CLIENT,
};
use bt_core::{Blackboard, BtNode, BtStatus, NodeConfig, Ports, TickContext};
use bt_tree::{BehaviorTree, ReactiveSequence};
use common::{nav_node, Fixture};

type World = Rc<RefCell<WorldState>>;

fn charged() -> Predicate {
    Predicate::new("charged", ["r2d2"])
}

fn move_action() -> DurativeAction {
    DurativeAction {
        name: "move".into(),
        parameters: vec!["r2d2".into(), "kitchen".into()],
        at_start_requirements: Cond::pred("robot_at", ["r2d2", "hall"]).into(),
        over_all_requirements: Cond::And(vec![
            Cond::pred("charged", ["r2d2"]),
            Cond::compare(
                Comparison::Greater,
                Cond::func("battery_level", ["r2d2"]),
                Cond::Number(20.0),
            ),
        ])
        .into(),
        at_end_requirements: Default::default(),
    }
}

fn setup(bb: &mut Blackboard) -> (ActionMap, World) {
    let map = new_action_map();
    map.borrow_mut()
        .insert("(move r2d2 kitchen):0".into(), ActionExecutionInfo::durative(move_action()));
    map.borrow_mut().insert(
        "(pick r2d2 cup):1".into(),
        ActionExecutionInfo::snap(SnapAction {
            name: "pick".into(),
            parameters: vec!["r2d2".into(), "cup".into()],
            preconditions: Cond::pred("robot_at", ["r2d2", "kitchen"]).into(),
        }),
    );

    let mut state = WorldState::new()
        .with_predicate(charged())
        .with_predicate(Predicate::new("robot_at", ["r2d2", "kitchen"]));
    state.set_function(Function::new("battery_level", ["r2d2"]), 80.0);
    let world = Rc::new(RefCell::new(state));

    bb.set(ACTION_MAP, Rc::clone(&map));
    let client: Rc<dyn ProblemClient> = world.clone();
    bb.set(PROBLEM_CLIENT, client);
    (map, world)
}

fn guard(phase: RequirementPhase, action: &str) -> RequirementGuard {
    let config = NodeConfig::new(
        RequirementGuard::provided_ports(),
        Ports::new().with("action", action),
    );
    RequirementGuard::new("CheckReq", phase, config)
}

fn tick(node: &mut dyn BtNode, bb: &mut Blackboard) -> BtStatus {
    node.tick(&TickContext::new(0), bb)
}

#[test]
fn phases_select_the_matching_requirements() {
    let mut bb = Blackboard::new();
    setup(&mut bb);

    let moving = "(move r2d2 kitchen):0";
    assert_eq!(tick(&mut guard(RequirementPhase::OverAll, moving), &mut bb), BtStatus::Success);
    assert_eq!(tick(&mut guard(RequirementPhase::AtStart, moving), &mut bb), BtStatus::Failure);
    assert_eq!(tick(&mut guard(RequirementPhase::AtEnd, moving), &mut bb), BtStatus::Success);

    let picking = "(pick r2d2 cup):1";
    assert_eq!(tick(&mut guard(RequirementPhase::AtStart, picking), &mut bb), BtStatus::Success);
    assert_eq!(tick(&mut guard(RequirementPhase::OverAll, picking), &mut bb), BtStatus::Success);
    assert_eq!(tick(&mut guard(RequirementPhase::AtEnd, picking), &mut bb), BtStatus::Success);
}

#[test]
fn failure_records_the_reason_in_the_action_map() {
    let mut bb = Blackboard::new();
    let (map, world) = setup(&mut bb);
    let id = "(move r2d2 kitchen):0";

    let mut over_all = RequirementGuard::over_all(
        "CheckOverAllReq",
        NodeConfig::new(
            RequirementGuard::provided_ports(),
            Ports::new().with("action", id),
        ),
    );
    assert_eq!(over_all.phase(), RequirementPhase::OverAll);
    assert_eq!(tick(&mut over_all, &mut bb), BtStatus::Success);
    assert!(map.borrow()[id].execution_error_info.is_empty());

    world
        .borrow_mut()
        .set_function(Function::new("battery_level", ["r2d2"]), 10.0);
    assert_eq!(tick(&mut over_all, &mut bb), BtStatus::Failure);
    assert_eq!(
        map.borrow()[id].execution_error_info,
        "Error checking over all requirements"
    );

    let mut at_start = RequirementGuard::at_start(
        "CheckAtStartReq",
        NodeConfig::new(
            RequirementGuard::provided_ports(),
            Ports::new().with("action", id),
        ),
    );
    assert_eq!(tick(&mut at_start, &mut bb), BtStatus::Failure);
    assert_eq!(
        map.borrow()[id].execution_error_info,
        "Error checking at start requirements"
    );
}

#[test]
fn unknown_action_has_no_requirements() {
    let mut bb = Blackboard::new();
    setup(&mut bb);
    let mut g = RequirementGuard::at_end(
        "CheckAtEndReq",
        NodeConfig::new(
            RequirementGuard::provided_ports(),
            Ports::new().with("action", "(wait r2d2):9"),
        ),
    );
    assert_eq!(tick(&mut g, &mut bb), BtStatus::Success);
}

#[test]
fn missing_inputs_fail() {
    let mut empty = Blackboard::new();
    let mut g = guard(RequirementPhase::OverAll, "(move r2d2 kitchen):0");
    assert_eq!(tick(&mut g, &mut empty), BtStatus::Failure);

    let mut bb = Blackboard::new();
    setup(&mut bb);
    let mut no_port = RequirementGuard::over_all(
        "CheckOverAllReq",
        NodeConfig::new(RequirementGuard::provided_ports(), Ports::new()),
    );
    assert_eq!(tick(&mut no_port, &mut bb), BtStatus::Failure);
}

#[test]
fn world_changes_are_seen_on_every_tick() {
    let mut bb = Blackboard::new();
    let (_map, world) = setup(&mut bb);
    let mut g = guard(RequirementPhase::OverAll, "(move r2d2 kitchen):0");

    assert_eq!(tick(&mut g, &mut bb), BtStatus::Success);
    world.borrow_mut().remove_predicate(&charged());
    assert_eq!(tick(&mut g, &mut bb), BtStatus::Failure);
    world.borrow_mut().add_predicate(charged());
    assert_eq!(tick(&mut g, &mut bb), BtStatus::Success);

    g.halt(&TickContext::new(1), &mut bb);
    assert_eq!(tick(&mut g, &mut bb), BtStatus::Success);
}

#[test]
fn replaced_blackboard_entries_are_used_on_the_next_tick() {
    let mut bb = Blackboard::new();
    let (_map, world) = setup(&mut bb);
    let id = "(move r2d2 kitchen):0";
    let mut g = guard(RequirementPhase::OverAll, id);
    assert_eq!(tick(&mut g, &mut bb), BtStatus::Success);

    let mut docked = move_action();
    docked.over_all_requirements = Cond::pred("docked", ["r2d2"]).into();
    let replanned = new_action_map();
    replanned
        .borrow_mut()
        .insert(id.into(), ActionExecutionInfo::durative(docked));
    bb.set(ACTION_MAP, Rc::clone(&replanned));
    assert_eq!(tick(&mut g, &mut bb), BtStatus::Failure);
    assert_eq!(
        replanned.borrow()[id].execution_error_info,
        "Error checking over all requirements"
    );

    let empty: Rc<dyn ProblemClient> = Rc::new(RefCell::new(WorldState::new()));
    bb.set(PROBLEM_CLIENT, empty);
    world
        .borrow_mut()
        .add_predicate(Predicate::new("docked", ["r2d2"]));
    assert_eq!(tick(&mut g, &mut bb), BtStatus::Failure);

    let client: Rc<dyn ProblemClient> = world.clone();
    bb.set(PROBLEM_CLIENT, client);
    assert_eq!(tick(&mut g, &mut bb), BtStatus::Success);

    bb.remove(ACTION_MAP);
    assert_eq!(tick(&mut g, &mut bb), BtStatus::Failure);
    bb.set(ACTION_MAP, replanned);
    assert_eq!(tick(&mut g, &mut bb), BtStatus::Success);
}

#[test]
fn guard_failure_mid_run_cancels_the_sibling_action() {
    let mut fx = Fixture::new();
    let (_map, world) = setup(&mut fx.blackboard);
    let server = fx.server.clone();

    let root = ReactiveSequence::new(vec![
        Box::new(guard(RequirementPhase::OverAll, "(move r2d2 kitchen):0")),
        Box::new(nav_node(100)),
    ]);
    let mut tree = BehaviorTree::new(Box::new(root), std::mem::take(&mut fx.blackboard));

    assert_eq!(tree.tick_once(), BtStatus::Running);
    assert_eq!(tree.tick_once(), BtStatus::Running);
    let id = server.active_goal().expect("goal running");

    world.borrow_mut().remove_predicate(&charged());
    assert_eq!(tree.tick_once(), BtStatus::Failure);

    assert_eq!(server.cancel_requests(), vec![id]);
    assert_eq!(server.active_goal(), None);
    let log = tree.blackboard().get(bt_tools::TRACE_LOG).expect("trace log");
    assert_eq!(log.count("bt.guard.failed"), 1);
    assert_eq!(log.count("bt.action.cancelled"), 1);
}
