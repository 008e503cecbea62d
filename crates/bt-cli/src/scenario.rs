//! Scripted runs of a navigation action against a loopback server.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use bt_action::{
    new_action_map, provided_ports, ActionExecutionInfo, ActionType, BtActionNode, Comparison,
    Cond, DurativeAction, Function, GoalPolicy, Loopback, LoopbackServer, Predicate,
    ProblemClient, RequirementGuard, RuntimeHandle, WorldState, ACTION_MAP, NODE, PROBLEM_CLIENT,
};
use bt_core::{Blackboard, BtNode, BtStatus, NodeConfig, Ports};
use bt_tools::{LogTraceSink, TraceLog, TraceSink, TRACE_LOG, TRACE_SINK};
use bt_tree::{BehaviorTree, ReactiveSequence};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const SERVER: &str = "navigate_to_pose";
const ACTION_ID: &str = "(move r2d2 hall kitchen):0";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigateGoal {
    pub target: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigateFeedback {
    pub distance_remaining: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigateResult {
    pub reached: bool,
}

pub struct Navigate;

impl ActionType for Navigate {
    const NAME: &'static str = "nav2_msgs/NavigateToPose";
    type Goal = NavigateGoal;
    type Feedback = NavigateFeedback;
    type Result = NavigateResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Goal accepted, feedback streamed, success reported
    Happy,
    /// Server never comes online
    Unreachable,
    /// Server rejects the goal
    Rejected,
    /// Tree is halted while the goal runs
    Halt,
    /// An over-all requirement stops holding mid-run
    Guard,
}

#[derive(Debug)]
pub struct Report {
    pub status: BtStatus,
    pub ticks: u64,
    pub goals_received: usize,
    pub cancel_requests: usize,
    pub trace: Vec<String>,
}

pub fn load_ports(yaml: Option<&str>) -> Result<Ports> {
    let mut ports = match yaml {
        Some(src) => Ports::from_yaml(src).context("parsing port values")?,
        None => Ports::new(),
    };
    if ports.get("server_timeout").is_none() {
        ports.set("server_timeout", 200);
    }
    Ok(ports)
}

pub fn run(scenario: Scenario, ports: Ports, max_ticks: u64) -> Result<Report> {
    let loopback = Loopback::new();

    let mut blackboard = Blackboard::new();
    blackboard.set(
        NODE,
        Rc::new(RuntimeHandle::new("bt_demo", loopback.transport())),
    );
    blackboard.set(TRACE_LOG, TraceLog::default());
    blackboard.set(TRACE_SINK, Box::new(LogTraceSink) as Box<dyn TraceSink>);

    let node = BtActionNode::<Navigate>::with_default_hooks(
        "MoveToKitchen",
        SERVER,
        NodeConfig::new(provided_ports(), ports),
    )
    .with_goal(NavigateGoal {
        target: "kitchen".into(),
    });
    // The server_name port may have redirected the node.
    let server = loopback.server(node.server_name());
    run_on(scenario, server, node, blackboard, max_ticks)
}

fn run_on(
    scenario: Scenario,
    server: LoopbackServer,
    node: BtActionNode<Navigate>,
    mut blackboard: Blackboard,
    max_ticks: u64,
) -> Result<Report> {
    if scenario != Scenario::Unreachable {
        server.go_online();
    }
    if scenario == Scenario::Rejected {
        server.set_goal_policy(GoalPolicy::Reject);
    }

    let root: Box<dyn BtNode> = match scenario {
        Scenario::Guard => {
            let world = install_world(&mut blackboard);
            let guard = RequirementGuard::over_all(
                "CheckOverAllReq",
                NodeConfig::new(
                    RequirementGuard::provided_ports(),
                    Ports::new().with("action", ACTION_ID),
                ),
            );
            let root = ReactiveSequence::new(vec![Box::new(guard), Box::new(node)]);
            let mut tree = BehaviorTree::new(Box::new(root), blackboard);
            let status = tree.tick_while_running(max_ticks, |n, _bb| {
                drive(&server, n);
                if n == 2 {
                    tracing::info!("robot lost charge");
                    world.borrow_mut().remove_predicate(&charged());
                }
            });
            return Ok(report(&tree, status, &server));
        }
        _ => Box::new(node),
    };

    let mut tree = BehaviorTree::new(root, blackboard);
    let status = match scenario {
        Scenario::Halt => {
            let status = tree.tick_while_running(2.min(max_ticks), |n, _bb| drive(&server, n));
            tracing::info!("halting tree");
            tree.halt();
            status
        }
        _ => tree.tick_while_running(max_ticks, |n, _bb| {
            drive(&server, n);
            if n == 3 {
                if let Some(id) = server.active_goal() {
                    server.succeed(id, &NavigateResult { reached: true });
                }
            }
        }),
    };
    Ok(report(&tree, status, &server))
}

/// Server behavior between ticks: start executing, then stream feedback.
fn drive(server: &LoopbackServer, tick: u64) {
    let Some(id) = server.active_goal() else {
        return;
    };
    if tick == 0 {
        server.execute(id);
    }
    server.publish_feedback(
        id,
        &NavigateFeedback {
            distance_remaining: 4.0 - tick as f64,
        },
    );
}

fn charged() -> Predicate {
    Predicate::new("charged", ["r2d2"])
}

fn install_world(blackboard: &mut Blackboard) -> Rc<RefCell<WorldState>> {
    let action = DurativeAction {
        name: "move".into(),
        parameters: vec!["r2d2".into(), "hall".into(), "kitchen".into()],
        at_start_requirements: Cond::pred("robot_at", ["r2d2", "hall"]).into(),
        over_all_requirements: Cond::And(vec![
            Cond::pred("charged", ["r2d2"]),
            Cond::compare(
                Comparison::GreaterOrEqual,
                Cond::func("battery_level", ["r2d2"]),
                Cond::Number(10.0),
            ),
        ])
        .into(),
        at_end_requirements: Default::default(),
    };
    let map = new_action_map();
    map.borrow_mut()
        .insert(ACTION_ID.to_string(), ActionExecutionInfo::durative(action));

    let mut state = WorldState::new().with_predicate(charged());
    state.set_function(Function::new("battery_level", ["r2d2"]), 64.0);
    let world = Rc::new(RefCell::new(state));

    blackboard.set(ACTION_MAP, map);
    let client: Rc<dyn ProblemClient> = world.clone();
    blackboard.set(PROBLEM_CLIENT, client);
    world
}

fn report(tree: &BehaviorTree, status: BtStatus, server: &LoopbackServer) -> Report {
    let trace = tree
        .blackboard()
        .get(TRACE_LOG)
        .map(|log| log.tags().into_iter().map(str::to_string).collect())
        .unwrap_or_default();
    Report {
        status,
        ticks: tree.ticks(),
        goals_received: server.received_goals().len(),
        cancel_requests: server.cancel_requests().len(),
        trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(scenario: Scenario) -> Report {
        let ports = load_ports(Some("server_timeout: 10")).unwrap();
        run(scenario, ports, 20).unwrap()
    }

    #[test]
    fn happy_succeeds_without_cancelling() {
        let report = quick(Scenario::Happy);
        assert_eq!(report.status, BtStatus::Success);
        assert_eq!(report.goals_received, 1);
        assert_eq!(report.cancel_requests, 0);
    }

    #[test]
    fn unreachable_and_rejected_fail() {
        let report = quick(Scenario::Unreachable);
        assert_eq!(report.status, BtStatus::Failure);
        assert_eq!(report.goals_received, 0);

        let report = quick(Scenario::Rejected);
        assert_eq!(report.status, BtStatus::Failure);
        assert_eq!(report.goals_received, 1);
    }

    #[test]
    fn halt_and_guard_cancel_the_goal() {
        let report = quick(Scenario::Halt);
        assert_eq!(report.cancel_requests, 1);

        let report = quick(Scenario::Guard);
        assert_eq!(report.status, BtStatus::Failure);
        assert_eq!(report.cancel_requests, 1);
        assert!(report.trace.iter().any(|t| t == "bt.guard.failed"));
    }

    #[test]
    fn ports_yaml_redirects_the_server() {
        let ports = load_ports(Some("server_name: dock\nserver_timeout: 10")).unwrap();
        assert_eq!(ports.get("server_timeout"), Some("10"));
        let report = run(Scenario::Happy, ports, 20).unwrap();
        assert_eq!(report.status, BtStatus::Success);
    }
}
