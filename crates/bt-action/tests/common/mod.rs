#![allow(dead_code)]

use std::rc::Rc;

use bt_action::{provided_ports, ActionType, BtActionNode, Loopback, LoopbackServer, RuntimeHandle, NODE};
use bt_core::{Blackboard, BtNode, BtStatus, NodeConfig, Ports, TickContext};
use bt_tools::{TraceLog, TRACE_LOG};
use serde::{Deserialize, Serialize};

pub const SERVER: &str = "navigate_to_pose";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigateGoal {
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigateFeedback {
    pub distance_remaining: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
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

pub fn goal(target: &str) -> NavigateGoal {
    NavigateGoal {
        target: target.to_string(),
    }
}

pub fn config(timeout_ms: u64) -> NodeConfig {
    NodeConfig::new(provided_ports(), Ports::new().with("server_timeout", timeout_ms))
}

pub fn nav_node(timeout_ms: u64) -> BtActionNode<Navigate> {
    BtActionNode::with_default_hooks("MoveTo", SERVER, config(timeout_ms)).with_goal(goal("kitchen"))
}

/// Loopback middleware with one online server, and a blackboard wired to it.
pub struct Fixture {
    pub loopback: Loopback,
    pub server: LoopbackServer,
    pub blackboard: Blackboard,
    next_tick: u64,
}

impl Fixture {
    pub fn new() -> Self {
        let loopback = Loopback::new();
        let server = loopback.server(SERVER);
        server.go_online();

        let mut blackboard = Blackboard::new();
        blackboard.set(NODE, Rc::new(RuntimeHandle::new("bt_executor", loopback.transport())));
        blackboard.set(TRACE_LOG, TraceLog::default());

        Self {
            loopback,
            server,
            blackboard,
            next_tick: 0,
        }
    }

    pub fn ctx(&mut self) -> TickContext {
        let ctx = TickContext::new(self.next_tick);
        self.next_tick += 1;
        ctx
    }

    pub fn tick(&mut self, node: &mut dyn BtNode) -> BtStatus {
        let ctx = self.ctx();
        node.tick(&ctx, &mut self.blackboard)
    }

    pub fn halt(&mut self, node: &mut dyn BtNode) {
        let ctx = self.ctx();
        node.halt(&ctx, &mut self.blackboard);
    }

    pub fn trace_count(&self, tag: &str) -> usize {
        self.blackboard.get(TRACE_LOG).map_or(0, |log| log.count(tag))
    }

    pub fn active_goal(&self) -> bt_action::GoalId {
        self.server.active_goal().expect("server has an active goal")
    }
}
