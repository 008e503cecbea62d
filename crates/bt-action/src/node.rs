use std::rc::Rc;
use std::time::Duration;

use bt_core::{Blackboard, BtNode, BtStatus, NodeConfig, PortInfo, PortsList, TickContext};
use bt_tools::{emit as trace_emit, TraceEvent};

use crate::client::ActionClient;
use crate::config::{ActionClientConfig, SERVER_NAME_PORT, SERVER_TIMEOUT_PORT};
use crate::error::ActionError;
use crate::goal::{GoalHandle, ResultCode, WrappedResult};
use crate::hooks::{ActionContext, ActionHooks, DefaultHooks, GoalState};
use crate::keys::NODE;
use crate::runtime::RuntimeHandle;
use crate::schema::ActionType;
use crate::transport::SessionMessage;

/// The ports every action node understands, plus `extra`.
pub fn provided_basic_ports(extra: PortsList) -> PortsList {
    let mut basic = vec![
        PortInfo::input(SERVER_NAME_PORT, "Action server name"),
        PortInfo::input(
            SERVER_TIMEOUT_PORT,
            "The amount of time to wait for a response from the action server, in milliseconds",
        )
        .with_default("1000"),
    ];
    for port in extra {
        basic.retain(|p| p.name != port.name);
        basic.push(port);
    }
    basic
}

pub fn provided_ports() -> PortsList {
    provided_basic_ports(Vec::new())
}

/// Behavior tree leaf driving one remote action per activation.
///
/// First tick (from `Idle`): resolve the runtime handle, open a session bounded by
/// `server_timeout`, run `on_tick`, send the goal. Following ticks: run `on_wait_for_result`,
/// resend the goal if a hook marked it updated, pump the runtime, and either return `Running`
/// or map the result code through `on_success` / `on_aborted` / `on_cancelled`.
///
/// The node holds an open session exactly while its status is `Running`. Returning a terminal
/// status or being halted closes the session and puts the node back to `Idle`.
///
/// Feedback and results are only applied when their goal id matches the active goal handle;
/// traffic for a superseded goal (after a resend) is dropped before it reaches any hook.
pub struct BtActionNode<A: ActionType, H: ActionHooks<A> = DefaultHooks> {
    tag_name: String,
    server_name: String,
    server_timeout: Duration,
    config: NodeConfig,
    hooks: H,

    status: BtStatus,
    client: Option<ActionClient<A>>,
    goal_handle: Option<GoalHandle>,
    state: GoalState<A::Goal>,
    last_result: Option<WrappedResult<A::Result>>,
    goal_result_available: bool,
}

impl<A: ActionType> BtActionNode<A, DefaultHooks> {
    pub fn with_default_hooks(
        tag_name: impl Into<String>,
        action_name: impl Into<String>,
        config: NodeConfig,
    ) -> Self {
        Self::new(tag_name, action_name, config, DefaultHooks)
    }
}

impl<A: ActionType, H: ActionHooks<A>> BtActionNode<A, H> {
    pub fn new(
        tag_name: impl Into<String>,
        action_name: impl Into<String>,
        config: NodeConfig,
        hooks: H,
    ) -> Self {
        let tag_name = tag_name.into();
        let mut server_name = action_name.into();
        if let Ok(remapped) = config.get_input::<String>(SERVER_NAME_PORT) {
            server_name = remapped;
        }
        tracing::debug!(node = %tag_name, action = A::NAME, server = %server_name, "action node initialized");

        Self {
            tag_name,
            server_name,
            server_timeout: ActionClientConfig::default().server_timeout(),
            config,
            hooks,
            status: BtStatus::Idle,
            client: None,
            goal_handle: None,
            state: GoalState::default(),
            last_result: None,
            goal_result_available: false,
        }
    }

    /// Seed the goal sent on activation (hooks may still change it in `on_tick`).
    pub fn with_goal(mut self, goal: A::Goal) -> Self {
        self.state.goal = goal;
        self
    }

    pub fn status(&self) -> BtStatus {
        self.status
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn server_timeout(&self) -> Duration {
        self.server_timeout
    }

    pub fn has_session(&self) -> bool {
        self.client.is_some()
    }

    pub fn goal(&self) -> &A::Goal {
        &self.state.goal
    }

    pub fn goal_handle(&self) -> Option<&GoalHandle> {
        self.goal_handle.as_ref()
    }

    pub fn last_result(&self) -> Option<&WrappedResult<A::Result>> {
        self.last_result.as_ref()
    }

    pub fn goal_result_available(&self) -> bool {
        self.goal_result_available
    }

    pub fn is_failure_latched(&self) -> bool {
        self.state.failure_latched
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    fn event(&self, ctx: &TickContext, tag: &'static str) -> TraceEvent {
        TraceEvent::new(ctx.tick, tag).with_node(self.tag_name.clone())
    }

    /// Idle -> Running. `Some(status)` means the activation ended on this tick.
    fn start(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> Option<BtStatus> {
        self.state.goal_updated = false;
        self.state.failure_latched = false;
        self.goal_result_available = false;
        self.last_result = None;

        let runtime: Rc<RuntimeHandle> = match blackboard.require(NODE) {
            Ok(runtime) => Rc::clone(runtime),
            Err(err) => {
                tracing::error!(node = %self.tag_name, error = %err, "action node is misconfigured");
                let event = self.event(ctx, "bt.action.missing_key");
                trace_emit(blackboard, event);
                return Some(BtStatus::Failure);
            }
        };

        let client_config = ActionClientConfig::from_node_config(&self.config, &self.tag_name);
        if let Some(name) = client_config.server_name.clone() {
            self.server_name = name;
        }
        self.server_timeout = client_config.server_timeout();

        let client = runtime.create_client::<A>(self.server_name.clone());
        tracing::info!(node = %self.tag_name, server = %self.server_name, "Waiting for action server");
        if let Err(err) = client.connect(self.server_timeout) {
            tracing::error!(
                node = %self.tag_name,
                error = %err,
                timeout_ms = client_config.server_timeout_ms,
                "Could not reach action server"
            );
            let event = self
                .event(ctx, "bt.action.server_unreachable")
                .with_a(client_config.server_timeout_ms);
            trace_emit(blackboard, event);
            return Some(BtStatus::Failure);
        }
        tracing::info!(node = %self.tag_name, server = %self.server_name, "Action server session open");

        self.client = Some(client);
        self.status = BtStatus::Running;

        {
            let mut hook_ctx = ActionContext::<A>::new(
                ctx,
                &self.tag_name,
                &self.config,
                blackboard,
                &mut self.state,
            );
            self.hooks.on_tick(&mut hook_ctx);
        }
        if self.state.failure_latched {
            return Some(self.fail(ctx, blackboard));
        }

        self.send_new_goal(ctx, blackboard);
        if self.state.failure_latched {
            return Some(self.fail(ctx, blackboard));
        }

        None
    }

    fn send_new_goal(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) {
        self.goal_result_available = false;

        let Some(client) = self.client.as_mut() else {
            self.state.failure_latched = true;
            return;
        };

        match client.send_goal(&self.state.goal, self.server_timeout) {
            Ok(handle) => {
                if let Some(prev) = self.goal_handle.as_ref() {
                    tracing::debug!(node = %self.tag_name, old = %prev.id(), new = %handle.id(), "goal superseded");
                }
                self.goal_handle = Some(handle);
                let event = self
                    .event(ctx, "bt.action.goal_sent")
                    .with_a(self.server_timeout.as_millis() as u64);
                trace_emit(blackboard, event);
            }
            Err(err) => {
                // A failed resend keeps the previous handle so the cancel path can still reach it.
                self.state.failure_latched = true;
                let tag = match err {
                    ActionError::GoalRejected { .. } => {
                        tracing::error!(node = %self.tag_name, server = %self.server_name, "Goal was rejected by action server");
                        "bt.action.goal_rejected"
                    }
                    ActionError::SendTimeout { .. } => {
                        tracing::error!(node = %self.tag_name, server = %self.server_name, "Failed to send goal to action server");
                        "bt.action.send_timeout"
                    }
                    ref other => {
                        tracing::error!(node = %self.tag_name, server = %self.server_name, error = %other, "Failed to send goal to action server");
                        "bt.action.send_failed"
                    }
                };
                let event = self.event(ctx, tag);
                trace_emit(blackboard, event);
            }
        }
    }

    /// Pump the runtime and apply whatever arrived for the active goal, in arrival order.
    fn pump(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) {
        let Some(client) = self.client.as_mut() else {
            return;
        };
        client.spin_some();

        let active = self.goal_handle.as_ref().map(GoalHandle::id);
        while !self.goal_result_available {
            let Some(message) = client.try_next() else {
                break;
            };

            // Traffic for a superseded goal shares the session stream; drop it untouched.
            if Some(message.goal_id()) != active {
                tracing::debug!(node = %self.tag_name, goal = %message.goal_id(), "dropping message for inactive goal");
                trace_emit(
                    blackboard,
                    TraceEvent::new(ctx.tick, "bt.action.stale_dropped").with_node(self.tag_name.clone()),
                );
                continue;
            }

            match message {
                SessionMessage::Feedback { payload, .. } => {
                    match serde_json::from_value::<A::Feedback>(payload) {
                        Ok(feedback) => {
                            trace_emit(
                                blackboard,
                                TraceEvent::new(ctx.tick, "bt.action.feedback").with_node(self.tag_name.clone()),
                            );
                            let mut hook_ctx = ActionContext::<A>::new(
                                ctx,
                                &self.tag_name,
                                &self.config,
                                blackboard,
                                &mut self.state,
                            );
                            self.hooks.on_feedback(&mut hook_ctx, &feedback);
                        }
                        Err(err) => {
                            tracing::warn!(node = %self.tag_name, error = %err, "dropping undecodable feedback");
                        }
                    }
                }
                SessionMessage::Result {
                    goal_id,
                    code,
                    payload,
                } => {
                    let (code, result) = match serde_json::from_value::<A::Result>(payload) {
                        Ok(result) => (code, result),
                        Err(err) => {
                            tracing::error!(node = %self.tag_name, error = %err, "undecodable action result");
                            (ResultCode::Unknown, A::Result::default())
                        }
                    };
                    trace_emit(
                        blackboard,
                        TraceEvent::new(ctx.tick, "bt.action.result")
                            .with_node(self.tag_name.clone())
                            .with_a(code.as_u64()),
                    );
                    self.last_result = Some(WrappedResult {
                        goal_id,
                        code,
                        result,
                    });
                    self.goal_result_available = true;
                }
            }
        }
    }

    fn map_result(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> BtStatus {
        let Some(result) = self.last_result.clone() else {
            return BtStatus::Failure;
        };

        let mut hook_ctx = ActionContext::<A>::new(
            ctx,
            &self.tag_name,
            &self.config,
            blackboard,
            &mut self.state,
        );
        let status = match result.code {
            ResultCode::Succeeded => self.hooks.on_success(&mut hook_ctx, &result),
            ResultCode::Aborted => self.hooks.on_aborted(&mut hook_ctx, &result),
            ResultCode::Canceled => self.hooks.on_cancelled(&mut hook_ctx, &result),
            ResultCode::Unknown => {
                tracing::error!(node = %self.tag_name, server = %self.server_name, "invalid action result code");
                BtStatus::Failure
            }
        };

        if status.is_terminal() {
            status
        } else {
            tracing::warn!(node = %self.tag_name, ?status, "result hook returned a non-terminal status, reporting Failure");
            BtStatus::Failure
        }
    }

    /// Cancel the active goal if it is still accepted or executing. Bounded by `server_timeout`.
    fn cancel_goal(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) {
        if self.status != BtStatus::Running {
            return;
        }
        let (Some(client), Some(handle)) = (self.client.as_mut(), self.goal_handle.as_ref()) else {
            return;
        };

        // The goal may have finished since the last tick; never cancel a terminal goal.
        client.spin_some();
        if !handle.status().is_active() {
            trace_emit(
                blackboard,
                TraceEvent::new(ctx.tick, "bt.action.cancel_skipped").with_node(self.tag_name.clone()),
            );
            return;
        }

        match client.cancel_goal(handle, self.server_timeout) {
            Ok(()) => {
                tracing::info!(node = %self.tag_name, server = %self.server_name, goal = %handle.id(), "Cancelled goal for action server");
                trace_emit(
                    blackboard,
                    TraceEvent::new(ctx.tick, "bt.action.cancelled").with_node(self.tag_name.clone()),
                );
            }
            Err(err) => {
                tracing::error!(node = %self.tag_name, server = %self.server_name, error = %err, "Failed to cancel action server");
                trace_emit(
                    blackboard,
                    TraceEvent::new(ctx.tick, "bt.action.cancel_failed").with_node(self.tag_name.clone()),
                );
            }
        }
    }

    fn fail(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> BtStatus {
        self.cancel_goal(ctx, blackboard);
        self.release();
        BtStatus::Failure
    }

    /// Close the session and return to `Idle`. The last result stays readable.
    fn release(&mut self) {
        self.client = None;
        self.goal_handle = None;
        self.status = BtStatus::Idle;
    }
}

impl<A: ActionType, H: ActionHooks<A>> BtNode for BtActionNode<A, H> {
    fn tick(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> BtStatus {
        if self.status == BtStatus::Idle {
            if let Some(status) = self.start(ctx, blackboard) {
                return status;
            }
        }

        if !self.goal_result_available {
            {
                let mut hook_ctx = ActionContext::<A>::new(
                    ctx,
                    &self.tag_name,
                    &self.config,
                    blackboard,
                    &mut self.state,
                );
                self.hooks.on_wait_for_result(&mut hook_ctx);
            }
            if self.state.failure_latched {
                return self.fail(ctx, blackboard);
            }

            let resend = self.state.goal_updated
                && self
                    .goal_handle
                    .as_ref()
                    .is_some_and(|h| h.status().is_active());
            if resend {
                self.state.goal_updated = false;
                self.send_new_goal(ctx, blackboard);
                if self.state.failure_latched {
                    return self.fail(ctx, blackboard);
                }
            }

            self.pump(ctx, blackboard);
            if self.state.failure_latched {
                return self.fail(ctx, blackboard);
            }

            if !self.goal_result_available {
                return BtStatus::Running;
            }
        }

        let status = self.map_result(ctx, blackboard);
        self.release();
        status
    }

    fn halt(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) {
        if self.status == BtStatus::Running {
            let event = self.event(ctx, "bt.action.halt");
            trace_emit(blackboard, event);
        }
        self.cancel_goal(ctx, blackboard);
        self.release();
    }

    fn name(&self) -> &str {
        &self.tag_name
    }
}
