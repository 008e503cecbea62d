use std::fmt::Display;
use std::str::FromStr;

use bt_core::{Blackboard, BtError, BtStatus, NodeConfig, TickContext};

use crate::goal::WrappedResult;
use crate::keys::NUMBER_RECOVERIES;
use crate::schema::ActionType;

/// Goal and the two flags hooks use to talk back to the node.
#[derive(Debug, Clone, Default)]
pub(crate) struct GoalState<G> {
    pub(crate) goal: G,
    pub(crate) goal_updated: bool,
    pub(crate) failure_latched: bool,
}

/// What a hook may see and change while the node is ticking.
pub struct ActionContext<'a, A: ActionType> {
    tick: &'a TickContext,
    tag_name: &'a str,
    config: &'a NodeConfig,
    blackboard: &'a mut Blackboard,
    state: &'a mut GoalState<A::Goal>,
}

impl<'a, A: ActionType> ActionContext<'a, A> {
    pub(crate) fn new(
        tick: &'a TickContext,
        tag_name: &'a str,
        config: &'a NodeConfig,
        blackboard: &'a mut Blackboard,
        state: &'a mut GoalState<A::Goal>,
    ) -> Self {
        Self {
            tick,
            tag_name,
            config,
            blackboard,
            state,
        }
    }

    pub fn tick(&self) -> &TickContext {
        self.tick
    }

    pub fn tag_name(&self) -> &str {
        self.tag_name
    }

    pub fn get_input<T>(&self, name: &str) -> Result<T, BtError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.config.get_input(name)
    }

    pub fn blackboard(&self) -> &Blackboard {
        self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        self.blackboard
    }

    pub fn goal(&self) -> &A::Goal {
        &self.state.goal
    }

    /// Edit the goal in place. Takes effect on the next send; call
    /// [`ActionContext::mark_goal_updated`] to have a running goal resent.
    pub fn goal_mut(&mut self) -> &mut A::Goal {
        &mut self.state.goal
    }

    pub fn set_goal(&mut self, goal: A::Goal) {
        self.state.goal = goal;
    }

    /// Ask the node to resend the current goal on its next running tick.
    pub fn mark_goal_updated(&mut self) {
        self.state.goal_updated = true;
    }

    pub fn goal_updated(&self) -> bool {
        self.state.goal_updated
    }

    /// Latch failure: the node cancels the goal and reports `Failure` at its next check.
    pub fn fail(&mut self) {
        self.state.failure_latched = true;
    }

    pub fn is_failure_latched(&self) -> bool {
        self.state.failure_latched
    }

    /// Bump `number_recoveries` on the blackboard and return the new value.
    pub fn increment_recovery_count(&mut self) -> u32 {
        let next = self
            .blackboard
            .get(NUMBER_RECOVERIES)
            .copied()
            .unwrap_or(0)
            .saturating_add(1);
        self.blackboard.set(NUMBER_RECOVERIES, next);
        next
    }
}

/// Per-action behavior plugged into [`crate::BtActionNode`].
///
/// Every method has a default; implement only what the action needs. Hooks run on the ticking
/// thread and must return promptly. To abort, call [`ActionContext::fail`] rather than
/// panicking.
pub trait ActionHooks<A: ActionType>: 'static {
    /// Before the goal is first sent. May fill in the goal or latch failure.
    fn on_tick(&mut self, _ctx: &mut ActionContext<'_, A>) {}

    /// For each feedback message of the active goal.
    fn on_feedback(&mut self, _ctx: &mut ActionContext<'_, A>, _feedback: &A::Feedback) {}

    /// Once per running tick while no result has arrived.
    fn on_wait_for_result(&mut self, _ctx: &mut ActionContext<'_, A>) {}

    fn on_success(
        &mut self,
        _ctx: &mut ActionContext<'_, A>,
        _result: &WrappedResult<A::Result>,
    ) -> BtStatus {
        BtStatus::Success
    }

    fn on_aborted(
        &mut self,
        _ctx: &mut ActionContext<'_, A>,
        _result: &WrappedResult<A::Result>,
    ) -> BtStatus {
        BtStatus::Failure
    }

    /// Cancellation counts as a cooperative early exit by default.
    fn on_cancelled(
        &mut self,
        _ctx: &mut ActionContext<'_, A>,
        _result: &WrappedResult<A::Result>,
    ) -> BtStatus {
        BtStatus::Success
    }
}

/// Hooks with every default: send the default goal, map results as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl<A: ActionType> ActionHooks<A> for DefaultHooks {}
