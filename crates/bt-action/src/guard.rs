//! Requirement guards: condition leaves that check one phase of an action's requirements
//! against the current world state.

use std::fmt;
use std::rc::Rc;

use bt_core::{Blackboard, BtError, BtNode, BtStatus, NodeConfig, PortInfo, PortsList, TickContext};
use bt_tools::{emit as trace_emit, TraceEvent};

use crate::action_map::ActionMap;
use crate::keys::{ACTION_MAP, PROBLEM_CLIENT};
use crate::problem::ProblemClient;
use crate::requirement::{holds, RequirementTree};

pub const ACTION_PORT: &str = "action";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequirementPhase {
    AtStart,
    OverAll,
    AtEnd,
}

impl RequirementPhase {
    pub fn label(self) -> &'static str {
        match self {
            RequirementPhase::AtStart => "at start",
            RequirementPhase::OverAll => "over all",
            RequirementPhase::AtEnd => "at end",
        }
    }
}

impl fmt::Display for RequirementPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Succeeds while the `action` port's requirements for `phase` hold; fails otherwise.
///
/// The action map and problem client are looked up on the blackboard at every tick. On failure
/// the guard records a reason in the action's `execution_error_info`.
pub struct RequirementGuard {
    tag_name: String,
    phase: RequirementPhase,
    config: NodeConfig,
}

impl RequirementGuard {
    pub fn new(tag_name: impl Into<String>, phase: RequirementPhase, config: NodeConfig) -> Self {
        Self {
            tag_name: tag_name.into(),
            phase,
            config,
        }
    }

    pub fn at_start(tag_name: impl Into<String>, config: NodeConfig) -> Self {
        Self::new(tag_name, RequirementPhase::AtStart, config)
    }

    pub fn over_all(tag_name: impl Into<String>, config: NodeConfig) -> Self {
        Self::new(tag_name, RequirementPhase::OverAll, config)
    }

    pub fn at_end(tag_name: impl Into<String>, config: NodeConfig) -> Self {
        Self::new(tag_name, RequirementPhase::AtEnd, config)
    }

    pub fn provided_ports() -> PortsList {
        vec![PortInfo::input(ACTION_PORT, "Action whose requirements are checked")]
    }

    pub fn phase(&self) -> RequirementPhase {
        self.phase
    }

    /// Both entries are read on every tick, so the executor may replace them between ticks.
    fn resolve(blackboard: &Blackboard) -> Result<(ActionMap, Rc<dyn ProblemClient>), BtError> {
        let action_map = Rc::clone(blackboard.require(ACTION_MAP)?);
        let problem_client = Rc::clone(blackboard.require(PROBLEM_CLIENT)?);
        Ok((action_map, problem_client))
    }

    fn check(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> Result<BtStatus, BtError> {
        let (action_map, problem_client) = Self::resolve(blackboard)?;
        let action: String = self.config.get_input(ACTION_PORT)?;

        let requirements = action_map
            .borrow()
            .get(&action)
            .and_then(|info| info.requirements(self.phase).cloned())
            .unwrap_or_else(RequirementTree::empty);

        if holds(&requirements, problem_client.as_ref()) {
            trace_emit(
                blackboard,
                TraceEvent::new(ctx.tick, "bt.guard.ok").with_node(self.tag_name.clone()),
            );
            return Ok(BtStatus::Success);
        }

        if let Some(info) = action_map.borrow_mut().get_mut(&action) {
            info.execution_error_info = format!("Error checking {} requirements", self.phase);
        }
        tracing::error!(
            node = %self.tag_name,
            "[{action}] Error checking {} requirements",
            self.phase
        );
        tracing::error!(node = %self.tag_name, "[{action}] info: {requirements}");
        trace_emit(
            blackboard,
            TraceEvent::new(ctx.tick, "bt.guard.failed").with_node(self.tag_name.clone()),
        );
        Ok(BtStatus::Failure)
    }
}

impl BtNode for RequirementGuard {
    fn tick(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> BtStatus {
        match self.check(ctx, blackboard) {
            Ok(status) => status,
            Err(err) => {
                tracing::error!(node = %self.tag_name, error = %err, "requirement guard is misconfigured");
                trace_emit(
                    blackboard,
                    TraceEvent::new(ctx.tick, "bt.guard.misconfigured").with_node(self.tag_name.clone()),
                );
                BtStatus::Failure
            }
        }
    }

    fn halt(&mut self, _ctx: &TickContext, _blackboard: &mut Blackboard) {}

    fn name(&self) -> &str {
        &self.tag_name
    }
}
