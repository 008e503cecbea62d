//! Bridge between a cooperatively ticked behavior tree and a long-running remote action
//! protocol (send goal, stream feedback, observe result, cancel).
//!
//! - [`BtActionNode`] is the leaf: it opens an [`ActionClient`] session on its first tick,
//!   sends the goal, returns `Running` while the goal executes and maps the terminal result
//!   code to a tree status. Per-action behavior is supplied through [`ActionHooks`].
//! - [`RequirementGuard`] evaluates an action's requirement tree from the shared
//!   [`ActionMap`] against a [`ProblemClient`].
//!
//! Everything runs on the ticking thread. Middleware callbacks are delivered when the
//! [`RuntimeHandle`] is pumped, which the leaf does during its own tick.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action_map;
pub mod client;
pub mod config;
pub mod error;
pub mod goal;
pub mod guard;
pub mod hooks;
pub mod keys;
pub mod loopback;
pub mod node;
pub mod problem;
pub mod requirement;
pub mod runtime;
pub mod schema;
pub mod transport;

pub use action_map::{
    new_action_map, ActionExecutionInfo, ActionInfo, ActionMap, DurativeAction, SnapAction,
};
pub use client::ActionClient;
pub use config::ActionClientConfig;
pub use error::{ActionError, Result};
pub use goal::{GoalHandle, GoalId, GoalStatus, ResultCode, WrappedResult};
pub use guard::{RequirementGuard, RequirementPhase};
pub use hooks::{ActionContext, ActionHooks, DefaultHooks};
pub use keys::{ACTION_MAP, NODE, NUMBER_RECOVERIES, PROBLEM_CLIENT};
pub use loopback::{CancelPolicy, GoalPolicy, Loopback, LoopbackServer, LoopbackTransport};
pub use node::{provided_basic_ports, provided_ports, BtActionNode};
pub use problem::{ProblemClient, WorldState};
pub use requirement::{
    holds, Comparison, Cond, Function, NodeKind, Predicate, RequirementTree, TreeNode,
};
pub use runtime::{RuntimeHandle, SpinOutcome};
pub use schema::ActionType;
pub use transport::{ActionTransport, GoalSink, GoalStream, SessionMessage};
