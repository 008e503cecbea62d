//! Blackboard entries shared between the plan executor and the nodes in this crate.

use std::rc::Rc;

use bt_core::BbKey;

use crate::action_map::ActionMap;
use crate::problem::ProblemClient;
use crate::runtime::RuntimeHandle;

pub const NODE: BbKey<Rc<RuntimeHandle>> = BbKey::new("node");
pub const ACTION_MAP: BbKey<ActionMap> = BbKey::new("action_map");
pub const PROBLEM_CLIENT: BbKey<Rc<dyn ProblemClient>> = BbKey::new("problem_client");
/// Never decreases over the life of a tree; only incremented.
pub const NUMBER_RECOVERIES: BbKey<u32> = BbKey::new("number_recoveries");
