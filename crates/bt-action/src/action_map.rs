use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::guard::RequirementPhase;
use crate::requirement::RequirementTree;

/// An instantaneous action: one precondition set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapAction {
    pub name: String,
    pub parameters: Vec<String>,
    pub preconditions: RequirementTree,
}

/// A temporally extended action: separate requirements at start, throughout, and at end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurativeAction {
    pub name: String,
    pub parameters: Vec<String>,
    pub at_start_requirements: RequirementTree,
    pub over_all_requirements: RequirementTree,
    pub at_end_requirements: RequirementTree,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum ActionInfo {
    #[default]
    Unset,
    Snap(SnapAction),
    Durative(DurativeAction),
}

/// One entry of the plan executor's action map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionExecutionInfo {
    pub action: ActionInfo,
    /// Human-readable reason the action could not run, written by guards.
    pub execution_error_info: String,
}

impl ActionExecutionInfo {
    pub fn snap(action: SnapAction) -> Self {
        Self {
            action: ActionInfo::Snap(action),
            execution_error_info: String::new(),
        }
    }

    pub fn durative(action: DurativeAction) -> Self {
        Self {
            action: ActionInfo::Durative(action),
            execution_error_info: String::new(),
        }
    }

    /// The requirement set that applies in `phase`, if the action has one.
    pub fn requirements(&self, phase: RequirementPhase) -> Option<&RequirementTree> {
        match (&self.action, phase) {
            (ActionInfo::Snap(a), RequirementPhase::AtStart | RequirementPhase::OverAll) => {
                Some(&a.preconditions)
            }
            (ActionInfo::Snap(_), RequirementPhase::AtEnd) => None,
            (ActionInfo::Durative(a), RequirementPhase::AtStart) => Some(&a.at_start_requirements),
            (ActionInfo::Durative(a), RequirementPhase::OverAll) => Some(&a.over_all_requirements),
            (ActionInfo::Durative(a), RequirementPhase::AtEnd) => Some(&a.at_end_requirements),
            (ActionInfo::Unset, _) => None,
        }
    }
}

/// Owned by the plan executor; nodes only read it (guards also write `execution_error_info`).
/// Entries are inserted and removed between ticks.
pub type ActionMap = Rc<RefCell<BTreeMap<String, ActionExecutionInfo>>>;

pub fn new_action_map() -> ActionMap {
    Rc::new(RefCell::new(BTreeMap::new()))
}
