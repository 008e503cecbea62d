use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GoalId(Uuid);

impl GoalId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Server-side state of a goal, as last reported to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GoalStatus {
    #[default]
    Unknown,
    Accepted,
    Executing,
    Canceling,
    Succeeded,
    Aborted,
    Canceled,
}

impl GoalStatus {
    /// Accepted or executing: the only states in which a goal may be updated or canceled.
    pub fn is_active(self) -> bool {
        matches!(self, GoalStatus::Accepted | GoalStatus::Executing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GoalStatus::Succeeded | GoalStatus::Aborted | GoalStatus::Canceled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultCode {
    Succeeded,
    Aborted,
    Canceled,
    Unknown,
}

impl ResultCode {
    pub fn as_u64(self) -> u64 {
        match self {
            ResultCode::Succeeded => 4,
            ResultCode::Canceled => 5,
            ResultCode::Aborted => 6,
            ResultCode::Unknown => 0,
        }
    }

    /// Goal status implied by a terminal result.
    pub fn status(self) -> GoalStatus {
        match self {
            ResultCode::Succeeded => GoalStatus::Succeeded,
            ResultCode::Aborted => GoalStatus::Aborted,
            ResultCode::Canceled => GoalStatus::Canceled,
            ResultCode::Unknown => GoalStatus::Unknown,
        }
    }
}

/// Reference to an accepted goal.
///
/// The status cell is shared with the transport, which updates it as status messages are
/// pumped. Clones observe the same status.
#[derive(Debug, Clone)]
pub struct GoalHandle {
    id: GoalId,
    status: Rc<Cell<GoalStatus>>,
}

impl GoalHandle {
    pub fn new(id: GoalId) -> Self {
        Self {
            id,
            status: Rc::new(Cell::new(GoalStatus::Accepted)),
        }
    }

    pub fn id(&self) -> GoalId {
        self.id
    }

    pub fn status(&self) -> GoalStatus {
        self.status.get()
    }

    pub fn set_status(&self, status: GoalStatus) {
        self.status.set(status);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrappedResult<R> {
    pub goal_id: GoalId,
    pub code: ResultCode,
    pub result: R,
}
