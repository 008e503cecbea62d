use crate::{Blackboard, TickContext};

/// Status of a tree node as observed by its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BtStatus {
    /// Not started, or reset by `halt`.
    #[default]
    Idle,
    Running,
    Success,
    Failure,
}

impl BtStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BtStatus::Success | BtStatus::Failure)
    }
}

pub trait BtNode: 'static {
    /// Advance the node by one slice of work. Must return promptly.
    fn tick(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> BtStatus;

    /// Interrupt the node and return it to `Idle`. Calling `halt` on an idle node is a no-op.
    fn halt(&mut self, ctx: &TickContext, blackboard: &mut Blackboard);

    fn name(&self) -> &str {
        ""
    }
}
