use bt_core::{Blackboard, BtNode, BtStatus, TickContext};

/// Owns a root node and its blackboard, and ticks the root cooperatively.
///
/// After a terminal status the root is halted, so the next `tick_once` starts a fresh activation.
pub struct BehaviorTree {
    root: Box<dyn BtNode>,
    blackboard: Blackboard,
    next_tick: u64,
    last: BtStatus,
}

impl BehaviorTree {
    pub fn new(root: Box<dyn BtNode>, blackboard: Blackboard) -> Self {
        Self {
            root,
            blackboard,
            next_tick: 0,
            last: BtStatus::Idle,
        }
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    pub fn last_status(&self) -> BtStatus {
        self.last
    }

    /// Number of ticks issued so far.
    pub fn ticks(&self) -> u64 {
        self.next_tick
    }

    pub fn tick_once(&mut self) -> BtStatus {
        let ctx = TickContext::new(self.next_tick);
        self.next_tick = self.next_tick.wrapping_add(1);

        self.last = self.root.tick(&ctx, &mut self.blackboard);
        if self.last.is_terminal() {
            self.root.halt(&ctx, &mut self.blackboard);
        }
        self.last
    }

    /// Tick until the root leaves `Running`, calling `between` after every running tick.
    ///
    /// Returns `Running` if `max_ticks` is exhausted first.
    pub fn tick_while_running(
        &mut self,
        max_ticks: u64,
        mut between: impl FnMut(u64, &mut Blackboard),
    ) -> BtStatus {
        for n in 0..max_ticks {
            let status = self.tick_once();
            if status != BtStatus::Running {
                return status;
            }
            between(n, &mut self.blackboard);
        }
        BtStatus::Running
    }

    pub fn halt(&mut self) {
        let ctx = TickContext::new(self.next_tick);
        self.root.halt(&ctx, &mut self.blackboard);
        self.last = BtStatus::Idle;
    }
}
