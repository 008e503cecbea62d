use bt_core::{Blackboard, BtNode, BtStatus, TickContext};
use bt_tools::{emit as trace_emit, TraceEvent};

/// A child returning `Idle` from `tick` is misbehaving; composites treat it as `Failure`.
fn settle(child: &dyn BtNode, status: BtStatus) -> BtStatus {
    if status == BtStatus::Idle {
        tracing::warn!(node = child.name(), "child returned Idle from tick, treating as Failure");
        return BtStatus::Failure;
    }
    status
}

fn halt_all(children: &mut [Box<dyn BtNode>], ctx: &TickContext, blackboard: &mut Blackboard) {
    for c in children.iter_mut() {
        c.halt(ctx, blackboard);
    }
}

/// Switch the remembered running child, halting the previous one if it changed.
fn note_running(
    children: &mut [Box<dyn BtNode>],
    running: &mut Option<usize>,
    i: usize,
    ctx: &TickContext,
    blackboard: &mut Blackboard,
) {
    if *running == Some(i) {
        return;
    }
    if let Some(prev) = running.take() {
        children[prev].halt(ctx, blackboard);
        trace_emit(
            blackboard,
            TraceEvent::new(ctx.tick, "bt.tree.preempt")
                .with_node(children[prev].name().to_string())
                .with_a(prev as u64)
                .with_b(i as u64),
        );
    }
    *running = Some(i);
}

/// Re-evaluates every child from the left on each tick; the first `Failure` halts the rest.
///
/// This is the composition that lets a guard condition abort a running action sibling.
pub struct ReactiveSequence {
    children: Vec<Box<dyn BtNode>>,
    running: Option<usize>,
}

impl ReactiveSequence {
    pub fn new(children: Vec<Box<dyn BtNode>>) -> Self {
        Self {
            children,
            running: None,
        }
    }
}

impl BtNode for ReactiveSequence {
    fn tick(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> BtStatus {
        for i in 0..self.children.len() {
            let raw = self.children[i].tick(ctx, blackboard);
            match settle(self.children[i].as_ref(), raw) {
                BtStatus::Failure => {
                    self.halt(ctx, blackboard);
                    return BtStatus::Failure;
                }
                BtStatus::Running => {
                    note_running(&mut self.children, &mut self.running, i, ctx, blackboard);
                    return BtStatus::Running;
                }
                BtStatus::Success | BtStatus::Idle => continue,
            }
        }

        self.halt(ctx, blackboard);
        BtStatus::Success
    }

    fn halt(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) {
        self.running = None;
        halt_all(&mut self.children, ctx, blackboard);
    }

    fn name(&self) -> &str {
        "ReactiveSequence"
    }
}

pub struct ReactiveSelector {
    children: Vec<Box<dyn BtNode>>,
    running: Option<usize>,
}

impl ReactiveSelector {
    pub fn new(children: Vec<Box<dyn BtNode>>) -> Self {
        Self {
            children,
            running: None,
        }
    }
}

impl BtNode for ReactiveSelector {
    fn tick(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> BtStatus {
        for i in 0..self.children.len() {
            let raw = self.children[i].tick(ctx, blackboard);
            match settle(self.children[i].as_ref(), raw) {
                BtStatus::Failure | BtStatus::Idle => continue,
                BtStatus::Success => {
                    self.halt(ctx, blackboard);
                    return BtStatus::Success;
                }
                BtStatus::Running => {
                    note_running(&mut self.children, &mut self.running, i, ctx, blackboard);
                    return BtStatus::Running;
                }
            }
        }

        self.halt(ctx, blackboard);
        BtStatus::Failure
    }

    fn halt(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) {
        self.running = None;
        halt_all(&mut self.children, ctx, blackboard);
    }

    fn name(&self) -> &str {
        "ReactiveSelector"
    }
}

pub struct Sequence {
    children: Vec<Box<dyn BtNode>>,
    index: usize,
}

impl Sequence {
    pub fn new(children: Vec<Box<dyn BtNode>>) -> Self {
        Self { children, index: 0 }
    }
}

impl BtNode for Sequence {
    fn tick(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> BtStatus {
        while self.index < self.children.len() {
            let child = &mut self.children[self.index];
            let raw = child.tick(ctx, blackboard);
            match settle(child.as_ref(), raw) {
                BtStatus::Running => return BtStatus::Running,
                BtStatus::Failure | BtStatus::Idle => {
                    self.halt(ctx, blackboard);
                    return BtStatus::Failure;
                }
                BtStatus::Success => self.index += 1,
            }
        }

        self.halt(ctx, blackboard);
        BtStatus::Success
    }

    fn halt(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) {
        self.index = 0;
        halt_all(&mut self.children, ctx, blackboard);
    }

    fn name(&self) -> &str {
        "Sequence"
    }
}

pub struct Selector {
    children: Vec<Box<dyn BtNode>>,
    index: usize,
}

impl Selector {
    pub fn new(children: Vec<Box<dyn BtNode>>) -> Self {
        Self { children, index: 0 }
    }
}

impl BtNode for Selector {
    fn tick(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> BtStatus {
        while self.index < self.children.len() {
            let child = &mut self.children[self.index];
            let raw = child.tick(ctx, blackboard);
            match settle(child.as_ref(), raw) {
                BtStatus::Running => return BtStatus::Running,
                BtStatus::Success => {
                    self.halt(ctx, blackboard);
                    return BtStatus::Success;
                }
                BtStatus::Failure | BtStatus::Idle => self.index += 1,
            }
        }

        self.halt(ctx, blackboard);
        BtStatus::Failure
    }

    fn halt(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) {
        self.index = 0;
        halt_all(&mut self.children, ctx, blackboard);
    }

    fn name(&self) -> &str {
        "Selector"
    }
}

/// Leaf that evaluates a predicate over the blackboard.
pub struct Condition<F> {
    cond: F,
}

impl<F> Condition<F> {
    pub fn new(cond: F) -> Self {
        Self { cond }
    }
}

impl<F> BtNode for Condition<F>
where
    F: FnMut(&TickContext, &Blackboard) -> bool + 'static,
{
    fn tick(&mut self, ctx: &TickContext, blackboard: &mut Blackboard) -> BtStatus {
        if (self.cond)(ctx, &*blackboard) {
            BtStatus::Success
        } else {
            BtStatus::Failure
        }
    }

    fn halt(&mut self, _ctx: &TickContext, _blackboard: &mut Blackboard) {}

    fn name(&self) -> &str {
        "Condition"
    }
}
