mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bt_action::{ActionContext, ActionHooks, BtActionNode, WrappedResult, NUMBER_RECOVERIES};
use bt_core::BtStatus;
use common::{config, goal, Fixture, Navigate, NavigateFeedback, NavigateResult, SERVER};
use serde_json::json;

#[derive(Default)]
struct Script {
    fail_on_tick: bool,
    fail_on_feedback: bool,
    retarget: Rc<Cell<Option<&'static str>>>,
    feedback: Rc<RefCell<Vec<f64>>>,
    waits: Rc<Cell<u32>>,
    on_success: Option<BtStatus>,
    on_cancelled: Option<BtStatus>,
    recoveries_seen: Rc<RefCell<Vec<u32>>>,
}

impl ActionHooks<Navigate> for Script {
    fn on_tick(&mut self, ctx: &mut ActionContext<'_, Navigate>) {
        if self.fail_on_tick {
            ctx.fail();
            return;
        }
        ctx.goal_mut().target.push_str("/map");
    }

    fn on_feedback(&mut self, ctx: &mut ActionContext<'_, Navigate>, feedback: &NavigateFeedback) {
        self.feedback.borrow_mut().push(feedback.distance_remaining);
        if self.fail_on_feedback {
            ctx.fail();
        }
    }

    fn on_wait_for_result(&mut self, ctx: &mut ActionContext<'_, Navigate>) {
        self.waits.set(self.waits.get() + 1);
        if let Some(target) = self.retarget.take() {
            ctx.set_goal(goal(target));
            ctx.mark_goal_updated();
        }
    }

    fn on_success(
        &mut self,
        _ctx: &mut ActionContext<'_, Navigate>,
        _result: &WrappedResult<NavigateResult>,
    ) -> BtStatus {
        self.on_success.unwrap_or(BtStatus::Success)
    }

    fn on_aborted(
        &mut self,
        ctx: &mut ActionContext<'_, Navigate>,
        _result: &WrappedResult<NavigateResult>,
    ) -> BtStatus {
        let n = ctx.increment_recovery_count();
        self.recoveries_seen.borrow_mut().push(n);
        BtStatus::Failure
    }

    fn on_cancelled(
        &mut self,
        _ctx: &mut ActionContext<'_, Navigate>,
        _result: &WrappedResult<NavigateResult>,
    ) -> BtStatus {
        self.on_cancelled.unwrap_or(BtStatus::Success)
    }
}

fn scripted(script: Script) -> BtActionNode<Navigate, Script> {
    BtActionNode::new("MoveTo", SERVER, config(100), script).with_goal(goal("kitchen"))
}

#[test]
fn on_tick_edits_the_goal_before_it_is_sent() {
    let mut fx = Fixture::new();
    let mut node = scripted(Script::default());

    assert_eq!(fx.tick(&mut node), BtStatus::Running);
    assert_eq!(
        fx.server.received_goals(),
        vec![json!({ "target": "kitchen/map" })]
    );
    assert_eq!(node.hooks().waits.get(), 1);
}

#[test]
fn failure_latched_in_on_tick_sends_nothing() {
    let mut fx = Fixture::new();
    let mut node = scripted(Script {
        fail_on_tick: true,
        ..Script::default()
    });

    assert_eq!(fx.tick(&mut node), BtStatus::Failure);
    assert!(fx.server.received_goals().is_empty());
    assert!(fx.server.cancel_requests().is_empty());
    assert_eq!(node.status(), BtStatus::Idle);
    assert!(node.is_failure_latched());

    // The latch is per activation.
    node.hooks_mut().fail_on_tick = false;
    assert_eq!(fx.tick(&mut node), BtStatus::Running);
    assert!(!node.is_failure_latched());
}

#[test]
fn failure_latched_in_on_feedback_cancels_the_goal() {
    let mut fx = Fixture::new();
    let mut node = scripted(Script {
        fail_on_feedback: true,
        ..Script::default()
    });

    fx.tick(&mut node);
    let id = fx.active_goal();
    fx.server.publish_feedback(id, &NavigateFeedback { distance_remaining: 9.0 });

    assert_eq!(fx.tick(&mut node), BtStatus::Failure);
    assert_eq!(fx.server.cancel_requests(), vec![id]);
    assert_eq!(node.status(), BtStatus::Idle);
}

#[test]
fn resend_drops_feedback_and_results_of_the_superseded_goal() {
    let mut fx = Fixture::new();
    let script = Script::default();
    let retarget = Rc::clone(&script.retarget);
    let feedback = Rc::clone(&script.feedback);
    let mut node = scripted(script);

    assert_eq!(fx.tick(&mut node), BtStatus::Running);
    let old = fx.active_goal();

    // Feedback for the old goal is queued ahead of the resend and delivered during it.
    fx.server.publish_feedback(old, &NavigateFeedback { distance_remaining: 5.0 });
    retarget.set(Some("garage"));
    assert_eq!(fx.tick(&mut node), BtStatus::Running);

    let new = fx.active_goal();
    assert_ne!(old, new);
    assert_eq!(node.goal_handle().map(|h| h.id()), Some(new));
    assert_eq!(fx.server.goal_payload(new), Some(json!({ "target": "garage" })));
    assert!(feedback.borrow().is_empty());

    fx.server.publish_feedback(old, &NavigateFeedback { distance_remaining: 4.0 });
    fx.server.publish_feedback(new, &NavigateFeedback { distance_remaining: 1.0 });
    assert_eq!(fx.tick(&mut node), BtStatus::Running);
    assert_eq!(*feedback.borrow(), vec![1.0]);

    fx.server.abort(old, &NavigateResult::default());
    assert_eq!(fx.tick(&mut node), BtStatus::Running);

    fx.server.succeed(new, &NavigateResult { reached: true });
    assert_eq!(fx.tick(&mut node), BtStatus::Success);
    assert_eq!(node.last_result().map(|r| r.goal_id), Some(new));
    assert_eq!(fx.trace_count("bt.action.stale_dropped"), 3);
    assert_eq!(fx.trace_count("bt.action.goal_sent"), 2);
}

#[test]
fn goal_update_is_ignored_once_the_goal_is_no_longer_active() {
    let mut fx = Fixture::new();
    let script = Script::default();
    let retarget = Rc::clone(&script.retarget);
    let mut node = scripted(script);

    fx.tick(&mut node);
    let id = fx.active_goal();
    fx.server.succeed(id, &NavigateResult { reached: true });
    // Deliver the result so the handle is terminal before the hook asks for a resend.
    fx.tick(&mut node);

    assert_eq!(fx.tick(&mut node), BtStatus::Running);
    let second = fx.active_goal();
    fx.server.succeed(second, &NavigateResult { reached: true });
    fx.blackboard
        .get(bt_action::NODE)
        .expect("runtime handle")
        .spin_some();
    retarget.set(Some("garage"));

    assert_eq!(fx.tick(&mut node), BtStatus::Success);
    assert_eq!(fx.server.goals().len(), 2);
}

#[test]
fn recovery_counter_is_created_and_incremented() {
    let mut fx = Fixture::new();
    let script = Script::default();
    let seen = Rc::clone(&script.recoveries_seen);
    let mut node = scripted(script);
    assert!(fx.blackboard.get(NUMBER_RECOVERIES).is_none());

    for _ in 0..2 {
        assert_eq!(fx.tick(&mut node), BtStatus::Running);
        let id = fx.active_goal();
        fx.server.abort(id, &NavigateResult::default());
        assert_eq!(fx.tick(&mut node), BtStatus::Failure);
    }

    assert_eq!(*seen.borrow(), vec![1, 2]);
    assert_eq!(fx.blackboard.get(NUMBER_RECOVERIES).copied(), Some(2));
}

#[test]
fn on_cancelled_can_report_failure() {
    let mut fx = Fixture::new();
    let mut node = scripted(Script {
        on_cancelled: Some(BtStatus::Failure),
        ..Script::default()
    });

    fx.tick(&mut node);
    let id = fx.active_goal();
    fx.server.cancel(id, &NavigateResult::default());
    assert_eq!(fx.tick(&mut node), BtStatus::Failure);
}

#[test]
fn non_terminal_hook_status_becomes_failure() {
    let mut fx = Fixture::new();
    let mut node = scripted(Script {
        on_success: Some(BtStatus::Running),
        ..Script::default()
    });

    fx.tick(&mut node);
    let id = fx.active_goal();
    fx.server.succeed(id, &NavigateResult { reached: true });
    assert_eq!(fx.tick(&mut node), BtStatus::Failure);
    assert_eq!(node.status(), BtStatus::Idle);
}
