use std::cell::RefCell;
use std::rc::Rc;

use bt_core::Blackboard;
use bt_tools::{emit, LogTraceSink, TraceEvent, TraceLog, TraceSink, TRACE_LOG, TRACE_SINK};

#[derive(Clone, Default)]
struct RcSink(Rc<RefCell<Vec<TraceEvent>>>);

impl TraceSink for RcSink {
    fn emit(&mut self, event: TraceEvent) {
        self.0.borrow_mut().push(event);
    }
}

#[test]
fn emit_is_a_noop_without_log_or_sink() {
    let mut bb = Blackboard::new();
    emit(&mut bb, TraceEvent::new(0, "ignored"));
    assert!(bb.is_empty());
}

#[test]
fn emit_writes_to_trace_log_when_present() {
    let mut bb = Blackboard::new();
    bb.set(TRACE_LOG, TraceLog::default());

    emit(
        &mut bb,
        TraceEvent::new(1, "bt.action.goal_sent")
            .with_node("navigate")
            .with_a(10)
            .with_b(20),
    );

    let log = bb.get(TRACE_LOG).unwrap();
    assert_eq!(log.events.len(), 1);
    assert_eq!(log.events[0].tick, 1);
    assert_eq!(log.events[0].tag, "bt.action.goal_sent");
    assert_eq!(log.events[0].node, "navigate");
    assert_eq!(log.events[0].a, 10);
    assert_eq!(log.events[0].b, 20);
    assert_eq!(log.count("bt.action.goal_sent"), 1);
}

#[test]
fn emit_writes_to_both_log_and_sink_when_both_present() {
    let mut bb = Blackboard::new();
    bb.set(TRACE_LOG, TraceLog::default());

    let handle = RcSink::default();
    let shared = handle.0.clone();
    bb.set(TRACE_SINK, Box::new(handle) as Box<dyn TraceSink>);

    emit(&mut bb, TraceEvent::new(3, "both"));
    emit(&mut bb, TraceEvent::new(4, "again"));

    let log = bb.get(TRACE_LOG).unwrap();
    assert_eq!(log.tags(), vec!["both", "again"]);

    let events = shared.borrow();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].tick, 4);
}

#[test]
fn log_can_be_filtered_by_node() {
    let mut log = TraceLog::default();
    log.push(TraceEvent::new(0, "bt.guard.ok").with_node("CheckOverAllReq"));
    log.push(TraceEvent::new(0, "bt.action.goal_sent").with_node("MoveTo"));
    log.push(TraceEvent::new(1, "bt.guard.failed").with_node("CheckOverAllReq"));

    let guard: Vec<_> = log.for_node("CheckOverAllReq").map(|e| e.tick).collect();
    assert_eq!(guard, vec![0, 1]);
    assert_eq!(log.last().map(|e| e.tag.as_ref()), Some("bt.guard.failed"));
}

#[test]
fn log_sink_accepts_events_without_a_subscriber() {
    let mut bb = Blackboard::new();
    bb.set(TRACE_SINK, Box::new(LogTraceSink) as Box<dyn TraceSink>);
    emit(&mut bb, TraceEvent::new(7, "bt.action.halt").with_node("MoveTo"));
    assert!(!bb.contains(TRACE_LOG));
}
