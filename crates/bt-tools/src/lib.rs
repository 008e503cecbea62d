//! Tooling primitives for behavior tree nodes.
//!
//! Nodes record what they did into the blackboard (`TRACE_LOG`) and/or a user-provided sink
//! (`TRACE_SINK`). Nothing is recorded when neither is present.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{emit, LogTraceSink, TraceEvent, TraceLog, TraceSink, TRACE_LOG, TRACE_SINK};
