//! Middleware seam.
//!
//! A transport moves type-erased (JSON) goal traffic between this process and action servers.
//! It must never call back into the tree: replies go into oneshot channels and goal traffic
//! goes into the session's [`GoalSink`], both of which are drained by the ticking thread.

use futures::channel::{mpsc, oneshot};
use futures::{FutureExt, StreamExt};

use crate::goal::{GoalHandle, GoalId, ResultCode};

/// A message addressed to one goal of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionMessage {
    Feedback {
        goal_id: GoalId,
        payload: serde_json::Value,
    },
    Result {
        goal_id: GoalId,
        code: ResultCode,
        payload: serde_json::Value,
    },
}

impl SessionMessage {
    pub fn goal_id(&self) -> GoalId {
        match self {
            SessionMessage::Feedback { goal_id, .. } | SessionMessage::Result { goal_id, .. } => {
                *goal_id
            }
        }
    }
}

/// Sending half of a session's delivery channel. Cheap to clone; one per goal sent.
#[derive(Debug, Clone)]
pub struct GoalSink {
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl GoalSink {
    pub fn channel() -> (GoalSink, GoalStream) {
        let (tx, rx) = mpsc::unbounded();
        (GoalSink { tx }, GoalStream { rx })
    }

    /// Returns `false` once the session has been closed.
    pub fn deliver(&self, message: SessionMessage) -> bool {
        self.tx.unbounded_send(message).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, owned by the client session. Messages come out in arrival order.
#[derive(Debug)]
pub struct GoalStream {
    rx: mpsc::UnboundedReceiver<SessionMessage>,
}

impl GoalStream {
    /// Next queued message, without waiting.
    pub fn try_next(&mut self) -> Option<SessionMessage> {
        self.rx.next().now_or_never().flatten()
    }
}

pub trait ActionTransport {
    /// Non-blocking discovery check.
    fn server_ready(&self, server: &str) -> bool;

    /// Issue a goal. The reply resolves to `Some(handle)` once accepted or `None` once rejected.
    /// Feedback and the result for the goal are delivered into `sink`.
    fn send_goal(
        &mut self,
        server: &str,
        goal: serde_json::Value,
        sink: GoalSink,
    ) -> oneshot::Receiver<Option<GoalHandle>>;

    /// Request cancellation. The reply resolves to whether the server accepted the request.
    fn cancel_goal(&mut self, server: &str, goal_id: GoalId) -> oneshot::Receiver<bool>;

    /// Move whatever work is pending into the reply and session channels, without blocking.
    fn spin_some(&mut self);
}
