//! In-process action middleware.
//!
//! [`Loopback`] pairs a [`LoopbackTransport`] (handed to a [`crate::RuntimeHandle`]) with any
//! number of scripted [`LoopbackServer`]s. Requests and server-side effects are queued and only
//! take effect when the transport is pumped, so delivery timing matches a real middleware
//! where nothing reaches the client outside `spin_some`.
//!
//! Requests the server ignores (offline, or a `Silent` policy) keep their reply channel open
//! while the client still holds the receiver, so the client observes a timeout rather than an
//! interruption. Replies nobody waits for are dropped on the next pump.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use futures::channel::oneshot;
use serde::Serialize;

use crate::goal::{GoalHandle, GoalId, GoalStatus, ResultCode};
use crate::transport::{ActionTransport, GoalSink, SessionMessage};

/// How a server answers goal requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GoalPolicy {
    #[default]
    Accept,
    Reject,
    /// Never answer.
    Silent,
}

/// How a server answers cancel requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPolicy {
    /// Acknowledge and report the goal `Canceled`, if it is still active.
    #[default]
    Accept,
    Reject,
    Silent,
}

struct ServerGoal {
    id: GoalId,
    payload: serde_json::Value,
    status: GoalStatus,
    handle: GoalHandle,
    sink: GoalSink,
}

#[derive(Default)]
struct ServerState {
    online: bool,
    goal_policy: GoalPolicy,
    cancel_policy: CancelPolicy,
    auto_finish: Option<(ResultCode, serde_json::Value)>,
    received: Vec<serde_json::Value>,
    goals: Vec<ServerGoal>,
    cancel_requests: Vec<GoalId>,
}

impl ServerState {
    fn goal_mut(&mut self, id: GoalId) -> Option<&mut ServerGoal> {
        self.goals.iter_mut().find(|g| g.id == id)
    }
}

enum Event {
    Goal {
        server: String,
        payload: serde_json::Value,
        sink: GoalSink,
        reply: oneshot::Sender<Option<GoalHandle>>,
    },
    Cancel {
        server: String,
        goal_id: GoalId,
        reply: oneshot::Sender<bool>,
    },
    Status {
        handle: GoalHandle,
        status: GoalStatus,
    },
    Deliver {
        sink: GoalSink,
        handle: GoalHandle,
        message: SessionMessage,
    },
}

#[derive(Default)]
struct Inner {
    servers: BTreeMap<String, ServerState>,
    queue: VecDeque<Event>,
    unanswered_goals: Vec<oneshot::Sender<Option<GoalHandle>>>,
    unanswered_cancels: Vec<oneshot::Sender<bool>>,
}

impl Inner {
    fn server_mut(&mut self, name: &str) -> &mut ServerState {
        self.servers.entry(name.to_owned()).or_default()
    }

    /// Queue the terminal result for `id`. Returns `false` if the goal is unknown or finished.
    fn finish(&mut self, server: &str, id: GoalId, code: ResultCode, payload: serde_json::Value) -> bool {
        let Some(goal) = self.server_mut(server).goal_mut(id) else {
            return false;
        };
        if goal.status.is_terminal() {
            return false;
        }
        goal.status = code.status();
        let event = Event::Deliver {
            sink: goal.sink.clone(),
            handle: goal.handle.clone(),
            message: SessionMessage::Result {
                goal_id: id,
                code,
                payload,
            },
        };
        self.queue.push_back(event);
        true
    }

    fn apply(&mut self, event: Event) {
        match event {
            Event::Goal {
                server,
                payload,
                sink,
                reply,
            } => {
                let state = self.server_mut(&server);
                if !state.online {
                    self.unanswered_goals.push(reply);
                    return;
                }
                state.received.push(payload.clone());
                match state.goal_policy {
                    GoalPolicy::Reject => {
                        let _ = reply.send(None);
                    }
                    GoalPolicy::Silent => self.unanswered_goals.push(reply),
                    GoalPolicy::Accept => {
                        let id = GoalId::new_v4();
                        let handle = GoalHandle::new(id);
                        state.goals.push(ServerGoal {
                            id,
                            payload,
                            status: GoalStatus::Accepted,
                            handle: handle.clone(),
                            sink,
                        });
                        let auto_finish = state.auto_finish.clone();
                        let _ = reply.send(Some(handle));
                        if let Some((code, payload)) = auto_finish {
                            self.finish(&server, id, code, payload);
                        }
                    }
                }
            }
            Event::Cancel {
                server,
                goal_id,
                reply,
            } => {
                let state = self.server_mut(&server);
                if !state.online {
                    self.unanswered_cancels.push(reply);
                    return;
                }
                state.cancel_requests.push(goal_id);
                match state.cancel_policy {
                    CancelPolicy::Reject => {
                        let _ = reply.send(false);
                    }
                    CancelPolicy::Silent => self.unanswered_cancels.push(reply),
                    CancelPolicy::Accept => {
                        let active = state
                            .goal_mut(goal_id)
                            .is_some_and(|g| g.status.is_active());
                        let _ = reply.send(active);
                        if active {
                            self.finish(&server, goal_id, ResultCode::Canceled, serde_json::Value::Null);
                        }
                    }
                }
            }
            Event::Status { handle, status } => handle.set_status(status),
            Event::Deliver {
                sink,
                handle,
                message,
            } => {
                if let SessionMessage::Result { code, .. } = &message {
                    handle.set_status(code.status());
                }
                // A closed sink means the session is gone; the message is dropped.
                sink.deliver(message);
            }
        }
    }
}

/// Shared in-process middleware. Clones refer to the same servers and queue.
#[derive(Clone, Default)]
pub struct Loopback {
    inner: Rc<RefCell<Inner>>,
}

impl Loopback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport(&self) -> LoopbackTransport {
        LoopbackTransport {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Server-side control for `name`. Servers start offline.
    pub fn server(&self, name: impl Into<String>) -> LoopbackServer {
        let name = name.into();
        self.inner.borrow_mut().server_mut(&name);
        LoopbackServer {
            name,
            inner: Rc::clone(&self.inner),
        }
    }

    /// Number of queued events not yet applied by a pump.
    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Requests left unanswered whose client may still be waiting for the reply.
    pub fn unanswered(&self) -> usize {
        let inner = self.inner.borrow();
        inner.unanswered_goals.len() + inner.unanswered_cancels.len()
    }
}

impl std::fmt::Debug for Loopback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Loopback")
            .field("servers", &inner.servers.keys().collect::<Vec<_>>())
            .field("pending", &inner.queue.len())
            .finish()
    }
}

/// Client-facing half of a [`Loopback`].
pub struct LoopbackTransport {
    inner: Rc<RefCell<Inner>>,
}

impl ActionTransport for LoopbackTransport {
    fn server_ready(&self, server: &str) -> bool {
        self.inner
            .borrow()
            .servers
            .get(server)
            .is_some_and(|s| s.online)
    }

    fn send_goal(
        &mut self,
        server: &str,
        goal: serde_json::Value,
        sink: GoalSink,
    ) -> oneshot::Receiver<Option<GoalHandle>> {
        let (reply, rx) = oneshot::channel();
        self.inner.borrow_mut().queue.push_back(Event::Goal {
            server: server.to_owned(),
            payload: goal,
            sink,
            reply,
        });
        rx
    }

    fn cancel_goal(&mut self, server: &str, goal_id: GoalId) -> oneshot::Receiver<bool> {
        let (reply, rx) = oneshot::channel();
        self.inner.borrow_mut().queue.push_back(Event::Cancel {
            server: server.to_owned(),
            goal_id,
            reply,
        });
        rx
    }

    fn spin_some(&mut self) {
        let mut inner = self.inner.borrow_mut();
        // A client that stopped waiting has dropped its receiver; forget the reply.
        inner.unanswered_goals.retain(|reply| !reply.is_canceled());
        inner.unanswered_cancels.retain(|reply| !reply.is_canceled());
        while let Some(event) = inner.queue.pop_front() {
            inner.apply(event);
        }
    }
}

/// Scripted action server living in a [`Loopback`].
///
/// Effects on the client (status changes, feedback, results) are queued and delivered on the
/// next pump; the server's own view of a goal changes immediately.
#[derive(Clone)]
pub struct LoopbackServer {
    name: String,
    inner: Rc<RefCell<Inner>>,
}

impl LoopbackServer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn go_online(&self) {
        self.inner.borrow_mut().server_mut(&self.name).online = true;
    }

    pub fn go_offline(&self) {
        self.inner.borrow_mut().server_mut(&self.name).online = false;
    }

    pub fn set_goal_policy(&self, policy: GoalPolicy) {
        self.inner.borrow_mut().server_mut(&self.name).goal_policy = policy;
    }

    pub fn set_cancel_policy(&self, policy: CancelPolicy) {
        self.inner.borrow_mut().server_mut(&self.name).cancel_policy = policy;
    }

    /// Finish every accepted goal immediately with this result (delivered in the same pump as
    /// the acceptance). `None` turns it off.
    pub fn set_auto_finish<R: Serialize>(&self, auto_finish: Option<(ResultCode, R)>) {
        let auto_finish = auto_finish.and_then(|(code, result)| {
            serde_json::to_value(result).ok().map(|payload| (code, payload))
        });
        self.inner.borrow_mut().server_mut(&self.name).auto_finish = auto_finish;
    }

    /// Most recently accepted goal that is still accepted or executing.
    pub fn active_goal(&self) -> Option<GoalId> {
        let inner = self.inner.borrow();
        inner
            .servers
            .get(&self.name)?
            .goals
            .iter()
            .rev()
            .find(|g| g.status.is_active())
            .map(|g| g.id)
    }

    /// Every accepted goal, oldest first.
    pub fn goals(&self) -> Vec<GoalId> {
        let inner = self.inner.borrow();
        inner
            .servers
            .get(&self.name)
            .map(|s| s.goals.iter().map(|g| g.id).collect())
            .unwrap_or_default()
    }

    /// Payload of every goal request that reached the server, accepted or not.
    pub fn received_goals(&self) -> Vec<serde_json::Value> {
        let inner = self.inner.borrow();
        inner
            .servers
            .get(&self.name)
            .map(|s| s.received.clone())
            .unwrap_or_default()
    }

    pub fn goal_payload(&self, id: GoalId) -> Option<serde_json::Value> {
        let inner = self.inner.borrow();
        inner
            .servers
            .get(&self.name)?
            .goals
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.payload.clone())
    }

    pub fn goal_status(&self, id: GoalId) -> Option<GoalStatus> {
        let inner = self.inner.borrow();
        inner
            .servers
            .get(&self.name)?
            .goals
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.status)
    }

    pub fn cancel_requests(&self) -> Vec<GoalId> {
        let inner = self.inner.borrow();
        inner
            .servers
            .get(&self.name)
            .map(|s| s.cancel_requests.clone())
            .unwrap_or_default()
    }

    /// Move an accepted goal to `Executing`.
    pub fn execute(&self, id: GoalId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(goal) = inner.server_mut(&self.name).goal_mut(id) else {
            return false;
        };
        if goal.status != GoalStatus::Accepted {
            return false;
        }
        goal.status = GoalStatus::Executing;
        let event = Event::Status {
            handle: goal.handle.clone(),
            status: GoalStatus::Executing,
        };
        inner.queue.push_back(event);
        true
    }

    pub fn publish_feedback<F: Serialize>(&self, id: GoalId, feedback: &F) -> bool {
        match serde_json::to_value(feedback) {
            Ok(payload) => self.publish_raw_feedback(id, payload),
            Err(err) => {
                tracing::warn!(server = %self.name, error = %err, "feedback does not serialize");
                false
            }
        }
    }

    /// Queue a feedback payload as-is, whether or not it matches the action's schema.
    pub fn publish_raw_feedback(&self, id: GoalId, payload: serde_json::Value) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(goal) = inner.server_mut(&self.name).goal_mut(id) else {
            return false;
        };
        if !goal.status.is_active() {
            return false;
        }
        let event = Event::Deliver {
            sink: goal.sink.clone(),
            handle: goal.handle.clone(),
            message: SessionMessage::Feedback { goal_id: id, payload },
        };
        inner.queue.push_back(event);
        true
    }

    pub fn succeed<R: Serialize>(&self, id: GoalId, result: &R) -> bool {
        self.finish_with(id, ResultCode::Succeeded, result)
    }

    pub fn abort<R: Serialize>(&self, id: GoalId, result: &R) -> bool {
        self.finish_with(id, ResultCode::Aborted, result)
    }

    /// Report the goal canceled without a client request.
    pub fn cancel<R: Serialize>(&self, id: GoalId, result: &R) -> bool {
        self.finish_with(id, ResultCode::Canceled, result)
    }

    /// Queue a terminal result with an arbitrary code and raw payload.
    pub fn finish(&self, id: GoalId, code: ResultCode, payload: serde_json::Value) -> bool {
        self.inner.borrow_mut().finish(&self.name, id, code, payload)
    }

    fn finish_with<R: Serialize>(&self, id: GoalId, code: ResultCode, result: &R) -> bool {
        match serde_json::to_value(result) {
            Ok(payload) => self.finish(id, code, payload),
            Err(err) => {
                tracing::warn!(server = %self.name, error = %err, "result does not serialize");
                false
            }
        }
    }
}

impl std::fmt::Debug for LoopbackServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackServer")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
