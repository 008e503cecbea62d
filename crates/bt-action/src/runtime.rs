use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use futures::channel::oneshot;
use futures::FutureExt;

use crate::client::ActionClient;
use crate::goal::{GoalHandle, GoalId};
use crate::schema::ActionType;
use crate::transport::{ActionTransport, GoalSink};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Outcome of a bounded wait on a pending reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpinOutcome<T> {
    Complete(T),
    Timeout,
    /// The transport dropped the reply channel.
    Interrupted,
}

/// Handle to the hosting runtime (blackboard entry `"node"`).
///
/// Owns the transport and acts as the cooperative dispatcher: nothing is delivered to any
/// session until somebody pumps it with [`RuntimeHandle::spin_some`] or one of the bounded
/// waits.
pub struct RuntimeHandle {
    name: String,
    transport: RefCell<Box<dyn ActionTransport>>,
    poll_interval: Duration,
}

impl RuntimeHandle {
    pub fn new(name: impl Into<String>, transport: impl ActionTransport + 'static) -> Self {
        Self {
            name: name.into(),
            transport: RefCell::new(Box::new(transport)),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spin_some(&self) {
        self.transport.borrow_mut().spin_some();
    }

    pub fn server_ready(&self, server: &str) -> bool {
        self.transport.borrow().server_ready(server)
    }

    pub fn wait_for_server(&self, server: &str, timeout: Duration) -> bool {
        self.spin_until(timeout, |rt| rt.server_ready(server).then_some(()))
            .is_some()
    }

    /// Pump until `rx` resolves or `timeout` elapses. A zero timeout makes exactly one attempt.
    pub fn spin_until_complete<T>(
        &self,
        rx: &mut oneshot::Receiver<T>,
        timeout: Duration,
    ) -> SpinOutcome<T> {
        let outcome = self.spin_until(timeout, |_| match (&mut *rx).now_or_never() {
            Some(Ok(value)) => Some(Ok(value)),
            Some(Err(oneshot::Canceled)) => Some(Err(())),
            None => None,
        });
        match outcome {
            Some(Ok(value)) => SpinOutcome::Complete(value),
            Some(Err(())) => SpinOutcome::Interrupted,
            None => SpinOutcome::Timeout,
        }
    }

    pub fn create_client<A: ActionType>(self: &Rc<Self>, server: impl Into<String>) -> ActionClient<A> {
        ActionClient::new(Rc::clone(self), server.into())
    }

    pub(crate) fn send_goal(
        &self,
        server: &str,
        goal: serde_json::Value,
        sink: GoalSink,
    ) -> oneshot::Receiver<Option<GoalHandle>> {
        self.transport.borrow_mut().send_goal(server, goal, sink)
    }

    pub(crate) fn cancel_goal(&self, server: &str, goal_id: GoalId) -> oneshot::Receiver<bool> {
        self.transport.borrow_mut().cancel_goal(server, goal_id)
    }

    fn spin_until<T>(&self, timeout: Duration, mut poll: impl FnMut(&Self) -> Option<T>) -> Option<T> {
        let deadline = Instant::now() + timeout;
        loop {
            self.spin_some();
            if let Some(value) = poll(self) {
                return Some(value);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            std::thread::sleep(self.poll_interval.min(deadline - now));
        }
    }
}

impl std::fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("name", &self.name)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
