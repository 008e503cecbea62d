use std::marker::PhantomData;
use std::rc::Rc;
use std::time::Duration;

use futures::channel::oneshot;

use crate::error::{ActionError, Result};
use crate::goal::GoalHandle;
use crate::runtime::{RuntimeHandle, SpinOutcome};
use crate::schema::ActionType;
use crate::transport::{GoalSink, GoalStream, SessionMessage};

/// A session with one named action server.
///
/// Every goal sent through the session delivers into the same stream; callers tell goals apart
/// by [`SessionMessage::goal_id`]. Dropping the session closes the stream, so late traffic for
/// its goals is discarded by the transport.
pub struct ActionClient<A: ActionType> {
    server: String,
    runtime: Rc<RuntimeHandle>,
    sink: GoalSink,
    stream: GoalStream,
    _schema: PhantomData<fn() -> A>,
}

impl<A: ActionType> ActionClient<A> {
    pub(crate) fn new(runtime: Rc<RuntimeHandle>, server: String) -> Self {
        let (sink, stream) = GoalSink::channel();
        Self {
            server,
            runtime,
            sink,
            stream,
            _schema: PhantomData,
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server
    }

    pub fn runtime(&self) -> &Rc<RuntimeHandle> {
        &self.runtime
    }

    pub fn wait_for_server(&self, timeout: Duration) -> bool {
        self.runtime.wait_for_server(&self.server, timeout)
    }

    /// Like [`ActionClient::wait_for_server`], as an error.
    pub fn connect(&self, timeout: Duration) -> Result<()> {
        if self.wait_for_server(timeout) {
            Ok(())
        } else {
            Err(ActionError::ServerUnavailable {
                server: self.server.clone(),
            })
        }
    }

    pub fn spin_some(&self) {
        self.runtime.spin_some();
    }

    pub fn async_send_goal(&mut self, goal: &A::Goal) -> Result<oneshot::Receiver<Option<GoalHandle>>> {
        let payload = serde_json::to_value(goal)?;
        Ok(self
            .runtime
            .send_goal(&self.server, payload, self.sink.clone()))
    }

    /// Send a goal and wait at most `timeout` for the server to accept or reject it.
    pub fn send_goal(&mut self, goal: &A::Goal, timeout: Duration) -> Result<GoalHandle> {
        let mut pending = self.async_send_goal(goal)?;
        match self.runtime.spin_until_complete(&mut pending, timeout) {
            SpinOutcome::Complete(Some(handle)) => Ok(handle),
            SpinOutcome::Complete(None) => Err(ActionError::GoalRejected {
                server: self.server.clone(),
            }),
            SpinOutcome::Timeout => Err(ActionError::SendTimeout {
                server: self.server.clone(),
            }),
            SpinOutcome::Interrupted => Err(ActionError::Interrupted {
                server: self.server.clone(),
            }),
        }
    }

    pub fn async_cancel_goal(&mut self, handle: &GoalHandle) -> oneshot::Receiver<bool> {
        self.runtime.cancel_goal(&self.server, handle.id())
    }

    /// Request cancellation and wait at most `timeout` for the acknowledgement.
    pub fn cancel_goal(&mut self, handle: &GoalHandle, timeout: Duration) -> Result<()> {
        let mut pending = self.async_cancel_goal(handle);
        match self.runtime.spin_until_complete(&mut pending, timeout) {
            SpinOutcome::Complete(true) => Ok(()),
            SpinOutcome::Complete(false) => Err(ActionError::CancelRejected {
                server: self.server.clone(),
            }),
            SpinOutcome::Timeout => Err(ActionError::CancelTimeout {
                server: self.server.clone(),
            }),
            SpinOutcome::Interrupted => Err(ActionError::Interrupted {
                server: self.server.clone(),
            }),
        }
    }

    /// Next already-delivered message, if any. Does not pump the runtime.
    pub fn try_next(&mut self) -> Option<SessionMessage> {
        self.stream.try_next()
    }
}

impl<A: ActionType> std::fmt::Debug for ActionClient<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionClient")
            .field("action", &A::NAME)
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}
