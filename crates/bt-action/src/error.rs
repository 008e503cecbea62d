use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("action server `{server}` is not available")]
    ServerUnavailable { server: String },

    #[error("timed out waiting for `{server}` to answer the goal request")]
    SendTimeout { server: String },

    #[error("goal was rejected by action server `{server}`")]
    GoalRejected { server: String },

    #[error("timed out waiting for `{server}` to answer the cancel request")]
    CancelTimeout { server: String },

    #[error("cancel request was refused by action server `{server}`")]
    CancelRejected { server: String },

    #[error("transport dropped the pending request to `{server}`")]
    Interrupted { server: String },

    #[error("failed to encode goal: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ActionError>;
