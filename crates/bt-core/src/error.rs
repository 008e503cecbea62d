use thiserror::Error;

/// Configuration errors surfaced by the kernel.
///
/// These are programmer/configuration mistakes; nodes report them as `Failure` and log them
/// rather than letting them cross the tick boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BtError {
    #[error("missing blackboard entry `{key}`")]
    MissingKey { key: &'static str },

    #[error("input port `{port}` is not declared by this node")]
    PortNotDeclared { port: String },

    #[error("input port `{port}` has no value and no default")]
    MissingPort { port: String },

    #[error("input port `{port}` has invalid value {value:?}: {reason}")]
    InvalidPort {
        port: String,
        value: String,
        reason: String,
    },

    #[error("failed to parse ports: {0}")]
    PortsParse(String),
}

pub type Result<T> = std::result::Result<T, BtError>;
