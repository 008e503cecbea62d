//! Per-node client settings resolved from input ports.

use std::time::Duration;

use bt_core::{BtError, NodeConfig};
use serde::{Deserialize, Serialize};

pub const SERVER_NAME_PORT: &str = "server_name";
pub const SERVER_TIMEOUT_PORT: &str = "server_timeout";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionClientConfig {
    /// Overrides the server name the node was built with.
    #[serde(default)]
    pub server_name: Option<String>,

    /// Bound for every wait the node performs (discovery, goal response, cancel response).
    #[serde(default = "default_server_timeout_ms")]
    pub server_timeout_ms: u64,
}

pub fn default_server_timeout_ms() -> u64 {
    1000
}

impl Default for ActionClientConfig {
    fn default() -> Self {
        Self {
            server_name: None,
            server_timeout_ms: default_server_timeout_ms(),
        }
    }
}

impl ActionClientConfig {
    /// Read `server_name` and `server_timeout` from the node's ports.
    ///
    /// A node whose port list lacks `server_timeout` (or carries an unparsable value) falls back
    /// to the default with a warning.
    pub fn from_node_config(config: &NodeConfig, node: &str) -> Self {
        let server_name = config.get_input::<String>(SERVER_NAME_PORT).ok();

        let server_timeout_ms = match config.get_input::<u64>(SERVER_TIMEOUT_PORT) {
            Ok(ms) => ms,
            Err(BtError::InvalidPort { value, reason, .. }) => {
                tracing::warn!(
                    node,
                    value = %value,
                    reason = %reason,
                    "Invalid input port [server_timeout], using default value of 1s"
                );
                default_server_timeout_ms()
            }
            Err(_) => {
                tracing::warn!(
                    node,
                    "Missing input port [server_timeout], using default value of 1s"
                );
                tracing::debug!(node, "Use `provided_basic_ports` to avoid this issue");
                default_server_timeout_ms()
            }
        };

        Self {
            server_name,
            server_timeout_ms,
        }
    }

    pub fn server_timeout(&self) -> Duration {
        Duration::from_millis(self.server_timeout_ms)
    }
}
