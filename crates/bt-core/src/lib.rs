//! Behavior tree kernel primitives: blackboard, node contract, ports.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod blackboard;
pub mod error;
pub mod node;
pub mod ports;
pub mod tick;

pub use blackboard::{BbKey, Blackboard};
pub use error::{BtError, Result};
pub use node::{BtNode, BtStatus};
pub use ports::{NodeConfig, PortInfo, Ports, PortsList};
pub use tick::TickContext;
