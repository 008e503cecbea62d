use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// The message triple of a remote action: what is sent, what streams back, what it ends with.
///
/// Goals travel as JSON values through the transport; feedback and results are decoded on
/// receipt. The adapter never looks inside any of them.
pub trait ActionType: 'static {
    /// Interface name, used in logs.
    const NAME: &'static str;

    type Goal: Serialize + Clone + Default + Debug + 'static;
    type Feedback: DeserializeOwned + Debug + 'static;
    type Result: DeserializeOwned + Clone + Default + Debug + 'static;
}
