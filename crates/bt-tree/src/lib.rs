//! Behavior tree composites and driver built on `bt-core`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod nodes;
pub mod tree;

// Defaults: reactive control flow nodes (abort-friendly).
//
// Memory variants are still available as `MemSelector` / `MemSequence` for cases
// where you explicitly want "resume running child without re-checking earlier
// conditions".
pub use nodes::{
    Condition, ReactiveSelector, ReactiveSequence, Selector as MemSelector,
    Sequence as MemSequence,
};
pub use nodes::{ReactiveSelector as Selector, ReactiveSequence as Sequence};
pub use tree::BehaviorTree;
