//! Condition evaluation for select and delete
//!
//! Filters records strictly according to a condition chain. There is no
//! planning, no index use and no operator precedence: chains are folded
//! left to right over the full table.

mod chain;
mod predicate;

pub use chain::{ConditionChain, LogicalOp};
pub use predicate::{CompareOp, Predicate};
