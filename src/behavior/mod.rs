//! Behaviors and their resolution.
//!
//! A [`BehaviorNode`] owns an ordered, frozen list of patches and names its
//! parent. [`resolve`] turns the parent's matrix plus those patches into the
//! node's [`ResolvedMatrix`]; the registry memoizes the result per node.

mod baseline;
mod builder;
mod explain;
mod matrix;
mod node;

pub(crate) use baseline::*;
pub use builder::*;
pub use explain::*;
pub use matrix::*;
pub use node::*;

#[cfg(test)]
mod behavior_test;
