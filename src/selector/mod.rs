//! Addressing slices of the operation space.
//!
//! - [`OperationKey`] - one concrete (kind, shape, mode) row
//! - [`SelectorSpec`] - runtime pattern over keys, with wildcards
//! - [`Selector`] / [`PatchBuilder`] - the same pattern with compile-time narrowing
//! - [`Patch`] - frozen (selector, partial settings) pair

mod key;
mod patch;
mod spec;
mod typed;

pub use key::*;
pub use patch::*;
pub use spec::*;
pub use typed::*;

#[cfg(test)]
mod selector_test;
