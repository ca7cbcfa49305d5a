//! Hierarchical behavior resolution for database clients.
//!
//! A *behavior* is a named set of ordered patches over policy settings
//! (timeouts, retries, batching, consistency sub-modes). Behaviors form a tree
//! rooted at the built-in [`ROOT_BEHAVIOR`]; asking a behavior for the settings
//! of one (kind, shape, mode) operation returns the field-by-field merge of
//! its ancestors' patches and its own.
//!
//! ```ignore
//! let registry = Registry::new();
//! let bulk = registry.root().derive_with_changes("bulk", |b| {
//!     b.on(Selector::all().reads().batch(), |p| {
//!         p.max_concurrent_nodes(0);
//!     });
//! })?;
//! let settings = bulk.get_settings(OperationKind::Read, OperationShape::Batch, ConsistencyMode::Availability)?;
//!
//! let mut watcher = registry.start_watching("behaviors.yml", None)?;
//! ```

mod behavior;
mod config;
mod constants;
mod errors;
mod loader;
mod registry;
mod selector;
mod settings;
mod watcher;

pub use behavior::*;
pub use config::*;
pub use constants::ROOT_BEHAVIOR;
pub use errors::*;
pub use loader::*;
pub use registry::*;
pub use selector::*;
pub use settings::*;
pub use watcher::*;
