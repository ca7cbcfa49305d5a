//! Policy knobs and their values.
//!
//! - [`SettingsRecord`] - sparse record used both for patches and resolved rows
//! - [`SettingsField`] - field names plus the capability each field requires
//! - [`parse_duration`] - duration literals from behavior documents

mod duration;
mod record;
mod types;

pub use duration::*;
pub use record::*;
pub use types::*;
