// -
// Behavior tree

/// Name of the built-in root behavior every other behavior descends from
pub const ROOT_BEHAVIOR: &str = "default";

// -
// Environment

/// Prefix for environment overrides, e.g. `BEHAVIOR__WATCHER__DEBOUNCE_IN_MS`
pub(crate) const ENV_PREFIX: &str = "BEHAVIOR";
pub(crate) const ENV_SEPARATOR: &str = "__";

// -
// Watcher

pub(crate) const DEFAULT_DEBOUNCE_IN_MS: u64 = 1000;
pub(crate) const DEFAULT_IO_RETRY_INTERVAL_IN_MS: u64 = 5000;
pub(crate) const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;
