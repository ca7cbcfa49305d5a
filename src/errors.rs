//! Behavior Engine Error Hierarchy
//!
//! Errors are grouped by the layer that raises them: document parsing,
//! registry/tree maintenance and the file watcher. Duration literals that
//! fail to parse inside a document surface as [`DocumentError::Malformed`].
//! A field that was never configured is not an error; it surfaces as `None`
//! on [`SettingsRecord`](crate::SettingsRecord).

use std::path::PathBuf;

use config::ConfigError;

use crate::selector::SelectorSpec;
use crate::settings::SettingsField;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Engine configuration loading/validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// External behavior document could not be turned into nodes
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Behavior tree maintenance failures
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Background watcher failures
    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// YAML syntax or schema violations (unknown keys, wrong types)
    #[error("Malformed behavior document: {0}")]
    Malformed(String),

    /// A field was set inside a block whose selector cannot carry it
    #[error("Behavior '{behavior}': field '{field}' is not valid for selector {selector}")]
    FieldNotPermitted {
        behavior: String,
        field: SettingsField,
        selector: SelectorSpec,
    },

    /// The root behavior is the backstop and cannot inherit from anything
    #[error("Root behavior '{0}' cannot declare a parent")]
    RootWithParent(String),

    /// Parent chain loops back on itself
    #[error("Cyclic parent chain: {}", chain.join(" -> "))]
    CyclicParent { chain: Vec<String> },

    /// Parent name resolves nowhere (strict mode only)
    #[error("Behavior '{behavior}' names unknown parent '{parent}'")]
    UnknownParent { behavior: String, parent: String },

    #[error("Failed to read behavior document at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationParseError {
    #[error("duration cannot be empty")]
    Empty,

    #[error("missing number in duration '{0}'")]
    MissingNumber(String),

    #[error("unknown unit '{unit}' in duration '{input}'")]
    UnknownUnit { input: String, unit: String },

    #[error("invalid number in duration '{0}'")]
    InvalidNumber(String),

    #[error("malformed ISO-8601 duration '{0}'")]
    InvalidIso8601(String),

    #[error("duration '{0}' overflows")]
    Overflow(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown behavior '{0}'")]
    UnknownBehavior(String),

    /// Registering would make a node its own ancestor
    #[error("Cyclic parent chain: {}", chain.join(" -> "))]
    CyclicParent { chain: Vec<String> },

    #[error("Root behavior '{0}' cannot be removed or given a parent")]
    RootImmutable(String),

    /// A patch value was outside its accepted range
    #[error("Behavior '{behavior}': invalid value for '{field}': {reason}")]
    InvalidSetting {
        behavior: String,
        field: SettingsField,
        reason: String,
    },

    /// Requested (kind, shape, mode) is not a concrete key
    #[error("No settings row for {0}")]
    InvalidOperationKey(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error(transparent)]
    Notify(#[from] notify::Error),

    #[error("Watch location {0} has no parent directory")]
    InvalidLocation(PathBuf),

    #[error("Watcher has been stopped")]
    Stopped,

    #[error("Watcher task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}
