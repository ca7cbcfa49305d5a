use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_DEBOUNCE_IN_MS;
use crate::constants::DEFAULT_EVENT_CHANNEL_CAPACITY;
use crate::constants::DEFAULT_IO_RETRY_INTERVAL_IN_MS;
use crate::Error;
use crate::Result;

/// Scheduling parameters for the behavior document watcher
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Quiet period after the last change event before a reload fires.
    /// Editors typically emit several events per save; they collapse into one reload.
    #[serde(default = "default_debounce")]
    pub debounce_in_ms: u64,

    /// Delay before retrying a reload that failed on I/O (file missing, permission denied)
    #[serde(default = "default_io_retry_interval")]
    pub io_retry_interval_in_ms: u64,

    /// Buffered change notifications between the OS watcher and the reload task.
    /// Overflowing notifications are dropped; one pending signal is enough to reload.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_in_ms: default_debounce(),
            io_retry_interval_in_ms: default_io_retry_interval(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl WatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.debounce_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watcher.debounce_in_ms must be greater than 0".into(),
            )));
        }

        if self.io_retry_interval_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watcher.io_retry_interval_in_ms must be greater than 0".into(),
            )));
        }

        if self.event_channel_capacity == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watcher.event_channel_capacity must be greater than 0".into(),
            )));
        }

        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_in_ms)
    }

    pub fn io_retry_interval(&self) -> Duration {
        Duration::from_millis(self.io_retry_interval_in_ms)
    }
}

fn default_debounce() -> u64 {
    DEFAULT_DEBOUNCE_IN_MS
}
fn default_io_retry_interval() -> u64 {
    DEFAULT_IO_RETRY_INTERVAL_IN_MS
}
fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}
