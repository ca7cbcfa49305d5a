use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use super::duration::deserialize_opt_duration;
use super::CommitLevel;
use super::ReadModeAp;
use super::ReadModeSc;
use super::Replica;

/// Sparse bag of policy knobs.
///
/// Every field is independently optional: `None` means "inherit", `Some`
/// is authoritative. The same type is used for a patch's partial settings and
/// for a fully resolved row of a behavior's matrix; in the resolved case a
/// remaining `None` means the field was configured nowhere in the ancestor
/// chain and the consumer must apply its own fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsRecord {
    /// Deadline for the whole call, retries included
    #[serde(deserialize_with = "deserialize_opt_duration")]
    pub total_timeout: Option<Duration>,
    /// Idle socket timeout for a single attempt
    #[serde(deserialize_with = "deserialize_opt_duration")]
    pub socket_timeout: Option<Duration>,
    #[serde(deserialize_with = "deserialize_opt_duration")]
    pub connect_timeout: Option<Duration>,
    /// Extra wait after a socket timeout so the connection can drain and be reused
    #[serde(deserialize_with = "deserialize_opt_duration")]
    pub timeout_delay: Option<Duration>,
    #[serde(deserialize_with = "deserialize_opt_duration")]
    pub sleep_between_retries: Option<Duration>,
    /// Initial attempt included
    pub max_attempts: Option<u32>,
    pub replica: Option<Replica>,
    pub send_key: Option<bool>,
    pub use_compression: Option<bool>,

    // batch
    /// 0 means all nodes in parallel
    pub max_concurrent_nodes: Option<u32>,
    pub allow_inline: Option<bool>,
    pub allow_inline_ssd: Option<bool>,
    pub respond_all_keys: Option<bool>,

    // query
    pub record_queue_size: Option<u32>,
    pub max_records: Option<u64>,

    // writes
    pub durable_delete: Option<bool>,
    pub commit_level: Option<CommitLevel>,

    // reads
    pub read_mode_ap: Option<ReadModeAp>,
    pub read_mode_sc: Option<ReadModeSc>,
    /// Percentage of the record TTL after which a read also resets it, 0 disables
    pub reset_ttl_percent: Option<u8>,
}

/// Names every [`SettingsRecord`] field; used for diagnostics and for the
/// selector capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingsField {
    TotalTimeout,
    SocketTimeout,
    ConnectTimeout,
    TimeoutDelay,
    SleepBetweenRetries,
    MaxAttempts,
    Replica,
    SendKey,
    UseCompression,
    MaxConcurrentNodes,
    AllowInline,
    AllowInlineSsd,
    RespondAllKeys,
    RecordQueueSize,
    MaxRecords,
    DurableDelete,
    CommitLevel,
    ReadModeAp,
    ReadModeSc,
    ResetTtlPercent,
}

/// Slice of the operation space a field is meaningful for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    General,
    Reads,
    Writes,
    Batch,
    Query,
    AvailabilityReads,
    ConsistencyReads,
    AvailabilityWrites,
}

impl SettingsField {
    pub const ALL: [SettingsField; 20] = [
        SettingsField::TotalTimeout,
        SettingsField::SocketTimeout,
        SettingsField::ConnectTimeout,
        SettingsField::TimeoutDelay,
        SettingsField::SleepBetweenRetries,
        SettingsField::MaxAttempts,
        SettingsField::Replica,
        SettingsField::SendKey,
        SettingsField::UseCompression,
        SettingsField::MaxConcurrentNodes,
        SettingsField::AllowInline,
        SettingsField::AllowInlineSsd,
        SettingsField::RespondAllKeys,
        SettingsField::RecordQueueSize,
        SettingsField::MaxRecords,
        SettingsField::DurableDelete,
        SettingsField::CommitLevel,
        SettingsField::ReadModeAp,
        SettingsField::ReadModeSc,
        SettingsField::ResetTtlPercent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SettingsField::TotalTimeout => "total_timeout",
            SettingsField::SocketTimeout => "socket_timeout",
            SettingsField::ConnectTimeout => "connect_timeout",
            SettingsField::TimeoutDelay => "timeout_delay",
            SettingsField::SleepBetweenRetries => "sleep_between_retries",
            SettingsField::MaxAttempts => "max_attempts",
            SettingsField::Replica => "replica",
            SettingsField::SendKey => "send_key",
            SettingsField::UseCompression => "use_compression",
            SettingsField::MaxConcurrentNodes => "max_concurrent_nodes",
            SettingsField::AllowInline => "allow_inline",
            SettingsField::AllowInlineSsd => "allow_inline_ssd",
            SettingsField::RespondAllKeys => "respond_all_keys",
            SettingsField::RecordQueueSize => "record_queue_size",
            SettingsField::MaxRecords => "max_records",
            SettingsField::DurableDelete => "durable_delete",
            SettingsField::CommitLevel => "commit_level",
            SettingsField::ReadModeAp => "read_mode_ap",
            SettingsField::ReadModeSc => "read_mode_sc",
            SettingsField::ResetTtlPercent => "reset_ttl_percent",
        }
    }

    pub fn capability(self) -> Capability {
        match self {
            SettingsField::TotalTimeout
            | SettingsField::SocketTimeout
            | SettingsField::ConnectTimeout
            | SettingsField::TimeoutDelay
            | SettingsField::SleepBetweenRetries
            | SettingsField::MaxAttempts
            | SettingsField::Replica
            | SettingsField::SendKey
            | SettingsField::UseCompression => Capability::General,
            SettingsField::MaxConcurrentNodes
            | SettingsField::AllowInline
            | SettingsField::AllowInlineSsd
            | SettingsField::RespondAllKeys => Capability::Batch,
            SettingsField::RecordQueueSize | SettingsField::MaxRecords => Capability::Query,
            SettingsField::DurableDelete => Capability::Writes,
            SettingsField::CommitLevel => Capability::AvailabilityWrites,
            SettingsField::ReadModeAp => Capability::AvailabilityReads,
            SettingsField::ReadModeSc => Capability::ConsistencyReads,
            SettingsField::ResetTtlPercent => Capability::Reads,
        }
    }
}

impl fmt::Display for SettingsField {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set value outside the range its field accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSetting {
    pub field: SettingsField,
    pub reason: String,
}

/// Copies `src` over `dst` only when `src` is set
#[inline]
fn overlay<T: Copy>(
    dst: &mut Option<T>,
    src: Option<T>,
) {
    if src.is_some() {
        *dst = src;
    }
}

impl SettingsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field-granular last-writer-wins: every set field of `other` replaces
    /// the corresponding field of `self`, unset fields leave it untouched.
    pub fn merge_from(
        &mut self,
        other: &SettingsRecord,
    ) {
        overlay(&mut self.total_timeout, other.total_timeout);
        overlay(&mut self.socket_timeout, other.socket_timeout);
        overlay(&mut self.connect_timeout, other.connect_timeout);
        overlay(&mut self.timeout_delay, other.timeout_delay);
        overlay(&mut self.sleep_between_retries, other.sleep_between_retries);
        overlay(&mut self.max_attempts, other.max_attempts);
        overlay(&mut self.replica, other.replica);
        overlay(&mut self.send_key, other.send_key);
        overlay(&mut self.use_compression, other.use_compression);
        overlay(&mut self.max_concurrent_nodes, other.max_concurrent_nodes);
        overlay(&mut self.allow_inline, other.allow_inline);
        overlay(&mut self.allow_inline_ssd, other.allow_inline_ssd);
        overlay(&mut self.respond_all_keys, other.respond_all_keys);
        overlay(&mut self.record_queue_size, other.record_queue_size);
        overlay(&mut self.max_records, other.max_records);
        overlay(&mut self.durable_delete, other.durable_delete);
        overlay(&mut self.commit_level, other.commit_level);
        overlay(&mut self.read_mode_ap, other.read_mode_ap);
        overlay(&mut self.read_mode_sc, other.read_mode_sc);
        overlay(&mut self.reset_ttl_percent, other.reset_ttl_percent);
    }

    /// Returns a copy of `self` with `other` merged on top
    pub fn merged_with(
        &self,
        other: &SettingsRecord,
    ) -> SettingsRecord {
        let mut merged = *self;
        merged.merge_from(other);
        merged
    }

    /// Rendered value of a field, `None` when unset
    pub fn field_value(
        &self,
        field: SettingsField,
    ) -> Option<String> {
        fn show<T: fmt::Display>(v: Option<T>) -> Option<String> {
            v.map(|v| v.to_string())
        }
        fn show_duration(v: Option<Duration>) -> Option<String> {
            v.map(|d| format!("{d:?}"))
        }

        match field {
            SettingsField::TotalTimeout => show_duration(self.total_timeout),
            SettingsField::SocketTimeout => show_duration(self.socket_timeout),
            SettingsField::ConnectTimeout => show_duration(self.connect_timeout),
            SettingsField::TimeoutDelay => show_duration(self.timeout_delay),
            SettingsField::SleepBetweenRetries => show_duration(self.sleep_between_retries),
            SettingsField::MaxAttempts => show(self.max_attempts),
            SettingsField::Replica => show(self.replica),
            SettingsField::SendKey => show(self.send_key),
            SettingsField::UseCompression => show(self.use_compression),
            SettingsField::MaxConcurrentNodes => show(self.max_concurrent_nodes),
            SettingsField::AllowInline => show(self.allow_inline),
            SettingsField::AllowInlineSsd => show(self.allow_inline_ssd),
            SettingsField::RespondAllKeys => show(self.respond_all_keys),
            SettingsField::RecordQueueSize => show(self.record_queue_size),
            SettingsField::MaxRecords => show(self.max_records),
            SettingsField::DurableDelete => show(self.durable_delete),
            SettingsField::CommitLevel => show(self.commit_level),
            SettingsField::ReadModeAp => show(self.read_mode_ap),
            SettingsField::ReadModeSc => show(self.read_mode_sc),
            SettingsField::ResetTtlPercent => show(self.reset_ttl_percent),
        }
    }

    pub fn is_set(
        &self,
        field: SettingsField,
    ) -> bool {
        self.field_value(field).is_some()
    }

    /// Fields carrying a value, in declaration order
    pub fn set_fields(&self) -> Vec<SettingsField> {
        SettingsField::ALL
            .into_iter()
            .filter(|f| self.is_set(*f))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        *self == SettingsRecord::default()
    }

    /// Range checks that serde cannot express
    pub fn validate(&self) -> std::result::Result<(), InvalidSetting> {
        if let Some(p) = self.reset_ttl_percent {
            if p > 100 {
                return Err(InvalidSetting {
                    field: SettingsField::ResetTtlPercent,
                    reason: format!("{p} is not a percentage (0..=100)"),
                });
            }
        }
        if self.max_attempts == Some(0) {
            return Err(InvalidSetting {
                field: SettingsField::MaxAttempts,
                reason: "at least one attempt is required".to_string(),
            });
        }
        if self.record_queue_size == Some(0) {
            return Err(InvalidSetting {
                field: SettingsField::RecordQueueSize,
                reason: "queue size must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}
