//! Compile-time narrowing of selectors.
//!
//! A [`Selector`] carries three tag type parameters, one per axis of the key
//! space. Narrowing calls (`reads()`, `batch()`, `availability()`, ...) swap a
//! tag and overwrite the matching field of the runtime [`SelectorSpec`]. The
//! setters of [`PatchBuilder`] are bounded by those tags, so e.g.
//! `max_concurrent_nodes` only exists once the shape was narrowed to batch.
//!
//! ```ignore
//! let selector = Selector::all().reads().batch().availability();
//! ```
//!
//! The order of narrowing calls only affects which methods are visible along
//! the way; the resulting spec is the same.

use std::marker::PhantomData;
use std::time::Duration;

use super::ConsistencyMode;
use super::KindSelector;
use super::OperationKind;
use super::OperationShape;
use super::Patch;
use super::SelectorSpec;
use crate::settings::CommitLevel;
use crate::settings::ReadModeAp;
use crate::settings::ReadModeSc;
use crate::settings::Replica;
use crate::settings::SettingsRecord;

/// Axis tags
pub mod tags {
    /// Kind not narrowed
    pub struct AnyKind;
    pub struct ReadKind;
    /// Retryable, non-retryable or both
    pub struct WriteKind;

    /// Shape not narrowed
    pub struct AnyShape;
    pub struct Point;
    pub struct Batch;
    pub struct Query;

    /// Mode not narrowed
    pub struct AnyMode;
    pub struct Ap;
    pub struct Cp;
}

use tags::*;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::AnyKind {}
    impl Sealed for super::ReadKind {}
    impl Sealed for super::WriteKind {}
    impl Sealed for super::AnyShape {}
    impl Sealed for super::Point {}
    impl Sealed for super::Batch {}
    impl Sealed for super::Query {}
    impl Sealed for super::AnyMode {}
    impl Sealed for super::Ap {}
    impl Sealed for super::Cp {}
}

/// Kind tags that address reads only
pub trait IsRead: sealed::Sealed {}
impl IsRead for ReadKind {}

/// Kind tags that address writes only
pub trait IsWrite: sealed::Sealed {}
impl IsWrite for WriteKind {}

/// Kind tags that may still be narrowed to queries
pub trait QueryableKind: sealed::Sealed {}
impl QueryableKind for AnyKind {}
impl QueryableKind for ReadKind {}

/// Shape tags compatible with writes
pub trait WritableShape: sealed::Sealed {}
impl WritableShape for AnyShape {}
impl WritableShape for Point {}
impl WritableShape for Batch {}

pub trait IsBatch: sealed::Sealed {}
impl IsBatch for Batch {}

pub trait IsQuery: sealed::Sealed {}
impl IsQuery for Query {}

/// Mode tags that include availability-mode keys
pub trait AllowsAp: sealed::Sealed {}
impl AllowsAp for AnyMode {}
impl AllowsAp for Ap {}

/// Mode tags that include consistency-mode keys
pub trait AllowsCp: sealed::Sealed {}
impl AllowsCp for AnyMode {}
impl AllowsCp for Cp {}

/// A [`SelectorSpec`] whose narrowing is tracked in its type
pub struct Selector<K, S, M> {
    spec: SelectorSpec,
    _tags: PhantomData<fn() -> (K, S, M)>,
}

impl<K, S, M> Clone for Selector<K, S, M> {
    fn clone(&self) -> Self {
        Self::wrap(self.spec)
    }
}

impl<K, S, M> Copy for Selector<K, S, M> {}

impl<K, S, M> std::fmt::Debug for Selector<K, S, M> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_tuple("Selector").field(&self.spec).finish()
    }
}

impl Selector<AnyKind, AnyShape, AnyMode> {
    /// Every operation
    pub fn all() -> Self {
        Self::wrap(SelectorSpec::ALL)
    }
}

impl<K, S, M> Selector<K, S, M> {
    fn wrap(spec: SelectorSpec) -> Self {
        Self {
            spec,
            _tags: PhantomData,
        }
    }

    fn retag<K2, S2, M2>(self) -> Selector<K2, S2, M2> {
        Selector::wrap(self.spec)
    }

    pub fn spec(&self) -> SelectorSpec {
        self.spec
    }
}

impl<S, M> Selector<AnyKind, S, M> {
    pub fn reads(mut self) -> Selector<ReadKind, S, M> {
        self.spec.kind = KindSelector::Exactly(OperationKind::Read);
        self.retag()
    }
}

impl<S: WritableShape, M> Selector<AnyKind, S, M> {
    /// Retryable and non-retryable writes
    pub fn writes(mut self) -> Selector<WriteKind, S, M> {
        self.spec.kind = KindSelector::Writes;
        self.retag()
    }
}

impl<S, M> Selector<WriteKind, S, M> {
    pub fn retryable(mut self) -> Self {
        self.spec.kind = KindSelector::Exactly(OperationKind::WriteRetryable);
        self
    }

    pub fn non_retryable(mut self) -> Self {
        self.spec.kind = KindSelector::Exactly(OperationKind::WriteNonRetryable);
        self
    }
}

impl<K, M> Selector<K, AnyShape, M> {
    pub fn point(mut self) -> Selector<K, Point, M> {
        self.spec.shape = OperationShape::Point;
        self.retag()
    }

    pub fn batch(mut self) -> Selector<K, Batch, M> {
        self.spec.shape = OperationShape::Batch;
        self.retag()
    }
}

impl<K: QueryableKind, M> Selector<K, AnyShape, M> {
    /// Queries only exist as reads
    pub fn query(mut self) -> Selector<ReadKind, Query, M> {
        self.spec.kind = KindSelector::Exactly(OperationKind::Read);
        self.spec.shape = OperationShape::Query;
        self.retag()
    }
}

impl<K, S> Selector<K, S, AnyMode> {
    pub fn availability(mut self) -> Selector<K, S, Ap> {
        self.spec.mode = ConsistencyMode::Availability;
        self.retag()
    }

    pub fn consistency(mut self) -> Selector<K, S, Cp> {
        self.spec.mode = ConsistencyMode::Consistency;
        self.retag()
    }
}

/// Accumulates the settings of one patch. Each setter writes exactly one
/// field; calling it again keeps the last value.
pub struct PatchBuilder<K, S, M> {
    selector: Selector<K, S, M>,
    settings: SettingsRecord,
}

impl<K, S, M> PatchBuilder<K, S, M> {
    pub(crate) fn new(selector: Selector<K, S, M>) -> Self {
        Self {
            selector,
            settings: SettingsRecord::default(),
        }
    }

    pub(crate) fn into_patch(self) -> Option<Patch> {
        if self.settings.is_empty() {
            return None;
        }
        Some(Patch::new_unchecked(self.selector.spec, self.settings))
    }

    pub fn total_timeout(
        &mut self,
        timeout: Duration,
    ) -> &mut Self {
        self.settings.total_timeout = Some(timeout);
        self
    }

    pub fn socket_timeout(
        &mut self,
        timeout: Duration,
    ) -> &mut Self {
        self.settings.socket_timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(
        &mut self,
        timeout: Duration,
    ) -> &mut Self {
        self.settings.connect_timeout = Some(timeout);
        self
    }

    pub fn timeout_delay(
        &mut self,
        delay: Duration,
    ) -> &mut Self {
        self.settings.timeout_delay = Some(delay);
        self
    }

    pub fn sleep_between_retries(
        &mut self,
        delay: Duration,
    ) -> &mut Self {
        self.settings.sleep_between_retries = Some(delay);
        self
    }

    pub fn max_attempts(
        &mut self,
        attempts: u32,
    ) -> &mut Self {
        self.settings.max_attempts = Some(attempts);
        self
    }

    pub fn replica(
        &mut self,
        replica: Replica,
    ) -> &mut Self {
        self.settings.replica = Some(replica);
        self
    }

    pub fn send_key(
        &mut self,
        send_key: bool,
    ) -> &mut Self {
        self.settings.send_key = Some(send_key);
        self
    }

    pub fn use_compression(
        &mut self,
        enable: bool,
    ) -> &mut Self {
        self.settings.use_compression = Some(enable);
        self
    }
}

impl<K, S: IsBatch, M> PatchBuilder<K, S, M> {
    pub fn max_concurrent_nodes(
        &mut self,
        nodes: u32,
    ) -> &mut Self {
        self.settings.max_concurrent_nodes = Some(nodes);
        self
    }

    pub fn allow_inline(
        &mut self,
        allow: bool,
    ) -> &mut Self {
        self.settings.allow_inline = Some(allow);
        self
    }

    pub fn allow_inline_ssd(
        &mut self,
        allow: bool,
    ) -> &mut Self {
        self.settings.allow_inline_ssd = Some(allow);
        self
    }

    pub fn respond_all_keys(
        &mut self,
        respond: bool,
    ) -> &mut Self {
        self.settings.respond_all_keys = Some(respond);
        self
    }
}

impl<K, S: IsQuery, M> PatchBuilder<K, S, M> {
    pub fn record_queue_size(
        &mut self,
        size: u32,
    ) -> &mut Self {
        self.settings.record_queue_size = Some(size);
        self
    }

    pub fn max_records(
        &mut self,
        records: u64,
    ) -> &mut Self {
        self.settings.max_records = Some(records);
        self
    }
}

impl<K: IsWrite, S, M> PatchBuilder<K, S, M> {
    pub fn durable_delete(
        &mut self,
        durable: bool,
    ) -> &mut Self {
        self.settings.durable_delete = Some(durable);
        self
    }
}

impl<K: IsWrite, S, M: AllowsAp> PatchBuilder<K, S, M> {
    pub fn commit_level(
        &mut self,
        level: CommitLevel,
    ) -> &mut Self {
        self.settings.commit_level = Some(level);
        self
    }
}

impl<K: IsRead, S, M> PatchBuilder<K, S, M> {
    /// Percentages above 100 are rejected when the behavior is registered
    pub fn reset_ttl_percent(
        &mut self,
        percent: u8,
    ) -> &mut Self {
        self.settings.reset_ttl_percent = Some(percent);
        self
    }
}

impl<K: IsRead, S, M: AllowsAp> PatchBuilder<K, S, M> {
    pub fn read_mode_ap(
        &mut self,
        mode: ReadModeAp,
    ) -> &mut Self {
        self.settings.read_mode_ap = Some(mode);
        self
    }
}

impl<K: IsRead, S, M: AllowsCp> PatchBuilder<K, S, M> {
    pub fn read_mode_sc(
        &mut self,
        mode: ReadModeSc,
    ) -> &mut Self {
        self.settings.read_mode_sc = Some(mode);
        self
    }
}
