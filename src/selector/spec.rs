use std::fmt;

use super::ConsistencyMode;
use super::OperationKey;
use super::OperationKind;
use super::OperationShape;
use crate::settings::Capability;
use crate::settings::SettingsField;

/// Kind half of a selector. `All` is the wildcard; `Writes` covers both
/// retryable and non-retryable writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindSelector {
    All,
    Writes,
    Exactly(OperationKind),
}

impl KindSelector {
    pub fn matches(
        self,
        kind: OperationKind,
    ) -> bool {
        match self {
            KindSelector::All => true,
            KindSelector::Writes => kind.is_write(),
            KindSelector::Exactly(k) => k == kind,
        }
    }

    fn is_reads(self) -> bool {
        self == KindSelector::Exactly(OperationKind::Read)
    }

    fn is_writes(self) -> bool {
        match self {
            KindSelector::All => false,
            KindSelector::Writes => true,
            KindSelector::Exactly(k) => k.is_write(),
        }
    }
}

impl From<OperationKind> for KindSelector {
    fn from(kind: OperationKind) -> Self {
        KindSelector::Exactly(kind)
    }
}

/// Pattern addressing a subset of the concrete key space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectorSpec {
    pub kind: KindSelector,
    pub shape: OperationShape,
    pub mode: ConsistencyMode,
}

impl Default for SelectorSpec {
    fn default() -> Self {
        Self::ALL
    }
}

impl SelectorSpec {
    /// Matches every key
    pub const ALL: SelectorSpec = SelectorSpec {
        kind: KindSelector::All,
        shape: OperationShape::Any,
        mode: ConsistencyMode::Any,
    };

    pub fn new(
        kind: impl Into<KindSelector>,
        shape: OperationShape,
        mode: ConsistencyMode,
    ) -> Self {
        Self {
            kind: kind.into(),
            shape,
            mode,
        }
    }

    pub fn matches(
        &self,
        key: &OperationKey,
    ) -> bool {
        self.kind.matches(key.kind())
            && (self.shape == OperationShape::Any || self.shape == key.shape())
            && (self.mode == ConsistencyMode::Any || self.mode == key.mode())
    }

    /// Concrete keys this selector addresses, in matrix order
    pub fn matching_keys(&self) -> impl Iterator<Item = OperationKey> + '_ {
        OperationKey::ALL.into_iter().filter(move |k| self.matches(k))
    }

    /// Whether a patch addressed by this selector may carry `field`.
    ///
    /// Mirrors the bounds on the typed [`PatchBuilder`](super::PatchBuilder)
    /// setters so that loaded and hand-built patches accept the same fields.
    pub fn permits(
        &self,
        field: SettingsField,
    ) -> bool {
        let ap_compatible = matches!(self.mode, ConsistencyMode::Any | ConsistencyMode::Availability);
        let cp_compatible = matches!(self.mode, ConsistencyMode::Any | ConsistencyMode::Consistency);
        match field.capability() {
            Capability::General => true,
            Capability::Reads => self.kind.is_reads(),
            Capability::Writes => self.kind.is_writes(),
            Capability::Batch => self.shape == OperationShape::Batch,
            Capability::Query => self.shape == OperationShape::Query,
            Capability::AvailabilityReads => self.kind.is_reads() && ap_compatible,
            Capability::ConsistencyReads => self.kind.is_reads() && cp_compatible,
            Capability::AvailabilityWrites => self.kind.is_writes() && ap_compatible,
        }
    }
}

impl fmt::Display for SelectorSpec {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.kind {
            KindSelector::All => f.write_str("all")?,
            KindSelector::Writes => f.write_str("writes")?,
            KindSelector::Exactly(k) => write!(f, "{k}")?,
        }
        write!(f, "/{}/{}", self.shape, self.mode)
    }
}
