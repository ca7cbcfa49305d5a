//! Schema of the external behavior document.
//!
//! ```yaml
//! default:
//!   all_operations:
//!     max_attempts: 3
//! bulk:
//!   parent: default
//!   batch_reads:
//!     max_concurrent_nodes: 0
//!     total_timeout: 10s
//!   retryable_writes:
//!     sleep_between_retries: PT0.25S
//! ```
//!
//! Section keys are also accepted in kebab-case (`batch-reads`).

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::selector::ConsistencyMode;
use crate::selector::KindSelector;
use crate::selector::OperationKind;
use crate::selector::OperationShape;
use crate::selector::Patch;
use crate::selector::SelectorSpec;
use crate::settings::SettingsRecord;
use crate::DocumentError;

/// Top level: behavior name -> block, kept in name order
pub type BehaviorDocument = BTreeMap<String, BehaviorBlock>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BehaviorBlock {
    /// Defaults to the root when omitted
    pub parent: Option<String>,

    #[serde(alias = "all-operations")]
    pub all_operations: Option<SettingsRecord>,
    pub reads: Option<SettingsRecord>,
    pub writes: Option<SettingsRecord>,
    #[serde(alias = "retryable-writes")]
    pub retryable_writes: Option<SettingsRecord>,
    #[serde(alias = "non-retryable-writes")]
    pub non_retryable_writes: Option<SettingsRecord>,
    #[serde(alias = "point-reads")]
    pub point_reads: Option<SettingsRecord>,
    #[serde(alias = "point-writes")]
    pub point_writes: Option<SettingsRecord>,
    #[serde(alias = "batch-reads")]
    pub batch_reads: Option<SettingsRecord>,
    #[serde(alias = "batch-writes")]
    pub batch_writes: Option<SettingsRecord>,
    pub query: Option<SettingsRecord>,
    #[serde(alias = "availability-mode-reads")]
    pub availability_mode_reads: Option<SettingsRecord>,
    #[serde(alias = "consistency-mode-reads")]
    pub consistency_mode_reads: Option<SettingsRecord>,
    #[serde(alias = "availability-mode-writes")]
    pub availability_mode_writes: Option<SettingsRecord>,
    #[serde(alias = "consistency-mode-writes")]
    pub consistency_mode_writes: Option<SettingsRecord>,
}

const READS: KindSelector = KindSelector::Exactly(OperationKind::Read);

impl BehaviorBlock {
    /// Sections paired with their selectors, broad to narrow. This is the
    /// order their patches are applied in, independent of document order.
    fn sections(&self) -> [(SelectorSpec, Option<&SettingsRecord>); 14] {
        use ConsistencyMode as M;
        use OperationShape as S;
        [
            (SelectorSpec::ALL, self.all_operations.as_ref()),
            (SelectorSpec::new(READS, S::Any, M::Any), self.reads.as_ref()),
            (SelectorSpec::new(KindSelector::Writes, S::Any, M::Any), self.writes.as_ref()),
            (
                SelectorSpec::new(OperationKind::WriteRetryable, S::Any, M::Any),
                self.retryable_writes.as_ref(),
            ),
            (
                SelectorSpec::new(OperationKind::WriteNonRetryable, S::Any, M::Any),
                self.non_retryable_writes.as_ref(),
            ),
            (SelectorSpec::new(READS, S::Point, M::Any), self.point_reads.as_ref()),
            (
                SelectorSpec::new(KindSelector::Writes, S::Point, M::Any),
                self.point_writes.as_ref(),
            ),
            (SelectorSpec::new(READS, S::Batch, M::Any), self.batch_reads.as_ref()),
            (
                SelectorSpec::new(KindSelector::Writes, S::Batch, M::Any),
                self.batch_writes.as_ref(),
            ),
            (SelectorSpec::new(READS, S::Query, M::Any), self.query.as_ref()),
            (
                SelectorSpec::new(READS, S::Any, M::Availability),
                self.availability_mode_reads.as_ref(),
            ),
            (
                SelectorSpec::new(READS, S::Any, M::Consistency),
                self.consistency_mode_reads.as_ref(),
            ),
            (
                SelectorSpec::new(KindSelector::Writes, S::Any, M::Availability),
                self.availability_mode_writes.as_ref(),
            ),
            (
                SelectorSpec::new(KindSelector::Writes, S::Any, M::Consistency),
                self.consistency_mode_writes.as_ref(),
            ),
        ]
    }

    /// Turns the sections into patches, checking that every field is valid
    /// for its section. Value ranges are checked when the nodes are
    /// registered, as for hand-built behaviors.
    pub(crate) fn patches(
        &self,
        behavior: &str,
    ) -> Result<Vec<Patch>, DocumentError> {
        let mut patches = Vec::new();
        for (selector, settings) in self.sections() {
            let Some(settings) = settings else {
                continue;
            };
            if settings.is_empty() {
                continue;
            }
            let patch = Patch::try_new(selector, *settings).map_err(|field| DocumentError::FieldNotPermitted {
                behavior: behavior.to_string(),
                field,
                selector,
            })?;
            patches.push(patch);
        }
        Ok(patches)
    }
}

/// Parses the raw text. An empty document declares no behaviors.
pub(crate) fn parse_document(text: &str) -> Result<BehaviorDocument, DocumentError> {
    if text.trim().is_empty() {
        return Ok(BehaviorDocument::new());
    }
    let document: Option<BehaviorDocument> =
        serde_yaml::from_str(text).map_err(|e| DocumentError::Malformed(e.to_string()))?;
    Ok(document.unwrap_or_default())
}
