use crate::selector::OperationKey;
use crate::selector::Patch;
use crate::selector::KEY_COUNT;
use crate::settings::SettingsRecord;

/// Resolved settings for every concrete key of one behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMatrix {
    rows: [SettingsRecord; KEY_COUNT],
}

impl Default for ResolvedMatrix {
    fn default() -> Self {
        Self {
            rows: [SettingsRecord::default(); KEY_COUNT],
        }
    }
}

impl ResolvedMatrix {
    pub fn get(
        &self,
        key: &OperationKey,
    ) -> Option<&SettingsRecord> {
        key.index().map(|i| &self.rows[i])
    }

    /// Rows paired with their keys, in key-space order
    pub fn iter(&self) -> impl Iterator<Item = (OperationKey, &SettingsRecord)> {
        OperationKey::ALL.into_iter().zip(self.rows.iter())
    }
}

/// Resolution engine.
///
/// Starts from a copy of the parent's matrix (or an all-unset matrix for the
/// root) and merges each patch, in order, into every row its selector
/// matches. Pure: the same parent matrix and patch list always produce the
/// same result, which is what makes caching the output safe.
pub fn resolve(
    parent: Option<&ResolvedMatrix>,
    patches: &[Patch],
) -> ResolvedMatrix {
    let mut matrix = parent.cloned().unwrap_or_default();

    for patch in patches {
        for (row, key) in OperationKey::ALL.iter().enumerate() {
            if patch.selector().matches(key) {
                matrix.rows[row].merge_from(patch.settings());
            }
        }
    }

    matrix
}
