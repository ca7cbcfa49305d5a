use serde::Deserialize;
use serde::Serialize;

/// How the behavior document is interpreted
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// When false, a block naming an unknown parent is attached to the root
    /// behavior and a warning is reported. When true, the reload fails.
    #[serde(default)]
    pub strict_parents: bool,

    /// Unregister behaviors that were loaded from the document earlier but
    /// are missing from the current version of it.
    #[serde(default = "default_prune_removed")]
    pub prune_removed: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            strict_parents: false,
            prune_removed: default_prune_removed(),
        }
    }
}

fn default_prune_removed() -> bool {
    true
}
