//! Behavior documents to registry nodes.
//!
//! A load is all-or-nothing: the document is parsed, validated and ordered
//! parent before child in full, and only then installed into the registry in
//! one step. Any error leaves the active behaviors untouched.

mod document;
mod source;

pub use document::*;
pub use source::*;


use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use tracing::info;
use tracing::warn;

use crate::behavior::baseline_patches;
use crate::behavior::BehaviorBuilder;
use crate::behavior::BehaviorNode;
use crate::behavior::NodeOrigin;
use crate::constants::ROOT_BEHAVIOR;
use crate::DocumentError;
use crate::LoaderConfig;
use crate::Registry;
use crate::Result;

/// Recoverable problem found while loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// The parent was not found; the behavior was attached to the root instead
    UnknownParent { behavior: String, parent: String },
}

impl fmt::Display for LoadWarning {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            LoadWarning::UnknownParent { behavior, parent } => write!(
                f,
                "behavior '{behavior}' names unknown parent '{parent}', attached to '{ROOT_BEHAVIOR}'"
            ),
        }
    }
}

/// Outcome of a successful load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadReport {
    pub installed: Vec<String>,
    pub removed: Vec<String>,
    pub warnings: Vec<LoadWarning>,
}

/// Parsed document, ordered parent before child, not yet installed
#[derive(Debug)]
pub struct LoadedBehaviors {
    pub nodes: Vec<BehaviorNode>,
    pub warnings: Vec<LoadWarning>,
}

#[derive(Debug, Clone, Default)]
pub struct DynamicConfigLoader {
    config: LoaderConfig,
}

impl DynamicConfigLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Builds the nodes a document declares. Parent names are resolved
    /// against the document first, then against `registry`.
    pub fn parse(
        &self,
        text: &str,
        registry: &Registry,
    ) -> Result<LoadedBehaviors> {
        let document = parse_document(text)?;
        let mut warnings = Vec::new();

        let mut parents: BTreeMap<String, Option<String>> = BTreeMap::new();
        for (name, block) in &document {
            let parent = if name == ROOT_BEHAVIOR {
                if block.parent.is_some() {
                    return Err(DocumentError::RootWithParent(name.clone()).into());
                }
                None
            } else {
                let declared = block.parent.clone().unwrap_or_else(|| ROOT_BEHAVIOR.to_string());
                if self.parent_exists(&declared, &document, registry) {
                    Some(declared)
                } else if self.config.strict_parents {
                    return Err(DocumentError::UnknownParent {
                        behavior: name.clone(),
                        parent: declared,
                    }
                    .into());
                } else {
                    warn!(behavior = %name, parent = %declared, "unknown parent, attaching to root");
                    warnings.push(LoadWarning::UnknownParent {
                        behavior: name.clone(),
                        parent: declared,
                    });
                    Some(ROOT_BEHAVIOR.to_string())
                }
            };
            parents.insert(name.clone(), parent);
        }

        let mut nodes = Vec::with_capacity(document.len());
        for name in parent_first_order(&parents)? {
            let Some(block) = document.get(&name) else {
                continue;
            };
            let mut builder = BehaviorBuilder::new(name.as_str()).origin(NodeOrigin::Document);
            if name == ROOT_BEHAVIOR {
                builder.extend(baseline_patches());
            }
            if let Some(Some(parent)) = parents.get(&name) {
                builder = builder.parent(parent.as_str());
            }
            builder.extend(block.patches(&name)?);
            nodes.push(builder.build());
        }

        Ok(LoadedBehaviors { nodes, warnings })
    }

    fn parent_exists(
        &self,
        parent: &str,
        document: &BehaviorDocument,
        registry: &Registry,
    ) -> bool {
        if parent == ROOT_BEHAVIOR || document.contains_key(parent) {
            return true;
        }
        match registry.node(parent) {
            // About to be pruned by this very load
            Some(node) => !(self.config.prune_removed && node.origin() == NodeOrigin::Document),
            None => false,
        }
    }

    /// Installs parsed nodes, replacing same-named behaviors
    pub fn apply(
        &self,
        loaded: LoadedBehaviors,
        registry: &Registry,
    ) -> Result<ReloadReport> {
        let summary = registry.install(loaded.nodes, self.config.prune_removed)?;
        Ok(ReloadReport {
            installed: summary.installed,
            removed: summary.removed,
            warnings: loaded.warnings,
        })
    }

    pub fn load_str(
        &self,
        text: &str,
        registry: &Registry,
    ) -> Result<ReloadReport> {
        let loaded = self.parse(text, registry)?;
        let report = self.apply(loaded, registry)?;
        info!(
            installed = ?report.installed,
            removed = ?report.removed,
            warnings = report.warnings.len(),
            "loaded behavior document"
        );
        Ok(report)
    }

    /// Reads `source` and loads it
    pub fn reload(
        &self,
        source: &dyn DocumentSource,
        registry: &Registry,
    ) -> Result<ReloadReport> {
        let text = source.read().map_err(|e| DocumentError::Read {
            path: source.location().to_path_buf(),
            source: e,
        })?;
        self.load_str(&text, registry)
    }

    pub fn load_file(
        &self,
        path: impl AsRef<Path>,
        registry: &Registry,
    ) -> Result<ReloadReport> {
        self.reload(&FileSource::new(path.as_ref()), registry)
    }
}

/// Orders document behaviors so every parent declared in the document comes
/// before its children. Parents outside the document are already
/// registered and impose no order.
fn parent_first_order(parents: &BTreeMap<String, Option<String>>) -> std::result::Result<Vec<String>, DocumentError> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Visiting,
        Done,
    }

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut order = Vec::with_capacity(parents.len());

    for start in parents.keys() {
        let mut path: Vec<&str> = Vec::new();
        let mut cursor = Some(start.as_str());

        while let Some(name) = cursor {
            match marks.get(name) {
                Some(Mark::Done) => break,
                Some(Mark::Visiting) => {
                    let from = path.iter().position(|n| *n == name).unwrap_or(0);
                    let mut chain: Vec<String> = path[from..].iter().map(|n| n.to_string()).collect();
                    chain.push(name.to_string());
                    return Err(DocumentError::CyclicParent { chain });
                }
                None => {}
            }
            marks.insert(name, Mark::Visiting);
            path.push(name);
            cursor = parents
                .get(name)
                .and_then(|p| p.as_deref())
                .filter(|p| parents.contains_key(*p));
        }

        for name in path.into_iter().rev() {
            marks.insert(name, Mark::Done);
            order.push(name.to_string());
        }
    }
    Ok(order)
}
