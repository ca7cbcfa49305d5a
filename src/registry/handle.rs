use std::sync::Arc;

use super::Registry;
use crate::behavior::explain;
use crate::behavior::BehaviorBuilder;
use crate::behavior::BehaviorNode;
use crate::behavior::ResolvedMatrix;
use crate::selector::ConsistencyMode;
use crate::selector::OperationKey;
use crate::selector::OperationKind;
use crate::selector::OperationShape;
use crate::settings::SettingsRecord;
use crate::RegistryError;
use crate::Result;

/// Named reference into a [`Registry`].
///
/// A handle holds the name, not the node: every read goes through the
/// registry, so a handle taken before a reload sees the reloaded behavior.
#[derive(Clone)]
pub struct Behavior {
    registry: Registry,
    name: Arc<str>,
}

impl std::fmt::Debug for Behavior {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_tuple("Behavior").field(&self.name).finish()
    }
}

impl PartialEq for Behavior {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.registry.inner, &other.registry.inner)
    }
}

impl Behavior {
    pub(super) fn new(
        registry: Registry,
        name: &str,
    ) -> Self {
        Self {
            registry,
            name: Arc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Node currently registered under this name
    pub fn node(&self) -> Result<Arc<BehaviorNode>> {
        self.registry
            .node(&self.name)
            .ok_or_else(|| RegistryError::UnknownBehavior(self.name.to_string()).into())
    }

    pub fn parent(&self) -> Option<Behavior> {
        let node = self.registry.node(&self.name)?;
        self.registry.find_by_name(node.parent()?)
    }

    pub fn get_settings(
        &self,
        kind: OperationKind,
        shape: OperationShape,
        mode: ConsistencyMode,
    ) -> Result<SettingsRecord> {
        self.registry.get_settings(&self.name, kind, shape, mode)
    }

    pub fn settings_for(
        &self,
        key: &OperationKey,
    ) -> Result<SettingsRecord> {
        self.registry.settings_for(&self.name, key)
    }

    pub fn matrix(&self) -> Result<Arc<ResolvedMatrix>> {
        self.registry.matrix_for(&self.name)
    }

    /// Builds a child of this behavior from the patches added by
    /// `configure` and registers it, replacing any behavior named `name`.
    ///
    /// # Example
    /// ```ignore
    /// let batch_heavy = registry.root().derive_with_changes("batch-heavy", |b| {
    ///     b.on(Selector::all().reads().batch(), |p| {
    ///         p.max_concurrent_nodes(0);
    ///     });
    /// })?;
    /// ```
    pub fn derive_with_changes(
        &self,
        name: impl Into<String>,
        configure: impl FnOnce(&mut BehaviorBuilder),
    ) -> Result<Behavior> {
        let mut builder = BehaviorBuilder::new(name).parent(self.name.to_string());
        configure(&mut builder);
        let node = self.registry.register(builder.build())?;
        Ok(Behavior::new(self.registry.clone(), node.name()))
    }

    /// Patch list and resolved matrix, for diagnostics
    pub fn explain(&self) -> Result<String> {
        let node = self.node()?;
        let matrix = self.registry.matrix_for(&self.name)?;
        Ok(explain(&node, &matrix))
    }

    pub fn children(&self) -> Vec<Behavior> {
        self.registry
            .children(&self.name)
            .iter()
            .map(|c| Behavior::new(self.registry.clone(), c))
            .collect()
    }

    pub fn find_in_subtree(
        &self,
        name: &str,
    ) -> Option<Behavior> {
        self.registry.find_in_subtree(&self.name, name)
    }

    /// Drops the cached matrices of this behavior and everything below it
    pub fn invalidate(&self) {
        self.registry.invalidate(&self.name);
    }
}
