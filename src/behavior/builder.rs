use super::BehaviorNode;
use super::NodeOrigin;
use crate::constants::ROOT_BEHAVIOR;
use crate::selector::Patch;
use crate::selector::PatchBuilder;
use crate::selector::Selector;

/// Node under construction. Patches are recorded in call order and frozen
/// by [`build`](BehaviorBuilder::build).
///
/// # Example
/// ```ignore
/// let mut builder = BehaviorBuilder::new("bulk-import");
/// builder
///     .on(Selector::all(), |p| {
///         p.max_attempts(5);
///     })
///     .on(Selector::all().reads().batch(), |p| {
///         p.max_concurrent_nodes(0).allow_inline(false);
///     });
/// let node = builder.build();
/// ```
#[derive(Debug)]
pub struct BehaviorBuilder {
    name: String,
    parent: Option<String>,
    patches: Vec<Patch>,
    origin: NodeOrigin,
}

impl BehaviorBuilder {
    /// New behavior whose parent defaults to the root
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            patches: Vec::new(),
            origin: NodeOrigin::Programmatic,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(
        mut self,
        parent: impl Into<String>,
    ) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub(crate) fn origin(
        mut self,
        origin: NodeOrigin,
    ) -> Self {
        self.origin = origin;
        self
    }

    /// Appends one patch addressed by `selector`. Only the setters valid
    /// for the selector's narrowing are available inside `configure`.
    pub fn on<K, S, M>(
        &mut self,
        selector: Selector<K, S, M>,
        configure: impl FnOnce(&mut PatchBuilder<K, S, M>),
    ) -> &mut Self {
        let mut patch = PatchBuilder::new(selector);
        configure(&mut patch);
        if let Some(patch) = patch.into_patch() {
            self.patches.push(patch);
        }
        self
    }

    /// Appends an already validated patch
    pub fn push(
        &mut self,
        patch: Patch,
    ) -> &mut Self {
        self.patches.push(patch);
        self
    }

    pub fn extend(
        &mut self,
        patches: impl IntoIterator<Item = Patch>,
    ) -> &mut Self {
        self.patches.extend(patches);
        self
    }

    /// Freezes the patch list. Any behavior other than the root without an
    /// explicit parent is attached to the root.
    pub fn build(self) -> BehaviorNode {
        let parent = match self.parent {
            Some(parent) => Some(parent),
            None if self.name == ROOT_BEHAVIOR => None,
            None => Some(ROOT_BEHAVIOR.to_string()),
        };
        BehaviorNode::new(self.name, parent, self.patches, self.origin)
    }
}
