use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::trace;

use super::ResolvedMatrix;
use crate::selector::Patch;
use crate::settings::InvalidSetting;

/// Where a node came from; decides whether a document reload may prune it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOrigin {
    /// The root baseline created with the registry
    Builtin,
    /// `derive_with_changes` or a hand-built [`BehaviorBuilder`](super::BehaviorBuilder)
    Programmatic,
    /// Parsed from a behavior document
    Document,
}

/// A matrix together with the node epoch it was computed under
struct CachedMatrix {
    epoch: u64,
    matrix: Arc<ResolvedMatrix>,
}

/// A named, immutable bundle of ordered patches plus a lazily computed
/// resolution matrix.
///
/// The parent is referenced by name and looked up through the registry, so
/// replacing the parent never requires touching this node. Only the cache
/// changes after construction, and only by whole-snapshot replacement.
pub struct BehaviorNode {
    name: String,
    parent: Option<String>,
    patches: Vec<Patch>,
    origin: NodeOrigin,
    cache: ArcSwapOption<CachedMatrix>,
    /// Bumped by every invalidation; a matrix tagged with an older epoch is never served
    epoch: AtomicU64,
}

impl std::fmt::Debug for BehaviorNode {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("BehaviorNode")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("patches", &self.patches.len())
            .field("origin", &self.origin)
            .field("cached", &self.cached().is_some())
            .finish()
    }
}

impl BehaviorNode {
    pub(crate) fn new(
        name: String,
        parent: Option<String>,
        patches: Vec<Patch>,
        origin: NodeOrigin,
    ) -> Self {
        Self {
            name,
            parent,
            patches,
            origin,
            cache: ArcSwapOption::empty(),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `None` only for the root
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn origin(&self) -> NodeOrigin {
        self.origin
    }

    /// First patch value outside its accepted range
    pub fn validate(&self) -> std::result::Result<(), InvalidSetting> {
        self.patches.iter().try_for_each(|p| p.settings().validate())
    }

    /// Currently published matrix, if it was computed under the current epoch
    pub fn cached(&self) -> Option<Arc<ResolvedMatrix>> {
        let guard = self.cache.load();
        let entry = guard.as_ref()?;
        (entry.epoch == self.epoch.load(Ordering::SeqCst)).then(|| entry.matrix.clone())
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Drops the published matrix; the next read recomputes from the
    /// parent's then-current matrix.
    pub(crate) fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.cache.store(None);
        trace!(behavior = %self.name, "resolution cache invalidated");
    }

    /// Publishes a matrix computed while the node was at `computed_at`.
    ///
    /// The matrix is tagged with that epoch; once an invalidation bumps the
    /// epoch, [`cached`](Self::cached) no longer hands it out.
    pub(crate) fn publish(
        &self,
        matrix: Arc<ResolvedMatrix>,
        computed_at: u64,
    ) -> bool {
        if self.epoch.load(Ordering::SeqCst) != computed_at {
            trace!(behavior = %self.name, "discarded matrix computed before invalidation");
            return false;
        }
        self.cache.store(Some(Arc::new(CachedMatrix {
            epoch: computed_at,
            matrix,
        })));
        self.epoch.load(Ordering::SeqCst) == computed_at
    }
}
