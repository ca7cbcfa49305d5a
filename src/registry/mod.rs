//! Process-wide behavior registry.
//!
//! Nodes live in a flat arena keyed by name. A node's parent is a name, and
//! the `children` index maps a parent name to the names that declare it, so
//! both directions of the tree are plain lookups and replacing a node is a
//! single map insert.
//!
//! ```text
//! register / install (serialized by write_lock):
//!   insert Arc<BehaviorNode> -> update children index -> invalidate subtree
//!
//! get_settings (lock free):
//!   nodes[name] -> cached matrix ?: walk up to first cached ancestor,
//!                  resolve downward, publish each level
//! ```

mod handle;

pub use handle::*;


use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::DashSet;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::behavior::resolve;
use crate::behavior::root_behavior;
use crate::behavior::BehaviorNode;
use crate::behavior::NodeOrigin;
use crate::behavior::ResolvedMatrix;
use crate::constants::ROOT_BEHAVIOR;
use crate::selector::ConsistencyMode;
use crate::selector::OperationKey;
use crate::selector::OperationKind;
use crate::selector::OperationShape;
use crate::settings::SettingsRecord;
use crate::RegistryError;
use crate::Result;

lazy_static! {
    static ref GLOBAL_REGISTRY: Registry = Registry::new();
}

/// Names touched by one [`Registry::install`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallSummary {
    /// Registered or replaced, in installation order
    pub installed: Vec<String>,
    /// Unregistered because the new set no longer declares them
    pub removed: Vec<String>,
}

struct RegistryInner {
    nodes: DashMap<String, Arc<BehaviorNode>>,
    /// parent name -> names declaring it as parent
    children: DashMap<String, DashSet<String>>,
    /// Serializes tree mutations; reads never take it
    write_lock: Mutex<()>,
}

/// Cheap to clone; all clones share the same tree.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl std::fmt::Debug for Registry {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("behaviors", &self.inner.nodes.len())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Fresh tree holding only the built-in root
    pub fn new() -> Self {
        let registry = Self {
            inner: Arc::new(RegistryInner {
                nodes: DashMap::new(),
                children: DashMap::new(),
                write_lock: Mutex::new(()),
            }),
        };
        registry.insert_node(Arc::new(root_behavior()));
        registry
    }

    /// Shared registry for applications that want a single tree per process
    pub fn global() -> Registry {
        GLOBAL_REGISTRY.clone()
    }

    pub fn root(&self) -> Behavior {
        Behavior::new(self.clone(), ROOT_BEHAVIOR)
    }

    /// Handle to a registered behavior
    pub fn behavior(
        &self,
        name: &str,
    ) -> Result<Behavior> {
        if !self.contains(name) {
            return Err(RegistryError::UnknownBehavior(name.to_string()).into());
        }
        Ok(Behavior::new(self.clone(), name))
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.inner.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.nodes.is_empty()
    }

    /// Current node registered under `name`
    pub fn node(
        &self,
        name: &str,
    ) -> Option<Arc<BehaviorNode>> {
        self.inner.nodes.get(name).map(|n| n.value().clone())
    }

    /// Registers `node`, replacing any node of the same name, and
    /// invalidates everything beneath it.
    ///
    /// The parent must already be registered and the new parent link must not
    /// close a cycle.
    pub fn register(
        &self,
        node: BehaviorNode,
    ) -> Result<Arc<BehaviorNode>> {
        let _guard = self.inner.write_lock.lock();

        check_settings(&node)?;
        let name = node.name().to_string();
        match node.parent() {
            Some(_) if name == ROOT_BEHAVIOR => {
                return Err(RegistryError::RootImmutable(name).into());
            }
            Some(parent) if !self.contains(parent) => {
                return Err(RegistryError::UnknownBehavior(parent.to_string()).into());
            }
            _ => {}
        }

        let parent = node.parent().map(str::to_string);
        if let Some(chain) = find_cycle(&name, parent, |n| self.node(n).and_then(|p| p.parent().map(str::to_string)))
        {
            return Err(RegistryError::CyclicParent { chain }.into());
        }

        let node = Arc::new(node);
        self.insert_node(node.clone());
        self.invalidate(&name);
        info!(behavior = %name, parent = ?node.parent(), "registered behavior");
        Ok(node)
    }

    /// Swaps in a batch of nodes, as produced by one document load.
    ///
    /// `nodes` must be ordered parent before child. When `prune` is set,
    /// document-defined behaviors absent from `nodes` are unregistered; a
    /// pruned root falls back to the built-in baseline. The whole batch is
    /// validated against the resulting tree before anything is swapped.
    pub fn install(
        &self,
        nodes: Vec<BehaviorNode>,
        prune: bool,
    ) -> Result<InstallSummary> {
        let _guard = self.inner.write_lock.lock();

        let incoming: HashMap<String, Option<String>> = nodes
            .iter()
            .map(|n| (n.name().to_string(), n.parent().map(str::to_string)))
            .collect();

        let mut pruned: Vec<String> = Vec::new();
        if prune {
            for entry in self.inner.nodes.iter() {
                if entry.origin() == NodeOrigin::Document && !incoming.contains_key(entry.key()) {
                    pruned.push(entry.key().clone());
                }
            }
            pruned.sort();
        }

        // Parent links of the tree as it will look after the swap
        let parent_of = |name: &str| -> Option<String> {
            if let Some(parent) = incoming.get(name) {
                return parent.clone();
            }
            if name == ROOT_BEHAVIOR || pruned.iter().any(|p| p == name) {
                return None;
            }
            self.node(name).and_then(|n| n.parent().map(str::to_string))
        };
        let will_exist = |name: &str| {
            incoming.contains_key(name)
                || name == ROOT_BEHAVIOR
                || (self.contains(name) && !pruned.iter().any(|p| p == name))
        };

        for node in &nodes {
            check_settings(node)?;
            match node.parent() {
                Some(_) if node.name() == ROOT_BEHAVIOR => {
                    return Err(RegistryError::RootImmutable(node.name().to_string()).into());
                }
                Some(parent) if !will_exist(parent) => {
                    return Err(RegistryError::UnknownBehavior(parent.to_string()).into());
                }
                _ => {}
            }
            if let Some(chain) = find_cycle(node.name(), parent_of(node.name()), &parent_of) {
                return Err(RegistryError::CyclicParent { chain }.into());
            }
        }

        let mut summary = InstallSummary::default();
        for name in pruned {
            if name == ROOT_BEHAVIOR {
                self.insert_node(Arc::new(root_behavior()));
            } else {
                self.remove_node(&name);
            }
            summary.removed.push(name);
        }
        for node in nodes {
            summary.installed.push(node.name().to_string());
            self.insert_node(Arc::new(node));
        }

        for name in summary.installed.iter().chain(summary.removed.iter()) {
            self.invalidate(name);
        }
        info!(
            installed = summary.installed.len(),
            removed = summary.removed.len(),
            "installed behavior set"
        );
        Ok(summary)
    }

    /// Unregisters a behavior. Its children keep naming it and resolve
    /// under the root until a behavior of that name is registered again.
    pub fn remove(
        &self,
        name: &str,
    ) -> Result<Arc<BehaviorNode>> {
        if name == ROOT_BEHAVIOR {
            return Err(RegistryError::RootImmutable(name.to_string()).into());
        }
        let _guard = self.inner.write_lock.lock();
        let removed = self
            .remove_node(name)
            .ok_or_else(|| RegistryError::UnknownBehavior(name.to_string()))?;
        self.invalidate(name);
        info!(behavior = %name, "removed behavior");
        Ok(removed)
    }

    fn insert_node(
        &self,
        node: Arc<BehaviorNode>,
    ) {
        let name = node.name().to_string();
        let new_parent = node.parent().map(str::to_string);
        let previous = self.inner.nodes.insert(name.clone(), node);

        if let Some(old_parent) = previous.as_ref().and_then(|p| p.parent().map(str::to_string)) {
            if new_parent.as_deref() != Some(old_parent.as_str()) {
                self.unlink_child(&old_parent, &name);
            }
        }
        if let Some(parent) = new_parent {
            self.inner.children.entry(parent).or_default().insert(name);
        }
    }

    fn remove_node(
        &self,
        name: &str,
    ) -> Option<Arc<BehaviorNode>> {
        let (_, node) = self.inner.nodes.remove(name)?;
        if let Some(parent) = node.parent() {
            self.unlink_child(parent, name);
        }
        Some(node)
    }

    /// Drops `child` from the index of `parent`, and the index entry once
    /// it is empty
    fn unlink_child(
        &self,
        parent: &str,
        child: &str,
    ) {
        if let Some(siblings) = self.inner.children.get(parent) {
            siblings.remove(child);
        }
        self.inner.children.remove_if(parent, |_, siblings| siblings.is_empty());
    }

    /// Clears the cache of `name` and of every node below it, parents
    /// before children. Nothing is recomputed here; each node recomputes
    /// from its parent's then-current matrix on its next read.
    pub fn invalidate(
        &self,
        name: &str,
    ) {
        let mut seen: HashSet<String> = HashSet::new();
        let mut stack = vec![name.to_string()];
        let mut count = 0usize;

        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(node) = self.node(&current) {
                node.invalidate();
                count += 1;
            }

            let mut next = self.child_names(&current);
            if current == ROOT_BEHAVIOR {
                next.extend(self.orphans());
            }
            // Reverse so the stack pops in name order
            next.sort_unstable_by(|a, b| b.cmp(a));
            stack.extend(next);
        }
        debug!(behavior = %name, invalidated = count, "propagated invalidation");
    }

    pub fn invalidate_all(&self) {
        self.invalidate(ROOT_BEHAVIOR);
    }

    fn child_names(
        &self,
        name: &str,
    ) -> Vec<String> {
        self.inner
            .children
            .get(name)
            .map(|set| set.iter().map(|c| c.key().clone()).collect())
            .unwrap_or_default()
    }

    /// Registered nodes whose declared parent is not registered
    fn orphans(&self) -> Vec<String> {
        let declared: Vec<(String, String)> = self
            .inner
            .nodes
            .iter()
            .filter_map(|n| n.parent().map(|p| (n.key().clone(), p.to_string())))
            .collect();
        declared
            .into_iter()
            .filter(|(_, parent)| !self.contains(parent))
            .map(|(name, _)| name)
            .collect()
    }

    /// Resolved matrix of `name`, computing and caching any missing level
    /// of its ancestor chain first.
    pub fn matrix_for(
        &self,
        name: &str,
    ) -> Result<Arc<ResolvedMatrix>> {
        let node = self
            .node(name)
            .ok_or_else(|| RegistryError::UnknownBehavior(name.to_string()))?;
        Ok(self.resolve_node(node))
    }

    fn resolve_node(
        &self,
        node: Arc<BehaviorNode>,
    ) -> Arc<ResolvedMatrix> {
        if let Some(matrix) = node.cached() {
            return matrix;
        }

        // Walk up until a cached ancestor or the root. Each epoch is read
        // before the parent's matrix is, so an invalidation that lands in
        // between makes the publish below withdraw the result.
        let mut pending: Vec<(Arc<BehaviorNode>, u64)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut base: Option<Arc<ResolvedMatrix>> = None;
        let mut cursor = Some(node);

        while let Some(current) = cursor.take() {
            if let Some(matrix) = current.cached() {
                base = Some(matrix);
                break;
            }
            seen.insert(current.name().to_string());
            pending.push((current.clone(), current.epoch()));

            let Some(parent_name) = current.parent() else {
                break;
            };
            let parent = match self.node(parent_name) {
                Some(parent) => parent,
                None => {
                    warn!(
                        behavior = %current.name(),
                        parent = %parent_name,
                        "parent is not registered, resolving under the root"
                    );
                    match self.node(ROOT_BEHAVIOR) {
                        Some(root) => root,
                        None => break,
                    }
                }
            };
            if seen.contains(parent.name()) {
                warn!(behavior = %current.name(), "parent chain changed during resolution");
                break;
            }
            cursor = Some(parent);
        }

        let mut matrix = base;
        while let Some((node, epoch)) = pending.pop() {
            let computed = Arc::new(resolve(matrix.as_deref(), node.patches()));
            debug!(behavior = %node.name(), "resolved behavior matrix");
            node.publish(computed.clone(), epoch);
            matrix = Some(computed);
        }
        matrix.unwrap_or_default()
    }

    /// Effective settings of `name` for one concrete operation. Fields
    /// configured nowhere in the ancestor chain are `None`.
    pub fn get_settings(
        &self,
        name: &str,
        kind: OperationKind,
        shape: OperationShape,
        mode: ConsistencyMode,
    ) -> Result<SettingsRecord> {
        let key = OperationKey::new(kind, shape, mode)
            .ok_or_else(|| RegistryError::InvalidOperationKey(format!("{kind}/{shape}/{mode}")))?;
        self.settings_for(name, &key)
    }

    pub fn settings_for(
        &self,
        name: &str,
        key: &OperationKey,
    ) -> Result<SettingsRecord> {
        let matrix = self.matrix_for(name)?;
        matrix
            .get(key)
            .copied()
            .ok_or_else(|| RegistryError::InvalidOperationKey(key.to_string()).into())
    }

    // -
    // Traversal

    /// Direct lookup through the name index
    pub fn find_by_name(
        &self,
        name: &str,
    ) -> Option<Behavior> {
        self.contains(name).then(|| Behavior::new(self.clone(), name))
    }

    /// Breadth-first search for `name` among `start` and its descendants
    pub fn find_in_subtree(
        &self,
        start: &str,
        name: &str,
    ) -> Option<Behavior> {
        if !self.contains(start) {
            return None;
        }
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue = VecDeque::from([start.to_string()]);
        while let Some(current) = queue.pop_front() {
            if current == name {
                return self.find_by_name(name);
            }
            if seen.insert(current.clone()) {
                queue.extend(self.children(&current));
            }
        }
        None
    }

    /// Registered behaviors declaring `name` as parent, sorted
    pub fn children(
        &self,
        name: &str,
    ) -> Vec<String> {
        let mut children: Vec<String> = self
            .child_names(name)
            .into_iter()
            .filter(|c| self.contains(c))
            .collect();
        children.sort();
        children
    }

    /// Every registered behavior below `name`, depth-first pre-order
    pub fn descendants(
        &self,
        name: &str,
    ) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen: HashSet<String> = HashSet::from([name.to_string()]);
        let mut stack: Vec<String> = self.children(name).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            stack.extend(self.children(&current).into_iter().rev());
            out.push(current);
        }
        out
    }

    /// Parent chain of `name`, nearest first, ending at the root
    pub fn ancestors(
        &self,
        name: &str,
    ) -> Result<Vec<String>> {
        let node = self
            .node(name)
            .ok_or_else(|| RegistryError::UnknownBehavior(name.to_string()))?;
        let mut out: Vec<String> = Vec::new();
        let mut cursor = node.parent().map(str::to_string);
        while let Some(current) = cursor {
            if out.contains(&current) || current == name {
                break;
            }
            cursor = match self.node(&current) {
                Some(parent) => parent.parent().map(str::to_string),
                // Orphaned below this point, resolution continues at the root
                None if current != ROOT_BEHAVIOR => Some(ROOT_BEHAVIOR.to_string()),
                None => None,
            };
            out.push(current);
        }
        Ok(out)
    }

    /// Every registered name, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.nodes.iter().map(|n| n.key().clone()).collect();
        names.sort();
        names
    }
}

/// Range checks shared by every way a node reaches the registry
fn check_settings(node: &BehaviorNode) -> Result<()> {
    node.validate().map_err(|invalid| {
        RegistryError::InvalidSetting {
            behavior: node.name().to_string(),
            field: invalid.field,
            reason: invalid.reason,
        }
        .into()
    })
}

/// Follows parent links from `parent` and returns the chain if it leads
/// back to `name`.
fn find_cycle(
    name: &str,
    parent: Option<String>,
    parent_of: impl Fn(&str) -> Option<String>,
) -> Option<Vec<String>> {
    let mut chain = vec![name.to_string()];
    let mut cursor = parent;
    while let Some(current) = cursor {
        let closes = current == name;
        let revisits = chain.contains(&current);
        chain.push(current.clone());
        if closes {
            return Some(chain);
        }
        if revisits {
            // Loop above `name`, reported from the node that closes it
            return None;
        }
        cursor = parent_of(&current);
    }
    None
}
