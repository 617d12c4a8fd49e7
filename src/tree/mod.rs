/*!
 * Object Tree
 *
 * The disposal ownership forest. A single mutex (the tree lock) protects the
 * node arena, the object → node index, the root list, and the disposed-object
 * records.
 *
 * ## Disposal
 *
 * 1. **Detach** (lock held): the whole subtree is unlinked, removed from the
 *    index, and marked disposed in one lock acquisition
 * 2. **Hooks** (no lock): `before_tree_dispose` top-down
 * 3. **Teardown** (no lock): `dispose` bottom-up
 *
 * Because step 1 marks every detached object as disposed, a concurrent or
 * re-entrant `register` under any of them fails with `AlreadyDisposed`
 * instead of attaching to a node that no longer exists.
 */

pub mod node;
pub mod trace;
pub mod traversal;

pub use node::{NodeArena, ObjectNode, RemovedNode};
pub use trace::{DisposedTraces, Trace, TraceKind};
pub use traversal::DisposalContext;

use crate::core::config::{DisposerConfig, FailurePolicy};
use crate::core::errors::{DisposerError, DisposerResult};
use crate::core::types::{Capabilities, DisposableRef, NodeId, ObjectKey};
use crate::disposable::Disposable;
use crate::monitoring::DisposalSpan;
use ahash::RandomState;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Structural state guarded by the tree lock
struct TreeState {
    nodes: NodeArena,
    index: HashMap<ObjectKey, NodeId, RandomState>,
    /// Root-level nodes in insertion order
    roots: Vec<NodeId>,
    disposed: DisposedTraces,
}

impl TreeState {
    fn new(config: &DisposerConfig) -> Self {
        Self {
            nodes: NodeArena::new(),
            index: HashMap::with_hasher(RandomState::new()),
            roots: Vec::new(),
            disposed: DisposedTraces::new(config.disposed_trace_capacity),
        }
    }

    #[inline]
    fn node_of(&self, object: &dyn Disposable) -> Option<NodeId> {
        self.index.get(&ObjectKey::of_dyn(object)).copied()
    }

    fn is_disposed(&self, object: &dyn Disposable) -> bool {
        match object.as_checked() {
            Some(checked) => checked.is_disposed(),
            None => self.disposed.contains(ObjectKey::of_dyn(object)),
        }
    }

    /// Insert a node and link it under `parent` (or the root list)
    fn attach_new(&mut self, object: DisposableRef, parent: Option<NodeId>, debug: bool) -> NodeId {
        let key = ObjectKey::of(&object);
        // Only root-level nodes carry a creation trace
        let trace = if parent.is_none() {
            Trace::capture_if(debug, TraceKind::Registration)
        } else {
            None
        };
        let id = self.nodes.insert(ObjectNode::new(object, parent, trace));
        self.link(id, parent);
        self.index.insert(key, id);
        tracing::trace!(node = %id, object = %key, "Created tree node");
        id
    }

    fn link(&mut self, id: NodeId, parent: Option<NodeId>) {
        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent_node) => parent_node.add_child(id),
            None => self.roots.push(id),
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.set_parent(parent);
        }
    }

    fn unlink(&mut self, id: NodeId) {
        let parent = self.nodes.get(id).and_then(ObjectNode::parent);
        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent_node) => {
                parent_node.remove_child(id);
            }
            None => {
                if let Some(pos) = self.roots.iter().position(|&root| root == id) {
                    self.roots.remove(pos);
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.set_parent(None);
        }
    }

    /// Detach the subtree at `id`, dropping it from the index and marking
    /// every member disposed
    fn detach(&mut self, id: NodeId, trace: Option<&Arc<Trace>>, out: &mut Vec<RemovedNode>) {
        self.unlink(id);
        let start = out.len();
        self.nodes.remove_subtree(id, out);
        for removed in &out[start..] {
            self.index.remove(&ObjectKey::of(&removed.object));
            self.mark_disposed(&removed.object, removed.capabilities, trace);
        }
    }

    fn mark_disposed(
        &mut self,
        object: &DisposableRef,
        capabilities: Capabilities,
        trace: Option<&Arc<Trace>>,
    ) {
        if capabilities.checked {
            if let Some(checked) = object.as_checked() {
                checked.disposed_flag().mark();
            }
            // Self-reporting objects only need a record to keep the trace
            if trace.is_none() {
                return;
            }
        }
        self.disposed.remember(object, trace.cloned());
    }

    fn snapshot_node(&self, id: NodeId) -> Option<NodeSnapshot> {
        let node = self.nodes.get(id)?;
        Some(NodeSnapshot {
            name: node.object().name().into_owned(),
            capabilities: node.capabilities(),
            has_trace: node.trace().is_some(),
            children: node
                .children()
                .iter()
                .filter_map(|&child| self.snapshot_node(child))
                .collect(),
        })
    }
}

/// The ownership tree
pub struct ObjectTree {
    state: Mutex<TreeState>,
    debug: AtomicBool,
    failure_policy: FailurePolicy,
}

impl ObjectTree {
    pub fn new(config: &DisposerConfig) -> Self {
        Self {
            state: Mutex::new(TreeState::new(config)),
            debug: AtomicBool::new(config.debug),
            failure_policy: config.failure_policy,
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register `child` under `parent`, moving it if it already has a parent
    ///
    /// # Errors
    ///
    /// - `IllegalUsage` when `parent` is `child` or a descendant of it
    /// - `AlreadyDisposed` when `parent` has been disposed
    ///
    /// On error the tree is left unchanged.
    pub fn register(&self, parent: &DisposableRef, child: DisposableRef) -> DisposerResult<()> {
        if ObjectKey::of(parent) == ObjectKey::of(&child) {
            return Err(DisposerError::IllegalUsage(format!(
                "cannot register {} to itself",
                child.name()
            )));
        }

        let debug = self.is_debug_mode();
        let moved = {
            let mut state = self.state.lock();

            if state.is_disposed(parent.as_ref()) {
                let disposal_trace = state
                    .disposed
                    .trace_of(ObjectKey::of(parent))
                    .flatten()
                    .map(|trace| trace.to_string());
                drop(state);
                warn!(parent = %parent.name(), "Rejected registration under disposed parent");
                return Err(DisposerError::AlreadyDisposed {
                    parent: parent.name().into_owned(),
                    disposal_trace,
                });
            }

            let parent_id = state.node_of(parent.as_ref());
            let child_id = state.node_of(child.as_ref());

            if let (Some(p), Some(c)) = (parent_id, child_id) {
                if state.nodes.is_ancestor_or_self(c, p) {
                    drop(state);
                    warn!(parent = %parent.name(), child = %child.name(), "Rejected cyclic registration");
                    return Err(DisposerError::IllegalUsage(format!(
                        "{} is already an ancestor of {}",
                        child.name(),
                        parent.name()
                    )));
                }
            }

            // Registering a disposed object revives it
            state.disposed.forget(ObjectKey::of(&child));
            if let Some(checked) = child.as_checked() {
                checked.disposed_flag().reset();
            }

            let parent_id = match parent_id {
                Some(id) => id,
                None => state.attach_new(Arc::clone(parent), None, debug),
            };

            match child_id {
                Some(c) => {
                    state.unlink(c);
                    state.link(c, Some(parent_id));
                    true
                }
                None => {
                    state.attach_new(child.clone(), Some(parent_id), debug);
                    false
                }
            }
        };

        debug!(
            parent = %parent.name(),
            child = %child.name(),
            moved,
            "Registered disposable"
        );
        Ok(())
    }

    /// Like `register`, but reports a disposed parent as `Ok(false)`
    pub fn try_register(&self, parent: &DisposableRef, child: DisposableRef) -> DisposerResult<bool> {
        match self.register(parent, child) {
            Ok(()) => Ok(true),
            Err(DisposerError::AlreadyDisposed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Disposal
    // ========================================================================

    /// Dispose `object` and its whole subtree
    ///
    /// When `object` is not registered it is only disposed if
    /// `process_unregistered` is set and it is not already disposed.
    pub fn execute_all(&self, object: &DisposableRef, process_unregistered: bool) -> DisposerResult<()> {
        let trace = Trace::capture_if(self.is_debug_mode(), TraceKind::Disposal);
        let mut detached = Vec::new();
        {
            let mut state = self.state.lock();
            match state.node_of(object.as_ref()) {
                Some(id) => state.detach(id, trace.as_ref(), &mut detached),
                None => {
                    if !process_unregistered || state.is_disposed(object.as_ref()) {
                        return Ok(());
                    }
                    let capabilities = Capabilities::of(object.as_ref());
                    state.mark_disposed(object, capabilities, trace.as_ref());
                    detached.push(RemovedNode {
                        object: Arc::clone(object),
                        capabilities,
                    });
                }
            }
        }

        self.run_detached(object, &detached)
    }

    /// Dispose the direct children of `object` accepted by `predicate`
    ///
    /// `object` stays registered. The predicate runs without the tree lock
    /// over a snapshot of the children, before anything is detached, so a
    /// panicking predicate leaves the tree untouched. Children that moved away
    /// or were disposed in the meantime are skipped.
    pub fn dispose_children<P>(&self, object: &DisposableRef, predicate: P) -> DisposerResult<()>
    where
        P: Fn(&dyn Disposable) -> bool,
    {
        let children: Vec<(NodeId, DisposableRef)> = {
            let state = self.state.lock();
            let Some(node) = state.node_of(object.as_ref()).and_then(|id| state.nodes.get(id)) else {
                return Ok(());
            };
            let children = node
                .children()
                .iter()
                .filter_map(|&child| {
                    state
                        .nodes
                        .get(child)
                        .map(|node| (child, Arc::clone(node.object())))
                })
                .collect();
            children
        };

        let accepted: Vec<(NodeId, DisposableRef)> = children
            .into_iter()
            .rev()
            .filter(|(_, child)| predicate(child.as_ref()))
            .collect();
        if accepted.is_empty() {
            return Ok(());
        }

        let trace = Trace::capture_if(self.is_debug_mode(), TraceKind::Disposal);
        let mut detached = Vec::new();
        {
            let mut state = self.state.lock();
            let Some(id) = state.node_of(object.as_ref()) else {
                return Ok(());
            };
            for (child, child_object) in &accepted {
                let still_child = state.node_of(child_object.as_ref()) == Some(*child)
                    && state.nodes.get(*child).and_then(ObjectNode::parent) == Some(id);
                if still_child {
                    state.detach(*child, trace.as_ref(), &mut detached);
                }
            }
        }

        if detached.is_empty() {
            return Ok(());
        }
        self.run_detached(object, &detached)
    }

    /// Run the callback phases of a detached subtree outside the lock
    fn run_detached(&self, root: &DisposableRef, detached: &[RemovedNode]) -> DisposerResult<()> {
        debug!(root = %root.name(), subtree = detached.len(), "Disposing");
        let span = DisposalSpan::new(&root.name(), detached.len());
        let mut ctx = DisposalContext::new();
        {
            let _entered = span.enter();
            ctx.run(detached);
            span.record_failures(ctx.failures().len());
        }
        drop(span);
        ctx.finish(self.failure_policy)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether `object` is known to be disposed
    pub fn is_disposed(&self, object: &dyn Disposable) -> bool {
        if let Some(checked) = object.as_checked() {
            return checked.is_disposed();
        }
        self.state.lock().is_disposed(object)
    }

    pub fn is_registered(&self, object: &dyn Disposable) -> bool {
        self.state.lock().node_of(object).is_some()
    }

    /// `object` if it is a direct child of `parent`
    pub fn find_registered_object(
        &self,
        parent: &dyn Disposable,
        object: &dyn Disposable,
    ) -> Option<DisposableRef> {
        let state = self.state.lock();
        let parent_id = state.node_of(parent)?;
        let node = state.nodes.get(state.node_of(object)?)?;
        (node.parent() == Some(parent_id)).then(|| Arc::clone(node.object()))
    }

    /// Registered parent of `object`, `None` for root-level or unknown objects
    pub fn parent_of(&self, object: &dyn Disposable) -> Option<DisposableRef> {
        let state = self.state.lock();
        let node = state.nodes.get(state.node_of(object)?)?;
        let parent = state.nodes.get(node.parent()?)?;
        Some(Arc::clone(parent.object()))
    }

    /// Creation trace of a root-level node, captured in debug mode
    pub fn registration_trace(&self, object: &dyn Disposable) -> Option<Arc<Trace>> {
        let state = self.state.lock();
        let node = state.nodes.get(state.node_of(object)?)?;
        node.trace().cloned()
    }

    /// Drop the creation trace of a registered object
    pub fn clear_registration_trace(&self, object: &dyn Disposable) {
        let mut state = self.state.lock();
        if let Some(id) = state.node_of(object) {
            if let Some(node) = state.nodes.get_mut(id) {
                node.clear_trace();
            }
        }
    }

    /// Trace of the disposal of `object`, captured in debug mode
    pub fn disposal_trace(&self, object: &dyn Disposable) -> Option<Arc<Trace>> {
        self.state
            .lock()
            .disposed
            .trace_of(ObjectKey::of_dyn(object))
            .flatten()
    }

    /// Forget every disposed-object record
    pub fn clear_disposal_traces(&self) {
        self.state.lock().disposed.clear();
    }

    /// Forget records of objects that have been deallocated
    pub fn purge_disposal_traces(&self) -> usize {
        self.state.lock().disposed.purge_dead()
    }

    /// Number of live registrations
    pub fn len(&self) -> usize {
        self.state.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live forest in insertion order
    pub fn snapshot(&self) -> TreeSnapshot {
        let state = self.state.lock();
        TreeSnapshot {
            live: state.nodes.len(),
            disposed_records: state.disposed.len(),
            roots: state
                .roots
                .iter()
                .filter_map(|&root| state.snapshot_node(root))
                .collect(),
        }
    }

    /// Test hook: fail if anything is still registered
    pub fn assert_is_empty(&self) -> DisposerResult<()> {
        let snapshot = self.snapshot();
        if snapshot.live == 0 {
            return Ok(());
        }
        Err(DisposerError::NotEmpty {
            count: snapshot.live,
            rendered: snapshot.render(),
        })
    }

    // ========================================================================
    // Debug Mode
    // ========================================================================

    #[inline]
    pub fn is_debug_mode(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Toggle trace capture, returning the previous value
    pub fn set_debug_mode(&self, debug: bool) -> bool {
        self.debug.swap(debug, Ordering::Relaxed)
    }

    #[inline]
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }
}

impl Default for ObjectTree {
    fn default() -> Self {
        Self::new(&DisposerConfig::default())
    }
}

/// Serializable view of one live node
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub name: String,
    pub capabilities: Capabilities,
    pub has_trace: bool,
    pub children: Vec<NodeSnapshot>,
}

/// Serializable view of the live forest
#[derive(Debug, Clone, Serialize)]
pub struct TreeSnapshot {
    pub live: usize,
    pub disposed_records: usize,
    pub roots: Vec<NodeSnapshot>,
}

impl TreeSnapshot {
    /// Indented text rendering, two spaces per level
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(&NodeSnapshot, usize)> =
            self.roots.iter().rev().map(|root| (root, 0)).collect();
        while let Some((node, depth)) = stack.pop() {
            out.push_str(&"  ".repeat(depth));
            out.push_str(&node.name);
            out.push('\n');
            stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
