/*!
 * Object Nodes
 *
 * Arena-backed tree nodes. Each node owns its disposable and the ids of its
 * children; the parent link is a plain id used for traversal only.
 */

use super::trace::Trace;
use crate::core::types::{Capabilities, DisposableRef, NodeId};
use std::sync::Arc;

/// One disposable's position in the tree
pub struct ObjectNode {
    object: DisposableRef,
    capabilities: Capabilities,
    /// `None` for root-level nodes
    parent: Option<NodeId>,
    /// Insertion order
    children: Vec<NodeId>,
    trace: Option<Arc<Trace>>,
}

impl ObjectNode {
    pub fn new(object: DisposableRef, parent: Option<NodeId>, trace: Option<Arc<Trace>>) -> Self {
        let capabilities = Capabilities::of(object.as_ref());
        Self {
            object,
            capabilities,
            parent,
            children: Vec::new(),
            trace,
        }
    }

    #[inline]
    pub fn object(&self) -> &DisposableRef {
        &self.object
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn add_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    /// Remove a child id, preserving the order of the others
    pub fn remove_child(&mut self, child: NodeId) -> bool {
        match self.children.iter().position(|&id| id == child) {
            Some(pos) => {
                self.children.remove(pos);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn trace(&self) -> Option<&Arc<Trace>> {
        self.trace.as_ref()
    }

    #[inline]
    pub fn clear_trace(&mut self) {
        self.trace = None;
    }
}

struct Slot {
    generation: u32,
    node: Option<ObjectNode>,
}

/// Slot arena with generational ids and free-list reuse
#[derive(Default)]
pub struct NodeArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: ObjectNode) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.node = Some(node);
            return NodeId::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 1,
            node: Some(node),
        });
        NodeId::new(index, 1)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<ObjectNode> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation() {
            return None;
        }
        let node = slot.node.take()?;
        self.free.push(id.index() as u32);
        self.live -= 1;
        Some(node)
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&ObjectNode> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut ObjectNode> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(ObjectNode::parent);
        }
        false
    }

    /// Remove the subtree rooted at `id`, appending its objects children-first
    ///
    /// Siblings are visited last-registered first, so the resulting list
    /// disposes in reverse registration order. The root's parent link is not
    /// touched; callers detach it from its parent first.
    pub fn remove_subtree(&mut self, id: NodeId, out: &mut Vec<RemovedNode>) {
        enum Step {
            Visit(NodeId),
            Emit(RemovedNode),
        }

        // Explicit stack: ownership chains can be deeper than the thread stack
        let mut stack = vec![Step::Visit(id)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Emit(removed) => out.push(removed),
                Step::Visit(id) => {
                    let Some(node) = self.remove(id) else {
                        continue;
                    };
                    stack.push(Step::Emit(RemovedNode {
                        object: node.object,
                        capabilities: node.capabilities,
                    }));
                    stack.extend(node.children.into_iter().map(Step::Visit));
                }
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

/// Object taken out of the tree by a detach
pub struct RemovedNode {
    pub object: DisposableRef,
    pub capabilities: Capabilities,
}
