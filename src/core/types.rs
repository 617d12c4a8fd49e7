/*!
 * Core Types
 * Identity tokens and arena handles shared across the tree
 */

use crate::disposable::Disposable;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a lifecycle-managed object
pub type DisposableRef = Arc<dyn Disposable>;

// ============================================================================
// Object Identity
// ============================================================================

/// Identity of a disposable: the address of its `Arc` allocation
///
/// Two handles compare equal only when they point at the same allocation,
/// never by structural equality. A key is only meaningful while something
/// keeps the allocation alive (a live node's `Arc` or a disposed record's
/// `Weak`), which prevents address reuse from aliasing a different object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(usize);

impl ObjectKey {
    #[inline]
    pub fn of(object: &DisposableRef) -> Self {
        Self(Arc::as_ptr(object) as *const () as usize)
    }

    #[inline]
    pub(crate) fn of_dyn(object: &dyn Disposable) -> Self {
        Self(object as *const dyn Disposable as *const () as usize)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

// ============================================================================
// Arena Handles
// ============================================================================

/// Generational handle of a node in the tree arena
///
/// Freed slots are reused with a bumped generation so a stale id never
/// resolves to a different node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    #[inline]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub(crate) const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// Optional capabilities of a disposable, resolved once at node creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Implements `Parent::before_tree_dispose`
    pub parent_hook: bool,
    /// Self-reports its disposed state
    pub checked: bool,
}

impl Capabilities {
    pub fn of(object: &dyn Disposable) -> Self {
        Self {
            parent_hook: object.as_parent().is_some(),
            checked: object.as_checked().is_some(),
        }
    }
}
