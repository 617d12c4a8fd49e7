/*!
 * Disposer
 * Process-wide entry point to the ownership tree
 *
 * ## Example
 *
 * ```rust
 * use disposer::{Disposer, DisposableRef};
 *
 * let project = Disposer::new_named_disposable("project");
 * let editor = Disposer::new_child_disposable(&project, "editor").unwrap();
 *
 * Disposer::dispose(&project).unwrap();
 * assert!(Disposer::is_disposed(editor.as_ref()));
 * ```
 */

use crate::core::config::DisposerConfig;
use crate::core::errors::{DisposeResult, DisposerResult};
use crate::core::types::DisposableRef;
use crate::disposable::{CheckedHandle, Disposable, DisposeAction, NamedDisposable};
use crate::tree::{ObjectTree, Trace, TreeSnapshot};
use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

/// Global tree, created from the environment on first use
static TREE: OnceLock<ObjectTree> = OnceLock::new();

/// Facade over the process-wide `ObjectTree`
///
/// Stateless: every method delegates to the shared tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disposer;

impl Disposer {
    /// The shared tree
    pub fn tree() -> &'static ObjectTree {
        TREE.get_or_init(|| {
            let config = DisposerConfig::from_env();
            tracing::debug!(
                debug = config.debug,
                capacity = config.disposed_trace_capacity.get(),
                "Disposer tree initialized"
            );
            ObjectTree::new(&config)
        })
    }

    // ========================================================================
    // Factories
    // ========================================================================

    pub fn new_disposable() -> DisposableRef {
        Arc::new(NamedDisposable::anonymous())
    }

    pub fn new_named_disposable(name: impl Into<Cow<'static, str>>) -> DisposableRef {
        Arc::new(NamedDisposable::new(name))
    }

    /// Create a named disposable already registered under `parent`
    pub fn new_child_disposable(
        parent: &DisposableRef,
        name: impl Into<Cow<'static, str>>,
    ) -> DisposerResult<DisposableRef> {
        let child = Self::new_named_disposable(name);
        Self::register(parent, Arc::clone(&child))?;
        Ok(child)
    }

    pub fn new_checked_disposable(name: impl Into<String>) -> Arc<CheckedHandle> {
        Arc::new(CheckedHandle::new(name))
    }

    /// Disposable running `action` once on teardown
    pub fn on_dispose<F>(name: impl Into<Cow<'static, str>>, action: F) -> DisposableRef
    where
        F: FnOnce() -> DisposeResult + Send + 'static,
    {
        Arc::new(DisposeAction::new(name, action))
    }

    // ========================================================================
    // Registration and Disposal
    // ========================================================================

    #[inline]
    pub fn register(parent: &DisposableRef, child: DisposableRef) -> DisposerResult<()> {
        Self::tree().register(parent, child)
    }

    #[inline]
    pub fn try_register(parent: &DisposableRef, child: DisposableRef) -> DisposerResult<bool> {
        Self::tree().try_register(parent, child)
    }

    /// Dispose `object` and everything registered under it
    #[inline]
    pub fn dispose(object: &DisposableRef) -> DisposerResult<()> {
        Self::tree().execute_all(object, true)
    }

    #[inline]
    pub fn dispose_with(object: &DisposableRef, process_unregistered: bool) -> DisposerResult<()> {
        Self::tree().execute_all(object, process_unregistered)
    }

    #[inline]
    pub fn dispose_children<P>(object: &DisposableRef, predicate: P) -> DisposerResult<()>
    where
        P: Fn(&dyn Disposable) -> bool,
    {
        Self::tree().dispose_children(object, predicate)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    pub fn is_disposed(object: &dyn Disposable) -> bool {
        Self::tree().is_disposed(object)
    }

    #[inline]
    pub fn find_registered_object(
        parent: &dyn Disposable,
        object: &dyn Disposable,
    ) -> Option<DisposableRef> {
        Self::tree().find_registered_object(parent, object)
    }

    #[inline]
    pub fn parent_of(object: &dyn Disposable) -> Option<DisposableRef> {
        Self::tree().parent_of(object)
    }

    #[inline]
    pub fn registration_trace(object: &dyn Disposable) -> Option<Arc<Trace>> {
        Self::tree().registration_trace(object)
    }

    #[inline]
    pub fn disposal_trace(object: &dyn Disposable) -> Option<Arc<Trace>> {
        Self::tree().disposal_trace(object)
    }

    #[inline]
    pub fn clear_disposal_traces() {
        Self::tree().clear_disposal_traces();
    }

    #[inline]
    pub fn purge_disposal_traces() -> usize {
        Self::tree().purge_disposal_traces()
    }

    #[inline]
    pub fn snapshot() -> TreeSnapshot {
        Self::tree().snapshot()
    }

    /// Test hook: fail if anything is still registered
    #[inline]
    pub fn assert_is_empty() -> DisposerResult<()> {
        Self::tree().assert_is_empty()
    }

    // ========================================================================
    // Debug Mode
    // ========================================================================

    #[inline]
    pub fn is_debug_mode() -> bool {
        Self::tree().is_debug_mode()
    }

    /// Toggle trace capture, returning the previous value
    #[inline]
    pub fn set_debug_mode(debug: bool) -> bool {
        Self::tree().set_debug_mode(debug)
    }
}
