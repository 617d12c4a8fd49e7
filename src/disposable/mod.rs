/*!
 * Disposable Contract
 *
 * The minimal capability any lifecycle-managed resource implements.
 *
 * ## Traits
 *
 * - **Disposable**: single teardown operation, invoked at most once by the tree
 * - **Parent**: optional hook run before any descendant is torn down
 * - **CheckedDisposable**: self-reports its disposed state via a `DisposedFlag`
 *
 * Capabilities are exposed through `as_parent` / `as_checked` so the tree can
 * resolve them once per node instead of probing types during traversal.
 */

mod checked;
mod named;

pub use checked::{CheckedHandle, DisposedFlag};
pub use named::{DisposeAction, NamedDisposable};

use crate::core::errors::DisposeResult;
use std::borrow::Cow;

/// Core disposable trait
///
/// `dispose` may be called from any thread and must not assume its parent is
/// still present in the tree. Errors and panics are collected by the tree and
/// never abort the rest of a traversal.
pub trait Disposable: Send + Sync + 'static {
    /// Release the resource
    fn dispose(&self) -> DisposeResult;

    /// Debug name used in logs, errors, and tree renderings
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }

    fn as_parent(&self) -> Option<&dyn Parent> {
        None
    }

    fn as_checked(&self) -> Option<&dyn CheckedDisposable> {
        None
    }
}

/// Disposables that want to run code while their subtree is still intact
pub trait Parent: Disposable {
    /// Called top-down before any `dispose` of the subtree runs
    fn before_tree_dispose(&self) -> DisposeResult;
}

/// Disposables tracking their own disposed state
///
/// The tree sets the flag when it detaches the object for disposal and clears
/// it when the object is registered again.
pub trait CheckedDisposable: Disposable {
    fn disposed_flag(&self) -> &DisposedFlag;

    #[inline]
    fn is_disposed(&self) -> bool {
        self.disposed_flag().get()
    }
}
