/*!
 * Disposer Library
 * Hierarchical resource-lifecycle management
 *
 * Disposables register under a parent; disposing the parent tears the whole
 * subtree down bottom-up, exactly once.
 */

pub mod core;
pub mod disposable;
pub mod disposer;
pub mod monitoring;
pub mod tree;

// Re-exports
pub use crate::core::*;
pub use disposable::{
    CheckedDisposable, CheckedHandle, Disposable, DisposeAction, DisposedFlag, NamedDisposable,
    Parent,
};
pub use disposer::Disposer;
pub use monitoring::init_tracing;
pub use tree::{ObjectTree, Trace, TraceKind, TreeSnapshot};
