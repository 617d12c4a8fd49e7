/*!
 * Trace Capacity Tests
 * Disposal status must survive eviction of disposal traces
 */

use crate::support::*;
use disposer::{DisposableRef, DisposerConfig, DisposerError, NamedDisposable, ObjectTree};
use pretty_assertions::assert_eq;
use std::num::NonZeroUsize;
use std::sync::Arc;

const CAPACITY: usize = 4;

fn small_tree() -> ObjectTree {
    let capacity = NonZeroUsize::new(CAPACITY).unwrap();
    ObjectTree::new(&DisposerConfig::debug().with_trace_capacity(capacity))
}

fn named(name: &'static str) -> DisposableRef {
    Arc::new(NamedDisposable::new(name))
}

/// Dispose an unrelated root with `width` children
fn dispose_wide_root(tree: &ObjectTree, width: usize) {
    let root = named("wide");
    for _ in 0..width {
        tree.register(&root, named("leaf")).unwrap();
    }
    tree.execute_all(&root, true).unwrap();
}

#[test]
fn test_single_disposal_survives_trace_eviction() {
    let tree = small_tree();
    let log = event_log();
    let p = Recorder::new("p", &log);
    let x = Recorder::new("x", &log);
    tree.register(&dref(&p), dref(&x)).unwrap();

    tree.execute_all(&dref(&x), true).unwrap();
    assert!(tree.disposal_trace(x.as_ref()).is_some());

    dispose_wide_root(&tree, CAPACITY * 16);
    assert!(tree.disposal_trace(x.as_ref()).is_none());
    assert!(tree.is_disposed(x.as_ref()));

    tree.execute_all(&dref(&x), true).unwrap();
    assert_eq!(x.disposals(), 1);

    tree.execute_all(&dref(&p), true).unwrap();
    assert_eq!(p.disposals(), 1);
}

#[test]
fn test_late_registration_rejected_after_trace_eviction() {
    let tree = small_tree();
    let gone = named("gone");
    tree.execute_all(&gone, true).unwrap();

    dispose_wide_root(&tree, CAPACITY * 16);

    match tree.register(&gone, named("ghost")) {
        Err(DisposerError::AlreadyDisposed {
            parent,
            disposal_trace,
        }) => {
            assert_eq!(parent, "gone");
            assert!(disposal_trace.is_none());
        }
        other => panic!("expected AlreadyDisposed, got {:?}", other),
    }
    assert!(tree.is_empty());
}

#[test]
fn test_descendant_status_survives_trace_eviction() {
    let tree = small_tree();
    let log = event_log();
    let root = Recorder::new("root", &log);
    let children: Vec<_> = (0..CAPACITY * 4)
        .map(|i| Recorder::new(&format!("child-{}", i), &log))
        .collect();
    for child in &children {
        tree.register(&dref(&root), dref(child)).unwrap();
    }

    tree.execute_all(&dref(&root), true).unwrap();

    for child in &children {
        assert!(tree.is_disposed(child.as_ref()));
        tree.execute_all(&dref(child), true).unwrap();
        assert_eq!(child.disposals(), 1);
        assert_eq!(tree.try_register(&dref(child), named("late")).unwrap(), false);
    }
    assert!(tree.is_empty());
}

#[test]
fn test_deallocated_objects_are_swept() {
    let tree = small_tree();
    for _ in 0..8 {
        dispose_wide_root(&tree, CAPACITY * 8);
    }

    let snapshot = tree.snapshot();
    assert!(snapshot.disposed_records < 8 * (CAPACITY * 8 + 1));
    assert_eq!(tree.purge_disposal_traces(), snapshot.disposed_records);
    assert_eq!(tree.snapshot().disposed_records, 0);
}
