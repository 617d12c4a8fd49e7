/*!
 * Registration Tests
 * Attach, move, cycle rejection, and revival
 */

use crate::support::*;
use disposer::{DisposableRef, DisposerError, NamedDisposable, ObjectTree};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn named(name: &'static str) -> DisposableRef {
    Arc::new(NamedDisposable::new(name))
}

#[test]
fn test_register_self_is_illegal() {
    let tree = ObjectTree::default();
    let a = named("a");

    let err = tree.register(&a, a.clone()).unwrap_err();
    assert!(matches!(err, DisposerError::IllegalUsage(_)));
    assert!(tree.is_empty());
}

#[test]
fn test_cycle_rejected_and_tree_unchanged() {
    let tree = ObjectTree::default();
    let a = named("a");
    let b = named("b");
    tree.register(&a, b.clone()).unwrap();

    let err = tree.register(&b, a.clone()).unwrap_err();
    assert!(matches!(err, DisposerError::IllegalUsage(_)));

    assert_eq!(tree.len(), 2);
    assert!(tree.parent_of(a.as_ref()).is_none());
    assert!(Arc::ptr_eq(&tree.parent_of(b.as_ref()).unwrap(), &a));
}

#[test]
fn test_register_under_grandchild_is_cycle() {
    let tree = ObjectTree::default();
    let a = named("a");
    let b = named("b");
    let c = named("c");
    tree.register(&a, b.clone()).unwrap();
    tree.register(&b, c.clone()).unwrap();

    assert!(matches!(
        tree.register(&c, a.clone()),
        Err(DisposerError::IllegalUsage(_))
    ));
    assert_eq!(tree.snapshot().render(), "a\n  b\n    c\n");
}

#[test]
fn test_move_semantics() {
    let tree = ObjectTree::default();
    let log = event_log();
    let p1 = Recorder::new("p1", &log);
    let p2 = Recorder::new("p2", &log);
    let x = Recorder::new("x", &log);

    tree.register(&dref(&p1), dref(&x)).unwrap();
    tree.register(&dref(&p2), dref(&x)).unwrap();

    assert!(tree
        .find_registered_object(p1.as_ref(), x.as_ref())
        .is_none());
    assert!(tree
        .find_registered_object(p2.as_ref(), x.as_ref())
        .is_some());

    tree.execute_all(&dref(&p1), true).unwrap();
    assert_eq!(x.disposals(), 0);

    tree.execute_all(&dref(&p2), true).unwrap();
    assert_eq!(x.disposals(), 1);
    assert_eq!(entries(&log), vec!["dispose:p1", "dispose:x", "dispose:p2"]);
}

#[test]
fn test_late_registration_rejected() {
    let tree = ObjectTree::default();
    let parent = named("parent");
    tree.register(&parent, named("child")).unwrap();
    tree.execute_all(&parent, true).unwrap();

    let err = tree.register(&parent, named("late")).unwrap_err();
    match err {
        DisposerError::AlreadyDisposed {
            parent: name,
            disposal_trace,
        } => {
            assert_eq!(name, "parent");
            assert!(disposal_trace.is_none());
        }
        other => panic!("expected AlreadyDisposed, got {:?}", other),
    }
    assert!(tree.is_empty());
}

#[test]
fn test_late_registration_carries_trace_in_debug_mode() {
    let tree = ObjectTree::default();
    tree.set_debug_mode(true);
    let parent = named("parent");
    tree.execute_all(&parent, true).unwrap();

    match tree.register(&parent, named("late")) {
        Err(DisposerError::AlreadyDisposed {
            disposal_trace: Some(trace),
            ..
        }) => assert!(trace.starts_with("disposed on thread")),
        other => panic!("expected AlreadyDisposed with trace, got {:?}", other),
    }
}

#[test]
fn test_try_register_reports_disposed_parent() {
    let tree = ObjectTree::default();
    let parent = named("parent");

    assert_eq!(tree.try_register(&parent, named("a")).unwrap(), true);
    tree.execute_all(&parent, true).unwrap();
    assert_eq!(tree.try_register(&parent, named("b")).unwrap(), false);
    assert!(tree.is_empty());

    // Structural errors still surface
    let other = named("other");
    assert!(tree.try_register(&other, other.clone()).is_err());
}

#[test]
fn test_reregistration_revives() {
    let tree = ObjectTree::default();
    let log = event_log();
    let x = Recorder::new("x", &log);
    let p = named("p");

    tree.execute_all(&dref(&x), true).unwrap();
    assert!(tree.is_disposed(x.as_ref()));

    tree.register(&p, dref(&x)).unwrap();
    assert!(!tree.is_disposed(x.as_ref()));

    tree.execute_all(&p, true).unwrap();
    assert_eq!(x.disposals(), 2);
    assert!(tree.is_disposed(x.as_ref()));
}

#[test]
fn test_checked_disposable_flag_follows_lifecycle() {
    let tree = ObjectTree::default();
    let checked = CountingChecked::new();
    let p = named("p");

    tree.register(&p, dref(&checked)).unwrap();
    assert!(!checked.flag_set());

    tree.execute_all(&p, true).unwrap();
    assert!(checked.flag_set());
    assert!(tree.is_disposed(checked.as_ref()));

    let q = named("q");
    tree.register(&q, dref(&checked)).unwrap();
    assert!(!tree.is_disposed(checked.as_ref()));
    assert_eq!(checked.disposals(), 1);
}

#[test]
fn test_reregister_same_parent_moves_to_end() {
    let tree = ObjectTree::default();
    let root = named("root");
    let a = named("a");
    tree.register(&root, a.clone()).unwrap();
    tree.register(&root, named("b")).unwrap();
    tree.register(&root, a.clone()).unwrap();

    assert_eq!(tree.snapshot().render(), "root\n  b\n  a\n");
    assert_eq!(tree.len(), 3);
}
