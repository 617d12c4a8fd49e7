/*!
 * Disposer Demo - Main Entry Point
 *
 * Builds a small ownership tree, prints it, and tears it down:
 * - application → project → editor, listeners
 * - a component with a `before_tree_dispose` hook
 *
 * Set DISPOSER_DEBUG=on to capture registration and disposal traces.
 */

use disposer::{init_tracing, Disposable, DisposableRef, DisposeResult, Disposer, Parent};
use std::borrow::Cow;
use std::error::Error;
use std::sync::Arc;
use tracing::info;

/// Component announcing its teardown before its children go away
struct Component {
    name: &'static str,
}

impl Disposable for Component {
    fn dispose(&self) -> DisposeResult {
        info!(component = self.name, "component disposed");
        Ok(())
    }

    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.name)
    }

    fn as_parent(&self) -> Option<&dyn Parent> {
        Some(self)
    }
}

impl Parent for Component {
    fn before_tree_dispose(&self) -> DisposeResult {
        info!(component = self.name, "component about to be torn down");
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    info!(debug = Disposer::is_debug_mode(), "Disposer demo starting");

    let application = Disposer::new_named_disposable("application");
    let project = Disposer::new_child_disposable(&application, "project")?;

    let editor: DisposableRef = Arc::new(Component { name: "editor" });
    Disposer::register(&project, Arc::clone(&editor))?;

    for i in 0..3 {
        let listener = Disposer::on_dispose(format!("listener-{}", i), move || {
            info!(listener = i, "listener removed");
            Ok(())
        });
        Disposer::register(&editor, listener)?;
    }

    let snapshot = Disposer::snapshot();
    println!("{}", snapshot.to_json()?);
    print!("{}", snapshot.render());

    Disposer::dispose(&application)?;
    info!(
        project_disposed = Disposer::is_disposed(project.as_ref()),
        editor_disposed = Disposer::is_disposed(editor.as_ref()),
        "Tree disposed"
    );

    if let Some(trace) = Disposer::disposal_trace(editor.as_ref()) {
        println!("{}", trace);
    }

    Disposer::assert_is_empty()?;
    Ok(())
}
