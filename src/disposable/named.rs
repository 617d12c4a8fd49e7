/*!
 * Named and Closure Disposables
 */

use super::Disposable;
use crate::core::errors::DisposeResult;
use parking_lot::Mutex;
use std::borrow::Cow;
use std::fmt;

/// Disposable with no behavior of its own, used as an anchor for children
///
/// Returned by `Disposer::new_disposable` and friends.
#[derive(Debug, Clone)]
pub struct NamedDisposable {
    name: Cow<'static, str>,
}

impl NamedDisposable {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn anonymous() -> Self {
        Self::new("newDisposable")
    }
}

impl Disposable for NamedDisposable {
    fn dispose(&self) -> DisposeResult {
        Ok(())
    }

    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }
}

type Action = Box<dyn FnOnce() -> DisposeResult + Send>;

/// Disposable running a closure on teardown
///
/// The closure runs at most once even if `dispose` is invoked outside the tree
/// more than once.
pub struct DisposeAction {
    name: Cow<'static, str>,
    action: Mutex<Option<Action>>,
}

impl DisposeAction {
    pub fn new<F>(name: impl Into<Cow<'static, str>>, action: F) -> Self
    where
        F: FnOnce() -> DisposeResult + Send + 'static,
    {
        Self {
            name: name.into(),
            action: Mutex::new(Some(Box::new(action))),
        }
    }

    /// Whether the closure has not run yet
    pub fn is_pending(&self) -> bool {
        self.action.lock().is_some()
    }
}

impl Disposable for DisposeAction {
    fn dispose(&self) -> DisposeResult {
        // Take the closure before running it so it never executes under the lock
        let action = self.action.lock().take();
        match action {
            Some(action) => action(),
            None => Ok(()),
        }
    }

    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }
}

impl fmt::Debug for DisposeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposeAction")
            .field("name", &self.name)
            .field("pending", &self.is_pending())
            .finish()
    }
}
