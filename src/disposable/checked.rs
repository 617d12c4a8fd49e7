/*!
 * Checked Disposables
 * Atomic self-reported disposed state
 */

use super::{CheckedDisposable, Disposable};
use crate::core::errors::DisposeResult;
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};

/// Atomic disposed marker embedded in checked disposables
#[derive(Debug, Default)]
pub struct DisposedFlag(AtomicBool);

impl DisposedFlag {
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark as disposed, returning the previous state
    #[inline]
    pub(crate) fn mark(&self) -> bool {
        self.0.swap(true, Ordering::AcqRel)
    }

    #[inline]
    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Named disposable that can answer `is_disposed` without touching the tree
///
/// Returned by `Disposer::new_checked_disposable`.
#[derive(Debug)]
pub struct CheckedHandle {
    name: String,
    flag: DisposedFlag,
}

impl CheckedHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flag: DisposedFlag::new(),
        }
    }
}

impl Disposable for CheckedHandle {
    fn dispose(&self) -> DisposeResult {
        // Disposal outside the tree still flips the flag
        self.flag.mark();
        Ok(())
    }

    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn as_checked(&self) -> Option<&dyn CheckedDisposable> {
        Some(self)
    }
}

impl CheckedDisposable for CheckedHandle {
    fn disposed_flag(&self) -> &DisposedFlag {
        &self.flag
    }
}
