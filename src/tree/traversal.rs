/*!
 * Disposal Traversal
 *
 * Runs the user callbacks of an already-detached subtree. Nothing here holds
 * the tree lock: callbacks may register, dispose, or query freely.
 *
 * Phases over the detached list (children-first order):
 * 1. `before_tree_dispose` outermost to innermost (reverse list order)
 * 2. `dispose` innermost to outermost (list order)
 *
 * Failures from both phases are collected and reported once at the end.
 */

use super::node::RemovedNode;
use crate::core::config::FailurePolicy;
use crate::core::errors::{
    CallbackError, CallbackFailure, DisposalPhase, DisposeResult, DisposerError, DisposerResult,
};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error};

/// Per-traversal state threaded through the phases
#[derive(Default)]
pub struct DisposalContext {
    failures: Vec<CallbackFailure>,
}

impl DisposalContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn failures(&self) -> &[CallbackFailure] {
        &self.failures
    }

    /// Run both callback phases over a detached subtree
    pub fn run(&mut self, detached: &[RemovedNode]) {
        for removed in detached.iter().rev() {
            if !removed.capabilities.parent_hook {
                continue;
            }
            if let Some(parent) = removed.object.as_parent() {
                let result = guarded(|| parent.before_tree_dispose());
                self.record(removed, DisposalPhase::BeforeTreeDispose, result);
            }
        }

        for removed in detached {
            let result = guarded(|| removed.object.dispose());
            self.record(removed, DisposalPhase::Dispose, result);
        }

        debug!(
            objects = detached.len(),
            failures = self.failures.len(),
            "Disposal traversal finished"
        );
    }

    fn record(&mut self, removed: &RemovedNode, phase: DisposalPhase, result: DisposeResult) {
        if let Err(error) = result {
            self.failures.push(CallbackFailure {
                object: removed.object.name().into_owned(),
                phase,
                error,
            });
        }
    }

    /// Turn collected failures into the caller-visible outcome
    ///
    /// A cancellation is always returned. Other failures are returned or
    /// logged depending on the policy.
    pub fn finish(self, policy: FailurePolicy) -> DisposerResult<()> {
        if self.failures.is_empty() {
            return Ok(());
        }

        let mut failures = self.failures;
        if let Some(pos) = failures.iter().position(|f| f.error.is_cancellation()) {
            let cancelled = failures.remove(pos);
            let reason = match cancelled.error {
                CallbackError::Cancelled(reason) => reason,
                other => other.to_string(),
            };
            return Err(DisposerError::Cancelled {
                object: cancelled.object,
                reason,
                other_failures: failures,
            });
        }

        let err = DisposerError::AggregatedDisposal(failures);
        match policy {
            FailurePolicy::Propagate => Err(err),
            FailurePolicy::Log => {
                for failure in err.failures() {
                    error!(
                        object = %failure.object,
                        phase = %failure.phase,
                        error = %failure.error,
                        "Disposable callback failed"
                    );
                }
                error!(error = %err, "Disposal completed with failures");
                Ok(())
            }
        }
    }
}

/// Run a callback, converting a panic into a collected failure
fn guarded<F>(f: F) -> DisposeResult
where
    F: FnOnce() -> DisposeResult,
{
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|panic| Err(CallbackError::from_panic(panic)))
}
