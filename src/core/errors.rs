/*!
 * Error Types
 * Centralized error handling with thiserror and miette diagnostics
 */

use miette::Diagnostic;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result type returned by disposer operations
pub type DisposerResult<T> = Result<T, DisposerError>;

/// Result type returned by `dispose()` and `before_tree_dispose()` callbacks
pub type DisposeResult = Result<(), CallbackError>;

/// Error raised by a single disposable callback
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum CallbackError {
    /// Cooperative cancellation; escalated to the caller once the traversal is done
    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("{0}")]
    Failed(String),

    #[error("panicked: {0}")]
    Panicked(String),
}

impl CallbackError {
    #[inline]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    #[inline]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled(message.into())
    }

    #[inline]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Convert a caught panic payload
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

/// Traversal phase in which a callback failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisposalPhase {
    BeforeTreeDispose,
    Dispose,
}

impl fmt::Display for DisposalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeTreeDispose => write!(f, "before_tree_dispose"),
            Self::Dispose => write!(f, "dispose"),
        }
    }
}

/// One failed callback collected during a disposal traversal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackFailure {
    pub object: String,
    pub phase: DisposalPhase,
    pub error: CallbackError,
}

impl fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}: {}", self.object, self.phase, self.error)
    }
}

/// Render a failure list as a single line for error messages
fn summarize(failures: &[CallbackFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors surfaced by the ownership tree and the disposer facade
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum DisposerError {
    #[error("Illegal usage: {0}")]
    #[diagnostic(
        code(disposer::illegal_usage),
        help("An object cannot be registered under itself or under one of its own descendants.")
    )]
    IllegalUsage(String),

    #[error("Parent {parent} has already been disposed")]
    #[diagnostic(
        code(disposer::already_disposed),
        help("Register children before the parent is disposed. Enable debug mode (DISPOSER_DEBUG=on) to capture the disposal trace.")
    )]
    AlreadyDisposed {
        parent: String,
        disposal_trace: Option<String>,
    },

    #[error("{} callback(s) failed during disposal: {}", .0.len(), summarize(.0))]
    #[diagnostic(
        code(disposer::aggregated_disposal),
        help("The subtree was fully detached and disposed; only the listed callbacks failed.")
    )]
    AggregatedDisposal(Vec<CallbackFailure>),

    #[error("Disposal cancelled by {object}: {reason}")]
    #[diagnostic(
        code(disposer::cancelled),
        help("Teardown completed for the whole subtree; the cancellation is re-raised after the fact.")
    )]
    Cancelled {
        object: String,
        reason: String,
        other_failures: Vec<CallbackFailure>,
    },

    #[error("Tree is not empty: {count} live registration(s)\n{rendered}")]
    #[diagnostic(
        code(disposer::not_empty),
        help("Some disposables were registered but never disposed. Dispose their roots at the end of the test.")
    )]
    NotEmpty { count: usize, rendered: String },
}

impl DisposerError {
    /// Check whether this error signals a cooperative cancellation
    #[inline]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Failures collected during a traversal, if this error carries any
    pub fn failures(&self) -> &[CallbackFailure] {
        match self {
            Self::AggregatedDisposal(failures) => failures,
            Self::Cancelled { other_failures, .. } => other_failures,
            _ => &[],
        }
    }
}
