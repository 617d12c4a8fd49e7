/*!
 * Tracing
 * Structured logging for registration and disposal using the tracing crate
 *
 * Features:
 * - Env-filtered output (RUST_LOG)
 * - JSON-formatted logs for structured parsing
 * - One span per disposal traversal with timing
 */

use std::time::{Duration, Instant};
use tracing::{debug, span, warn, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Traversals slower than this are reported at warn level
const SLOW_DISPOSAL: Duration = Duration::from_millis(10);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - DISPOSER_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("DISPOSER_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .compact(),
            )
            .try_init()
    };

    if result.is_ok() {
        debug!(json = use_json, "Structured tracing initialized");
    }
}

/// Span covering the callback phases of one disposal traversal
pub struct DisposalSpan {
    span: tracing::Span,
    start: Instant,
    objects: usize,
}

impl DisposalSpan {
    pub fn new(root: &str, objects: usize) -> Self {
        let span = span!(
            Level::DEBUG,
            "disposal",
            root = root,
            objects = objects,
            failures = tracing::field::Empty,
            duration_us = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            objects,
        }
    }

    /// Enter the span for the duration of the callbacks
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    pub fn record_failures(&self, failures: usize) {
        self.span.record("failures", failures);
    }
}

impl Drop for DisposalSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration.as_micros() as u64);

        if duration > SLOW_DISPOSAL {
            warn!(
                objects = self.objects,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow disposal detected"
            );
        } else {
            debug!(
                objects = self.objects,
                duration_us = duration.as_micros() as u64,
                "disposal completed"
            );
        }
    }
}
