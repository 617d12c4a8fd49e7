/*!
 * Disposer Configuration
 *
 * Runtime configuration for trace capture and failure reporting
 */

use std::num::NonZeroUsize;

/// Environment switch forcing debug mode (`on` / `off`)
pub const DEBUG_ENV: &str = "DISPOSER_DEBUG";

/// Environment override for the number of retained disposal traces
pub const TRACE_CAPACITY_ENV: &str = "DISPOSER_TRACE_CAPACITY";

const DEFAULT_TRACE_CAPACITY: usize = 4096;

/// How callback failures collected during a traversal reach the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log an aggregated error and report success
    #[default]
    Log,
    /// Return the aggregated error to the caller
    Propagate,
}

/// Disposer configuration
#[derive(Debug, Clone)]
pub struct DisposerConfig {
    /// Capture registration and disposal traces
    pub debug: bool,
    /// Maximum number of disposal traces retained for diagnostics
    ///
    /// Disposal status is not bounded by this; it is kept until the object is
    /// deallocated.
    pub disposed_trace_capacity: NonZeroUsize,
    pub failure_policy: FailurePolicy,
}

impl Default for DisposerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            disposed_trace_capacity: NonZeroUsize::new(DEFAULT_TRACE_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
            failure_policy: FailurePolicy::Log,
        }
    }
}

impl DisposerConfig {
    /// Build a configuration from process environment variables
    ///
    /// Environment variables:
    /// - DISPOSER_DEBUG: `on`/`off` (default: off)
    /// - DISPOSER_TRACE_CAPACITY: retained disposal traces (default: 4096)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(DEBUG_ENV) {
            match parse_switch(&value) {
                Some(debug) => config.debug = debug,
                None => tracing::warn!(
                    variable = DEBUG_ENV,
                    value = %value,
                    "Ignoring unrecognized debug switch, expected on/off"
                ),
            }
        }

        if let Some(value) = lookup(TRACE_CAPACITY_ENV) {
            match value.trim().parse::<usize>().ok().and_then(NonZeroUsize::new) {
                Some(capacity) => config.disposed_trace_capacity = capacity,
                None => tracing::warn!(
                    variable = TRACE_CAPACITY_ENV,
                    value = %value,
                    "Ignoring invalid trace capacity"
                ),
            }
        }

        config
    }

    /// Configuration with trace capture enabled
    pub fn debug() -> Self {
        Self {
            debug: true,
            ..Default::default()
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_trace_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.disposed_trace_capacity = capacity;
        self
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "1" | "true" => Some(true),
        "off" | "0" | "false" => Some(false),
        _ => None,
    }
}
