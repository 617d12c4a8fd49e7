/*!
 * Diagnostic Traces
 *
 * Stack snapshots taken at registration and disposal time in debug mode, and
 * the record of already-disposed objects. Traces used to explain "parent
 * already disposed" failures are bounded; disposal status is not.
 */

use crate::core::types::{DisposableRef, ObjectKey};
use crate::disposable::Disposable;
use ahash::RandomState;
use lru::LruCache;
use std::backtrace::Backtrace;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::time::SystemTime;

/// Why a trace was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    Registration,
    Disposal,
}

/// Captured call-stack snapshot
#[derive(Debug)]
pub struct Trace {
    kind: TraceKind,
    thread: String,
    captured_at: SystemTime,
    backtrace: Backtrace,
}

impl Trace {
    /// Capture the current stack regardless of `RUST_BACKTRACE`
    pub fn capture(kind: TraceKind) -> Arc<Self> {
        let current = std::thread::current();
        Arc::new(Self {
            kind,
            thread: current.name().unwrap_or("<unnamed>").to_string(),
            captured_at: SystemTime::now(),
            backtrace: Backtrace::force_capture(),
        })
    }

    /// Capture only when debug mode is on
    #[inline]
    pub fn capture_if(debug: bool, kind: TraceKind) -> Option<Arc<Self>> {
        debug.then(|| Self::capture(kind))
    }

    #[inline]
    pub fn kind(&self) -> TraceKind {
        self.kind
    }

    #[inline]
    pub fn thread(&self) -> &str {
        &self.thread
    }

    #[inline]
    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    #[inline]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            TraceKind::Registration => "registered",
            TraceKind::Disposal => "disposed",
        };
        writeln!(f, "{} on thread '{}' at:", what, self.thread)?;
        write!(f, "{}", self.backtrace)
    }
}

/// Disposed objects and their disposal traces
///
/// Status and traces are kept apart. A status record lives as long as its
/// object does: it is only dropped once the object has been deallocated, or
/// when the object is registered again. Each record pins the allocation with a
/// `Weak` so its address cannot be handed to a new object. Traces are
/// diagnostics only and sit in a fixed-capacity LRU; evicting one never changes
/// whether an object counts as disposed.
pub struct DisposedTraces {
    status: HashMap<ObjectKey, Weak<dyn Disposable>, RandomState>,
    traces: LruCache<ObjectKey, Arc<Trace>, RandomState>,
    /// Status size that triggers the next sweep of deallocated objects
    sweep_at: usize,
}

impl DisposedTraces {
    pub fn new(trace_capacity: NonZeroUsize) -> Self {
        Self {
            status: HashMap::with_hasher(RandomState::new()),
            traces: LruCache::with_hasher(trace_capacity, RandomState::new()),
            sweep_at: trace_capacity.get(),
        }
    }

    pub fn remember(&mut self, object: &DisposableRef, trace: Option<Arc<Trace>>) {
        let key = ObjectKey::of(object);
        self.status.insert(key, Arc::downgrade(object));
        match trace {
            Some(trace) => {
                self.traces.put(key, trace);
            }
            // A trace from an earlier disposal no longer describes this one
            None => {
                self.traces.pop(&key);
            }
        }

        if self.status.len() > self.sweep_at {
            self.purge_dead();
            self.sweep_at = (self.status.len() * 2).max(self.traces.cap().get());
        }
    }

    /// Forget an object, e.g. because it was registered again
    pub fn forget(&mut self, key: ObjectKey) -> bool {
        self.traces.pop(&key);
        self.status.remove(&key).is_some()
    }

    #[inline]
    pub fn contains(&self, key: ObjectKey) -> bool {
        self.status.contains_key(&key)
    }

    /// Disposal trace of an object known to be disposed
    ///
    /// The outer `Option` says whether the object is known to be disposed, the
    /// inner one whether a trace was captured and is still retained.
    pub fn trace_of(&self, key: ObjectKey) -> Option<Option<Arc<Trace>>> {
        self.contains(key).then(|| self.traces.peek(&key).cloned())
    }

    /// Drop every record whose object has been deallocated
    pub fn purge_dead(&mut self) -> usize {
        let dead: Vec<ObjectKey> = self
            .status
            .iter()
            .filter(|(_, object)| object.strong_count() == 0)
            .map(|(key, _)| *key)
            .collect();
        for key in &dead {
            self.status.remove(key);
            self.traces.pop(key);
        }
        dead.len()
    }

    pub fn clear(&mut self) {
        self.status.clear();
        self.traces.clear();
    }

    /// Number of objects known to be disposed
    #[inline]
    pub fn len(&self) -> usize {
        self.status.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.status.is_empty()
    }

    /// Number of retained disposal traces
    #[inline]
    pub fn trace_count(&self) -> usize {
        self.traces.len()
    }
}
