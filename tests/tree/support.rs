/*!
 * Shared test disposables
 */

#![allow(dead_code)]

use disposer::{
    CallbackError, CheckedDisposable, Disposable, DisposableRef, DisposeResult, DisposedFlag,
    Parent,
};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Ordered record of callback invocations
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// How a recorder's `before_tree_dispose` misbehaves
#[derive(Clone)]
pub enum HookFault {
    Fail(CallbackError),
    Panic(&'static str),
}

/// Disposable recording every callback into a shared log
pub struct Recorder {
    name: String,
    log: EventLog,
    hook: bool,
    failure: Option<CallbackError>,
    hook_fault: Option<HookFault>,
    disposals: AtomicUsize,
}

impl Recorder {
    pub fn new(name: &str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self::build(name, log, false, None))
    }

    /// Recorder that also implements `Parent`
    pub fn with_hook(name: &str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self::build(name, log, true, None))
    }

    /// Recorder whose `dispose` fails with `error`
    pub fn failing(name: &str, log: &EventLog, error: CallbackError) -> Arc<Self> {
        Arc::new(Self::build(name, log, false, Some(error)))
    }

    /// Recorder implementing `Parent` whose hook fails or panics
    pub fn with_faulty_hook(name: &str, log: &EventLog, fault: HookFault) -> Arc<Self> {
        let mut recorder = Self::build(name, log, true, None);
        recorder.hook_fault = Some(fault);
        Arc::new(recorder)
    }

    fn build(name: &str, log: &EventLog, hook: bool, failure: Option<CallbackError>) -> Self {
        Self {
            name: name.to_string(),
            log: Arc::clone(log),
            hook,
            failure,
            hook_fault: None,
            disposals: AtomicUsize::new(0),
        }
    }

    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }
}

impl Disposable for Recorder {
    fn dispose(&self) -> DisposeResult {
        self.disposals.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(format!("dispose:{}", self.name));
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn as_parent(&self) -> Option<&dyn Parent> {
        if self.hook {
            Some(self)
        } else {
            None
        }
    }
}

impl Parent for Recorder {
    fn before_tree_dispose(&self) -> DisposeResult {
        self.log.lock().push(format!("before:{}", self.name));
        match &self.hook_fault {
            Some(HookFault::Fail(error)) => Err(error.clone()),
            Some(HookFault::Panic(message)) => panic!("{}", message),
            None => Ok(()),
        }
    }
}

/// Checked disposable counting its own disposals
pub struct CountingChecked {
    flag: DisposedFlag,
    disposals: AtomicUsize,
}

impl CountingChecked {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            flag: DisposedFlag::new(),
            disposals: AtomicUsize::new(0),
        })
    }

    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }

    pub fn flag_set(&self) -> bool {
        self.flag.get()
    }
}

impl Disposable for CountingChecked {
    fn dispose(&self) -> DisposeResult {
        self.disposals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_checked(&self) -> Option<&dyn CheckedDisposable> {
        Some(self)
    }
}

impl CheckedDisposable for CountingChecked {
    fn disposed_flag(&self) -> &DisposedFlag {
        &self.flag
    }
}

/// Upcast helper
pub fn dref<T: Disposable>(object: &Arc<T>) -> DisposableRef {
    Arc::clone(object) as DisposableRef
}

pub fn entries(log: &EventLog) -> Vec<String> {
    log.lock().clone()
}
