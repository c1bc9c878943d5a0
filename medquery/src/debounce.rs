//! Trailing-edge debounce for rapidly changing inputs.
//!
//! A [`DebouncedValue`] tracks a `raw` value that changes on every
//! keystroke and a `committed` value that updates only after the configured
//! delay elapses with no further writes. Each write restarts the timer;
//! there is no leading edge.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

/// Phase of the debounce state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebounceState {
    /// No write has happened yet.
    #[default]
    Idle,
    /// A write happened and the delay has not yet elapsed.
    Pending,
    /// The latest write has been committed.
    Committed,
}

struct ValueState {
    raw: String,
    committed: String,
    phase: DebounceState,
}

struct DebounceInner {
    delay: Duration,
    state: Mutex<ValueState>,
    // Each write bumps the generation; a timer only commits if its
    // generation is still current when it fires.
    generation: AtomicU64,
    committed_tx: watch::Sender<String>,
    listeners: Mutex<Vec<Box<dyn Fn(&str) + Send + Sync>>>,
}

/// A debounced string value.
///
/// Cloning shares the same underlying state. Writes must happen inside a
/// Tokio runtime; the commit timer is a spawned task.
///
/// # Example
///
/// ```ignore
/// let search = DebouncedValue::new(Duration::from_millis(500));
/// search.set("a");
/// search.set("ad");
/// search.set("ada");
/// // 500ms after the last write, committed() becomes "ada".
/// ```
#[derive(Clone)]
pub struct DebouncedValue {
    inner: Arc<DebounceInner>,
}

impl DebouncedValue {
    /// Creates an idle debounced value with the given trailing delay.
    pub fn new(delay: Duration) -> Self {
        let (committed_tx, _) = watch::channel(String::new());
        DebouncedValue {
            inner: Arc::new(DebounceInner {
                delay,
                state: Mutex::new(ValueState {
                    raw: String::new(),
                    committed: String::new(),
                    phase: DebounceState::Idle,
                }),
                generation: AtomicU64::new(0),
                committed_tx,
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Writes a new raw value and restarts the commit timer.
    pub fn set(&self, raw: impl Into<String>) {
        let raw = raw.into();
        {
            let mut state = self.inner.state.lock().expect("debounce state poisoned");
            state.raw = raw;
            state.phase = DebounceState::Pending;
        }
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;
            // A later write supersedes this timer.
            if inner.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            let committed = {
                let mut state = inner.state.lock().expect("debounce state poisoned");
                state.committed = state.raw.clone();
                state.phase = DebounceState::Committed;
                state.committed.clone()
            };
            let _ = inner.committed_tx.send(committed.clone());
            let listeners = inner.listeners.lock().expect("debounce listeners poisoned");
            for listener in listeners.iter() {
                listener(&committed);
            }
        });
    }

    /// The latest raw value.
    pub fn raw(&self) -> String {
        self.inner
            .state
            .lock()
            .expect("debounce state poisoned")
            .raw
            .clone()
    }

    /// The last committed value.
    pub fn committed(&self) -> String {
        self.inner
            .state
            .lock()
            .expect("debounce state poisoned")
            .committed
            .clone()
    }

    /// Current phase of the state machine.
    pub fn state(&self) -> DebounceState {
        self.inner.state.lock().expect("debounce state poisoned").phase
    }

    /// Registers a callback invoked synchronously on every commit.
    pub fn on_commit<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner
            .listeners
            .lock()
            .expect("debounce listeners poisoned")
            .push(Box::new(listener));
    }

    /// Returns a channel receiving every committed value.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.inner.committed_tx.subscribe()
    }
}

impl std::fmt::Debug for DebouncedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock().expect("debounce state poisoned");
        f.debug_struct("DebouncedValue")
            .field("raw", &state.raw)
            .field("committed", &state.committed)
            .field("phase", &state.phase)
            .field("delay", &self.inner.delay)
            .finish()
    }
}
