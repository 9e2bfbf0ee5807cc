//! Debounced input bindings
//!
//! Connects raw input sources to the store. Text inputs report every
//! keystroke; the binder holds the latest value back until it has been stable
//! for the quiet interval and only then forwards it. Discrete controls are
//! forwarded immediately.
//!
//! Per binding:
//!
//! ```text
//! Idle --event--> Pending --event--> Pending (timer rearmed)
//! Pending --timer fires--> Idle (value emitted)
//! any --dispose--> Disposed (pending timer cancelled, nothing emitted)
//! ```

use chrono::{DateTime, Duration, Utc};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{trace, warn};

use crate::config::StoreConfig;
use crate::input::{InputEvent, InputSource};
use crate::scheduler::{Scheduler, TimerId};
use crate::store::UserStore;
use crate::types::UserField;

/// Observable phase of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinderState {
    Idle,
    Pending,
    Disposed,
}

enum Phase {
    Idle,
    Pending {
        timer: TimerId,
        deadline: DateTime<Utc>,
        generation: u64,
        value: String,
    },
    Disposed,
}

struct DebouncerInner {
    scheduler: Rc<dyn Scheduler>,
    quiet: Duration,
    on_value: Box<dyn Fn(String)>,
    phase: RefCell<Phase>,
    generation: Cell<u64>,
}

/// Timer-reset debouncer: every event cancels the pending emission and
/// schedules a new one `quiet` after the event's timestamp.
#[derive(Clone)]
pub struct Debouncer {
    inner: Rc<DebouncerInner>,
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("quiet", &self.inner.quiet)
            .field("state", &self.state())
            .finish()
    }
}

impl Debouncer {
    pub fn new(
        scheduler: Rc<dyn Scheduler>,
        quiet: Duration,
        on_value: impl Fn(String) + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(DebouncerInner {
                scheduler,
                quiet,
                on_value: Box::new(on_value),
                phase: RefCell::new(Phase::Idle),
                generation: Cell::new(0),
            }),
        }
    }

    pub fn state(&self) -> BinderState {
        match &*self.inner.phase.borrow() {
            Phase::Idle => BinderState::Idle,
            Phase::Pending { .. } => BinderState::Pending,
            Phase::Disposed => BinderState::Disposed,
        }
    }

    /// Feed a raw event.
    ///
    /// A pending value whose quiet interval had already elapsed by the new
    /// event's timestamp is emitted first, even if the scheduler has not been
    /// pumped since.
    pub fn push(&self, event: &InputEvent) {
        let inner = &self.inner;
        let overdue = match &*inner.phase.borrow() {
            Phase::Disposed => return,
            Phase::Pending { deadline, .. } => *deadline <= event.timestamp,
            Phase::Idle => false,
        };
        if overdue {
            self.flush();
        }

        // Re-read: the emitted value may have disposed or re-armed the debouncer
        let previous = match &*inner.phase.borrow() {
            Phase::Disposed => return,
            Phase::Pending { timer, .. } => Some(*timer),
            Phase::Idle => None,
        };
        if let Some(timer) = previous {
            inner.scheduler.cancel(timer);
        }

        let Some(deadline) = event.timestamp.checked_add_signed(inner.quiet) else {
            warn!(quiet = %inner.quiet, "debounce deadline out of range, forwarding immediately");
            *inner.phase.borrow_mut() = Phase::Idle;
            (inner.on_value)(event.value.clone());
            return;
        };

        let generation = inner.generation.get() + 1;
        inner.generation.set(generation);

        let weak = Rc::downgrade(inner);
        let timer = inner
            .scheduler
            .schedule_at(deadline, Box::new(move || Self::fire(&weak, generation)));

        trace!(generation, %deadline, "debounce timer armed");
        *inner.phase.borrow_mut() = Phase::Pending {
            timer,
            deadline,
            generation,
            value: event.value.clone(),
        };
    }

    /// Emit a pending value now instead of waiting for the timer
    pub fn flush(&self) {
        let pending = self.take_pending(None);
        if let Some((timer, value)) = pending {
            self.inner.scheduler.cancel(timer);
            (self.inner.on_value)(value);
        }
    }

    /// Cancel any pending emission; no value is emitted afterwards
    pub fn dispose(&self) {
        let previous = self.inner.phase.replace(Phase::Disposed);
        if let Phase::Pending { timer, .. } = previous {
            self.inner.scheduler.cancel(timer);
        }
    }

    fn fire(weak: &Weak<DebouncerInner>, generation: u64) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let debouncer = Debouncer { inner };
        if let Some((_, value)) = debouncer.take_pending(Some(generation)) {
            (debouncer.inner.on_value)(value);
        }
    }

    /// Move Pending -> Idle, returning the timer and value. With a generation,
    /// only a matching pending emission is taken.
    fn take_pending(&self, generation: Option<u64>) -> Option<(TimerId, String)> {
        let mut phase = self.inner.phase.borrow_mut();
        let matches = match &*phase {
            Phase::Pending { generation: g, .. } => generation.map_or(true, |want| want == *g),
            _ => false,
        };
        if !matches {
            return None;
        }
        match std::mem::replace(&mut *phase, Phase::Idle) {
            Phase::Pending { timer, value, .. } => Some((timer, value)),
            _ => None,
        }
    }
}

/// A live connection from an input source to a consumer.
///
/// Dropping the binding tears it down.
#[must_use = "dropping a Binding tears it down immediately"]
pub struct Binding {
    debouncer: Option<Debouncer>,
    detach: RefCell<Option<Box<dyn FnOnce()>>>,
    disposed: Rc<Cell<bool>>,
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("debounced", &self.debouncer.is_some())
            .field("state", &self.state())
            .finish()
    }
}

impl Binding {
    pub fn state(&self) -> BinderState {
        if self.disposed.get() {
            return BinderState::Disposed;
        }
        match &self.debouncer {
            Some(debouncer) => debouncer.state(),
            None => BinderState::Idle,
        }
    }

    pub fn is_debounced(&self) -> bool {
        self.debouncer.is_some()
    }

    /// Forward a pending debounced value immediately
    pub fn flush(&self) {
        if let Some(debouncer) = &self.debouncer {
            debouncer.flush();
        }
    }

    /// Detach from the source and cancel pending work. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        if let Some(debouncer) = &self.debouncer {
            debouncer.dispose();
        }
        if let Some(detach) = self.detach.borrow_mut().take() {
            detach();
        }
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Creates bindings that share one scheduler and quiet interval
#[derive(Clone)]
pub struct InputBinder {
    scheduler: Rc<dyn Scheduler>,
    quiet: Duration,
}

impl std::fmt::Debug for InputBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputBinder")
            .field("quiet", &self.quiet)
            .finish_non_exhaustive()
    }
}

impl InputBinder {
    pub fn new(scheduler: Rc<dyn Scheduler>, quiet: Duration) -> Self {
        Self { scheduler, quiet }
    }

    /// Binder using the configured debounce interval
    pub fn from_config(scheduler: Rc<dyn Scheduler>, config: &StoreConfig) -> Self {
        Self::new(scheduler, config.debounce_interval())
    }

    pub fn quiet_interval(&self) -> Duration {
        self.quiet
    }

    /// Attach to a source. Text sources are debounced; discrete sources
    /// forward every change immediately.
    pub fn attach<S>(&self, source: &S, on_value: impl Fn(String) + 'static) -> Binding
    where
        S: InputSource + Clone + 'static,
    {
        if source.is_discrete() {
            self.attach_immediate(source, on_value)
        } else {
            self.attach_debounced(source, on_value)
        }
    }

    /// Attach with the timer-reset debounce
    pub fn attach_debounced<S>(&self, source: &S, on_value: impl Fn(String) + 'static) -> Binding
    where
        S: InputSource + Clone + 'static,
    {
        let debouncer = Debouncer::new(Rc::clone(&self.scheduler), self.quiet, on_value);
        let disposed = Rc::new(Cell::new(false));

        let feed = debouncer.clone();
        let id = source.add_listener(Rc::new(move |event: &InputEvent| feed.push(event)));

        let source = source.clone();
        Binding {
            debouncer: Some(debouncer),
            detach: RefCell::new(Some(Box::new(move || {
                source.remove_listener(id);
            }))),
            disposed,
        }
    }

    /// Attach without debouncing
    pub fn attach_immediate<S>(&self, source: &S, on_value: impl Fn(String) + 'static) -> Binding
    where
        S: InputSource + Clone + 'static,
    {
        let disposed = Rc::new(Cell::new(false));

        let gate = Rc::clone(&disposed);
        let id = source.add_listener(Rc::new(move |event: &InputEvent| {
            if !gate.get() {
                on_value(event.value.clone());
            }
        }));

        let source = source.clone();
        Binding {
            debouncer: None,
            detach: RefCell::new(Some(Box::new(move || {
                source.remove_listener(id);
            }))),
            disposed,
        }
    }

    /// Attach a source so its forwarded values update `field` in `store`
    pub fn bind_field<S>(&self, source: &S, store: &UserStore, field: UserField) -> Binding
    where
        S: InputSource + Clone + 'static,
    {
        let store = store.clone();
        self.attach(source, move |value| store.update_field(field, value))
    }
}
