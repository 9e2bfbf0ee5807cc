//! Observable user store
//!
//! [`UserStore`] owns the current [`UserState`] and is the only place it
//! changes. Actions go in through [`UserStore::dispatch`]; each one is reduced
//! to a new state, persisted, then published to every subscriber.
//!
//! # Invariants
//!
//! 1. Actions are applied strictly in the order they were dispatched. An
//!    action dispatched while another is being applied (for example from a
//!    subscriber callback) is queued and applied afterwards.
//! 2. Subscribers are notified in registration order, once per applied
//!    action, with the state that action produced.
//! 3. A new subscriber immediately receives the current snapshot, then every
//!    later change. History is never replayed.
//! 4. Persistence failures are logged and never prevent publication.
//! 5. Published snapshots are immutable; the next state is always a new
//!    allocation.
//!
//! The store is single-threaded (`Rc`/`RefCell`); clones are handles to the
//! same instance.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::action::{reduce, PersistenceEffect, UserAction};
use crate::config::StoreConfig;
use crate::error::PersistenceError;
use crate::persistence::PersistenceAdapter;
use crate::storage::KeyValueStore;
use crate::types::{UserField, UserInformation, UserState};

/// Shared, immutable point-in-time state
pub type Snapshot = Rc<UserState>;

struct SubscriberEntry {
    id: u64,
    active: Cell<bool>,
    callback: Box<dyn Fn(&Snapshot)>,
}

struct StoreInner {
    state: RefCell<Snapshot>,
    subscribers: RefCell<Vec<Rc<SubscriberEntry>>>,
    next_subscriber_id: Cell<u64>,
    pending: RefCell<VecDeque<UserAction>>,
    dispatching: Cell<bool>,
    persistence: PersistenceAdapter,
}

/// Single source of truth for onboarding data
#[derive(Clone)]
pub struct UserStore {
    inner: Rc<StoreInner>,
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore")
            .field("state", &self.inner.state.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .field("persistence", &self.inner.persistence)
            .finish()
    }
}

impl UserStore {
    /// Create a store, restoring any previously saved record.
    ///
    /// Unreadable stored data is logged and the store starts empty.
    pub fn new(persistence: PersistenceAdapter) -> Self {
        let restored = match persistence.load() {
            Ok(Some(info)) => {
                debug!(key = persistence.key(), "restored saved user information");
                info
            }
            Ok(None) => UserInformation::default(),
            Err(e) => {
                warn!(key = persistence.key(), error = %e, "ignoring unreadable saved user information");
                UserInformation::default()
            }
        };

        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(Rc::new(UserState::from_information(restored))),
                subscribers: RefCell::new(Vec::new()),
                next_subscriber_id: Cell::new(0),
                pending: RefCell::new(VecDeque::new()),
                dispatching: Cell::new(false),
                persistence,
            }),
        }
    }

    /// Create a store over a key-value backend using the configured key
    pub fn with_config(storage: impl KeyValueStore + 'static, config: &StoreConfig) -> Self {
        Self::new(PersistenceAdapter::with_key(storage, config.storage_key.clone()))
    }

    /// Current state
    pub fn snapshot(&self) -> Snapshot {
        Rc::clone(&self.inner.state.borrow())
    }

    /// Whether a record is currently persisted
    pub fn has_saved_data(&self) -> bool {
        self.saved_data_exists().unwrap_or_else(|e| {
            warn!(error = %e, "failed to query saved user information");
            false
        })
    }

    /// Like [`has_saved_data`](Self::has_saved_data), reporting storage errors
    pub fn saved_data_exists(&self) -> Result<bool, PersistenceError> {
        self.inner.persistence.exists()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// Apply an action.
    ///
    /// If called while another action is being applied, the action is queued
    /// and applied once the current one has been published.
    pub fn dispatch(&self, action: UserAction) {
        self.inner.pending.borrow_mut().push_back(action);
        self.drain_pending();
    }

    pub fn update_field(&self, field: UserField, value: impl Into<String>) {
        self.dispatch(UserAction::update(field, value));
    }

    pub fn replace_all(&self, user_information: UserInformation) {
        self.dispatch(UserAction::replace_all(user_information));
    }

    pub fn clear(&self) {
        self.dispatch(UserAction::Clear);
    }

    pub fn revalidate(&self) {
        self.dispatch(UserAction::Revalidate);
    }

    /// Register a callback.
    ///
    /// The callback is invoked immediately with the current snapshot and then
    /// after every applied action until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    pub fn subscribe(&self, callback: impl Fn(&Snapshot) + 'static) -> Subscription {
        let id = self.inner.next_subscriber_id.get();
        self.inner.next_subscriber_id.set(id + 1);

        let entry = Rc::new(SubscriberEntry {
            id,
            active: Cell::new(true),
            callback: Box::new(callback),
        });
        // Registered before the initial delivery so a dispatch from inside the
        // callback is not missed.
        self.inner.subscribers.borrow_mut().push(Rc::clone(&entry));

        let current = self.snapshot();
        if self.inner.dispatching.get() {
            (entry.callback)(&current);
        } else {
            {
                self.inner.dispatching.set(true);
                let _guard = DispatchGuard(&self.inner.dispatching);
                (entry.callback)(&current);
            }
            // Dispatches made from the initial delivery run after it returns
            self.drain_pending();
        }

        Subscription {
            store: Rc::downgrade(&self.inner),
            entry,
        }
    }

    /// Subscribe to a projection of the state
    pub fn subscribe_select<T>(
        &self,
        selector: impl Fn(&UserState) -> T + 'static,
        callback: impl Fn(T) + 'static,
    ) -> Subscription {
        self.subscribe(move |state| callback(selector(state)))
    }

    fn drain_pending(&self) {
        if self.inner.dispatching.get() {
            return;
        }

        self.inner.dispatching.set(true);
        let _guard = DispatchGuard(&self.inner.dispatching);

        loop {
            let next = self.inner.pending.borrow_mut().pop_front();
            match next {
                Some(action) => self.apply(action),
                None => break,
            }
        }
    }

    fn apply(&self, action: UserAction) {
        debug!(action = ?action, "applying user action");

        let next = {
            let current = self.inner.state.borrow();
            Rc::new(reduce(&current, &action))
        };

        self.persist(action.persistence_effect(), &next);

        *self.inner.state.borrow_mut() = Rc::clone(&next);
        self.notify(&next);
    }

    fn persist(&self, effect: PersistenceEffect, state: &UserState) {
        let persistence = &self.inner.persistence;
        let result = match effect {
            PersistenceEffect::Save => persistence.save(state.user_information()),
            PersistenceEffect::Erase => persistence.clear(),
        };

        if let Err(e) = result {
            warn!(key = persistence.key(), effect = ?effect, error = %e, "failed to persist user information");
        }
    }

    fn notify(&self, snapshot: &Snapshot) {
        let subscribers: Vec<Rc<SubscriberEntry>> = self.inner.subscribers.borrow().clone();
        for entry in subscribers {
            // Unsubscribed earlier in this cycle
            if entry.active.get() {
                (entry.callback)(snapshot);
            }
        }
    }
}

struct DispatchGuard<'a>(&'a Cell<bool>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Handle to a registered store callback.
///
/// Dropping the handle unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    store: Weak<StoreInner>,
    entry: Rc<SubscriberEntry>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.entry.id)
            .field("active", &self.entry.active.get())
            .finish()
    }
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.entry.active.get()
    }

    /// Stop delivery. Calling this more than once has no further effect.
    pub fn unsubscribe(&self) {
        if !self.entry.active.replace(false) {
            return;
        }
        if let Some(inner) = self.store.upgrade() {
            let id = self.entry.id;
            inner.subscribers.borrow_mut().retain(|e| e.id != id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
