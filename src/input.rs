//! Input source models
//!
//! Widget-independent stand-ins for the form controls. Hosts forward raw
//! widget changes into these models; bindings observe them.
//!
//! - [`TextField`]: free text, one change event per keystroke
//! - [`Selector`]: a fixed list of options (segmented control)
//!
//! Programmatic updates (`set_text`, `set_selected`) never emit change
//! events, matching platform text fields where only user edits notify.

use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Options offered by the gender selector, in display order
pub const GENDER_OPTIONS: [&str; 2] = ["Male", "Female"];

/// A raw change reported by an input source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEvent {
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

/// Identifier of a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Change listener callback
pub type Listener = Rc<dyn Fn(&InputEvent)>;

/// Something that reports raw value changes synchronously
pub trait InputSource {
    fn add_listener(&self, listener: Listener) -> ListenerId;

    /// Returns false if the listener was not registered
    fn remove_listener(&self, id: ListenerId) -> bool;

    /// Discrete controls report deliberate choices, not keystrokes, and are
    /// forwarded without debouncing
    fn is_discrete(&self) -> bool {
        false
    }
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, Listener)>>,
}

impl ListenerRegistry {
    fn add(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.listeners.borrow_mut().push((id, listener));
        id
    }

    fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn emit(&self, event: &InputEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}

#[derive(Default)]
struct TextFieldInner {
    text: RefCell<String>,
    listeners: ListenerRegistry,
}

/// Free-text input. Clones are handles to the same field.
#[derive(Clone, Default)]
pub struct TextField {
    inner: Rc<TextFieldInner>,
}

impl std::fmt::Debug for TextField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextField")
            .field("text", &self.inner.text.borrow())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

impl TextField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.inner.text.borrow().clone()
    }

    /// Replace the text without notifying listeners (prefill)
    pub fn set_text(&self, text: impl Into<String>) {
        *self.inner.text.borrow_mut() = text.into();
    }

    /// User edit at the current wall-clock time
    pub fn input(&self, text: impl Into<String>) {
        self.input_at(text, Utc::now());
    }

    /// User edit at `timestamp`; notifies every listener
    pub fn input_at(&self, text: impl Into<String>, timestamp: DateTime<Utc>) {
        let value = text.into();
        *self.inner.text.borrow_mut() = value.clone();
        self.inner.listeners.emit(&InputEvent { value, timestamp });
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }
}

impl InputSource for TextField {
    fn add_listener(&self, listener: Listener) -> ListenerId {
        self.inner.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }
}

struct SelectorInner {
    options: Vec<String>,
    selected: Cell<Option<usize>>,
    listeners: ListenerRegistry,
}

/// Discrete choice among fixed options. Clones are handles to the same control.
#[derive(Clone)]
pub struct Selector {
    inner: Rc<SelectorInner>,
}

impl std::fmt::Debug for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector")
            .field("options", &self.inner.options)
            .field("selected", &self.inner.selected.get())
            .finish()
    }
}

impl Selector {
    pub fn new<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Rc::new(SelectorInner {
                options: options.into_iter().map(Into::into).collect(),
                selected: Cell::new(None),
                listeners: ListenerRegistry::default(),
            }),
        }
    }

    /// Male / Female selector
    pub fn gender() -> Self {
        Self::new(GENDER_OPTIONS)
    }

    pub fn options(&self) -> &[String] {
        &self.inner.options
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.inner.selected.get()
    }

    pub fn selected_value(&self) -> Option<&str> {
        self.selected_index()
            .and_then(|i| self.inner.options.get(i))
            .map(String::as_str)
    }

    /// Index of an option by value
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.inner.options.iter().position(|option| option == value)
    }

    /// Change the selection without notifying listeners (prefill).
    /// Out-of-range indices clear the selection.
    pub fn set_selected(&self, index: Option<usize>) {
        let index = index.filter(|i| *i < self.inner.options.len());
        self.inner.selected.set(index);
    }

    /// User selection at the current wall-clock time
    pub fn select(&self, index: usize) -> bool {
        self.select_at(index, Utc::now())
    }

    /// User selection at `timestamp`. Returns false, without notifying, for
    /// an out-of-range index.
    pub fn select_at(&self, index: usize, timestamp: DateTime<Utc>) -> bool {
        let Some(value) = self.inner.options.get(index).cloned() else {
            return false;
        };
        self.inner.selected.set(Some(index));
        self.inner.listeners.emit(&InputEvent { value, timestamp });
        true
    }
}

impl InputSource for Selector {
    fn add_listener(&self, listener: Listener) -> ListenerId {
        self.inner.listeners.add(listener)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    fn is_discrete(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: &impl InputSource) -> (Rc<RefCell<Vec<String>>>, ListenerId) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = source.add_listener(Rc::new(move |e: &InputEvent| {
            sink.borrow_mut().push(e.value.clone())
        }));
        (seen, id)
    }

    #[test]
    fn test_text_field_emits_user_edits_only() {
        let field = TextField::new();
        let (seen, id) = collect(&field);

        field.set_text("prefilled");
        field.input("J");
        field.input("Jo");

        assert_eq!(*seen.borrow(), vec!["J", "Jo"]);
        assert_eq!(field.text(), "Jo");

        assert!(field.remove_listener(id));
        assert!(!field.remove_listener(id));
        field.input("Joe");
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_selector() {
        let selector = Selector::gender();
        let (seen, _) = collect(&selector);

        assert!(selector.select(1));
        assert!(!selector.select(5));
        assert_eq!(*seen.borrow(), vec!["Female"]);
        assert_eq!(selector.selected_value(), Some("Female"));

        selector.set_selected(selector.index_of("Male"));
        assert_eq!(selector.selected_index(), Some(0));
        assert_eq!(seen.borrow().len(), 1);

        selector.set_selected(Some(9));
        assert_eq!(selector.selected_index(), None);

        assert!(selector.is_discrete());
        assert!(!TextField::new().is_discrete());
    }

    #[test]
    fn test_listener_may_remove_itself() {
        let field = TextField::new();
        let slot: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));

        let handle = field.clone();
        let own_id = Rc::clone(&slot);
        let id = field.add_listener(Rc::new(move |_: &InputEvent| {
            if let Some(id) = own_id.get() {
                handle.remove_listener(id);
            }
        }));
        slot.set(Some(id));

        field.input("a");
        assert_eq!(field.listener_count(), 0);
    }
}
