//! # Slots
//!
//! Single-threaded observer registry.
//!
//! A [`Slot`] delivers every emitted value to its listeners synchronously, in
//! registration order. Registering returns a [`Subscription`]; disposing it
//! (explicitly or by dropping it) stops delivery.
//!
//! ## Emission rules
//!
//! - Listeners registered during an emission are not called for that emission
//! - A listener disposed during an emission is never called again, including
//!   later in the same emission
//! - Disposal is idempotent

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<T> = Rc<dyn Fn(&T)>;

struct Listener<T> {
    id: u64,
    active: Rc<Cell<bool>>,
    callback: Callback<T>,
}

struct SlotInner<T> {
    listeners: RefCell<Vec<Listener<T>>>,
    next_id: Cell<u64>,
}

/// Observer registry for values of type `T`
pub struct Slot<T> {
    inner: Rc<SlotInner<T>>,
}

impl<T: 'static> Slot<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SlotInner {
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Register a listener
    pub fn on<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        let active = Rc::new(Cell::new(true));
        let callback: Callback<T> = Rc::new(callback);
        self.inner.listeners.borrow_mut().push(Listener {
            id,
            active: Rc::clone(&active),
            callback,
        });

        let weak: Weak<SlotInner<T>> = Rc::downgrade(&self.inner);
        Subscription::new(active, move || {
            if let Some(inner) = weak.upgrade() {
                let removed = {
                    let mut listeners = inner.listeners.borrow_mut();
                    listeners
                        .iter()
                        .position(|listener| listener.id == id)
                        .map(|pos| listeners.remove(pos))
                };
                // Dropped outside the borrow: the callback may own other subscriptions
                drop(removed);
            }
        })
    }

    /// Deliver `value` to every active listener
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<(Rc<Cell<bool>>, Callback<T>)> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|listener| (Rc::clone(&listener.active), Rc::clone(&listener.callback)))
            .collect();

        for (active, callback) in snapshot {
            if active.get() {
                callback(value);
            }
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispose every listener
    pub fn clear(&self) {
        let listeners = std::mem::take(&mut *self.inner.listeners.borrow_mut());
        for listener in &listeners {
            listener.active.set(false);
        }
    }
}

impl<T: 'static> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

/// Disposal handle returned by [`Slot::on`]
///
/// Dropping the handle disposes it.
pub struct Subscription {
    active: Rc<Cell<bool>>,
    detach: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
    fn new(active: Rc<Cell<bool>>, detach: impl FnOnce() + 'static) -> Self {
        Self {
            active,
            detach: RefCell::new(Some(Box::new(detach))),
        }
    }

    /// Stop delivery to this listener
    pub fn dispose(&self) {
        self.active.set(false);
        let detach = self.detach.borrow_mut().take();
        if let Some(detach) = detach {
            detach();
        }
    }

    pub fn is_disposed(&self) -> bool {
        !self.active.get()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// A set of subscriptions disposed together
#[derive(Debug, Default)]
pub struct SubscriptionGroup {
    subscriptions: Vec<Subscription>,
}

impl SubscriptionGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn dispose(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.dispose();
        }
    }
}
