//! Observable values and scoped subscriptions.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Runs its cancel action exactly once, when dropped or cancelled.
#[must_use = "dropping a subscription cancels it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    pub fn cancel(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

type Callback<T> = Box<dyn FnMut(&T)>;

struct Inner<T> {
    value: T,
    next_id: u64,
    subscribers: Vec<(u64, Callback<T>)>,
    notifying: bool,
    /// Ids cancelled while their callbacks were out for notification.
    cancelled: Vec<u64>,
}

/// A value that notifies subscribers when it changes.
pub struct Signal<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner { value, next_id: 0, subscribers: Vec::new(), notifying: false, cancelled: Vec::new() })),
        }
    }

    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Stores `value` and notifies subscribers if it differs from the
    /// current one. Subscribers may read the signal while being notified.
    pub fn set(&self, value: T) {
        let mut callbacks = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value.clone();
            inner.notifying = true;
            std::mem::take(&mut inner.subscribers)
        };
        for (_, callback) in callbacks.iter_mut() {
            callback(&value);
        }
        let mut inner = self.inner.borrow_mut();
        let cancelled = std::mem::take(&mut inner.cancelled);
        callbacks.retain(|(id, _)| !cancelled.contains(id));
        callbacks.append(&mut inner.subscribers);
        inner.subscribers = callbacks;
        inner.notifying = false;
    }

    pub fn subscribe(&self, callback: impl FnMut(&T) + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            inner.next_id += 1;
            let id = inner.next_id;
            inner.subscribers.push((id, Box::new(callback)));
            id
        };
        let weak: Weak<RefCell<Inner<T>>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                if let Ok(mut inner) = inner.try_borrow_mut() {
                    inner.subscribers.retain(|(sid, _)| *sid != id);
                    if inner.notifying {
                        inner.cancelled.push(id);
                    }
                }
            }
        })
    }
}
