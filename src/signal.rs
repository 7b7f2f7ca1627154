//! Observer registry for host signals.
//!
//! `subscribe` hands back a [`Subscription`]; dropping it unregisters the
//! observer, so teardown happens on every exit path.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Observer<T> = Rc<dyn Fn(&T)>;

struct Registry<T> {
    next_id: u64,
    observers: Vec<(u64, Observer<T>)>,
}

/// A broadcast signal with scoped subscriptions.
pub struct Signal<T> {
    registry: Rc<RefCell<Registry<T>>>,
}

impl<T: 'static> Signal<T> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                observers: Vec::new(),
            })),
        }
    }

    pub fn subscribe(&self, observer: impl Fn(&T) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.observers.push((id, Rc::new(observer)));

        let weak: Weak<RefCell<Registry<T>>> = Rc::downgrade(&self.registry);
        Subscription {
            dispose: Some(Box::new(move || {
                if let Some(registry) = weak.upgrade() {
                    registry.borrow_mut().observers.retain(|(i, _)| *i != id);
                }
            })),
        }
    }

    /// Notify every current observer.
    ///
    /// Observers may subscribe or unsubscribe while being notified; changes
    /// take effect from the next emit.
    pub fn emit(&self, value: &T) {
        let observers: Vec<Observer<T>> = self
            .registry
            .borrow()
            .observers
            .iter()
            .map(|(_, o)| o.clone())
            .collect();
        for observer in observers {
            observer(value);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.registry.borrow().observers.len()
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Disposer for a signal observer.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Unsubscribe now.
    pub fn dispose(mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_emit_reaches_subscribers() {
        let signal = Signal::<u32>::new();
        let seen = Rc::new(Cell::new(0));
        let s = seen.clone();
        let _sub = signal.subscribe(move |v| s.set(s.get() + *v));
        signal.emit(&2);
        signal.emit(&3);
        assert_eq!(seen.get(), 5);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let signal = Signal::<()>::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let sub = signal.subscribe(move |_| h.set(h.get() + 1));
        assert_eq!(signal.observer_count(), 1);
        signal.emit(&());
        drop(sub);
        assert_eq!(signal.observer_count(), 0);
        signal.emit(&());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_dispose_only_removes_own_observer() {
        let signal = Signal::<()>::new();
        let a = signal.subscribe(|_| {});
        let _b = signal.subscribe(|_| {});
        a.dispose();
        assert_eq!(signal.observer_count(), 1);
    }

    #[test]
    fn test_subscription_outlives_signal() {
        let signal = Signal::<()>::new();
        let sub = signal.subscribe(|_| {});
        drop(signal);
        drop(sub);
    }
}
