//! Single-threaded publish/subscribe with scoped subscriptions.
//!
//! A [`Signal`] owns a list of closures. [`Signal::connect`] returns a
//! [`Connection`] token; the closure stays subscribed exactly as long as the
//! token is alive. Dropping (or explicitly disconnecting) the token removes
//! the closure, so a subscriber that is destroyed can never be invoked again.
//!
//! Emission works on a snapshot of the subscriber list, which means a
//! closure may freely connect or disconnect other subscribers (or itself)
//! while the signal is being emitted.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Slot<T> = Rc<RefCell<dyn FnMut(&T)>>;

struct SlotList<T> {
    next_id: Cell<u64>,
    slots: RefCell<Vec<(u64, Slot<T>)>>,
}

impl<T> SlotList<T> {
    fn contains(&self, id: u64) -> bool {
        self.slots.borrow().iter().any(|(slot_id, _)| *slot_id == id)
    }
}

/// Type-erased removal so a [`Connection`] does not carry the payload type.
trait Disconnect {
    fn remove(&self, id: u64) -> bool;
    fn is_subscribed(&self, id: u64) -> bool;
}

impl<T> Disconnect for SlotList<T> {
    fn remove(&self, id: u64) -> bool {
        let mut slots = self.slots.borrow_mut();
        let before = slots.len();
        slots.retain(|(slot_id, _)| *slot_id != id);
        slots.len() != before
    }

    fn is_subscribed(&self, id: u64) -> bool {
        self.contains(id)
    }
}

/// A typed event stream that closures can subscribe to.
///
/// `T` is the payload handed to every subscriber on [`Signal::emit`]; use
/// `Signal<()>` for plain notifications.
pub struct Signal<T = ()> {
    inner: Rc<SlotList<T>>,
}

impl<T: 'static> Signal<T> {
    /// Create a signal with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SlotList {
                next_id: Cell::new(0),
                slots: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Subscribe `callback`. It is invoked on every [`Signal::emit`] until
    /// the returned [`Connection`] is dropped or disconnected.
    pub fn connect(&self, callback: impl FnMut(&T) + 'static) -> Connection {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        let slot: Slot<T> = Rc::new(RefCell::new(callback));
        self.inner.slots.borrow_mut().push((id, slot));

        let list: Rc<dyn Disconnect> = self.inner.clone();
        Connection {
            list: Some(Rc::downgrade(&list)),
            id,
        }
    }

    /// Invoke every live subscriber with `value`, in subscription order.
    ///
    /// Returns the number of subscribers that were invoked. A subscriber
    /// that re-entrantly emits the signal it is subscribed to is skipped
    /// for the nested emission.
    pub fn emit(&self, value: &T) -> usize {
        let snapshot: Vec<(u64, Slot<T>)> = self.inner.slots.borrow().clone();
        let mut delivered = 0;
        for (id, slot) in snapshot {
            if !self.inner.contains(id) {
                continue;
            }
            match slot.try_borrow_mut() {
                Ok(mut callback) => {
                    (&mut *callback)(value);
                    delivered += 1;
                }
                Err(_) => {
                    log::warn!("skipping re-entrant emission for subscriber {id}");
                }
            }
        }
        delivered
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.slots.borrow().len()
    }

    /// Whether anything is subscribed.
    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.inner.slots.borrow().len())
            .finish()
    }
}

/// Scoped subscription token returned by [`Signal::connect`].
///
/// The subscription ends when the token is dropped. The token holds only a
/// weak reference, so it never keeps the signal alive.
#[must_use = "dropping a Connection immediately unsubscribes the callback"]
pub struct Connection {
    list: Option<Weak<dyn Disconnect>>,
    id: u64,
}

impl Connection {
    /// Whether the callback is still subscribed (the signal is alive and the
    /// token has not been disconnected).
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.list
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|list| list.is_subscribed(self.id))
    }

    /// End the subscription now. Returns `false` if it had already ended.
    pub fn disconnect(&mut self) -> bool {
        self.list
            .take()
            .and_then(|weak| weak.upgrade())
            .is_some_and(|list| list.remove(self.id))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_reaches_every_subscriber_in_order() {
        let signal = Signal::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let a = {
            let seen = seen.clone();
            signal.connect(move |v| seen.borrow_mut().push(("a", *v)))
        };
        let b = {
            let seen = seen.clone();
            signal.connect(move |v| seen.borrow_mut().push(("b", *v)))
        };

        assert_eq!(signal.emit(&7), 2);
        assert_eq!(*seen.borrow(), vec![("a", 7), ("b", 7)]);
        assert!(a.is_connected() && b.is_connected());
    }

    #[test]
    fn dropping_the_token_unsubscribes() {
        let signal = Signal::<()>::new();
        let hits = Rc::new(Cell::new(0));
        let connection = {
            let hits = hits.clone();
            signal.connect(move |_| hits.set(hits.get() + 1))
        };

        assert_eq!(signal.emit(&()), 1);
        drop(connection);
        assert_eq!(signal.emit(&()), 0);
        assert_eq!(hits.get(), 1);
        assert!(!signal.has_subscribers());
    }

    #[test]
    fn disconnect_is_idempotent() {
        let signal = Signal::<()>::new();
        let mut connection = signal.connect(|_| {});
        assert!(connection.disconnect());
        assert!(!connection.disconnect());
        assert!(!connection.is_connected());
    }

    #[test]
    fn connection_outliving_signal_is_inert() {
        let signal = Signal::<()>::new();
        let mut connection = signal.connect(|_| {});
        drop(signal);
        assert!(!connection.is_connected());
        assert!(!connection.disconnect());
    }

    #[test]
    fn subscriber_can_drop_another_during_emit() {
        let signal = Signal::<()>::new();
        let victim_hits = Rc::new(Cell::new(0));
        let victim_slot: Rc<RefCell<Option<Connection>>> =
            Rc::new(RefCell::new(None));

        let _killer = {
            let victim_slot = victim_slot.clone();
            signal.connect(move |_| drop(victim_slot.borrow_mut().take()))
        };
        let victim = {
            let victim_hits = victim_hits.clone();
            signal.connect(move |_| victim_hits.set(victim_hits.get() + 1))
        };
        *victim_slot.borrow_mut() = Some(victim);

        assert_eq!(signal.emit(&()), 1);
        assert_eq!(victim_hits.get(), 0);
        assert_eq!(signal.subscriber_count(), 1);
    }
}
