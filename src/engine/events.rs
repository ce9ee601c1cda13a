// src/engine/events.rs
//! Synchronous event bus with scoped subscriptions

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// An event carries a kind used to route it to listeners
pub trait Event: 'static {
    type Kind: Copy + PartialEq + 'static;

    fn kind(&self) -> Self::Kind;
}

type Handler<E> = Rc<dyn Fn(&E)>;

struct Listener<E: Event> {
    id: u64,
    kind: E::Kind,
    handler: Handler<E>,
}

struct Registry<E: Event> {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<Listener<E>>>,
}

trait Unsubscribe {
    fn off(&self, id: u64);
}

impl<E: Event> Unsubscribe for Registry<E> {
    fn off(&self, id: u64) {
        self.listeners.borrow_mut().retain(|l| l.id != id);
    }
}

/// Listener registry for one event source.
///
/// Handlers run synchronously in registration order. The listener list is
/// snapshotted before dispatch, so a handler may subscribe, unsubscribe or
/// fire further events without invalidating the current dispatch.
pub struct Evented<E: Event> {
    registry: Rc<Registry<E>>,
}

impl<E: Event> Evented<E> {
    pub fn new() -> Self {
        Self {
            registry: Rc::new(Registry {
                next_id: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register `handler` for events of `kind`; the listener lives as long
    /// as the returned subscription
    #[must_use = "dropping the subscription removes the listener"]
    pub fn on<F>(&self, kind: E::Kind, handler: F) -> Subscription
    where
        F: Fn(&E) + 'static,
    {
        let id = self.registry.next_id.get();
        self.registry.next_id.set(id + 1);
        self.registry.listeners.borrow_mut().push(Listener {
            id,
            kind,
            handler: Rc::new(handler),
        });

        let registry: Rc<dyn Unsubscribe> = self.registry.clone();
        Subscription {
            registry: Rc::downgrade(&registry),
            id,
        }
    }

    pub fn fire(&self, event: &E) {
        let kind = event.kind();
        let handlers: Vec<Handler<E>> = self
            .registry
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| Rc::clone(&l.handler))
            .collect();

        for handler in handlers {
            handler(event);
        }
    }

    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.registry
            .listeners
            .borrow()
            .iter()
            .filter(|l| l.kind == kind)
            .count()
    }

    pub fn has_listeners(&self, kind: E::Kind) -> bool {
        self.listener_count(kind) > 0
    }
}

impl<E: Event> Default for Evented<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes its listener when dropped
pub struct Subscription {
    registry: Weak<dyn Unsubscribe>,
    id: u64,
}

impl Subscription {
    /// Remove the listener now
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.off(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
