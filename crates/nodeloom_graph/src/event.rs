// SPDX-License-Identifier: MIT OR Apache-2.0
//! Change notification plumbing.
//!
//! There is no implicit reactivity anywhere in the engine: mutations notify
//! an explicit subscriber list ([`EventBus`]), and externally observed value
//! cells are explicit containers ([`Observable`]) with subscribe/unsubscribe.

use crate::connection::ConnectionId;
use crate::node::NodeId;
use std::fmt;

/// Opaque handle identifying a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// A structural change to the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    /// A node was added.
    NodeAdded(NodeId),
    /// A node was removed (cascades already applied).
    NodeRemoved(NodeId),
    /// A node moved or was resized.
    NodeChanged(NodeId),
    /// A connection was added.
    ConnectionAdded(ConnectionId),
    /// A connection was removed.
    ConnectionRemoved(ConnectionId),
    /// The outermost batch began.
    BatchStarted {
        /// Host-supplied reason, for diagnostics.
        reason: String,
    },
    /// The outermost batch ended, also on the unwind path.
    BatchEnded {
        /// Host-supplied reason, for diagnostics.
        reason: String,
    },
}

type Listener<T> = Box<dyn FnMut(&T)>;

/// Subscriber list delivering [`GraphEvent`]s synchronously, in
/// subscription order.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(SubscriberId, Listener<GraphEvent>)>,
    next_id: u64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; returns a handle for unsubscribing.
    pub fn subscribe(&mut self, listener: impl FnMut(&GraphEvent) + 'static) -> SubscriberId {
        self.next_id += 1;
        let id = SubscriberId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns true if the handle was registered.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Deliver an event to every listener.
    pub fn emit(&mut self, event: &GraphEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// An explicit value cell with change notification.
pub struct Observable<T> {
    value: T,
    listeners: Vec<(SubscriberId, Listener<T>)>,
    next_id: u64,
}

impl<T> Observable<T> {
    /// Create a cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            value,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Read the current value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replace the value and notify listeners.
    pub fn set(&mut self, value: T) {
        self.value = value;
        for (_, listener) in &mut self.listeners {
            listener(&self.value);
        }
    }

    /// Mutate the value in place and notify listeners.
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        f(&mut self.value);
        for (_, listener) in &mut self.listeners {
            listener(&self.value);
        }
    }

    /// Register a change listener; returns a handle for unsubscribing.
    pub fn subscribe(&mut self, listener: impl FnMut(&T) + 'static) -> SubscriberId {
        self.next_id += 1;
        let id = SubscriberId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a change listener. Returns true if the handle was registered.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.value)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_subscribe_and_emit() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut bus = EventBus::new();
        bus.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        bus.emit(&GraphEvent::NodeAdded("a".into()));

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0], GraphEvent::NodeAdded("a".into()));
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);

        let mut bus = EventBus::new();
        let id = bus.subscribe(move |_| *sink.borrow_mut() += 1);
        bus.emit(&GraphEvent::NodeAdded("a".into()));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(&GraphEvent::NodeAdded("b".into()));

        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_observable_set_notifies() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut cell = Observable::new(1);
        let id = cell.subscribe(move |v| sink.borrow_mut().push(*v));
        cell.set(2);
        cell.update(|v| *v += 1);
        assert!(cell.unsubscribe(id));
        cell.set(9);

        assert_eq!(*cell.get(), 9);
        assert_eq!(*seen.borrow(), vec![2, 3]);
    }
}
