//! Publish/subscribe plumbing for tree notifications.
//!
//! Emitters can be paused: while paused, fired events are queued and
//! delivered once the outermost `resume` runs. Coalescing emitters keep only
//! the latest queued event, so a batch of API calls produces one notification.

use std::fmt;

/// Handle returned by [`Emitter::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Box<dyn FnMut(&E)>;

/// Event source with buffered delivery.
pub struct Emitter<E> {
    listeners: Vec<(ListenerId, Listener<E>)>,
    next_id: u64,
    paused: usize,
    pending: Vec<E>,
    coalesce: bool,
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listeners.len())
            .field("paused", &self.paused)
            .field("pending", &self.pending.len())
            .field("coalesce", &self.coalesce)
            .finish()
    }
}

impl<E> Emitter<E> {
    /// Creates an emitter that delivers every buffered event.
    pub const fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
            paused: 0,
            pending: Vec::new(),
            coalesce: false,
        }
    }

    /// Creates an emitter that only delivers the latest event of a buffered batch.
    pub const fn coalescing() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
            paused: 0,
            pending: Vec::new(),
            coalesce: true,
        }
    }

    /// Registers a listener and returns its handle.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&E) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener; returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.listeners.len()
    }

    /// Returns `true` if at least one listener is registered.
    pub const fn has_listeners(&self) -> bool {
        !self.listeners.is_empty()
    }

    /// Fires an event, or queues it while the emitter is paused.
    pub fn fire(&mut self, event: E) {
        if self.paused > 0 {
            if self.coalesce {
                self.pending.clear();
            }
            self.pending.push(event);
            return;
        }
        self.deliver(&event);
    }

    /// Starts buffering. Calls nest.
    pub const fn pause(&mut self) {
        self.paused += 1;
    }

    /// Ends one level of buffering and flushes the queue at the outermost level.
    pub fn resume(&mut self) {
        self.paused = self.paused.saturating_sub(1);
        if self.paused > 0 {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        for event in &pending {
            self.deliver(event);
        }
    }

    fn deliver(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(emitter: &mut Emitter<u32>) -> Rc<RefCell<Vec<u32>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        emitter.subscribe(move |value| sink.borrow_mut().push(*value));
        seen
    }

    #[test]
    fn delivers_immediately_when_not_paused() {
        let mut emitter = Emitter::new();
        let seen = recorder(&mut emitter);
        emitter.fire(1);
        emitter.fire(2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn nested_pause_flushes_at_outermost_resume() {
        let mut emitter = Emitter::new();
        let seen = recorder(&mut emitter);
        emitter.pause();
        emitter.fire(1);
        emitter.pause();
        emitter.fire(2);
        emitter.resume();
        assert!(seen.borrow().is_empty());
        emitter.resume();
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn coalescing_keeps_latest_event() {
        let mut emitter = Emitter::coalescing();
        let seen = recorder(&mut emitter);
        emitter.pause();
        emitter.fire(1);
        emitter.fire(2);
        emitter.fire(3);
        emitter.resume();
        assert_eq!(*seen.borrow(), vec![3]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut emitter = Emitter::new();
        let seen = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&seen);
        let id = emitter.subscribe(move |_: &u32| *sink.borrow_mut() += 1);
        emitter.fire(1);
        assert!(emitter.unsubscribe(id));
        emitter.fire(2);
        assert_eq!(*seen.borrow(), 1);
        assert!(!emitter.unsubscribe(id));
    }
}
