//! Small cross-thread primitives shared by the engine and the session host.
//!
//! [`state_channel`] is a latest-value channel: the single writer replaces the
//! value and readers only ever observe the most recent one. [`EventSlot`] is a
//! one-deep buffer for events that must be delivered at most once, even if no
//! reader was waiting when they were emitted.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Notify, watch};

/// Create a latest-value channel seeded with `initial`.
pub fn state_channel<T>(initial: T) -> (StatePublisher<T>, StateSubscriber<T>) {
    let (tx, rx) = watch::channel(initial);
    (
        StatePublisher { tx },
        StateSubscriber {
            rx,
            primed: true,
        },
    )
}

/// The single writer of a state channel.
#[derive(Debug)]
pub struct StatePublisher<T> {
    tx: watch::Sender<T>,
}

impl<T> StatePublisher<T> {
    /// Replace the published value. Never blocks, even without subscribers.
    pub fn publish(&self, value: T) {
        self.tx.send_replace(value);
    }

    pub fn subscribe(&self) -> StateSubscriber<T> {
        StateSubscriber {
            rx: self.tx.subscribe(),
            primed: true,
        }
    }
}

/// A reader of a state channel.
///
/// A fresh subscriber reports the current value as changed once, so late
/// subscribers start from the latest state instead of waiting for the next
/// update.
#[derive(Debug)]
pub struct StateSubscriber<T> {
    rx: watch::Receiver<T>,
    primed: bool,
}

impl<T> Clone for StateSubscriber<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            primed: true,
        }
    }
}

impl<T: Clone> StateSubscriber<T> {
    /// The most recent value, without marking it seen.
    pub fn latest(&self) -> T {
        self.rx.borrow().clone()
    }

    /// The most recent value if it changed since the last call.
    pub fn take_if_changed(&mut self) -> Option<T> {
        let changed = self.rx.has_changed().unwrap_or(false);
        if std::mem::take(&mut self.primed) || changed {
            Some(self.rx.borrow_and_update().clone())
        } else {
            None
        }
    }

    /// Wait for the next value. Returns `None` once the publisher is gone and
    /// everything it published was observed.
    pub async fn changed(&mut self) -> Option<T> {
        if std::mem::take(&mut self.primed) {
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

struct SlotInner<T> {
    pending: Mutex<Option<T>>,
    notify: Notify,
}

/// One-deep event buffer with at-most-once delivery.
///
/// Emitting while an event is still pending replaces it; each emitted event
/// is taken by at most one reader.
pub struct EventSlot<T> {
    inner: Arc<SlotInner<T>>,
}

impl<T> Clone for EventSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for EventSlot<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(SlotInner {
                pending: Mutex::new(None),
                notify: Notify::new(),
            }),
        }
    }
}

impl<T> std::fmt::Debug for EventSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSlot")
            .field("pending", &self.pending().is_some())
            .finish()
    }
}

impl<T> EventSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, Option<T>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Buffer `event`, returning the undelivered event it displaced.
    pub fn emit(&self, event: T) -> Option<T> {
        let displaced = self.pending().replace(event);
        self.inner.notify.notify_one();
        displaced
    }

    pub fn try_take(&self) -> Option<T> {
        self.pending().take()
    }

    /// Wait until an event is available and take it.
    pub async fn recv(&self) -> T {
        loop {
            let notified = self.inner.notify.notified();
            if let Some(event) = self.try_take() {
                return event;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests;
