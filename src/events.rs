//! Callback lists and subscription handles
//!
//! An [`Emitter`] owns a list of callbacks; subscribing returns a
//! [`Subscription`] that removes its callback when disposed or dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Shared notification callback
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Locks a mutex, recovering the data if a callback panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    callbacks: Vec<(u64, Callback)>,
}

/// Ordered list of callbacks fired together by [`Emitter::emit`].
#[derive(Default)]
pub struct Emitter {
    listeners: Arc<Mutex<Listeners>>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback. It stays registered until the returned
    /// subscription is disposed or dropped, or the emitter is cleared.
    pub fn subscribe(&self, callback: Callback) -> Subscription {
        let id = {
            let mut listeners = lock(&self.listeners);
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.callbacks.push((id, callback));
            id
        };

        let listeners: Weak<Mutex<Listeners>> = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                lock(&listeners).callbacks.retain(|(other, _)| *other != id);
            }
        })
    }

    /// Invokes every registered callback in subscription order.
    ///
    /// The list is snapshotted first, so callbacks may subscribe or dispose
    /// without deadlocking.
    pub fn emit(&self) {
        let callbacks: Vec<Callback> = lock(&self.listeners)
            .callbacks
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            callback();
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).callbacks.len()
    }

    /// Drops every registered callback.
    pub fn clear(&self) {
        lock(&self.listeners).callbacks.clear();
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle to a registered callback.
///
/// Disposal runs at most once, either through [`Subscription::dispose`] or
/// on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(dispose: impl FnOnce() + Send + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// A subscription with nothing to undo.
    pub fn empty() -> Self {
        Self { dispose: None }
    }

    pub fn dispose(mut self) {
        self.run();
    }

    fn run(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.dispose.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Callback) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&count);
        (count, Arc::new(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_emit_reaches_every_listener() {
        let emitter = Emitter::new();
        let (first, cb1) = counter();
        let (second, cb2) = counter();
        let _s1 = emitter.subscribe(cb1);
        let _s2 = emitter.subscribe(cb2);

        emitter.emit();
        emitter.emit();

        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dispose_removes_only_its_listener() {
        let emitter = Emitter::new();
        let (first, cb1) = counter();
        let (second, cb2) = counter();
        let s1 = emitter.subscribe(cb1);
        let _s2 = emitter.subscribe(cb2);

        s1.dispose();
        emitter.emit();

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.listener_count(), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let emitter = Emitter::new();
        let (count, cb) = counter();
        drop(emitter.subscribe(cb));

        emitter.emit();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscription_outliving_emitter() {
        let emitter = Emitter::new();
        let (_, cb) = counter();
        let sub = emitter.subscribe(cb);
        drop(emitter);
        sub.dispose();
    }

    #[test]
    fn test_callback_may_unsubscribe_during_emit() {
        let emitter = Arc::new(Emitter::new());
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let inner = Arc::clone(&slot);
        let sub = emitter.subscribe(Arc::new(move || {
            inner.lock().unwrap().take();
        }));
        *slot.lock().unwrap() = Some(sub);

        emitter.emit();
        assert_eq!(emitter.listener_count(), 0);
    }
}
