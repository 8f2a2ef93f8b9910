//! Change-notification plumbing shared by live configuration and monitors.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Registered change callbacks, invoked in registration order.
pub(crate) struct Listeners<T: ?Sized> {
    entries: Mutex<Vec<(u64, Callback<T>)>>,
    next_id: AtomicU64,
}

impl<T: ?Sized + 'static> Listeners<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Adds `callback` and returns a [`Subscription`] that removes it on drop.
    ///
    /// `owner` is the structure holding these listeners; the subscription
    /// only keeps a weak reference to it.
    pub(crate) fn subscribe<O, F>(
        &self,
        owner: Weak<O>,
        project: fn(&O) -> &Listeners<T>,
        callback: F,
    ) -> Subscription
    where
        O: Send + Sync + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push((id, Arc::new(callback)));

        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(owner) = owner.upgrade() {
                    project(&owner).remove(id);
                }
            })),
        }
    }

    fn remove(&self, id: u64) {
        self.entries.lock().retain(|(entry, _)| *entry != id);
    }

    /// Calls every callback with `value`.
    ///
    /// The lock is released before the callbacks run, so a callback may
    /// subscribe or drop subscriptions itself.
    pub(crate) fn notify(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = self
            .entries
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Keeps a change callback registered until dropped.
#[must_use = "dropping a subscription unregisters its callback"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Leaves the callback registered for the lifetime of its source.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Owner {
        listeners: Listeners<u32>,
    }

    fn owner() -> Arc<Owner> {
        Arc::new(Owner {
            listeners: Listeners::new(),
        })
    }

    #[test]
    fn test_notify_and_unsubscribe_on_drop() {
        let owner = owner();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&seen);
        let subscription = owner.listeners.subscribe(
            Arc::downgrade(&owner),
            |o| &o.listeners,
            move |v| {
                counter.fetch_add(*v as usize, Ordering::SeqCst);
            },
        );

        owner.listeners.notify(&2);
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        drop(subscription);
        assert_eq!(owner.listeners.len(), 0);
        owner.listeners.notify(&5);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_detach_keeps_callback() {
        let owner = owner();
        owner
            .listeners
            .subscribe(Arc::downgrade(&owner), |o| &o.listeners, |_| {})
            .detach();

        assert_eq!(owner.listeners.len(), 1);
    }

    #[test]
    fn test_drop_after_owner_is_gone() {
        let owner = owner();
        let subscription =
            owner
                .listeners
                .subscribe(Arc::downgrade(&owner), |o| &o.listeners, |_| {});
        drop(owner);
        drop(subscription);
    }
}
