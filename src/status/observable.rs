use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

/// Listener invoked with the new value after every change.
pub type ChangeListener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle for removing a listener registered with [`Observable::on_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A value holder that broadcasts to registered listeners when it changes.
///
/// Synchronous listeners run on the thread that called [`set`](Self::set).
/// Async consumers can [`subscribe`](Self::subscribe) to a watch channel
/// instead. Setting an equal value notifies nobody.
pub struct Observable<T> {
    sender: watch::Sender<T>,
    listeners: Mutex<Vec<(ListenerId, ChangeListener<T>)>>,
    next_id: AtomicU64,
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender,
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.sender.borrow().clone()
    }

    /// Replace the value, notifying listeners if it differs from the current
    /// one. Returns whether a change happened.
    pub fn set(&self, value: T) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
        if changed {
            let current = self.get();
            // Listeners run outside the lock so they may register or remove
            // other listeners.
            let listeners: Vec<ChangeListener<T>> =
                self.listeners.lock().iter().map(|(_, l)| Arc::clone(l)).collect();
            for listener in listeners {
                listener(&current);
            }
        }
        changed
    }

    /// Register a synchronous change listener.
    pub fn on_change(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(l, _)| *l != id);
        listeners.len() != before
    }

    /// Watch channel receiving every change.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }
}
