//! In-process change listeners
//!
//! Gateways that observe their own writes fan change signals out through a
//! `ChangeHub`. Callbacks run on the writer's task, outside the registry lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::rows::Table;
use super::traits::{ChangeCallback, Subscription};

struct Listener {
    table: Table,
    owner_id: String,
    callback: ChangeCallback,
}

#[derive(Clone, Default)]
pub struct ChangeHub {
    next_id: Arc<AtomicU64>,
    listeners: Arc<Mutex<HashMap<u64, Listener>>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, table: Table, owner_id: &str, callback: ChangeCallback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().insert(
            id,
            Listener {
                table,
                owner_id: owner_id.to_string(),
                callback,
            },
        );

        let listeners = Arc::clone(&self.listeners);
        Subscription::new(move || {
            listeners.lock().remove(&id);
        })
    }

    /// Signal every listener of `table` registered for `owner_id`
    pub fn notify(&self, table: Table, owner_id: &str) {
        let callbacks: Vec<ChangeCallback> = self
            .listeners
            .lock()
            .values()
            .filter(|l| l.table == table && l.owner_id == owner_id)
            .map(|l| Arc::clone(&l.callback))
            .collect();

        log::debug!("{} change for {}: {} listener(s)", table.as_str(), owner_id, callbacks.len());
        for callback in callbacks {
            callback();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, ChangeCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_notify_filters_by_table_and_owner() {
        let hub = ChangeHub::new();
        let (tasks_u1, cb1) = counter();
        let (cats_u1, cb2) = counter();
        let (tasks_u2, cb3) = counter();
        let _s1 = hub.subscribe(Table::Tasks, "u1", cb1);
        let _s2 = hub.subscribe(Table::Categories, "u1", cb2);
        let _s3 = hub.subscribe(Table::Tasks, "u2", cb3);

        hub.notify(Table::Tasks, "u1");

        assert_eq!(tasks_u1.load(Ordering::SeqCst), 1);
        assert_eq!(cats_u1.load(Ordering::SeqCst), 0);
        assert_eq!(tasks_u2.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_removes_listener() {
        let hub = ChangeHub::new();
        let (count, cb) = counter();
        let sub = hub.subscribe(Table::Tasks, "u1", cb);
        assert_eq!(hub.listener_count(), 1);

        sub.unsubscribe();
        hub.notify(Table::Tasks, "u1");

        assert_eq!(hub.listener_count(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
