//! Change-notification wiring
//!
//! Gateway callbacks only enqueue the changed table; one worker task drains
//! the queue and reloads. Events already queued when the worker wakes are
//! folded into a single reload: everything if any touched `tasks`, otherwise
//! just the categories.

use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::gateway::{Subscription, Table};
use super::SyncStore;

/// Keeps the store subscribed; `stop()` or dropping it unsubscribes
#[derive(Debug)]
pub struct RealtimeHandle {
    subscriptions: Vec<Subscription>,
    worker: JoinHandle<()>,
}

impl RealtimeHandle {
    pub fn stop(self) {
        // Drop does the work
    }

    pub fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }
}

impl Drop for RealtimeHandle {
    fn drop(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        self.worker.abort();
    }
}

impl SyncStore {
    /// Subscribe to both tables for `owner_id`. Must be called inside a tokio runtime.
    pub fn start_realtime(self: &Arc<Self>, owner_id: &str) -> RealtimeHandle {
        let (tx, rx) = mpsc::unbounded_channel::<Table>();

        let subscriptions = [Table::Tasks, Table::Categories]
            .into_iter()
            .map(|table| {
                let tx = tx.clone();
                self.gateway.subscribe_table_changes(
                    table,
                    owner_id,
                    Arc::new(move || {
                        let _ = tx.send(table);
                    }),
                )
            })
            .collect();

        let worker = tokio::spawn(drain_changes(Arc::downgrade(self), owner_id.to_string(), rx));
        log::info!("Realtime sync started for {}", owner_id);

        RealtimeHandle {
            subscriptions,
            worker,
        }
    }
}

/// What a batch of notifications requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reload {
    All,
    Categories,
}

/// Fold `first` and everything already queued behind it into one reload
fn coalesce(first: Table, rx: &mut mpsc::UnboundedReceiver<Table>) -> Reload {
    let mut tasks = first == Table::Tasks;
    let mut skipped = 0usize;
    while let Ok(table) = rx.try_recv() {
        tasks |= table == Table::Tasks;
        skipped += 1;
    }
    if skipped > 0 {
        log::debug!("Coalesced {} queued change notification(s)", skipped);
    }
    if tasks {
        Reload::All
    } else {
        Reload::Categories
    }
}

async fn drain_changes(store: Weak<SyncStore>, owner_id: String, mut rx: mpsc::UnboundedReceiver<Table>) {
    while let Some(first) = rx.recv().await {
        let reload = coalesce(first, &mut rx);
        let Some(store) = store.upgrade() else {
            break;
        };
        log::debug!("Change notification, reloading {:?}", reload);
        match reload {
            Reload::All => store.load(&owner_id).await,
            Reload::Categories => store.reload_categories(&owner_id).await,
        }
    }
}
