//! Store state and the snapshots handed to readers

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{Category, Task};

/// Cache state of one collection
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "message")]
pub enum CollectionStatus {
    /// Never loaded, or cleared
    #[default]
    Stale,
    Loading,
    Fresh,
    /// Last reload failed; the previous contents are still served
    Error(String),
}

/// Immutable view of the store at one point in time
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub tasks: Arc<Vec<Task>>,
    pub categories: Arc<Vec<Category>>,
    pub tasks_status: CollectionStatus,
    pub categories_status: CollectionStatus,
    /// Bumped on every applied change
    pub version: u64,
}

#[derive(Debug, Default)]
pub(super) struct StoreState {
    pub tasks: Arc<Vec<Task>>,
    pub categories: Arc<Vec<Category>>,
    pub tasks_status: CollectionStatus,
    pub categories_status: CollectionStatus,
    /// Ticket of the last applied task/category write
    pub tasks_applied: u64,
    pub categories_applied: u64,
    /// Newest ticket that marked the collection `Loading`
    pub tasks_requested: u64,
    pub categories_requested: u64,
    /// Owner of the loaded collections
    pub owner: Option<String>,
    pub version: u64,
}

impl StoreState {
    pub fn begin_tasks(&mut self, ticket: u64) {
        self.tasks_requested = self.tasks_requested.max(ticket);
        self.tasks_status = CollectionStatus::Loading;
    }

    pub fn begin_categories(&mut self, ticket: u64) {
        self.categories_requested = self.categories_requested.max(ticket);
        self.categories_status = CollectionStatus::Loading;
    }

    /// Clear a `Loading` no in-flight reload can resolve any more
    pub fn settle_tasks(&mut self) {
        if self.tasks_status == CollectionStatus::Loading && self.tasks_requested <= self.tasks_applied {
            self.tasks_status = CollectionStatus::Fresh;
        }
    }

    pub fn settle_categories(&mut self) {
        if self.categories_status == CollectionStatus::Loading
            && self.categories_requested <= self.categories_applied
        {
            self.categories_status = CollectionStatus::Fresh;
        }
    }

    /// Record a local append/remove made under `ticket`
    pub fn apply_local_categories(&mut self, ticket: u64) {
        self.categories_applied = self.categories_applied.max(ticket);
        self.settle_categories();
    }

    /// Whether the loaded collections belong to `owner` (or nothing is loaded yet)
    pub fn shows_owner(&self, owner: &str) -> bool {
        self.owner.as_deref().is_none_or(|loaded| loaded == owner)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            tasks: Arc::clone(&self.tasks),
            categories: Arc::clone(&self.categories),
            tasks_status: self.tasks_status.clone(),
            categories_status: self.categories_status.clone(),
            version: self.version,
        }
    }
}
