//! Synchronization Store
//!
//! Single in-memory source of truth for the signed-in user's tasks and
//! categories. Task mutations write through to the gateway and then reload
//! everything; category mutations patch the local list directly.
//!
//! Every write to a collection carries a ticket taken when the operation
//! started. A completion older than the last applied ticket is discarded,
//! so overlapping reloads cannot overwrite newer data.

mod state;
mod realtime;
mod images;


use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::domain::{
    find_by_id, Category, NewCategory, NewTask, SyncError, SyncResult, Task, TaskFilter, TaskPatch,
};
use crate::gateway::{BackendGateway, SessionProvider};
use crate::normalizer;
use crate::query::{self, TaskStats};

pub use images::ImageStore;
pub use realtime::RealtimeHandle;
pub use state::{CollectionStatus, StoreSnapshot};
use state::StoreState;

pub struct SyncStore {
    gateway: Arc<dyn BackendGateway>,
    session: Arc<dyn SessionProvider>,
    state: RwLock<StoreState>,
    task_tickets: AtomicU64,
    category_tickets: AtomicU64,
    version_tx: watch::Sender<u64>,
}

impl SyncStore {
    pub fn new(gateway: Arc<dyn BackendGateway>, session: Arc<dyn SessionProvider>) -> Self {
        let (version_tx, _) = watch::channel(0);
        Self {
            gateway,
            session,
            state: RwLock::new(StoreState::default()),
            task_tickets: AtomicU64::new(0),
            category_tickets: AtomicU64::new(0),
            version_tx,
        }
    }

    // ========================
    // Readers
    // ========================

    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.read().snapshot()
    }

    pub fn tasks(&self) -> Arc<Vec<Task>> {
        Arc::clone(&self.state.read().tasks)
    }

    pub fn categories(&self) -> Arc<Vec<Category>> {
        Arc::clone(&self.state.read().categories)
    }

    /// Receiver of the state version; changes on every applied update
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version_tx.subscribe()
    }

    /// Current tasks through `filter`; category names are resolved to ids
    pub fn filtered(&self, filter: &TaskFilter) -> Vec<Task> {
        let (tasks, categories) = {
            let state = self.state.read();
            (Arc::clone(&state.tasks), Arc::clone(&state.categories))
        };
        let filter = filter.clone().resolve_category(&categories);
        query::apply(&tasks, &filter)
    }

    pub fn stats(&self, now: DateTime<Utc>) -> TaskStats {
        TaskStats::compute(&self.tasks(), now)
    }

    // ========================
    // Loading
    // ========================

    /// Fetch tasks and categories for `owner_id` and replace both collections.
    ///
    /// Failures are logged and leave the previous contents in place.
    pub async fn load(&self, owner_id: &str) {
        let task_ticket = next_ticket(&self.task_tickets);
        let category_ticket = next_ticket(&self.category_tickets);
        self.update_state(|state| {
            state.begin_tasks(task_ticket);
            state.begin_categories(category_ticket);
        });

        let (tasks, categories) = tokio::join!(
            self.gateway.fetch_tasks(owner_id),
            self.gateway.fetch_categories(owner_id),
        );

        match (tasks, categories) {
            (Ok(task_rows), Ok(category_rows)) => {
                let tasks: Vec<Task> = task_rows.iter().map(normalizer::to_task).collect();
                let categories: Vec<Category> =
                    category_rows.iter().map(normalizer::to_category).collect();
                log::debug!(
                    "Loaded {} task(s), {} categor(ies) for {}",
                    tasks.len(),
                    categories.len(),
                    owner_id
                );

                self.update_state(|state| {
                    if task_ticket > state.tasks_applied {
                        state.tasks = Arc::new(tasks);
                        state.tasks_status = CollectionStatus::Fresh;
                        state.tasks_applied = task_ticket;
                    } else {
                        log::debug!("Discarding stale task reload #{}", task_ticket);
                        state.settle_tasks();
                    }
                    if category_ticket > state.categories_applied {
                        state.categories = Arc::new(categories);
                        state.categories_status = CollectionStatus::Fresh;
                        state.categories_applied = category_ticket;
                    } else {
                        log::debug!("Discarding stale category reload #{}", category_ticket);
                        state.settle_categories();
                    }
                    state.owner = Some(owner_id.to_string());
                });
            }
            (tasks, categories) => {
                let message = tasks
                    .err()
                    .into_iter()
                    .chain(categories.err())
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                log::warn!("Failed to load data for {}: {}", owner_id, message);

                self.update_state(|state| {
                    if task_ticket > state.tasks_applied {
                        state.tasks_status = CollectionStatus::Error(message.clone());
                    } else {
                        state.settle_tasks();
                    }
                    if category_ticket > state.categories_applied {
                        state.categories_status = CollectionStatus::Error(message.clone());
                    } else {
                        state.settle_categories();
                    }
                });
            }
        }
    }

    /// Re-fetch only the categories
    pub async fn reload_categories(&self, owner_id: &str) {
        let ticket = next_ticket(&self.category_tickets);
        self.update_state(|state| state.begin_categories(ticket));

        match self.gateway.fetch_categories(owner_id).await {
            Ok(rows) => {
                let categories: Vec<Category> = rows.iter().map(normalizer::to_category).collect();
                self.update_state(|state| {
                    if ticket > state.categories_applied {
                        state.categories = Arc::new(categories);
                        state.categories_status = CollectionStatus::Fresh;
                        state.categories_applied = ticket;
                    } else {
                        state.settle_categories();
                    }
                });
            }
            Err(e) => {
                log::warn!("Failed to reload categories for {}: {}", owner_id, e);
                self.update_state(|state| {
                    if ticket > state.categories_applied {
                        state.categories_status = CollectionStatus::Error(e.to_string());
                    } else {
                        state.settle_categories();
                    }
                });
            }
        }
    }

    /// Drop all loaded data, e.g. on sign-out. In-flight reloads are discarded.
    pub fn reset(&self) {
        let task_ticket = next_ticket(&self.task_tickets);
        let category_ticket = next_ticket(&self.category_tickets);
        self.update_state(|state| {
            let version = state.version;
            *state = StoreState {
                tasks_applied: task_ticket,
                categories_applied: category_ticket,
                version,
                ..StoreState::default()
            };
        });
        log::info!("Store reset");
    }

    // ========================
    // Task mutations
    // ========================

    pub async fn create_task(&self, input: NewTask) -> SyncResult<Task> {
        let owner = self.resolve_owner(input.owner.as_deref())?;
        let row = normalizer::to_task_insert(&input, &owner);

        let created = self.gateway.insert_task(&row).await?;
        log::info!("Created task {}", created.id);

        self.load(&owner).await;
        Ok(normalizer::to_task(&created))
    }

    pub async fn update_task(&self, id: &str, patch: TaskPatch) -> SyncResult<Task> {
        let row = normalizer::from_task_patch(&patch);
        let updated = self.gateway.update_task_row(id, &row).await?;
        log::debug!("Updated task {}", id);

        self.reload_after_mutation().await;
        Ok(normalizer::to_task(&updated))
    }

    pub async fn delete_task(&self, id: &str) -> SyncResult<()> {
        self.gateway.delete_task_row(id).await?;
        log::info!("Deleted task {}", id);

        self.reload_after_mutation().await;
        Ok(())
    }

    /// Flip `completed`; an id that is not loaded is ignored
    pub async fn toggle_task(&self, id: &str) -> SyncResult<()> {
        let completed = {
            let state = self.state.read();
            find_by_id(state.tasks.as_slice(), id).map(|t| t.completed)
        };

        match completed {
            Some(completed) => self
                .update_task(id, TaskPatch::completed(!completed))
                .await
                .map(|_| ()),
            None => {
                log::debug!("Toggle ignored, task {} not loaded", id);
                Ok(())
            }
        }
    }

    // ========================
    // Category mutations
    // ========================

    pub async fn create_category(&self, input: NewCategory) -> SyncResult<Category> {
        let owner = self.resolve_owner(input.owner.as_deref())?;

        // The loaded list only says something about its own owner
        let duplicate = {
            let state = self.state.read();
            state.shows_owner(&owner) && state.categories.iter().any(|c| c.has_name(&input.name))
        };
        if duplicate {
            return Err(SyncError::DuplicateName { name: input.name });
        }

        let row = normalizer::to_category_insert(&input, &owner);
        let created = normalizer::to_category(&self.gateway.insert_category(&row).await?);
        log::info!("Created category {} ({})", created.name, created.id);

        let ticket = next_ticket(&self.category_tickets);
        self.update_state(|state| {
            if !state.shows_owner(&created.owner) {
                return;
            }
            if !state.categories.iter().any(|c| c.id == created.id) {
                let mut categories = state.categories.to_vec();
                categories.push(created.clone());
                state.categories = Arc::new(categories);
            }
            state.apply_local_categories(ticket);
        });
        Ok(created)
    }

    pub async fn delete_category(&self, id: &str) -> SyncResult<()> {
        let count = self
            .state
            .read()
            .tasks
            .iter()
            .filter(|t| t.category == id)
            .count();
        if count > 0 {
            return Err(SyncError::CategoryInUse { count });
        }

        self.gateway.delete_category_row(id).await?;
        log::info!("Deleted category {}", id);

        let ticket = next_ticket(&self.category_tickets);
        self.update_state(|state| {
            let categories: Vec<Category> =
                state.categories.iter().filter(|c| c.id != id).cloned().collect();
            state.categories = Arc::new(categories);
            state.apply_local_categories(ticket);
        });
        Ok(())
    }

    // ========================
    // Helpers
    // ========================

    fn resolve_owner(&self, explicit: Option<&str>) -> SyncResult<String> {
        explicit
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .or_else(|| self.session.current_owner())
            .ok_or(SyncError::NotAuthenticated)
    }

    async fn reload_after_mutation(&self) {
        let owner = self
            .session
            .current_owner()
            .or_else(|| self.state.read().owner.clone());
        match owner {
            Some(owner) => self.load(&owner).await,
            None => log::debug!("No owner known, skipping reload"),
        }
    }

    /// Mutate state under the write lock and publish the new version
    fn update_state(&self, f: impl FnOnce(&mut StoreState)) {
        let version = {
            let mut state = self.state.write();
            f(&mut state);
            state.version += 1;
            state.version
        };
        self.version_tx.send_replace(version);
    }
}

fn next_ticket(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}
