//! Gateway Layer - Core Traits
//!
//! Defines the abstract interface to the backend.
//! Implementations can use SQLite, a hosted REST service, etc.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::GatewayResult;
use super::rows::{CategoryRow, NewCategoryRow, Table, TaskRow, TaskRowPatch};

/// Invoked whenever rows of a subscribed table change
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Backend operations consumed by the synchronization store.
///
/// All row operations are async; `subscribe_table_changes` only registers
/// a listener and returns immediately.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// All task rows owned by `owner_id`
    async fn fetch_tasks(&self, owner_id: &str) -> GatewayResult<Vec<TaskRow>>;

    /// All category rows owned by `owner_id`
    async fn fetch_categories(&self, owner_id: &str) -> GatewayResult<Vec<CategoryRow>>;

    /// Insert a task; returns the stored row with id and timestamps
    async fn insert_task(&self, row: &TaskRowPatch) -> GatewayResult<TaskRow>;

    /// Apply a partial update to task `id`
    async fn update_task_row(&self, id: &str, patch: &TaskRowPatch) -> GatewayResult<TaskRow>;

    /// Hard delete task `id`
    async fn delete_task_row(&self, id: &str) -> GatewayResult<()>;

    /// Insert a category; returns the stored row
    async fn insert_category(&self, row: &NewCategoryRow) -> GatewayResult<CategoryRow>;

    /// Hard delete category `id`
    async fn delete_category_row(&self, id: &str) -> GatewayResult<()>;

    /// Register `on_change` for changes to `table` rows owned by `owner_id`
    fn subscribe_table_changes(
        &self,
        table: Table,
        owner_id: &str,
        on_change: ChangeCallback,
    ) -> Subscription;
}

/// Read-only access to the authenticated session
pub trait SessionProvider: Send + Sync {
    /// Current owner id, or `None` when nobody is signed in
    fn current_owner(&self) -> Option<String>;
}

/// Session holder set by the host application on sign-in/sign-out
#[derive(Debug, Default)]
pub struct StaticSession {
    owner: RwLock<Option<String>>,
}

impl StaticSession {
    pub fn new(owner: Option<String>) -> Self {
        Self {
            owner: RwLock::new(owner),
        }
    }

    pub fn signed_in(owner: impl Into<String>) -> Self {
        Self::new(Some(owner.into()))
    }

    pub fn sign_in(&self, owner: impl Into<String>) {
        *self.owner.write() = Some(owner.into());
    }

    pub fn sign_out(&self) {
        *self.owner.write() = None;
    }
}

impl SessionProvider for StaticSession {
    fn current_owner(&self) -> Option<String> {
        self.owner.read().clone()
    }
}

/// Handle to a change subscription. Dropping it also unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription that never fires
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
