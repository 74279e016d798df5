//! SQLite Gateway
//!
//! Embedded backend for offline use and tests. Writes are announced to
//! subscribers through an in-process `ChangeHub`. Task images are plain
//! files under an image directory.

mod db;
mod task_repo;
mod category_repo;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::domain::{GatewayError, GatewayResult};
use super::notify::ChangeHub;
use super::rows::{CategoryRow, NewCategoryRow, Table, TaskRow, TaskRowPatch};
use super::storage::{check_object_path, StorageGateway, IMAGE_BUCKET};
use super::traits::{BackendGateway, ChangeCallback, Subscription};

pub(crate) fn storage_err(e: rusqlite::Error) -> GatewayError {
    GatewayError::Storage(e.to_string())
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// SQLite implementation of the backend gateway
#[derive(Clone)]
pub struct SqliteGateway {
    conn: Arc<Mutex<Option<Connection>>>,
    hub: ChangeHub,
    image_dir: Option<PathBuf>,
}

impl SqliteGateway {
    /// Open (or create) the database at `db_path`; `:memory:` is accepted.
    ///
    /// Images go to a `task-images` directory next to a file database. An
    /// in-memory database has none until `with_image_dir` sets one.
    pub fn open(db_path: impl AsRef<Path>) -> GatewayResult<Self> {
        let db_path = db_path.as_ref();
        let conn = db::open_connection(db_path)?;
        log::info!("SQLite gateway opened at {}", db_path.display());

        let image_dir = (db_path != Path::new(":memory:"))
            .then(|| db_path.parent().unwrap_or(Path::new(".")).join(IMAGE_BUCKET));
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            hub: ChangeHub::new(),
            image_dir,
        })
    }

    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = Some(dir.into());
        self
    }

    fn image_path(&self, object_path: &str) -> GatewayResult<PathBuf> {
        check_object_path(object_path)?;
        let dir = self
            .image_dir
            .as_ref()
            .ok_or_else(|| GatewayError::Unavailable("no image directory configured".to_string()))?;
        Ok(dir.join(object_path))
    }

    pub fn open_in_memory() -> GatewayResult<Self> {
        Self::open(":memory:")
    }

    /// Close the connection; later calls fail with `Unavailable`
    pub async fn close(&self) {
        self.conn.lock().await.take();
    }

    /// Run `f` against the open connection
    async fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> GatewayResult<T>,
    ) -> GatewayResult<T> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or_else(|| GatewayError::Unavailable("database not initialized".to_string()))?;
        f(conn)
    }
}

#[async_trait]
impl BackendGateway for SqliteGateway {
    async fn fetch_tasks(&self, owner_id: &str) -> GatewayResult<Vec<TaskRow>> {
        self.with_conn(|conn| task_repo::list_by_owner(conn, owner_id)).await
    }

    async fn fetch_categories(&self, owner_id: &str) -> GatewayResult<Vec<CategoryRow>> {
        self.with_conn(|conn| category_repo::list_by_owner(conn, owner_id)).await
    }

    async fn insert_task(&self, row: &TaskRowPatch) -> GatewayResult<TaskRow> {
        let created = self.with_conn(|conn| task_repo::insert(conn, row)).await?;
        if let Some(owner) = &created.user_id {
            self.hub.notify(Table::Tasks, owner);
        }
        Ok(created)
    }

    async fn update_task_row(&self, id: &str, patch: &TaskRowPatch) -> GatewayResult<TaskRow> {
        let updated = self.with_conn(|conn| task_repo::update(conn, id, patch)).await?;
        if let Some(owner) = &updated.user_id {
            self.hub.notify(Table::Tasks, owner);
        }
        Ok(updated)
    }

    async fn delete_task_row(&self, id: &str) -> GatewayResult<()> {
        if let Some(owner) = self.with_conn(|conn| task_repo::delete(conn, id)).await? {
            self.hub.notify(Table::Tasks, &owner);
        }
        Ok(())
    }

    async fn insert_category(&self, row: &NewCategoryRow) -> GatewayResult<CategoryRow> {
        let created = self.with_conn(|conn| category_repo::insert(conn, row)).await?;
        self.hub.notify(Table::Categories, &row.user_id);
        Ok(created)
    }

    async fn delete_category_row(&self, id: &str) -> GatewayResult<()> {
        if let Some(owner) = self.with_conn(|conn| category_repo::delete(conn, id)).await? {
            self.hub.notify(Table::Categories, &owner);
        }
        Ok(())
    }

    fn subscribe_table_changes(
        &self,
        table: Table,
        owner_id: &str,
        on_change: ChangeCallback,
    ) -> Subscription {
        self.hub.subscribe(table, owner_id, on_change)
    }
}

#[async_trait]
impl StorageGateway for SqliteGateway {
    async fn upload_object(
        &self,
        object_path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> GatewayResult<()> {
        let target = self.image_path(object_path)?;
        let io_err = |e: std::io::Error| GatewayError::Storage(e.to_string());
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&target, bytes).await.map_err(io_err)
    }

    async fn remove_object(&self, object_path: &str) -> GatewayResult<()> {
        let target = self.image_path(object_path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(GatewayError::NotFound(object_path.to_string()))
            }
            Err(e) => Err(GatewayError::Storage(e.to_string())),
        }
    }

    fn public_url(&self, object_path: &str) -> String {
        let dir = self.image_dir.as_deref().unwrap_or(Path::new(IMAGE_BUCKET));
        format!("file://{}/{}", dir.display(), object_path)
    }
}
