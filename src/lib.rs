//! task-sync
//!
//! Client-side synchronization core for per-user tasks and categories.
//!
//! - `domain`: entities, filters and error types (no I/O)
//! - `gateway`: the backend trait plus SQLite and REST implementations
//! - `normalizer`: row <-> entity mapping
//! - `store`: the in-memory source of truth kept in sync with the backend,
//!   plus task image uploads
//! - `query`: pure filtering and statistics over store snapshots

pub mod config;
pub mod domain;
pub mod gateway;
pub mod logging;
pub mod normalizer;
pub mod query;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use domain::{Category, GatewayError, NewCategory, NewTask, SyncError, Task, TaskFilter, TaskPatch};
pub use gateway::{
    BackendGateway, RestGateway, SessionProvider, SqliteGateway, StaticSession, StorageGateway,
};
pub use store::{CollectionStatus, ImageStore, RealtimeHandle, StoreSnapshot, SyncStore};
