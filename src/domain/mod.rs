//! Domain Layer
//!
//! Contains all domain entities, task filters and error types.
//! This layer has NO I/O (only serde, chrono and thiserror).

mod entity;
mod task;
mod category;
mod filter;

pub use entity::{find_by_id, Entity, GatewayError, GatewayResult, SyncError, SyncResult};
pub use task::{Location, NewTask, Priority, Task, TaskPatch};
pub use category::{Category, NewCategory};
pub use filter::{CategoryFilter, ParseFilterError, PriorityFilter, StatusFilter, TaskFilter};
