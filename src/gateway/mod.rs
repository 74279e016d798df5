//! Gateway Layer
//!
//! Backend access abstractions and implementations.

mod traits;
mod rows;
mod notify;
mod sqlite;
mod rest;
mod storage;


pub use traits::{BackendGateway, ChangeCallback, SessionProvider, StaticSession, Subscription};
pub use rows::{CategoryRow, NewCategoryRow, Table, TaskRow, TaskRowPatch};
pub use notify::ChangeHub;
pub use sqlite::SqliteGateway;
pub use rest::RestGateway;
pub use storage::{check_object_path, StorageGateway, IMAGE_BUCKET};
