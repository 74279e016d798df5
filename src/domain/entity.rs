//! Domain Layer - Core Entity Trait and Errors
//!
//! Every entity carries a backend-assigned opaque identifier.

use thiserror::Error;

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone {
    /// Returns the entity's unique identifier
    fn id(&self) -> &str;
}

/// Find an entity in a slice by its identifier
pub fn find_by_id<'a, T: Entity>(entities: &'a [T], id: &str) -> Option<&'a T> {
    entities.iter().find(|e| e.id() == id)
}

/// Result type for backend gateway calls
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Any failure reported by a backend gateway.
///
/// The store never inspects the variant; it only passes it through.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("row not found: {0}")]
    NotFound(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the synchronization store
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no authenticated user")]
    NotAuthenticated,
    #[error("a category named '{name}' already exists")]
    DuplicateName { name: String },
    #[error("category is used by {count} task(s)")]
    CategoryInUse { count: usize },
    #[error("object '{path}' does not belong to the signed-in user")]
    ForeignObject { path: String },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Named(String);

    impl Entity for Named {
        fn id(&self) -> &str {
            &self.0
        }
    }

    #[test]
    fn test_find_by_id() {
        let items = vec![Named("a".into()), Named("b".into())];
        assert!(find_by_id(&items, "b").is_some());
        assert!(find_by_id(&items, "c").is_none());
    }

    #[test]
    fn test_error_messages() {
        let err = SyncError::CategoryInUse { count: 3 };
        assert_eq!(err.to_string(), "category is used by 3 task(s)");

        let err: SyncError = GatewayError::NotFound("t1".into()).into();
        assert!(matches!(err, SyncError::Gateway(GatewayError::NotFound(_))));
    }
}
