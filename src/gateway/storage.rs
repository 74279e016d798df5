//! Object storage for task images
//!
//! Objects live in one bucket and are addressed by a relative path
//! (`<owner>/<name>`). Ownership rules are enforced by the caller.

use async_trait::async_trait;

use crate::domain::{GatewayError, GatewayResult};

/// Bucket holding task images
pub const IMAGE_BUCKET: &str = "task-images";

#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Store `bytes` at `object_path`
    async fn upload_object(
        &self,
        object_path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> GatewayResult<()>;

    async fn remove_object(&self, object_path: &str) -> GatewayResult<()>;

    /// Public URL of `object_path`; makes no request
    fn public_url(&self, object_path: &str) -> String;

    /// Inverse of `public_url`; `None` for URLs outside the bucket
    fn object_path_from_url(&self, url: &str) -> Option<String> {
        let prefix = self.public_url("");
        url.strip_prefix(prefix.as_str())
            .filter(|path| check_object_path(path).is_ok())
            .map(str::to_string)
    }
}

/// Relative, non-empty, and free of `.`/`..` segments
pub fn check_object_path(path: &str) -> GatewayResult<()> {
    let valid = !path.is_empty()
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if valid {
        Ok(())
    } else {
        Err(GatewayError::Storage(format!("invalid object path: {}", path)))
    }
}
