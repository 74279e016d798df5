//! Task images
//!
//! Uploads go to `<owner>/<unix millis>.<ext>` in the image bucket. An
//! object outside the signed-in user's prefix is never written or removed.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use crate::domain::{SyncError, SyncResult, Task};
use crate::gateway::{SessionProvider, StorageGateway};

pub struct ImageStore {
    storage: Arc<dyn StorageGateway>,
    session: Arc<dyn SessionProvider>,
}

impl ImageStore {
    pub fn new(storage: Arc<dyn StorageGateway>, session: Arc<dyn SessionProvider>) -> Self {
        Self { storage, session }
    }

    /// Upload an image and return its public URL, ready for `Task::image`.
    ///
    /// `source_name` only supplies the extension. `object_path` overrides
    /// the generated path and must still sit under the owner's prefix.
    pub async fn upload_image(
        &self,
        source_name: &str,
        bytes: Vec<u8>,
        object_path: Option<&str>,
    ) -> SyncResult<String> {
        let owner = self.owner()?;
        let path = match object_path {
            Some(path) => path.to_string(),
            None => format!(
                "{}/{}.{}",
                owner,
                Utc::now().timestamp_millis(),
                extension_of(source_name)
            ),
        };
        ensure_owned(&owner, &path)?;

        let content_type = mime_guess::from_path(&path).first_or_octet_stream();
        self.storage
            .upload_object(&path, bytes, content_type.as_ref())
            .await?;
        log::info!("Uploaded image {}", path);

        Ok(self.storage.public_url(&path))
    }

    pub fn image_url(&self, object_path: &str) -> String {
        self.storage.public_url(object_path)
    }

    pub async fn delete_image(&self, object_path: &str) -> SyncResult<()> {
        let owner = self.owner()?;
        ensure_owned(&owner, object_path)?;

        self.storage.remove_object(object_path).await?;
        log::info!("Deleted image {}", object_path);
        Ok(())
    }

    /// Remove the stored image `task` points at. `Ok(false)` when the task
    /// has no image or it lives outside the bucket.
    pub async fn delete_task_image(&self, task: &Task) -> SyncResult<bool> {
        let Some(path) = task
            .image
            .as_deref()
            .and_then(|url| self.storage.object_path_from_url(url))
        else {
            return Ok(false);
        };
        self.delete_image(&path).await?;
        Ok(true)
    }

    fn owner(&self) -> SyncResult<String> {
        self.session.current_owner().ok_or(SyncError::NotAuthenticated)
    }
}

fn ensure_owned(owner: &str, path: &str) -> SyncResult<()> {
    let owned = path
        .strip_prefix(owner)
        .is_some_and(|rest| rest.starts_with('/'));
    if owned {
        Ok(())
    } else {
        Err(SyncError::ForeignObject {
            path: path.to_string(),
        })
    }
}

/// Lowercased extension of `name`, `jpg` when there is none
fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "jpg".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::domain::GatewayError;
    use crate::gateway::{RestGateway, StaticSession};
    use wiremock::matchers::{header, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rest_images(server: &MockServer, session: Arc<StaticSession>) -> ImageStore {
        let config = BackendConfig {
            url: server.uri(),
            anon_key: "anon-key".to_string(),
            ..BackendConfig::default()
        };
        ImageStore::new(Arc::new(RestGateway::new(&config).unwrap()), session)
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("/tmp/photo.PNG"), "png");
        assert_eq!(extension_of("content://media/42"), "jpg");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
    }

    #[test]
    fn test_ensure_owned_needs_full_segment() {
        assert!(ensure_owned("u1", "u1/a.jpg").is_ok());
        assert!(ensure_owned("u1", "u12/a.jpg").is_err());
        assert!(ensure_owned("u1", "u1").is_err());
        assert!(ensure_owned("u1", "u2/a.jpg").is_err());
    }

    #[tokio::test]
    async fn test_upload_generates_owner_path_and_returns_public_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/storage/v1/object/task-images/u1/\d+\.png$"))
            .and(header("content-type", "image/png"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let images = rest_images(&server, Arc::new(StaticSession::signed_in("u1")));
        let url = images
            .upload_image("/sdcard/DCIM/photo.png", vec![0x89, 0x50], None)
            .await
            .expect("Upload failed");

        let prefix = format!("{}/storage/v1/object/public/task-images/u1/", server.uri());
        assert!(url.starts_with(&prefix), "{url}");
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_foreign_paths_never_reach_the_backend() {
        let server = MockServer::start().await;
        Mock::given(path_regex(r"^/storage/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let images = rest_images(&server, Arc::new(StaticSession::signed_in("u1")));

        let upload = images.upload_image("a.jpg", vec![1], Some("u2/a.jpg")).await;
        assert!(matches!(upload, Err(SyncError::ForeignObject { ref path }) if path == "u2/a.jpg"));

        let delete = images.delete_image("u2/a.jpg").await;
        assert!(matches!(delete, Err(SyncError::ForeignObject { .. })));
    }

    #[tokio::test]
    async fn test_signed_out_user_cannot_upload_or_delete() {
        let server = MockServer::start().await;
        Mock::given(path_regex(r"^/storage/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let images = rest_images(&server, Arc::new(StaticSession::default()));
        assert!(matches!(
            images.upload_image("a.jpg", vec![1], None).await,
            Err(SyncError::NotAuthenticated)
        ));
        assert!(matches!(
            images.delete_image("u1/a.jpg").await,
            Err(SyncError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_delete_task_image_resolves_url() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/object/task-images/u1/5.jpg"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let images = rest_images(&server, Arc::new(StaticSession::signed_in("u1")));
        let mut task = Task {
            id: "t1".into(),
            title: "With photo".into(),
            description: None,
            completed: false,
            priority: Default::default(),
            due_date: None,
            category: "c1".into(),
            owner: "u1".into(),
            image: Some(images.image_url("u1/5.jpg")),
            location: None,
            created_at: None,
            updated_at: None,
        };
        assert!(images.delete_task_image(&task).await.unwrap());

        task.image = Some("https://cdn.example.com/u1/5.jpg".into());
        assert!(!images.delete_task_image(&task).await.unwrap());
        task.image = None;
        assert!(!images.delete_task_image(&task).await.unwrap());
    }

    #[tokio::test]
    async fn test_backend_rejection_is_propagated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("row-level security"))
            .mount(&server)
            .await;

        let images = rest_images(&server, Arc::new(StaticSession::signed_in("u1")));
        let err = images.upload_image("a.jpg", vec![1], None).await.unwrap_err();
        assert!(matches!(err, SyncError::Gateway(GatewayError::Status { status: 403, .. })));
    }
}
