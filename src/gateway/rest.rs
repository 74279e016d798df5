//! Hosted Backend Gateway
//!
//! Client for a PostgREST-style row API (`/rest/v1/<table>`).
//! Change notifications are derived by polling a cheap projection of each
//! table and firing when its content changes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::BackendConfig;
use crate::domain::{GatewayError, GatewayResult};
use super::rows::{CategoryRow, NewCategoryRow, Table, TaskRow, TaskRowPatch};
use super::storage::{check_object_path, StorageGateway, IMAGE_BUCKET};
use super::traits::{BackendGateway, ChangeCallback, Subscription};

fn transport_err(e: reqwest::Error) -> GatewayError {
    GatewayError::Transport(e.to_string())
}

/// REST implementation of the backend gateway
#[derive(Clone)]
pub struct RestGateway {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: Arc<RwLock<Option<String>>>,
    poll_interval: Duration,
}

impl RestGateway {
    pub fn new(config: &BackendConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(transport_err)?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            access_token: Arc::new(RwLock::new(None)),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
        })
    }

    /// Use the signed-in user's token instead of the anonymous key
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write() = token;
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.as_str())
    }

    fn object_url(&self, object_path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, IMAGE_BUCKET, object_path)
    }

    fn authed(&self, method: Method, url: String) -> RequestBuilder {
        let bearer = self
            .access_token
            .read()
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());

        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    fn request(&self, method: Method, table: Table) -> RequestBuilder {
        self.authed(method, self.table_url(table))
    }

    async fn send(rb: RequestBuilder) -> GatewayResult<Response> {
        let response = rb.send().await.map_err(transport_err)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(GatewayError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(rb: RequestBuilder) -> GatewayResult<T> {
        let body = Self::send(rb).await?.text().await.map_err(transport_err)?;
        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Decode a row array one element at a time, skipping elements that
    /// are not rows at all
    async fn send_rows<T: DeserializeOwned>(rb: RequestBuilder, table: Table) -> GatewayResult<Vec<T>> {
        let values: Vec<Value> = Self::send_json(rb).await?;
        let total = values.len();
        let rows: Vec<T> = values
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();
        if rows.len() < total {
            log::warn!("Skipped {} undecodable {} row(s)", total - rows.len(), table.as_str());
        }
        Ok(rows)
    }

    /// Rows come back as an array; a write must echo exactly one
    fn single<T>(rows: Vec<T>, what: &str) -> GatewayResult<T> {
        rows.into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound(what.to_string()))
    }

    /// Cheap projection used to detect changes between polls
    async fn fingerprint(&self, table: Table, owner_id: &str) -> GatewayResult<String> {
        let select = match table {
            Table::Tasks => "id,updated_at",
            Table::Categories => "id,name,color,icon",
        };
        let rb = self.request(Method::GET, table).query(&[
            ("select", select.to_string()),
            ("user_id", format!("eq.{}", owner_id)),
            ("order", "id.asc".to_string()),
        ]);
        Self::send(rb).await?.text().await.map_err(transport_err)
    }
}

#[async_trait]
impl BackendGateway for RestGateway {
    async fn fetch_tasks(&self, owner_id: &str) -> GatewayResult<Vec<TaskRow>> {
        let rb = self.request(Method::GET, Table::Tasks).query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", owner_id)),
            ("order", "created_at.desc".to_string()),
        ]);
        Self::send_rows(rb, Table::Tasks).await
    }

    async fn fetch_categories(&self, owner_id: &str) -> GatewayResult<Vec<CategoryRow>> {
        let rb = self.request(Method::GET, Table::Categories).query(&[
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", owner_id)),
            ("order", "name.asc".to_string()),
        ]);
        Self::send_rows(rb, Table::Categories).await
    }

    async fn insert_task(&self, row: &TaskRowPatch) -> GatewayResult<TaskRow> {
        let rb = self
            .request(Method::POST, Table::Tasks)
            .header("Prefer", "return=representation")
            .json(row);
        Self::single(Self::send_json(rb).await?, "inserted task")
    }

    async fn update_task_row(&self, id: &str, patch: &TaskRowPatch) -> GatewayResult<TaskRow> {
        let rb = self
            .request(Method::PATCH, Table::Tasks)
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=representation")
            .json(patch);
        Self::single(Self::send_json(rb).await?, id)
    }

    async fn delete_task_row(&self, id: &str) -> GatewayResult<()> {
        let rb = self
            .request(Method::DELETE, Table::Tasks)
            .query(&[("id", format!("eq.{}", id))]);
        Self::send(rb).await.map(|_| ())
    }

    async fn insert_category(&self, row: &NewCategoryRow) -> GatewayResult<CategoryRow> {
        let rb = self
            .request(Method::POST, Table::Categories)
            .header("Prefer", "return=representation")
            .json(row);
        Self::single(Self::send_json(rb).await?, "inserted category")
    }

    async fn delete_category_row(&self, id: &str) -> GatewayResult<()> {
        let rb = self
            .request(Method::DELETE, Table::Categories)
            .query(&[("id", format!("eq.{}", id))]);
        Self::send(rb).await.map(|_| ())
    }

    fn subscribe_table_changes(
        &self,
        table: Table,
        owner_id: &str,
        on_change: ChangeCallback,
    ) -> Subscription {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::warn!("No async runtime; {} changes will not be observed", table.as_str());
            return Subscription::noop();
        };

        let gateway = self.clone();
        let owner_id = owner_id.to_string();
        let poller = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(gateway.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut last: Option<String> = None;

            loop {
                ticker.tick().await;
                match gateway.fingerprint(table, &owner_id).await {
                    Ok(current) => {
                        let changed = last.as_ref().is_some_and(|prev| *prev != current);
                        last = Some(current);
                        if changed {
                            on_change();
                        }
                    }
                    Err(e) => log::warn!("Polling {} failed: {}", table.as_str(), e),
                }
            }
        });

        Subscription::new(move || poller.abort())
    }
}

#[async_trait]
impl StorageGateway for RestGateway {
    async fn upload_object(
        &self,
        object_path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> GatewayResult<()> {
        check_object_path(object_path)?;
        let rb = self
            .authed(Method::POST, self.object_url(object_path))
            .header(CONTENT_TYPE, content_type)
            .body(bytes);
        Self::send(rb).await.map(|_| ())
    }

    async fn remove_object(&self, object_path: &str) -> GatewayResult<()> {
        check_object_path(object_path)?;
        Self::send(self.authed(Method::DELETE, self.object_url(object_path)))
            .await
            .map(|_| ())
    }

    fn public_url(&self, object_path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, IMAGE_BUCKET, object_path
        )
    }
}
