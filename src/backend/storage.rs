//! Object storage client — uploads and public URLs for avatars and logos.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::config::BackendConfig;
use crate::error::BackendError;

/// Client for the platform's object storage API.
#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    bearer: Arc<RwLock<Option<SecretString>>>,
}

impl StorageClient {
    pub fn new(config: &BackendConfig, bearer: Arc<RwLock<Option<SecretString>>>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            anon_key: config.anon_key.clone(),
            bearer,
        }
    }

    /// Upload an object, replacing any existing one at the same path.
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BackendError> {
        let url = format!("{}/storage/v1/object/{bucket}/{path}", self.base_url);
        let token = {
            let bearer = self.bearer.read().await;
            bearer
                .as_ref()
                .unwrap_or(&self.anon_key)
                .expose_secret()
                .to_string()
        };

        let resp = self
            .http
            .post(&url)
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(&token)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                table: format!("storage/{bucket}"),
                status,
                message,
            });
        }
        Ok(())
    }

    /// Public URL for an object in a public bucket.
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/public/{bucket}/{path}", self.base_url)
    }
}
