//! Relational API client — typed wrapper over the platform's REST interface.
//!
//! Every failure is classified here, at the response boundary, into a
//! [`BackendError`] kind. Callers never inspect status codes or message
//! strings.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::config::BackendConfig;
use crate::error::BackendError;

/// Postgres error code for a unique-constraint violation.
const PG_UNIQUE_VIOLATION: &str = "23505";
/// Postgres error code for a row-level-security rejection.
const PG_INSUFFICIENT_PRIVILEGE: &str = "42501";

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for row-level table access.
#[derive(Clone)]
pub struct TableClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    /// Session access token shared with [`super::auth::AuthClient`]; falls
    /// back to the anon key while signed out.
    bearer: Arc<RwLock<Option<SecretString>>>,
}

impl TableClient {
    pub fn new(config: &BackendConfig, bearer: Arc<RwLock<Option<SecretString>>>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            anon_key: config.anon_key.clone(),
            bearer,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    async fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self.bearer.read().await;
        let token = bearer.as_ref().unwrap_or(&self.anon_key);
        builder
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(token.expose_secret())
    }

    /// Fetch all rows matching the filter pairs (PostgREST query syntax,
    /// e.g. `("user_id", "eq.<uuid>")`).
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, BackendError> {
        let resp = self
            .authed(self.http.get(self.table_url(table)))
            .await
            .query(query)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Self::decode_rows(table, resp).await
    }

    /// Fetch at most one row. Absence is not an error.
    pub async fn select_optional<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, BackendError> {
        Ok(self.select(table, query).await?.into_iter().next())
    }

    /// Insert a row and return the stored representation.
    pub async fn insert<T: DeserializeOwned>(
        &self,
        table: &str,
        body: &impl Serialize,
    ) -> Result<T, BackendError> {
        let resp = self
            .authed(self.http.post(self.table_url(table)))
            .await
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        let mut rows: Vec<T> = Self::decode_rows(table, resp).await?;
        rows.pop().ok_or_else(|| BackendError::Decode {
            table: table.into(),
            message: "insert returned no rows".into(),
        })
    }

    /// Update matching rows and return the stored representations.
    pub async fn update<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
        body: &impl Serialize,
    ) -> Result<Vec<T>, BackendError> {
        let resp = self
            .authed(self.http.patch(self.table_url(table)))
            .await
            .query(query)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Self::decode_rows(table, resp).await
    }

    /// Delete matching rows.
    pub async fn delete(&self, table: &str, query: &[(&str, &str)]) -> Result<(), BackendError> {
        let resp = self
            .authed(self.http.delete(self.table_url(table)))
            .await
            .query(query)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::error_from_response(table, resp).await);
        }
        Ok(())
    }

    /// Invoke a stored procedure.
    pub async fn rpc(
        &self,
        name: &str,
        args: &serde_json::Value,
    ) -> Result<serde_json::Value, BackendError> {
        let url = format!("{}/rest/v1/rpc/{name}", self.base_url);
        let resp = self
            .authed(self.http.post(url))
            .await
            .json(args)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body: ApiErrorBody = resp.json().await.unwrap_or_default();
            return Err(BackendError::Rpc {
                name: name.into(),
                message: body
                    .message
                    .unwrap_or_else(|| format!("status {status}")),
            });
        }

        // Void procedures return an empty body.
        let text = resp
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| BackendError::Decode {
            table: format!("rpc/{name}"),
            message: e.to_string(),
        })
    }

    async fn decode_rows<T: DeserializeOwned>(
        table: &str,
        resp: reqwest::Response,
    ) -> Result<Vec<T>, BackendError> {
        if !resp.status().is_success() {
            return Err(Self::error_from_response(table, resp).await);
        }
        resp.json().await.map_err(|e| BackendError::Decode {
            table: table.into(),
            message: e.to_string(),
        })
    }

    async fn error_from_response(table: &str, resp: reqwest::Response) -> BackendError {
        let status = resp.status().as_u16();
        let body: ApiErrorBody = resp.json().await.unwrap_or_default();
        let code = body.code.unwrap_or_default();
        let message = body
            .message
            .unwrap_or_else(|| format!("status {status}"));

        if code == PG_INSUFFICIENT_PRIVILEGE || status == 401 || status == 403 {
            BackendError::PermissionDenied {
                table: table.into(),
                message,
            }
        } else if code == PG_UNIQUE_VIOLATION || status == 409 {
            BackendError::Conflict {
                table: table.into(),
                message,
            }
        } else {
            BackendError::Api {
                table: table.into(),
                status,
                message,
            }
        }
    }
}
