//! Remote platform clients — auth, relational tables, object storage.

pub mod auth;
pub mod postgrest;
pub mod storage;
pub mod types;

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::RwLock;

pub use auth::{AuthClient, SessionStore};
pub use postgrest::TableClient;
pub use storage::StorageClient;
pub use types::{AuthEvent, AuthUser, OAuthProvider, Session, SignUpResult, UserMetadata};

use crate::config::BackendConfig;

/// Shared handles to the remote platform APIs. All three clients share one
/// bearer slot, so a sign-in immediately authorizes table and storage calls.
pub struct Backend {
    pub auth: Arc<AuthClient>,
    pub tables: TableClient,
    pub storage: StorageClient,
}

impl Backend {
    pub fn connect(config: &BackendConfig) -> Self {
        let bearer: Arc<RwLock<Option<SecretString>>> = Arc::new(RwLock::new(None));
        Self {
            auth: Arc::new(AuthClient::new(config, Arc::clone(&bearer))),
            tables: TableClient::new(config, Arc::clone(&bearer)),
            storage: StorageClient::new(config, bearer),
        }
    }
}
