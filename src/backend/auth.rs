//! Auth service client — session issuance, refresh, and lifecycle events.
//!
//! Wraps the platform's auth REST API. The client holds the current session
//! and broadcasts lifecycle events; consumers subscribe once and react.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{RwLock, broadcast};
use tracing::{info, warn};

use crate::backend::types::{
    AuthEvent, AuthUser, OAuthProvider, Session, SessionPayload, SignUpResult,
};
use crate::config::BackendConfig;
use crate::error::AuthError;

/// Capacity of the session event fan-out channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Read side of the session store, as seen by the orchestrator.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The session currently held, if any.
    async fn current_session(&self) -> Option<Session>;

    /// Subscribe to session lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    /// Destroy the current session.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// REST client for the platform's auth service.
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    /// Bearer token shared with the table/storage clients; carries the
    /// session access token while signed in, otherwise the anon key is used.
    bearer: Arc<RwLock<Option<SecretString>>>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthClient {
    pub fn new(config: &BackendConfig, bearer: Arc<RwLock<Option<SecretString>>>) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            anon_key: config.anon_key.clone(),
            bearer,
            session: RwLock::new(None),
            events,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    /// Register a new user with email and password.
    ///
    /// Platforms requiring email confirmation return a bare user; otherwise
    /// a session is issued and a `SignedIn` event fires immediately.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResult, AuthError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let resp = self
            .http
            .post(self.endpoint("signup"))
            .header("apikey", self.anon_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?;

        if payload.get("access_token").is_some() {
            let session: Session = serde_json::from_value::<SessionPayload>(payload)
                .map_err(|e| AuthError::Decode(e.to_string()))?
                .into();
            self.install_session(session.clone(), AuthEvent::SignedIn(session.clone()))
                .await;
            Ok(SignUpResult::SignedIn(session))
        } else {
            let user: AuthUser = serde_json::from_value(payload)
                .map_err(|e| AuthError::Decode(e.to_string()))?;
            info!(user_id = %user.id, "Sign-up accepted, email confirmation pending");
            Ok(SignUpResult::ConfirmationRequired(user))
        }
    }

    /// Sign in with email and password.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let resp = self
            .http
            .post(self.endpoint("token?grant_type=password"))
            .header("apikey", self.anon_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::BAD_REQUEST {
            return Err(AuthError::InvalidCredentials);
        }
        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        let session: Session = resp
            .json::<SessionPayload>()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?
            .into();
        self.install_session(session.clone(), AuthEvent::SignedIn(session.clone()))
            .await;
        Ok(session)
    }

    /// Build the redirect URL for an external identity provider sign-in.
    /// The session arrives out-of-band; the host completes the flow with
    /// [`AuthClient::accept_external_session`].
    pub fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
    ) -> Result<String, AuthError> {
        let url = reqwest::Url::parse_with_params(
            &self.endpoint("authorize"),
            &[("provider", provider.as_str()), ("redirect_to", redirect_to)],
        )
        .map_err(|e| AuthError::Decode(e.to_string()))?;
        Ok(url.into())
    }

    /// Install a session obtained from a completed external-provider
    /// redirect and fire `SignedIn`.
    pub async fn accept_external_session(&self, session: Session) {
        self.install_session(session.clone(), AuthEvent::SignedIn(session))
            .await;
    }

    /// Exchange the held refresh token for a fresh session.
    pub async fn refresh(&self) -> Result<Session, AuthError> {
        let refresh_token = {
            let session = self.session.read().await;
            match session.as_ref() {
                Some(s) => s.refresh_token.expose_secret().to_string(),
                None => return Err(AuthError::NotSignedIn),
            }
        };

        let body = serde_json::json!({ "refresh_token": refresh_token });
        let resp = self
            .http
            .post(self.endpoint("token?grant_type=refresh_token"))
            .header("apikey", self.anon_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        let session: Session = resp
            .json::<SessionPayload>()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?
            .into();
        self.install_session(session.clone(), AuthEvent::TokenRefreshed(session.clone()))
            .await;
        Ok(session)
    }

    /// Update the signed-in user's metadata bag. Fires `UserUpdated`.
    pub async fn update_metadata(&self, data: serde_json::Value) -> Result<Session, AuthError> {
        let token = {
            let session = self.session.read().await;
            match session.as_ref() {
                Some(s) => s.access_token.expose_secret().to_string(),
                None => return Err(AuthError::NotSignedIn),
            }
        };

        let resp = self
            .http
            .put(self.endpoint("user"))
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(&token)
            .json(&serde_json::json!({ "data": data }))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }

        let user: AuthUser = resp
            .json()
            .await
            .map_err(|e| AuthError::Decode(e.to_string()))?;

        let updated = {
            let mut session = self.session.write().await;
            match session.as_mut() {
                Some(s) => {
                    s.user = user;
                    s.clone()
                }
                None => return Err(AuthError::NotSignedIn),
            }
        };
        let _ = self.events.send(AuthEvent::UserUpdated(updated.clone()));
        Ok(updated)
    }

    /// Request a password-recovery email.
    pub async fn request_password_recovery(&self, email: &str) -> Result<(), AuthError> {
        let resp = self
            .http
            .post(self.endpoint("recover"))
            .header("apikey", self.anon_key.expose_secret())
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Self::error_from_response(resp).await);
        }
        Ok(())
    }

    async fn install_session(&self, session: Session, event: AuthEvent) {
        *self.bearer.write().await = Some(session.access_token.clone());
        *self.session.write().await = Some(session);
        // Fine if no receivers are subscribed yet
        let _ = self.events.send(event);
    }

    async fn error_from_response(resp: reqwest::Response) -> AuthError {
        let status = resp.status().as_u16();
        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        let message = body
            .get("error_description")
            .or_else(|| body.get("msg"))
            .or_else(|| body.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown auth error")
            .to_string();
        AuthError::Api { status, message }
    }
}

#[async_trait]
impl SessionStore for AuthClient {
    async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.expose_secret().to_string());

        if let Some(token) = token {
            let result = self
                .http
                .post(self.endpoint("logout"))
                .header("apikey", self.anon_key.expose_secret())
                .bearer_auth(&token)
                .send()
                .await;
            // The local session is discarded either way; the remote token
            // simply lives until expiry if the call failed.
            if let Err(e) = result {
                warn!(error = %e, "Remote logout failed, discarding local session anyway");
            }
        }

        *self.bearer.write().await = None;
        *self.session.write().await = None;
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }
}
