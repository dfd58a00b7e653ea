//! Session and user types issued by the remote auth service.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use uuid::Uuid;

/// Metadata bag attached to a user by the identity provider. Social logins
/// may carry a display name here; password sign-ups usually carry nothing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
}

/// The authenticated user carried inside a session.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl AuthUser {
    /// Bare user with an id and email, for tests and placeholder flows.
    pub fn minimal(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: Some(email.into()),
            user_metadata: UserMetadata::default(),
            email_confirmed_at: None,
        }
    }
}

/// An opaque token set issued by the auth service. The crate never mints or
/// mutates sessions, it only holds the most recent one.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    /// Seconds until the access token expires, as reported at issue time.
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

/// Wire shape of a token response; tokens are wrapped into secrets before
/// the session leaves the auth client.
#[derive(Debug, Deserialize)]
pub(crate) struct SessionPayload {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

impl From<SessionPayload> for Session {
    fn from(payload: SessionPayload) -> Self {
        Self {
            access_token: SecretString::from(payload.access_token),
            refresh_token: SecretString::from(payload.refresh_token),
            expires_in: payload.expires_in,
            user: payload.user,
        }
    }
}

/// Outcome of a sign-up request. Platforms configured to require email
/// confirmation return a user without a session.
#[derive(Debug, Clone)]
pub enum SignUpResult {
    /// Auto-confirmed: the user is signed in immediately.
    SignedIn(Session),
    /// A confirmation email was sent; no session yet.
    ConfirmationRequired(AuthUser),
}

/// Session lifecycle events broadcast by the session store.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    UserUpdated(Session),
    SignedOut,
}

/// External identity providers supported for redirect-based sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Github,
    LinkedIn,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::LinkedIn => "linkedin",
        }
    }
}
