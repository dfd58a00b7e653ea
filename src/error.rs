//! Error types for internlink.

use uuid::Uuid;

use crate::profile::model::ProfileKind;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the remote auth service.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("No active session")]
    NotSignedIn,

    #[error("Auth request failed ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode auth response: {0}")]
    Decode(String),
}

/// Typed failure kinds from the relational and storage APIs.
///
/// The kind is decided once, at the response boundary, so callers branch on
/// variants instead of inspecting error message strings.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Permission denied on {table}: {message}")]
    PermissionDenied { table: String, message: String },

    #[error("Conflict on {table}: {message}")]
    Conflict { table: String, message: String },

    #[error("Row not found in {table}")]
    NotFound { table: String },

    #[error("Failed to decode {table} response: {message}")]
    Decode { table: String, message: String },

    #[error("Remote procedure {name} failed: {message}")]
    Rpc { name: String, message: String },

    #[error("Request on {table} failed ({status}): {message}")]
    Api {
        table: String,
        status: u16,
        message: String,
    },
}

/// Profile provisioning failures surfaced to registration callers.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Direct inserts and the permission-repair fallback were all exhausted.
    #[error(
        "Failed to create profile for user {user_id} after {attempts} direct attempts and permission repair: {source}"
    )]
    ProfileCreationFailed {
        user_id: Uuid,
        attempts: u32,
        source: BackendError,
    },

    /// The profile row exists but the role record insert failed. The account
    /// is half-provisioned; the caller must surface this to the user.
    #[error("Profile for user {user_id} exists but the {kind} record could not be created: {source}")]
    RoleRecordCreationFailed {
        user_id: Uuid,
        kind: ProfileKind,
        source: BackendError,
    },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
