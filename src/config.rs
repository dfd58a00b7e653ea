//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Connection settings for the hosted data/auth/storage platform.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Platform project URL, e.g. `https://project.example.co`.
    pub base_url: String,
    /// Public anonymous API key. Requests carry this until a session token
    /// replaces it.
    pub anon_key: SecretString,
}

impl BackendConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("INTERNLINK_BACKEND_URL")
            .map_err(|_| ConfigError::MissingEnvVar("INTERNLINK_BACKEND_URL".into()))?;
        let anon_key = std::env::var("INTERNLINK_ANON_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("INTERNLINK_ANON_KEY".into()))?;

        if !base_url.starts_with("http") {
            return Err(ConfigError::InvalidValue {
                key: "INTERNLINK_BACKEND_URL".into(),
                message: format!("expected an http(s) URL, got {base_url}"),
            });
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: SecretString::from(anon_key),
        })
    }
}

/// Retry and settling policy for the role provisioner.
///
/// The constants mirror the platform's observed behavior: a flat delay
/// between direct insert attempts (no jitter, no exponential growth) and a
/// fixed settling pause before the dependent role-record insert.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// Direct profile-insert attempts before falling back to the
    /// permission-repair procedure.
    pub max_insert_attempts: u32,
    /// Flat delay after each failed insert attempt.
    pub insert_backoff: Duration,
    /// Pause between profile creation and the role-record insert, tolerating
    /// the permission layer's propagation lag.
    pub settle_delay: Duration,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            max_insert_attempts: 3,
            insert_backoff: Duration::from_millis(500),
            settle_delay: Duration::from_millis(1000),
        }
    }
}

/// Bounded backoff poll used after `SIGNED_IN`, giving the platform's
/// asynchronous sign-up trigger time to write the profile row before the
/// orchestrator concludes the user is new.
#[derive(Debug, Clone)]
pub struct SettleConfig {
    /// Delay before the second resolution attempt; doubles per attempt.
    pub initial_delay: Duration,
    /// Total resolution attempts before giving up.
    pub max_attempts: u32,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_attempts: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provision_defaults_match_observed_platform_behavior() {
        let config = ProvisionConfig::default();
        assert_eq!(config.max_insert_attempts, 3);
        assert_eq!(config.insert_backoff, Duration::from_millis(500));
        assert_eq!(config.settle_delay, Duration::from_millis(1000));
    }

    #[test]
    fn settle_poll_is_bounded() {
        let config = SettleConfig::default();
        assert!(config.max_attempts >= 2);
        assert!(config.initial_delay >= Duration::from_millis(100));
    }
}
