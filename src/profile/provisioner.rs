//! Role provisioner — creates the profile row and its role record.
//!
//! The two inserts are not atomic on the platform side, so the provisioner
//! layers recovery around them: an idempotency guard, a flat-backoff retry
//! ladder for the profile insert, a privileged permission-repair fallback,
//! and a settling pause before the dependent company insert. A role-record
//! failure raises immediately; the resulting dangling profile row is a
//! known state the resolver tolerates.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ProvisionConfig;
use crate::directory::Directory;
use crate::error::{BackendError, ProvisionError};
use crate::profile::model::{NewCompany, NewStudent, ProfileKind};

pub struct RoleProvisioner {
    dir: Arc<dyn Directory>,
    config: ProvisionConfig,
}

impl RoleProvisioner {
    pub fn new(dir: Arc<dyn Directory>, config: ProvisionConfig) -> Self {
        Self { dir, config }
    }

    /// Provision a student: profile row, then student record. Returns the
    /// student record id.
    pub async fn provision_student(&self, input: NewStudent) -> Result<Uuid, ProvisionError> {
        let user_id = input.user_id;
        self.ensure_profile(user_id, ProfileKind::Student).await?;

        let record = self.dir.insert_student(&input).await.map_err(|source| {
            ProvisionError::RoleRecordCreationFailed {
                user_id,
                kind: ProfileKind::Student,
                source,
            }
        })?;

        info!(%user_id, student_id = %record.id, "Student provisioned");
        Ok(record.id)
    }

    /// Provision a company: profile row, settling pause, company record,
    /// best-effort verification. Returns the company record id.
    pub async fn provision_company(&self, input: NewCompany) -> Result<Uuid, ProvisionError> {
        let user_id = input.user_id;
        self.ensure_profile(user_id, ProfileKind::Company).await?;

        // Let the permission layer's propagation finish before the
        // dependent insert; observed platform behavior, not a guarantee.
        sleep(self.config.settle_delay).await;

        let record = self.dir.insert_company(&input).await.map_err(|source| {
            ProvisionError::RoleRecordCreationFailed {
                user_id,
                kind: ProfileKind::Company,
                source,
            }
        })?;

        // Re-query to confirm the insert landed. Verification failure is
        // logged, not raised: the insert already succeeded.
        match self.dir.company_by_user(user_id).await {
            Ok(Some(_)) => {}
            Ok(None) => warn!(%user_id, "Company record verification found no row"),
            Err(e) => warn!(%user_id, error = %e, "Company record verification failed"),
        }

        info!(%user_id, company_id = %record.id, "Company provisioned");
        Ok(record.id)
    }

    /// Idempotently create the profile row. An existing row of any kind
    /// short-circuits, so retried registrations never double-provision.
    async fn ensure_profile(
        &self,
        user_id: Uuid,
        kind: ProfileKind,
    ) -> Result<(), ProvisionError> {
        match self.dir.profile_by_user(user_id).await {
            Ok(Some(existing)) => {
                if existing.kind != kind {
                    warn!(%user_id, existing = %existing.kind, requested = %kind,
                        "Profile already exists with a different type");
                } else {
                    debug!(%user_id, "Profile already exists, skipping creation");
                }
                return Ok(());
            }
            Ok(None) => {}
            // The insert path has its own recovery; a failed pre-check
            // should not abort provisioning.
            Err(e) => warn!(%user_id, error = %e, "Profile pre-check failed, attempting insert"),
        }

        self.create_profile_with_recovery(user_id, kind)
            .await
            .map_err(|source| ProvisionError::ProfileCreationFailed {
                user_id,
                attempts: self.config.max_insert_attempts,
                source,
            })
    }

    /// Direct inserts with a flat backoff, then the privileged
    /// permission-repair procedure and one final direct attempt.
    async fn create_profile_with_recovery(
        &self,
        user_id: Uuid,
        kind: ProfileKind,
    ) -> Result<(), BackendError> {
        let mut last_err = match self.try_insert_profile(user_id, kind, 1).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        for attempt in 2..=self.config.max_insert_attempts {
            sleep(self.config.insert_backoff).await;
            match self.try_insert_profile(user_id, kind, attempt).await {
                Ok(()) => return Ok(()),
                Err(e) => last_err = e,
            }
        }
        sleep(self.config.insert_backoff).await;

        warn!(%user_id, "Direct profile inserts exhausted, invoking permission repair");
        match self.dir.repair_profile_permissions().await {
            Ok(()) => {
                match self
                    .try_insert_profile(user_id, kind, self.config.max_insert_attempts + 1)
                    .await
                {
                    Ok(()) => {
                        info!(%user_id, "Profile created after permission repair");
                        return Ok(());
                    }
                    Err(e) => last_err = e,
                }
            }
            Err(e) => warn!(%user_id, error = %e, "Permission repair procedure failed"),
        }

        Err(last_err)
    }

    async fn try_insert_profile(
        &self,
        user_id: Uuid,
        kind: ProfileKind,
        attempt: u32,
    ) -> Result<(), BackendError> {
        match self.dir.insert_profile(user_id, kind).await {
            Ok(row) => {
                info!(%user_id, profile_id = %row.id, attempt, "Profile created");
                Ok(())
            }
            // Another writer (the platform's sign-up trigger, or a retried
            // registration racing us) inserted the row first. That is the
            // outcome we wanted.
            Err(BackendError::Conflict { .. }) => {
                debug!(%user_id, attempt, "Profile already present, treating insert as done");
                Ok(())
            }
            Err(e) => {
                warn!(%user_id, attempt, error = %e, "Profile insert attempt failed");
                Err(e)
            }
        }
    }
}
