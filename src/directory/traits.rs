//! Backend-agnostic directory trait — the persistence seam for profiles and
//! role records.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::BackendError;
use crate::profile::model::{
    CompanyChanges, CompanyRecord, NewCompany, NewStudent, ProfileKind, ProfileRow, StudentChanges,
    StudentRecord,
};

/// Directory of profiles and role records, keyed by the auth user id.
#[async_trait]
pub trait Directory: Send + Sync {
    // ── Profiles ────────────────────────────────────────────────────

    /// Look up a profile row. Absence signals an unprovisioned user.
    async fn profile_by_user(&self, user_id: Uuid) -> Result<Option<ProfileRow>, BackendError>;

    /// Insert the profile row for a user.
    async fn insert_profile(
        &self,
        user_id: Uuid,
        kind: ProfileKind,
    ) -> Result<ProfileRow, BackendError>;

    /// Invoke the privileged procedure that repairs the permission layer so
    /// a subsequent direct insert can succeed.
    async fn repair_profile_permissions(&self) -> Result<(), BackendError>;

    // ── Students ────────────────────────────────────────────────────

    async fn student_by_user(&self, user_id: Uuid) -> Result<Option<StudentRecord>, BackendError>;

    async fn insert_student(&self, input: &NewStudent) -> Result<StudentRecord, BackendError>;

    async fn update_student(
        &self,
        user_id: Uuid,
        changes: &StudentChanges,
    ) -> Result<StudentRecord, BackendError>;

    /// Search by name, university, or department, optionally narrowed to
    /// students carrying all of the given skills.
    async fn search_students(
        &self,
        query: Option<&str>,
        skills: &[String],
    ) -> Result<Vec<StudentRecord>, BackendError>;

    // ── Companies ───────────────────────────────────────────────────

    async fn company_by_user(&self, user_id: Uuid) -> Result<Option<CompanyRecord>, BackendError>;

    async fn insert_company(&self, input: &NewCompany) -> Result<CompanyRecord, BackendError>;

    async fn update_company(
        &self,
        id: Uuid,
        changes: &CompanyChanges,
    ) -> Result<CompanyRecord, BackendError>;
}
