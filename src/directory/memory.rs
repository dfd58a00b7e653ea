//! In-memory directory — backs tests and offline development.
//!
//! Failure injection covers the recovery paths: forced insert failures
//! model the platform's permission layer rejecting writes, and the repair
//! procedure clears them the way the privileged policy fix does remotely.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::directory::traits::Directory;
use crate::error::BackendError;
use crate::profile::model::{
    CompanyChanges, CompanyRecord, NewCompany, NewStudent, ProfileKind, ProfileRow, StudentChanges,
    StudentRecord,
};

#[derive(Default)]
struct State {
    profiles: Vec<ProfileRow>,
    students: Vec<StudentRecord>,
    companies: Vec<CompanyRecord>,
}

/// In-memory [`Directory`] implementation.
#[derive(Default)]
pub struct MemoryDirectory {
    state: Mutex<State>,
    profile_lookup_failures: AtomicU32,
    profile_insert_failures: AtomicU32,
    role_insert_failures: AtomicU32,
    repair_failures: AtomicU32,
    profile_insert_calls: AtomicU32,
    role_insert_calls: AtomicU32,
    repair_calls: AtomicU32,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the next `n` profile lookups to fail with a transport error.
    pub fn fail_profile_lookups(&self, n: u32) {
        self.profile_lookup_failures.store(n, Ordering::SeqCst);
    }

    /// Force the next `n` profile inserts to fail with a permission error.
    pub fn fail_profile_inserts(&self, n: u32) {
        self.profile_insert_failures.store(n, Ordering::SeqCst);
    }

    /// Force the next `n` role-record inserts (student or company) to fail.
    pub fn fail_role_inserts(&self, n: u32) {
        self.role_insert_failures.store(n, Ordering::SeqCst);
    }

    /// Force the next `n` permission-repair invocations to fail.
    pub fn fail_repairs(&self, n: u32) {
        self.repair_failures.store(n, Ordering::SeqCst);
    }

    /// Number of profile insert attempts seen, including failed ones.
    pub fn profile_insert_calls(&self) -> u32 {
        self.profile_insert_calls.load(Ordering::SeqCst)
    }

    /// Number of role-record insert attempts seen, including failed ones.
    pub fn role_insert_calls(&self) -> u32 {
        self.role_insert_calls.load(Ordering::SeqCst)
    }

    /// Number of permission-repair invocations seen.
    pub fn repair_calls(&self) -> u32 {
        self.repair_calls.load(Ordering::SeqCst)
    }

    /// Number of profile rows held for a user. The unique constraint keeps
    /// this at zero or one; tests assert it never exceeds one.
    pub async fn profile_rows_for(&self, user_id: Uuid) -> usize {
        let state = self.state.lock().await;
        state
            .profiles
            .iter()
            .filter(|p| p.user_id == user_id)
            .count()
    }

    pub async fn student_record_for(&self, user_id: Uuid) -> Option<StudentRecord> {
        let state = self.state.lock().await;
        state
            .students
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn permission_denied(table: &str) -> BackendError {
        BackendError::PermissionDenied {
            table: table.into(),
            message: "new row violates row-level security policy".into(),
        }
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn profile_by_user(&self, user_id: Uuid) -> Result<Option<ProfileRow>, BackendError> {
        if Self::take_failure(&self.profile_lookup_failures) {
            return Err(BackendError::Transport("connection reset".into()));
        }
        let state = self.state.lock().await;
        Ok(state
            .profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn insert_profile(
        &self,
        user_id: Uuid,
        kind: ProfileKind,
    ) -> Result<ProfileRow, BackendError> {
        self.profile_insert_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.profile_insert_failures) {
            return Err(Self::permission_denied("profiles"));
        }

        let mut state = self.state.lock().await;
        if state.profiles.iter().any(|p| p.user_id == user_id) {
            return Err(BackendError::Conflict {
                table: "profiles".into(),
                message: "duplicate key value violates unique constraint".into(),
            });
        }
        let row = ProfileRow {
            id: Uuid::new_v4(),
            user_id,
            kind,
            created_at: Some(chrono::Utc::now()),
        };
        state.profiles.push(row.clone());
        Ok(row)
    }

    async fn repair_profile_permissions(&self) -> Result<(), BackendError> {
        self.repair_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.repair_failures) {
            return Err(BackendError::Rpc {
                name: "repair_profile_policies".into(),
                message: "permission denied for function".into(),
            });
        }
        // Repaired policies let every queued-up failure through.
        self.profile_insert_failures.store(0, Ordering::SeqCst);
        Ok(())
    }

    async fn student_by_user(&self, user_id: Uuid) -> Result<Option<StudentRecord>, BackendError> {
        let state = self.state.lock().await;
        Ok(state
            .students
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn insert_student(&self, input: &NewStudent) -> Result<StudentRecord, BackendError> {
        self.role_insert_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.role_insert_failures) {
            return Err(Self::permission_denied("students"));
        }

        let mut state = self.state.lock().await;
        if state.students.iter().any(|s| s.user_id == input.user_id) {
            return Err(BackendError::Conflict {
                table: "students".into(),
                message: "duplicate key value violates unique constraint".into(),
            });
        }
        let record = StudentRecord {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            full_name: input.full_name.clone(),
            university: input.university.clone(),
            department: input.department.clone(),
            bio: input.bio.clone(),
            avatar_url: input.avatar_url.clone(),
            resume_url: None,
            skills: input.skills.clone(),
            projects: Vec::new(),
            created_at: Some(chrono::Utc::now()),
        };
        state.students.push(record.clone());
        Ok(record)
    }

    async fn update_student(
        &self,
        user_id: Uuid,
        changes: &StudentChanges,
    ) -> Result<StudentRecord, BackendError> {
        let mut state = self.state.lock().await;
        let record = state
            .students
            .iter_mut()
            .find(|s| s.user_id == user_id)
            .ok_or(BackendError::NotFound {
                table: "students".into(),
            })?;

        if let Some(v) = &changes.full_name {
            record.full_name = v.clone();
        }
        if let Some(v) = &changes.university {
            record.university = v.clone();
        }
        if let Some(v) = &changes.department {
            record.department = v.clone();
        }
        if let Some(v) = &changes.bio {
            record.bio = Some(v.clone());
        }
        if let Some(v) = &changes.avatar_url {
            record.avatar_url = Some(v.clone());
        }
        if let Some(v) = &changes.resume_url {
            record.resume_url = Some(v.clone());
        }
        if let Some(v) = &changes.skills {
            record.skills = v.clone();
        }
        if let Some(v) = &changes.projects {
            record.projects = v.clone();
        }
        Ok(record.clone())
    }

    async fn search_students(
        &self,
        query: Option<&str>,
        skills: &[String],
    ) -> Result<Vec<StudentRecord>, BackendError> {
        let state = self.state.lock().await;
        let needle = query.map(str::to_lowercase);
        Ok(state
            .students
            .iter()
            .filter(|s| match &needle {
                Some(q) if !q.is_empty() => {
                    s.full_name.to_lowercase().contains(q)
                        || s.university.to_lowercase().contains(q)
                        || s.department.to_lowercase().contains(q)
                }
                _ => true,
            })
            .filter(|s| skills.iter().all(|skill| s.skills.contains(skill)))
            .cloned()
            .collect())
    }

    async fn company_by_user(&self, user_id: Uuid) -> Result<Option<CompanyRecord>, BackendError> {
        let state = self.state.lock().await;
        Ok(state
            .companies
            .iter()
            .find(|c| c.user_id == user_id)
            .cloned())
    }

    async fn insert_company(&self, input: &NewCompany) -> Result<CompanyRecord, BackendError> {
        self.role_insert_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.role_insert_failures) {
            return Err(Self::permission_denied("companies"));
        }

        let mut state = self.state.lock().await;
        if state.companies.iter().any(|c| c.user_id == input.user_id) {
            return Err(BackendError::Conflict {
                table: "companies".into(),
                message: "duplicate key value violates unique constraint".into(),
            });
        }
        let record = CompanyRecord {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            name: input.name.clone(),
            industry: input.industry.clone(),
            location: input.location.clone(),
            about: input.about.clone(),
            logo_url: input.logo_url.clone(),
            website: input.website.clone(),
            created_at: Some(chrono::Utc::now()),
        };
        state.companies.push(record.clone());
        Ok(record)
    }

    async fn update_company(
        &self,
        id: Uuid,
        changes: &CompanyChanges,
    ) -> Result<CompanyRecord, BackendError> {
        let mut state = self.state.lock().await;
        let record = state
            .companies
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(BackendError::NotFound {
                table: "companies".into(),
            })?;

        if let Some(v) = &changes.name {
            record.name = v.clone();
        }
        if let Some(v) = &changes.industry {
            record.industry = v.clone();
        }
        if let Some(v) = &changes.location {
            record.location = v.clone();
        }
        if let Some(v) = &changes.about {
            record.about = v.clone();
        }
        if let Some(v) = &changes.logo_url {
            record.logo_url = Some(v.clone());
        }
        if let Some(v) = &changes.website {
            record.website = Some(v.clone());
        }
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn profile_insert_is_unique_per_user() {
        let dir = MemoryDirectory::new();
        let user_id = Uuid::new_v4();

        dir.insert_profile(user_id, ProfileKind::Student)
            .await
            .unwrap();
        let second = dir.insert_profile(user_id, ProfileKind::Student).await;
        assert!(matches!(second, Err(BackendError::Conflict { .. })));
        assert_eq!(dir.profile_rows_for(user_id).await, 1);
    }

    #[tokio::test]
    async fn forced_failures_drain_then_clear() {
        let dir = MemoryDirectory::new();
        let user_id = Uuid::new_v4();
        dir.fail_profile_inserts(2);

        assert!(dir.insert_profile(user_id, ProfileKind::Student).await.is_err());
        assert!(dir.insert_profile(user_id, ProfileKind::Student).await.is_err());
        assert!(dir.insert_profile(user_id, ProfileKind::Student).await.is_ok());
        assert_eq!(dir.profile_insert_calls(), 3);
    }

    #[tokio::test]
    async fn repair_clears_pending_failures() {
        let dir = MemoryDirectory::new();
        let user_id = Uuid::new_v4();
        dir.fail_profile_inserts(10);

        assert!(dir.insert_profile(user_id, ProfileKind::Company).await.is_err());
        dir.repair_profile_permissions().await.unwrap();
        assert!(dir.insert_profile(user_id, ProfileKind::Company).await.is_ok());
    }

    #[tokio::test]
    async fn search_matches_name_and_skills() {
        let dir = MemoryDirectory::new();
        let mut input = NewStudent::new(Uuid::new_v4(), "Ada Lovelace", "Cambridge", "Math");
        input.skills = vec!["rust".into(), "sql".into()];
        dir.insert_student(&input).await.unwrap();

        let by_name = dir.search_students(Some("lovelace"), &[]).await.unwrap();
        assert_eq!(by_name.len(), 1);

        let by_skill = dir
            .search_students(None, &["rust".to_string()])
            .await
            .unwrap();
        assert_eq!(by_skill.len(), 1);

        let missing_skill = dir
            .search_students(None, &["go".to_string()])
            .await
            .unwrap();
        assert!(missing_skill.is_empty());
    }
}
