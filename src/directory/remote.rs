//! Remote directory — [`Directory`] over the platform's relational API.

use async_trait::async_trait;
use uuid::Uuid;

use crate::backend::TableClient;
use crate::directory::traits::Directory;
use crate::error::BackendError;
use crate::profile::model::{
    CompanyChanges, CompanyRecord, NewCompany, NewStudent, ProfileKind, ProfileRow, StudentChanges,
    StudentRecord,
};

const PROFILES: &str = "profiles";
const STUDENTS: &str = "students";
const COMPANIES: &str = "companies";

/// Privileged procedure that rewrites the permission policies blocking
/// profile inserts. Provided by the platform operator.
const REPAIR_PROFILE_POLICIES: &str = "repair_profile_policies";

pub struct RemoteDirectory {
    tables: TableClient,
}

impl RemoteDirectory {
    pub fn new(tables: TableClient) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl Directory for RemoteDirectory {
    async fn profile_by_user(&self, user_id: Uuid) -> Result<Option<ProfileRow>, BackendError> {
        let filter = format!("eq.{user_id}");
        self.tables
            .select_optional(PROFILES, &[("user_id", filter.as_str())])
            .await
    }

    async fn insert_profile(
        &self,
        user_id: Uuid,
        kind: ProfileKind,
    ) -> Result<ProfileRow, BackendError> {
        let body = serde_json::json!({ "user_id": user_id, "type": kind });
        self.tables.insert(PROFILES, &body).await
    }

    async fn repair_profile_permissions(&self) -> Result<(), BackendError> {
        self.tables
            .rpc(REPAIR_PROFILE_POLICIES, &serde_json::json!({}))
            .await?;
        Ok(())
    }

    async fn student_by_user(&self, user_id: Uuid) -> Result<Option<StudentRecord>, BackendError> {
        let filter = format!("eq.{user_id}");
        self.tables
            .select_optional(STUDENTS, &[("user_id", filter.as_str())])
            .await
    }

    async fn insert_student(&self, input: &NewStudent) -> Result<StudentRecord, BackendError> {
        self.tables.insert(STUDENTS, input).await
    }

    async fn update_student(
        &self,
        user_id: Uuid,
        changes: &StudentChanges,
    ) -> Result<StudentRecord, BackendError> {
        let filter = format!("eq.{user_id}");
        let rows: Vec<StudentRecord> = self
            .tables
            .update(STUDENTS, &[("user_id", filter.as_str())], changes)
            .await?;
        rows.into_iter().next().ok_or(BackendError::NotFound {
            table: STUDENTS.into(),
        })
    }

    async fn search_students(
        &self,
        query: Option<&str>,
        skills: &[String],
    ) -> Result<Vec<StudentRecord>, BackendError> {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            pairs.push((
                "or",
                format!(
                    "(full_name.ilike.*{q}*,university.ilike.*{q}*,department.ilike.*{q}*)"
                ),
            ));
        }
        if !skills.is_empty() {
            pairs.push(("skills", format!("cs.{{{}}}", skills.join(","))));
        }
        let borrowed: Vec<(&str, &str)> =
            pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.tables.select(STUDENTS, &borrowed).await
    }

    async fn company_by_user(&self, user_id: Uuid) -> Result<Option<CompanyRecord>, BackendError> {
        let filter = format!("eq.{user_id}");
        self.tables
            .select_optional(COMPANIES, &[("user_id", filter.as_str())])
            .await
    }

    async fn insert_company(&self, input: &NewCompany) -> Result<CompanyRecord, BackendError> {
        self.tables.insert(COMPANIES, input).await
    }

    async fn update_company(
        &self,
        id: Uuid,
        changes: &CompanyChanges,
    ) -> Result<CompanyRecord, BackendError> {
        let filter = format!("eq.{id}");
        let rows: Vec<CompanyRecord> = self
            .tables
            .update(COMPANIES, &[("id", filter.as_str())], changes)
            .await?;
        rows.into_iter().next().ok_or(BackendError::NotFound {
            table: COMPANIES.into(),
        })
    }
}
