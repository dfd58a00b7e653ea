//! Applications — typed passthrough over the `applications` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::TableClient;
use crate::error::BackendError;

const APPLICATIONS: &str = "applications";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub internship_id: Uuid,
    pub student_id: Uuid,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewApplication {
    pub internship_id: Uuid,
    pub student_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<String>,
}

pub struct ApplicationService {
    tables: TableClient,
}

impl ApplicationService {
    pub fn new(tables: TableClient) -> Self {
        Self { tables }
    }

    /// Submit an application. New applications always start pending.
    pub async fn create(&self, input: &NewApplication) -> Result<Application, BackendError> {
        let mut body = serde_json::to_value(input).map_err(|e| BackendError::Decode {
            table: APPLICATIONS.into(),
            message: e.to_string(),
        })?;
        body["status"] = serde_json::json!(ApplicationStatus::Pending);
        self.tables.insert(APPLICATIONS, &body).await
    }

    pub async fn by_internship(
        &self,
        internship_id: Uuid,
    ) -> Result<Vec<Application>, BackendError> {
        let filter = format!("eq.{internship_id}");
        self.tables
            .select(APPLICATIONS, &[("internship_id", filter.as_str())])
            .await
    }

    pub async fn by_student(&self, student_id: Uuid) -> Result<Vec<Application>, BackendError> {
        let filter = format!("eq.{student_id}");
        self.tables
            .select(APPLICATIONS, &[("student_id", filter.as_str())])
            .await
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Application, BackendError> {
        let filter = format!("eq.{id}");
        let body = serde_json::json!({ "status": status });
        let rows: Vec<Application> = self
            .tables
            .update(APPLICATIONS, &[("id", filter.as_str())], &body)
            .await?;
        rows.into_iter().next().ok_or(BackendError::NotFound {
            table: APPLICATIONS.into(),
        })
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), BackendError> {
        let filter = format!("eq.{id}");
        self.tables
            .delete(APPLICATIONS, &[("id", filter.as_str())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_and_tolerates_unknown() {
        let json = serde_json::to_string(&ApplicationStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");

        let parsed: ApplicationStatus = serde_json::from_str("\"shortlisted\"").unwrap();
        assert_eq!(parsed, ApplicationStatus::Unknown);
    }
}
