//! Internship listings — typed passthrough over the `internships` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::TableClient;
use crate::error::BackendError;

const INTERNSHIPS: &str = "internships";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Internship {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    /// Work mode, e.g. "Remote", "On-site", "Hybrid".
    #[serde(rename = "type")]
    pub kind: String,
    pub duration: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewInternship {
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub duration: String,
    pub requirements: Vec<String>,
    pub responsibilities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InternshipChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsibilities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

/// Listing filter; all fields are optional and combine conjunctively.
#[derive(Debug, Clone, Default)]
pub struct InternshipFilter {
    pub kind: Option<String>,
    pub location: Option<String>,
    pub active: Option<bool>,
    pub company_id: Option<Uuid>,
}

/// Build PostgREST query pairs for a listing filter, newest first.
fn filter_pairs(filter: &InternshipFilter) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(kind) = &filter.kind {
        pairs.push(("type", format!("eq.{kind}")));
    }
    if let Some(location) = &filter.location {
        pairs.push(("location", format!("ilike.*{location}*")));
    }
    if let Some(active) = filter.active {
        pairs.push(("is_active", format!("eq.{active}")));
    }
    if let Some(company_id) = filter.company_id {
        pairs.push(("company_id", format!("eq.{company_id}")));
    }
    pairs.push(("order", "created_at.desc".to_string()));
    pairs
}

pub struct InternshipService {
    tables: TableClient,
}

impl InternshipService {
    pub fn new(tables: TableClient) -> Self {
        Self { tables }
    }

    pub async fn list(&self, filter: &InternshipFilter) -> Result<Vec<Internship>, BackendError> {
        let pairs = filter_pairs(filter);
        let borrowed: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.tables.select(INTERNSHIPS, &borrowed).await
    }

    pub async fn by_id(&self, id: Uuid) -> Result<Internship, BackendError> {
        let filter = format!("eq.{id}");
        self.tables
            .select_optional(INTERNSHIPS, &[("id", filter.as_str())])
            .await?
            .ok_or(BackendError::NotFound {
                table: INTERNSHIPS.into(),
            })
    }

    /// Create a listing. New listings are always active.
    pub async fn create(&self, input: &NewInternship) -> Result<Internship, BackendError> {
        let mut body = serde_json::to_value(input).map_err(|e| BackendError::Decode {
            table: INTERNSHIPS.into(),
            message: e.to_string(),
        })?;
        body["is_active"] = serde_json::Value::Bool(true);
        self.tables.insert(INTERNSHIPS, &body).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        changes: &InternshipChanges,
    ) -> Result<Internship, BackendError> {
        let filter = format!("eq.{id}");
        let rows: Vec<Internship> = self
            .tables
            .update(INTERNSHIPS, &[("id", filter.as_str())], changes)
            .await?;
        rows.into_iter().next().ok_or(BackendError::NotFound {
            table: INTERNSHIPS.into(),
        })
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), BackendError> {
        let filter = format!("eq.{id}");
        self.tables
            .delete(INTERNSHIPS, &[("id", filter.as_str())])
            .await
    }
}
