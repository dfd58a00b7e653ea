//! Profile domain types — the role-typed root record and its projections.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role tag stored on a profile row. `Unknown` captures values written by
/// other clients that this crate does not recognize; it is never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Student,
    Company,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::Company => write!(f, "company"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The profile row. At most one exists per user; its kind never changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: ProfileKind,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Resolved identity projection cached by the orchestrator.
///
/// The role-record id is optional: a profile row without its matching role
/// record is a known partial-provisioning state, and the profile row alone
/// is authoritative for routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileView {
    Student {
        profile_id: Uuid,
        student_id: Option<Uuid>,
    },
    Company {
        profile_id: Uuid,
        company_id: Option<Uuid>,
    },
}

impl ProfileView {
    pub fn kind(&self) -> ProfileKind {
        match self {
            Self::Student { .. } => ProfileKind::Student,
            Self::Company { .. } => ProfileKind::Company,
        }
    }
}

/// A project entry embedded in a student record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A student's role record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub university: String,
    pub department: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A company's role record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub industry: String,
    pub location: String,
    pub about: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Input for creating a student record.
#[derive(Debug, Clone, Serialize)]
pub struct NewStudent {
    pub user_id: Uuid,
    pub full_name: String,
    pub university: String,
    pub department: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
}

impl NewStudent {
    pub fn new(
        user_id: Uuid,
        full_name: impl Into<String>,
        university: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            full_name: full_name.into(),
            university: university.into(),
            department: department.into(),
            bio: None,
            avatar_url: None,
            skills: Vec::new(),
        }
    }

    /// Placeholder record for a first-time external-identity sign-in; the
    /// user is expected to fill in the real values afterwards.
    pub fn placeholder(user_id: Uuid, full_name: impl Into<String>) -> Self {
        Self::new(user_id, full_name, "Please update", "Please update")
    }
}

/// Input for creating a company record.
#[derive(Debug, Clone, Serialize)]
pub struct NewCompany {
    pub user_id: Uuid,
    pub name: String,
    pub industry: String,
    pub location: String,
    pub about: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl NewCompany {
    pub fn new(user_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            industry: String::new(),
            location: String::new(),
            about: String::new(),
            logo_url: None,
            website: None,
        }
    }
}

/// Partial update for a student record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StudentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects: Option<Vec<Project>>,
}

/// Partial update for a company record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompanyChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_kind_parses_known_values() {
        let student: ProfileKind = serde_json::from_str("\"student\"").unwrap();
        let company: ProfileKind = serde_json::from_str("\"company\"").unwrap();
        assert_eq!(student, ProfileKind::Student);
        assert_eq!(company, ProfileKind::Company);
    }

    #[test]
    fn profile_kind_maps_unrecognized_values_to_unknown() {
        let kind: ProfileKind = serde_json::from_str("\"administrator\"").unwrap();
        assert_eq!(kind, ProfileKind::Unknown);
    }

    #[test]
    fn view_kind_matches_variant() {
        let view = ProfileView::Student {
            profile_id: Uuid::new_v4(),
            student_id: None,
        };
        assert_eq!(view.kind(), ProfileKind::Student);
    }

    #[test]
    fn new_student_serializes_without_empty_optionals() {
        let input = NewStudent::new(Uuid::new_v4(), "A B", "U", "CS");
        let value = serde_json::to_value(&input).unwrap();
        assert!(value.get("bio").is_none());
        assert!(value.get("skills").is_none());
        assert_eq!(value["full_name"], "A B");
    }

    #[test]
    fn placeholder_student_carries_update_markers() {
        let input = NewStudent::placeholder(Uuid::new_v4(), "jdoe");
        assert_eq!(input.university, "Please update");
        assert_eq!(input.department, "Please update");
    }
}
