//! Profile resolver — turns a user id into a typed profile view.
//!
//! Resolution fails soft: every remote error maps to `None` so the
//! orchestrator always has a defined value to branch on. A profile row
//! whose role record is missing still resolves — the profile is
//! authoritative for routing, and the gap is logged for repair.

use std::sync::Arc;

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::directory::Directory;
use crate::profile::model::{ProfileKind, ProfileView};

pub struct ProfileResolver {
    dir: Arc<dyn Directory>,
}

impl ProfileResolver {
    pub fn new(dir: Arc<dyn Directory>) -> Self {
        Self { dir }
    }

    /// Resolve a user's profile. Returns `None` for unprovisioned users,
    /// unrecognized profile types, and any lookup failure.
    pub async fn resolve(&self, user_id: Uuid) -> Option<ProfileView> {
        let row = match self.dir.profile_by_user(user_id).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                debug!(%user_id, "No profile row");
                return None;
            }
            Err(e) => {
                error!(%user_id, error = %e, "Profile lookup failed");
                return None;
            }
        };

        match row.kind {
            ProfileKind::Student => {
                let student_id = match self.dir.student_by_user(user_id).await {
                    Ok(Some(student)) => Some(student.id),
                    Ok(None) => {
                        warn!(%user_id, "Profile row exists but the student record is missing");
                        None
                    }
                    Err(e) => {
                        error!(%user_id, error = %e, "Student record lookup failed");
                        None
                    }
                };
                Some(ProfileView::Student {
                    profile_id: row.id,
                    student_id,
                })
            }
            ProfileKind::Company => {
                let company_id = match self.dir.company_by_user(user_id).await {
                    Ok(Some(company)) => Some(company.id),
                    Ok(None) => {
                        warn!(%user_id, "Profile row exists but the company record is missing");
                        None
                    }
                    Err(e) => {
                        error!(%user_id, error = %e, "Company record lookup failed");
                        None
                    }
                };
                Some(ProfileView::Company {
                    profile_id: row.id,
                    company_id,
                })
            }
            ProfileKind::Unknown => {
                error!(%user_id, "Profile row carries an unrecognized type");
                None
            }
        }
    }
}
