//! Directives — side-effect requests the orchestrator hands to its host.
//!
//! The orchestrator never touches UI or navigation itself; it emits these
//! on a channel and the hosting shell carries them out.

use crate::profile::model::ProfileView;

/// Destinations the hosting shell can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Landing,
    StudentDashboard,
    CompanyDashboard,
}

impl Route {
    /// Dashboard route for a resolved profile.
    pub fn for_profile(view: &ProfileView) -> Self {
        match view {
            ProfileView::Student { .. } => Self::StudentDashboard,
            ProfileView::Company { .. } => Self::CompanyDashboard,
        }
    }

    pub fn as_path(&self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::StudentDashboard => "/student-dashboard",
            Self::CompanyDashboard => "/company-dashboard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A user-facing notification.
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Side effects requested by the orchestrator.
#[derive(Debug, Clone)]
pub enum Directive {
    Navigate(Route),
    Notify(Notice),
}
