//! Auth orchestrator — drives the session lifecycle state machine.
//!
//! Subscribes once to the session store's event stream and reacts:
//! startup hydration (no navigation), post-sign-in profile resolution with
//! a bounded settle poll, first-social-login provisioning, role-based
//! navigation, and sign-out teardown. The orchestrator is the single owner
//! of the cached session and profile view; everyone else gets snapshots.

use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::directives::{Directive, Notice, Route};
use crate::backend::types::{AuthEvent, AuthUser, Session};
use crate::backend::SessionStore;
use crate::config::{ProvisionConfig, SettleConfig};
use crate::directory::Directory;
use crate::error::AuthError;
use crate::profile::model::{NewStudent, ProfileKind, ProfileView};
use crate::profile::{ProfileResolver, RoleProvisioner};

pub struct AuthOrchestrator {
    sessions: Arc<dyn SessionStore>,
    dir: Arc<dyn Directory>,
    resolver: ProfileResolver,
    provisioner: RoleProvisioner,
    settle: SettleConfig,
    session: RwLock<Option<Session>>,
    profile: RwLock<Option<ProfileView>>,
    directives: mpsc::Sender<Directive>,
}

impl AuthOrchestrator {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        dir: Arc<dyn Directory>,
        provision: ProvisionConfig,
        settle: SettleConfig,
        directives: mpsc::Sender<Directive>,
    ) -> Self {
        Self {
            sessions,
            resolver: ProfileResolver::new(Arc::clone(&dir)),
            provisioner: RoleProvisioner::new(Arc::clone(&dir), provision),
            dir,
            settle,
            session: RwLock::new(None),
            profile: RwLock::new(None),
            directives,
        }
    }

    /// Snapshot of the cached profile view.
    pub async fn profile(&self) -> Option<ProfileView> {
        self.profile.read().await.clone()
    }

    /// Snapshot of the cached session.
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Hydrate state from an existing session, e.g. after a reload. Never
    /// navigates: the current route must not be hijacked.
    pub async fn start(&self) {
        if let Some(session) = self.sessions.current_session().await {
            info!(user_id = %session.user.id, "Existing session found at startup");
            let view = self.resolver.resolve(session.user.id).await;
            *self.profile.write().await = view;
            *self.session.write().await = Some(session);
        }
    }

    /// Subscribe to session events and react until the store closes.
    pub async fn run(&self) {
        let mut events = self.sessions.subscribe();
        self.start().await;
        loop {
            match events.recv().await {
                Ok(event) => self.handle_event(event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    pub async fn handle_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(session) => self.on_signed_in(session).await,
            AuthEvent::TokenRefreshed(session) | AuthEvent::UserUpdated(session) => {
                *self.session.write().await = Some(session);
            }
            AuthEvent::SignedOut => {
                *self.session.write().await = None;
                *self.profile.write().await = None;
                self.emit(Directive::Navigate(Route::Landing)).await;
            }
        }
    }

    /// Destroy the session. Cache teardown and navigation happen when the
    /// resulting `SignedOut` event comes back through the stream.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.sessions.sign_out().await?;
        self.emit(Directive::Notify(Notice::info(
            "Signed out",
            "You have been signed out successfully",
        )))
        .await;
        Ok(())
    }

    async fn on_signed_in(&self, session: Session) {
        let user_id = session.user.id;
        *self.session.write().await = Some(session.clone());

        if let Some(view) = self.resolve_with_settle(user_id).await {
            let route = Route::for_profile(&view);
            *self.profile.write().await = Some(view);
            self.emit(Directive::Navigate(route)).await;
            return;
        }

        // The poll saw nothing. Re-check the row directly before treating
        // this as a brand-new user: the resolver may have hit a transient
        // error, or the row may carry a type we do not recognize.
        match self.dir.profile_by_user(user_id).await {
            Ok(Some(row)) if row.kind == ProfileKind::Unknown => {
                error!(%user_id, "Profile exists with an unrecognized type");
                self.emit(Directive::Notify(Notice::error(
                    "Profile error",
                    "Your account's profile type is not recognized",
                )))
                .await;
            }
            Ok(Some(_)) => {
                if let Some(view) = self.resolver.resolve(user_id).await {
                    let route = Route::for_profile(&view);
                    *self.profile.write().await = Some(view);
                    self.emit(Directive::Navigate(route)).await;
                } else {
                    warn!(%user_id, "Profile row exists but could not be resolved");
                    self.emit(Directive::Notify(Notice::error(
                        "Profile error",
                        "Could not load your profile, please try again",
                    )))
                    .await;
                }
            }
            Ok(None) => self.provision_first_social_login(&session).await,
            Err(e) => {
                error!(%user_id, error = %e, "Profile re-check failed");
                self.emit(Directive::Notify(Notice::error(
                    "Profile error",
                    "Could not load your profile, please try again",
                )))
                .await;
            }
        }
    }

    /// Poll for the profile with bounded exponential backoff, giving the
    /// platform's asynchronous sign-up trigger time to land the row.
    async fn resolve_with_settle(&self, user_id: Uuid) -> Option<ProfileView> {
        let mut delay = self.settle.initial_delay;
        for attempt in 1..=self.settle.max_attempts {
            if let Some(view) = self.resolver.resolve(user_id).await {
                return Some(view);
            }
            if attempt < self.settle.max_attempts {
                sleep(delay).await;
                delay *= 2;
            }
        }
        None
    }

    /// A live sign-in with no profile row: a first-time external-identity
    /// sign-in. There is no signal distinguishing a company's first social
    /// login from a student's, so this defaults to student and the user
    /// corrects their profile afterwards.
    async fn provision_first_social_login(&self, session: &Session) {
        let user_id = session.user.id;
        let name = display_name(&session.user);
        info!(%user_id, name = %name, "No profile found, provisioning first-time sign-in as student");

        match self
            .provisioner
            .provision_student(NewStudent::placeholder(user_id, name))
            .await
        {
            Ok(_) => {
                let view = self.resolver.resolve(user_id).await;
                *self.profile.write().await = view;
                self.emit(Directive::Notify(Notice::info(
                    "Profile created",
                    "Please complete your profile details",
                )))
                .await;
                self.emit(Directive::Navigate(Route::StudentDashboard)).await;
            }
            Err(e) => {
                error!(%user_id, error = %e, "First-time provisioning failed");
                self.emit(Directive::Notify(Notice::error(
                    "Profile creation error",
                    e.to_string(),
                )))
                .await;
            }
        }
    }

    async fn emit(&self, directive: Directive) {
        // A closed receiver only means the host shell is gone.
        let _ = self.directives.send(directive).await;
    }
}

/// Derive a display name from session metadata: the full name if present,
/// else given name and username concatenated, else the local part of the
/// email, else "User".
pub fn display_name(user: &AuthUser) -> String {
    let meta = &user.user_metadata;

    if let Some(full_name) = meta.full_name.as_deref() {
        let full_name = full_name.trim();
        if !full_name.is_empty() {
            return full_name.to_string();
        }
    }

    let combined = format!(
        "{} {}",
        meta.name.as_deref().unwrap_or_default(),
        meta.preferred_username.as_deref().unwrap_or_default()
    );
    let combined = combined.trim();
    if !combined.is_empty() {
        return combined.to_string();
    }

    if let Some(local) = user.email.as_deref().and_then(|e| e.split('@').next()) {
        if !local.is_empty() {
            return local.to_string();
        }
    }

    "User".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::UserMetadata;
    use crate::directory::MemoryDirectory;
    use async_trait::async_trait;
    use secrecy::SecretString;
    use tokio::sync::Mutex;

    struct FakeSessions {
        session: Mutex<Option<Session>>,
        events: broadcast::Sender<AuthEvent>,
    }

    impl FakeSessions {
        fn new() -> Arc<Self> {
            let (events, _rx) = broadcast::channel(16);
            Arc::new(Self {
                session: Mutex::new(None),
                events,
            })
        }

        async fn set_session(&self, session: Session) {
            *self.session.lock().await = Some(session);
        }
    }

    #[async_trait]
    impl SessionStore for FakeSessions {
        async fn current_session(&self) -> Option<Session> {
            self.session.lock().await.clone()
        }

        fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
            self.events.subscribe()
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            *self.session.lock().await = None;
            let _ = self.events.send(AuthEvent::SignedOut);
            Ok(())
        }
    }

    fn session_for(user: AuthUser) -> Session {
        Session {
            access_token: SecretString::from("access"),
            refresh_token: SecretString::from("refresh"),
            expires_in: Some(3600),
            user,
        }
    }

    struct Harness {
        dir: Arc<MemoryDirectory>,
        sessions: Arc<FakeSessions>,
        orchestrator: AuthOrchestrator,
        rx: mpsc::Receiver<Directive>,
    }

    fn harness() -> Harness {
        let dir = Arc::new(MemoryDirectory::new());
        let sessions = FakeSessions::new();
        let (tx, rx) = mpsc::channel(16);
        let orchestrator = AuthOrchestrator::new(
            Arc::clone(&sessions) as Arc<dyn SessionStore>,
            Arc::clone(&dir) as Arc<dyn Directory>,
            ProvisionConfig::default(),
            SettleConfig::default(),
            tx,
        );
        Harness {
            dir,
            sessions,
            orchestrator,
            rx,
        }
    }

    #[tokio::test]
    async fn startup_hydrates_without_navigating() {
        let mut h = harness();
        let user_id = Uuid::new_v4();
        h.dir
            .insert_profile(user_id, ProfileKind::Student)
            .await
            .unwrap();
        h.sessions
            .set_session(session_for(AuthUser::minimal(user_id, "a@x.com")))
            .await;

        h.orchestrator.start().await;

        assert!(h.orchestrator.profile().await.is_some());
        assert!(h.orchestrator.session().await.is_some());
        assert!(h.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn startup_without_session_stays_empty() {
        let mut h = harness();
        h.orchestrator.start().await;
        assert!(h.orchestrator.profile().await.is_none());
        assert!(h.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn signed_in_student_routes_to_student_dashboard() {
        let mut h = harness();
        let user_id = Uuid::new_v4();
        h.dir
            .insert_profile(user_id, ProfileKind::Student)
            .await
            .unwrap();
        h.dir
            .insert_student(&NewStudent::new(user_id, "A B", "U", "CS"))
            .await
            .unwrap();

        let session = session_for(AuthUser::minimal(user_id, "a@x.com"));
        h.orchestrator
            .handle_event(AuthEvent::SignedIn(session))
            .await;

        match h.rx.try_recv().unwrap() {
            Directive::Navigate(route) => assert_eq!(route, Route::StudentDashboard),
            other => panic!("expected navigation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn signed_in_existing_company_skips_provisioning() {
        let mut h = harness();
        let user_id = Uuid::new_v4();
        h.dir
            .insert_profile(user_id, ProfileKind::Company)
            .await
            .unwrap();
        let baseline = h.dir.profile_insert_calls();

        let session = session_for(AuthUser::minimal(user_id, "hr@acme.com"));
        h.orchestrator
            .handle_event(AuthEvent::SignedIn(session))
            .await;

        assert_eq!(h.dir.profile_insert_calls(), baseline);
        match h.rx.try_recv().unwrap() {
            Directive::Navigate(route) => assert_eq!(route, Route::CompanyDashboard),
            other => panic!("expected navigation, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_social_login_provisions_student_with_derived_name() {
        let mut h = harness();
        let user_id = Uuid::new_v4();

        let session = session_for(AuthUser::minimal(user_id, "jdoe@example.com"));
        h.orchestrator
            .handle_event(AuthEvent::SignedIn(session))
            .await;

        let record = h.dir.student_record_for(user_id).await.unwrap();
        assert_eq!(record.full_name, "jdoe");
        assert_eq!(record.university, "Please update");
        assert_eq!(record.department, "Please update");

        match h.rx.try_recv().unwrap() {
            Directive::Notify(notice) => assert_eq!(notice.title, "Profile created"),
            other => panic!("expected notice, got {other:?}"),
        }
        match h.rx.try_recv().unwrap() {
            Directive::Navigate(route) => assert_eq!(route, Route::StudentDashboard),
            other => panic!("expected navigation, got {other:?}"),
        }

        let view = h.orchestrator.profile().await.unwrap();
        assert_eq!(view.kind(), ProfileKind::Student);
    }

    #[tokio::test(start_paused = true)]
    async fn unrecognized_profile_type_is_surfaced_not_overwritten() {
        let mut h = harness();
        let user_id = Uuid::new_v4();
        h.dir
            .insert_profile(user_id, ProfileKind::Unknown)
            .await
            .unwrap();

        let session = session_for(AuthUser::minimal(user_id, "odd@x.com"));
        h.orchestrator
            .handle_event(AuthEvent::SignedIn(session))
            .await;

        assert_eq!(h.dir.profile_rows_for(user_id).await, 1);
        match h.rx.try_recv().unwrap() {
            Directive::Notify(notice) => {
                assert_eq!(notice.level, crate::auth::directives::NoticeLevel::Error);
            }
            other => panic!("expected notice, got {other:?}"),
        }
        assert!(h.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn token_refresh_updates_session_only() {
        let mut h = harness();
        let user_id = Uuid::new_v4();

        let session = session_for(AuthUser::minimal(user_id, "a@x.com"));
        h.orchestrator
            .handle_event(AuthEvent::TokenRefreshed(session))
            .await;

        assert!(h.orchestrator.session().await.is_some());
        assert!(h.orchestrator.profile().await.is_none());
        assert!(h.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn signed_out_clears_state_and_returns_to_landing() {
        let mut h = harness();
        let user_id = Uuid::new_v4();
        h.dir
            .insert_profile(user_id, ProfileKind::Student)
            .await
            .unwrap();
        h.sessions
            .set_session(session_for(AuthUser::minimal(user_id, "a@x.com")))
            .await;
        h.orchestrator.start().await;

        h.orchestrator.handle_event(AuthEvent::SignedOut).await;

        assert!(h.orchestrator.session().await.is_none());
        assert!(h.orchestrator.profile().await.is_none());
        match h.rx.try_recv().unwrap() {
            Directive::Navigate(route) => assert_eq!(route, Route::Landing),
            other => panic!("expected navigation, got {other:?}"),
        }
    }

    // ── Display-name derivation ─────────────────────────────────────

    fn user_with_metadata(email: Option<&str>, metadata: UserMetadata) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: email.map(String::from),
            user_metadata: metadata,
            email_confirmed_at: None,
        }
    }

    #[test]
    fn full_name_wins() {
        let user = user_with_metadata(
            Some("jdoe@example.com"),
            UserMetadata {
                full_name: Some("Jane Doe".into()),
                name: Some("Jane".into()),
                preferred_username: Some("jdoe".into()),
            },
        );
        assert_eq!(display_name(&user), "Jane Doe");
    }

    #[test]
    fn name_and_username_concatenate() {
        let user = user_with_metadata(
            Some("jdoe@example.com"),
            UserMetadata {
                full_name: None,
                name: Some("Jane".into()),
                preferred_username: Some("jdoe".into()),
            },
        );
        assert_eq!(display_name(&user), "Jane jdoe");
    }

    #[test]
    fn bare_metadata_falls_back_to_email_local_part() {
        let user = user_with_metadata(Some("jdoe@example.com"), UserMetadata::default());
        assert_eq!(display_name(&user), "jdoe");
    }

    #[test]
    fn no_signal_at_all_falls_back_to_user() {
        let user = user_with_metadata(None, UserMetadata::default());
        assert_eq!(display_name(&user), "User");
    }
}
