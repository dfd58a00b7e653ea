//! Integration tests for the auth/provisioning lifecycle.
//!
//! Each test wires a full orchestrator over the in-memory directory and a
//! stub session store, then drives the public event surface: registration,
//! reload, first social login, and the partial-provisioning repair path.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::{Mutex, broadcast, mpsc};
use uuid::Uuid;

use internlink::auth::{AuthOrchestrator, Directive, Route};
use internlink::backend::types::{AuthEvent, AuthUser, Session};
use internlink::backend::SessionStore;
use internlink::config::{ProvisionConfig, SettleConfig};
use internlink::directory::{Directory, MemoryDirectory};
use internlink::error::{AuthError, ProvisionError};
use internlink::profile::{
    NewCompany, NewStudent, ProfileKind, ProfileResolver, ProfileView, RoleProvisioner,
};

/// Stub session store for integration tests (no real auth service).
struct StubSessions {
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl StubSessions {
    fn new() -> Arc<Self> {
        let (events, _rx) = broadcast::channel(16);
        Arc::new(Self {
            session: Mutex::new(None),
            events,
        })
    }
}

#[async_trait]
impl SessionStore for StubSessions {
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

fn session_for(user_id: Uuid, email: &str) -> Session {
    Session {
        access_token: SecretString::from("access"),
        refresh_token: SecretString::from("refresh"),
        expires_in: Some(3600),
        user: AuthUser::minimal(user_id, email),
    }
}

fn orchestrator_over(
    dir: Arc<MemoryDirectory>,
    sessions: Arc<StubSessions>,
) -> (AuthOrchestrator, mpsc::Receiver<Directive>) {
    let (tx, rx) = mpsc::channel(16);
    let orchestrator = AuthOrchestrator::new(
        sessions as Arc<dyn SessionStore>,
        dir as Arc<dyn Directory>,
        ProvisionConfig::default(),
        SettleConfig::default(),
        tx,
    );
    (orchestrator, rx)
}

#[tokio::test(start_paused = true)]
async fn registration_then_reload_resolves_the_same_identity() {
    let dir = Arc::new(MemoryDirectory::new());
    let user_id = Uuid::new_v4();

    // Registration: explicit provisioning, as the sign-up form drives it.
    let provisioner = RoleProvisioner::new(
        Arc::clone(&dir) as Arc<dyn Directory>,
        ProvisionConfig::default(),
    );
    let mut input = NewStudent::new(user_id, "A B", "U", "CS");
    input.skills = vec!["rust".into()];
    let student_id = provisioner.provision_student(input).await.unwrap();

    // Reload: startup hydration resolves the same identity, no navigation.
    let sessions = StubSessions::new();
    *sessions.session.lock().await = Some(session_for(user_id, "a@x.com"));
    let (orchestrator, mut rx) = orchestrator_over(Arc::clone(&dir), sessions);

    orchestrator.start().await;

    assert_eq!(
        orchestrator.profile().await,
        Some(ProfileView::Student {
            profile_id: dir.profile_by_user(user_id).await.unwrap().unwrap().id,
            student_id: Some(student_id),
        })
    );
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn first_social_login_provisions_and_lands_on_student_dashboard() {
    let dir = Arc::new(MemoryDirectory::new());
    let sessions = StubSessions::new();
    let (orchestrator, mut rx) = orchestrator_over(Arc::clone(&dir), Arc::clone(&sessions));
    let user_id = Uuid::new_v4();

    orchestrator
        .handle_event(AuthEvent::SignedIn(session_for(user_id, "jdoe@example.com")))
        .await;

    let record = dir.student_record_for(user_id).await.unwrap();
    assert_eq!(record.full_name, "jdoe");
    assert_eq!(record.university, "Please update");
    assert_eq!(dir.profile_rows_for(user_id).await, 1);

    let mut saw_student_dashboard = false;
    while let Ok(directive) = rx.try_recv() {
        if let Directive::Navigate(route) = directive {
            saw_student_dashboard = route == Route::StudentDashboard;
        }
    }
    assert!(saw_student_dashboard);
}

#[tokio::test(start_paused = true)]
async fn repeated_social_login_is_idempotent() {
    let dir = Arc::new(MemoryDirectory::new());
    let sessions = StubSessions::new();
    let (orchestrator, mut rx) = orchestrator_over(Arc::clone(&dir), Arc::clone(&sessions));
    let user_id = Uuid::new_v4();
    let session = session_for(user_id, "jdoe@example.com");

    orchestrator
        .handle_event(AuthEvent::SignedIn(session.clone()))
        .await;
    orchestrator
        .handle_event(AuthEvent::SignedIn(session))
        .await;

    assert_eq!(dir.profile_rows_for(user_id).await, 1);

    // The second sign-in resolves the existing profile and just navigates.
    let mut navigations = 0;
    while let Ok(directive) = rx.try_recv() {
        if matches!(directive, Directive::Navigate(Route::StudentDashboard)) {
            navigations += 1;
        }
    }
    assert_eq!(navigations, 2);
}

#[tokio::test(start_paused = true)]
async fn existing_company_social_login_skips_provisioning() {
    let dir = Arc::new(MemoryDirectory::new());
    let user_id = Uuid::new_v4();
    dir.insert_profile(user_id, ProfileKind::Company)
        .await
        .unwrap();
    dir.insert_company(&NewCompany::new(user_id, "Acme"))
        .await
        .unwrap();
    let baseline = dir.profile_insert_calls();

    let sessions = StubSessions::new();
    let (orchestrator, mut rx) = orchestrator_over(Arc::clone(&dir), sessions);

    orchestrator
        .handle_event(AuthEvent::SignedIn(session_for(user_id, "hr@acme.com")))
        .await;

    assert_eq!(dir.profile_insert_calls(), baseline);
    match rx.try_recv().unwrap() {
        Directive::Navigate(route) => assert_eq!(route, Route::CompanyDashboard),
        other => panic!("expected navigation, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn partial_provisioning_surfaces_then_tolerates_on_next_sign_in() {
    let dir = Arc::new(MemoryDirectory::new());
    let user_id = Uuid::new_v4();

    // Role-record insert fails after the profile row landed.
    dir.fail_role_inserts(1);
    let provisioner = RoleProvisioner::new(
        Arc::clone(&dir) as Arc<dyn Directory>,
        ProvisionConfig::default(),
    );
    let err = provisioner
        .provision_student(NewStudent::new(user_id, "A B", "U", "CS"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProvisionError::RoleRecordCreationFailed { .. }
    ));
    assert_eq!(dir.profile_rows_for(user_id).await, 1);

    // Signing in again still resolves: the dangling profile routes, with
    // the missing record flagged for repair rather than hidden.
    let resolver = ProfileResolver::new(Arc::clone(&dir) as Arc<dyn Directory>);
    let view = resolver.resolve(user_id).await.unwrap();
    assert_eq!(
        view,
        ProfileView::Student {
            profile_id: dir.profile_by_user(user_id).await.unwrap().unwrap().id,
            student_id: None,
        }
    );

    let sessions = StubSessions::new();
    let (orchestrator, mut rx) = orchestrator_over(Arc::clone(&dir), sessions);
    orchestrator
        .handle_event(AuthEvent::SignedIn(session_for(user_id, "a@x.com")))
        .await;
    match rx.try_recv().unwrap() {
        Directive::Navigate(route) => assert_eq!(route, Route::StudentDashboard),
        other => panic!("expected navigation, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn sign_out_round_trip_through_the_event_stream() {
    let dir = Arc::new(MemoryDirectory::new());
    let user_id = Uuid::new_v4();
    dir.insert_profile(user_id, ProfileKind::Student)
        .await
        .unwrap();

    let sessions = StubSessions::new();
    *sessions.session.lock().await = Some(session_for(user_id, "a@x.com"));
    let (orchestrator, mut rx) = orchestrator_over(Arc::clone(&dir), Arc::clone(&sessions));

    orchestrator.start().await;
    assert!(orchestrator.profile().await.is_some());

    orchestrator.sign_out().await.unwrap();
    // The store's SignedOut event is what tears the cache down.
    orchestrator.handle_event(AuthEvent::SignedOut).await;

    assert!(orchestrator.session().await.is_none());
    assert!(orchestrator.profile().await.is_none());

    let mut saw_landing = false;
    while let Ok(directive) = rx.try_recv() {
        if matches!(directive, Directive::Navigate(Route::Landing)) {
            saw_landing = true;
        }
    }
    assert!(saw_landing);
}
