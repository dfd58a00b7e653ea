use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use internlink::auth::{AuthOrchestrator, Directive, NoticeLevel};
use internlink::backend::{Backend, OAuthProvider, SessionStore, SignUpResult};
use internlink::config::{BackendConfig, ProvisionConfig, SettleConfig};
use internlink::directory::{Directory, RemoteDirectory};
use internlink::profile::{NewCompany, NewStudent, RoleProvisioner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BackendConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export INTERNLINK_BACKEND_URL=https://project.example.co");
        eprintln!("  export INTERNLINK_ANON_KEY=...");
        std::process::exit(1);
    });

    eprintln!("internlink v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", config.base_url);
    eprintln!("   Type 'help' for commands. 'quit' to exit.\n");

    let backend = Backend::connect(&config);
    let dir: Arc<dyn Directory> = Arc::new(RemoteDirectory::new(backend.tables.clone()));
    let auth = Arc::clone(&backend.auth);

    let (directive_tx, mut directive_rx) = mpsc::channel::<Directive>(64);

    let orchestrator = Arc::new(AuthOrchestrator::new(
        Arc::clone(&backend.auth) as Arc<dyn SessionStore>,
        Arc::clone(&dir),
        ProvisionConfig::default(),
        SettleConfig::default(),
        directive_tx,
    ));

    // Directive consumer: the CLI is the "shell" that navigation and
    // notices are addressed to.
    tokio::spawn(async move {
        while let Some(directive) = directive_rx.recv().await {
            match directive {
                Directive::Navigate(route) => eprintln!("→ {}", route.as_path()),
                Directive::Notify(notice) => match notice.level {
                    NoticeLevel::Info => eprintln!("ℹ️  {}: {}", notice.title, notice.body),
                    NoticeLevel::Error => eprintln!("❌ {}: {}", notice.title, notice.body),
                },
            }
            eprint!("> ");
        }
    });

    // Event loop lives for the whole process.
    {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.run().await });
    }

    let provisioner = RoleProvisioner::new(Arc::clone(&dir), ProvisionConfig::default());

    let stdin = tokio::io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    eprint!("> ");
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match command {
            "help" => {
                eprintln!("  register-student <email> <password> <full name…>");
                eprintln!("  register-company <email> <password> <company name…>");
                eprintln!("  login <email> <password>");
                eprintln!("  oauth <github|linkedin>");
                eprintln!("  recover <email>");
                eprintln!("  refresh");
                eprintln!("  whoami");
                eprintln!("  logout");
                eprintln!("  quit");
            }
            "register-student" => match args.as_slice() {
                [email, password, name @ ..] if !name.is_empty() => {
                    match auth.sign_up(email, password).await {
                        Ok(SignUpResult::SignedIn(session)) => {
                            let input = NewStudent::new(
                                session.user.id,
                                name.join(" "),
                                "Please update",
                                "Please update",
                            );
                            match provisioner.provision_student(input).await {
                                Ok(id) => eprintln!("Student profile created: {id}"),
                                Err(e) => eprintln!("❌ {e}"),
                            }
                        }
                        Ok(SignUpResult::ConfirmationRequired(user)) => {
                            eprintln!(
                                "Account created for {}; confirm your email, then log in",
                                user.email.unwrap_or_default()
                            );
                        }
                        Err(e) => eprintln!("❌ {e}"),
                    }
                }
                _ => eprintln!("usage: register-student <email> <password> <full name…>"),
            },
            "register-company" => match args.as_slice() {
                [email, password, name @ ..] if !name.is_empty() => {
                    match auth.sign_up(email, password).await {
                        Ok(SignUpResult::SignedIn(session)) => {
                            let input = NewCompany::new(session.user.id, name.join(" "));
                            match provisioner.provision_company(input).await {
                                Ok(id) => eprintln!("Company profile created: {id}"),
                                Err(e) => eprintln!("❌ {e}"),
                            }
                        }
                        Ok(SignUpResult::ConfirmationRequired(user)) => {
                            eprintln!(
                                "Account created for {}; confirm your email, then log in",
                                user.email.unwrap_or_default()
                            );
                        }
                        Err(e) => eprintln!("❌ {e}"),
                    }
                }
                _ => eprintln!("usage: register-company <email> <password> <company name…>"),
            },
            "login" => match args.as_slice() {
                [email, password] => match auth.sign_in_with_password(email, password).await {
                    Ok(session) => eprintln!("Signed in as {}", session.user.id),
                    Err(e) => eprintln!("❌ {e}"),
                },
                _ => eprintln!("usage: login <email> <password>"),
            },
            "oauth" => match args.as_slice() {
                ["github"] => print_authorize_url(&auth, OAuthProvider::Github),
                ["linkedin"] => print_authorize_url(&auth, OAuthProvider::LinkedIn),
                _ => eprintln!("usage: oauth <github|linkedin>"),
            },
            "recover" => match args.as_slice() {
                [email] => match auth.request_password_recovery(email).await {
                    Ok(()) => eprintln!("Password recovery email sent"),
                    Err(e) => eprintln!("❌ {e}"),
                },
                _ => eprintln!("usage: recover <email>"),
            },
            "refresh" => match auth.refresh().await {
                Ok(_) => eprintln!("Session refreshed"),
                Err(e) => eprintln!("❌ {e}"),
            },
            "whoami" => {
                match orchestrator.session().await {
                    Some(session) => eprintln!(
                        "user {} <{}>",
                        session.user.id,
                        session.user.email.unwrap_or_default()
                    ),
                    None => eprintln!("not signed in"),
                }
                match orchestrator.profile().await {
                    Some(view) => eprintln!("profile: {:?}", view),
                    None => eprintln!("profile: none"),
                }
            }
            "logout" => {
                if let Err(e) = orchestrator.sign_out().await {
                    eprintln!("❌ {e}");
                }
            }
            "quit" | "exit" => break,
            other => eprintln!("unknown command: {other} (try 'help')"),
        }
        eprint!("> ");
    }

    Ok(())
}

fn print_authorize_url(auth: &internlink::backend::AuthClient, provider: OAuthProvider) {
    match auth.authorize_url(provider, "http://localhost:3000/auth/callback") {
        Ok(url) => eprintln!("Open in a browser: {url}"),
        Err(e) => eprintln!("❌ {e}"),
    }
}
