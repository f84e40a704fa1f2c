//! Application entry point and server initialization
//!
//! Loads the environment configuration, opens the embedded database, builds
//! the shared services and serves the router until a shutdown signal.

use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use dotenvy::dotenv;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use template_manager::auth::AuthEvent;
use template_manager::config::Config;
use template_manager::database::{init_db, AppState};
use template_manager::route::create_app;

/// Application entry point
///
/// 1. Loads environment variables from `.env`
/// 2. Reads [`Config`]
/// 3. Initializes the embedded database and the application state
/// 4. Logs auth events in the background
/// 5. Starts the HTTP server with graceful shutdown handling
#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("template_manager=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env();
    let port = config.port;
    let db_name = config.database_url.clone();

    let db = init_db(&db_name).expect("Failed to initialize database");
    let state = AppState::new(db, config).expect("Failed to load application state");

    let mut events = state.auth.subscribe();
    tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Auth event log fell behind");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            match event {
                AuthEvent::SignedUp(user) => tracing::info!(email = %user.email, "User signed up"),
                AuthEvent::SignedIn(user) => tracing::info!(email = %user.email, "User signed in"),
                AuthEvent::SignedOut(user) => tracing::info!(email = %user.email, "User signed out"),
                AuthEvent::PasswordResetRequested { email } => {
                    tracing::info!(%email, "Password reset requested")
                }
            }
        }
    });

    let app = create_app(state).layer(TraceLayer::new_for_http());

    // Bind to all network interfaces on the specified port
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind address");

    tracing::info!("Server running at http://localhost:{}", port);
    tracing::info!("Using database: {}", db_name);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Returns when SIGINT (Ctrl+C) or, on Unix, SIGTERM is received.
///
/// Open connections are allowed to complete and pending redb write
/// transactions are committed or dropped before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    // On non-Unix systems (Windows), only handle Ctrl+C
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping server.");
}
