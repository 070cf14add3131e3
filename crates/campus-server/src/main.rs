mod config;

use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use campus_api::mail::{LogMailer, Mailer, SmtpMailer};
use campus_api::password::hash_password;
use campus_api::{AppState, AppStateInner};
use campus_db::{Database, MemoryStore, NewUser, Store};

use crate::config::{AdminSeed, Config, StorageKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Storage backend is chosen once, here.
    let store: Arc<dyn Store> = match &config.storage {
        StorageKind::Memory => {
            info!("Using in-memory storage; submissions are lost on restart");
            Arc::new(MemoryStore::new())
        }
        StorageKind::Sqlite(path) => Arc::new(Database::open(path)?),
    };

    seed_admin(store.as_ref(), &config.admin)?;

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            info!("Sending email through {}:{}", smtp.host, smtp.port);
            Arc::new(SmtpMailer::new(smtp)?)
        }
        None => {
            warn!("CAMPUS_SMTP_HOST not set; reset emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let state: AppState = Arc::new(AppStateInner::new(
        store,
        mailer,
        config.jwt_secret.clone(),
        config.base_url.clone(),
    ));

    let mut app = campus_api::router(state);
    if let Some(dir) = &config.static_dir {
        info!("Serving static client from {}", dir.display());
        app = app.fallback_service(
            ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html"))),
        );
    }

    let app = app
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = bind(&config.host, config.port).await?;
    info!("Campus server listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Creates the admin account on first start. An existing account keeps its
/// current password, so a reset survives restarts of the durable store.
fn seed_admin(store: &dyn Store, admin: &AdminSeed) -> anyhow::Result<()> {
    if store.get_user_by_username(&admin.username)?.is_some() {
        info!("Admin account '{}' already present", admin.username);
        return Ok(());
    }

    let user = store.ensure_user(NewUser {
        username: admin.username.clone(),
        password_hash: hash_password(&admin.password)?,
        email: admin.email.clone(),
    })?;
    if user.email.is_none() {
        warn!("CAMPUS_ADMIN_EMAIL not set; password reset cannot reach the admin");
    }
    info!(user_id = user.id, "Seeded admin account '{}'", user.username);
    Ok(())
}

/// Accepts host names as well as literal addresses.
async fn bind(host: &str, port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind((host, port)).await
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => tokio::select! {
                _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            },
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
