//! appliance-assistant server entry point.
//!
//! Startup order:
//! 1. Load `.env` (if present) and read configuration from the environment.
//! 2. Initialise tracing (JSON or human-readable).
//! 3. Build the LLM service and token verifier.
//! 4. Serve the router until SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use appliance_assistant::auth::IdentityToolkitVerifier;
use appliance_assistant::config::Config;
use appliance_assistant::server::{self, AppState};
use appliance_assistant::{GeminiFactory, LlmService};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cfg = Config::from_env();

    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: LOG_LEVEL='{}' is not a valid tracing filter ({}); falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);
    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), model = %cfg.llm.model, "appliance-assistant starting");
    if cfg.llm.api_key.is_none() {
        warn!("GOOGLE_API_KEY is not set; chat requests will fail");
    }

    let client = reqwest::Client::builder().build()?;
    let state = AppState {
        llm: LlmService::new(Arc::new(GeminiFactory::new(
            cfg.llm.clone(),
            client.clone(),
        ))),
        verifier: Arc::new(IdentityToolkitVerifier::new(&cfg.identity, client)),
    };

    let app = server::build(state, cfg.cors_origins.as_deref());
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("appliance-assistant stopped");
    Ok(())
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
