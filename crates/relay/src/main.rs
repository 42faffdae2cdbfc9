//! Charity Yeti relay - donation payments and mention replies.
//!
//! # Architecture
//!
//! - Axum HTTP server relaying payment authorizations to the payment
//!   middleware and recording donations in `PostgreSQL`
//! - Optional mention listener on the Twitter filtered stream, started when
//!   Twitter credentials are configured
//!
//! # Security
//!
//! The relay never sees card data or processor credentials. It only holds
//! tokenized payment data for the duration of a request.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use charity_yeti_relay::config::RelayConfig;
use charity_yeti_relay::payments::MiddlewareClient;
use charity_yeti_relay::responder::{MentionResponder, ReconnectBackoff, listen_for_mentions};
use charity_yeti_relay::routes;
use charity_yeti_relay::social::TwitterClient;
use charity_yeti_relay::state::AppState;
use charity_yeti_relay::store::{PgDonationStore, create_pool};
use sentry::integrations::tracing as sentry_tracing;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &RelayConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration is needed before Sentry and tracing
    let config = RelayConfig::from_env()?;

    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "charity_yeti_relay=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p charity-yeti-cli -- migrate

    let middleware = MiddlewareClient::new(&config.middleware)?;
    let store = Arc::new(PgDonationStore::new(pool));
    let state = AppState::new(middleware, store, config.honorary.clone());

    let listener_task = start_mention_listener(&config);

    let app = routes::app(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("relay listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = listener_task {
        task.abort();
        tracing::info!("Mention listener stopped");
    }

    Ok(())
}

/// Spawn the mention listener, if configured.
///
/// The stream is opened inside the task and reopened with backoff whenever
/// it drops, so the payment relay never waits on Twitter.
fn start_mention_listener(config: &RelayConfig) -> Option<JoinHandle<()>> {
    let Some(twitter) = &config.twitter else {
        tracing::info!("Twitter credentials not configured, mention listener disabled");
        return None;
    };

    let client = match TwitterClient::new(twitter) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create Twitter client");
            return None;
        }
    };

    let responder = MentionResponder::new(Arc::new(client.clone()), config.responder.clone());
    let connect = move || {
        let client = client.clone();
        async move { client.mention_stream().await }
    };

    Some(tokio::spawn(listen_for_mentions(
        responder,
        connect,
        ReconnectBackoff::default(),
    )))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
