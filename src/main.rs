//! Lumos Access service entry point.

use std::error::Error;
use std::sync::Arc;

use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lumos_access::adapters::cloudpayments::{CloudPaymentsClient, WebhookVerifier};
use lumos_access::adapters::http::{build_app, PaymentsAppState};
use lumos_access::adapters::memory::InMemoryEntitlementStore;
use lumos_access::adapters::postgres::{self, PostgresEntitlementStore};
use lumos_access::adapters::telegram::{LogNotifier, TelegramNotifier};
use lumos_access::adapters::unisender::UniSenderClient;
use lumos_access::config::{AppConfig, StorageBackend};
use lumos_access::ports::{AdminNotifier, EntitlementStore, SystemClock};

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() {
    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("Error: invalid configuration: {e}");
        std::process::exit(1);
    }

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server terminated with error");
        std::process::exit(1);
    }
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone()));

    let registry = tracing_subscriber::registry().with(filter);
    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
}

async fn run(config: AppConfig) -> Result<(), BoxError> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        environment = ?config.server.environment,
        storage = ?config.storage.backend,
        "Starting Lumos Access"
    );

    let store: Arc<dyn EntitlementStore> = match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory entitlement store; records are lost on restart");
            Arc::new(InMemoryEntitlementStore::new(config.database.lock_timeout()))
        }
        StorageBackend::Postgres => {
            let pool = postgres::connect_lazy(&config.database)?;
            if config.database.run_migrations {
                postgres::run_migrations(&pool).await?;
                info!("Database migrations applied");
            }
            Arc::new(PostgresEntitlementStore::new(
                pool,
                config.database.lock_timeout(),
            ))
        }
    };

    let notifier: Arc<dyn AdminNotifier> = match config.telegram.credentials() {
        Some((token, chat_id)) => Arc::new(
            TelegramNotifier::new(token, chat_id)
                .with_base_url(config.telegram.api_base_url.clone())
                .with_timeout(config.telegram.request_timeout()),
        ),
        None => {
            info!("Telegram not configured; admin notices go to the log");
            Arc::new(LogNotifier)
        }
    };

    let webhook_verifier = if config.cloudpayments.verify_hmac {
        Some(WebhookVerifier::new(config.cloudpayments.api_secret.clone()))
    } else {
        tracing::warn!("CloudPayments webhook signature verification is disabled");
        None
    };

    let state = PaymentsAppState {
        store,
        subscription_provider: Arc::new(CloudPaymentsClient::from_config(&config.cloudpayments)),
        mailing_list: Arc::new(UniSenderClient::from_config(&config.unisender)),
        notifier,
        clock: Arc::new(SystemClock),
        campaigns: config.unisender.campaigns(),
        webhooks: config.webhooks.clone(),
        webhook_verifier,
        default_trial_days: config.entitlement.default_trial_days,
    };

    let app = build_app(state, &config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
