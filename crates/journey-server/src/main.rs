mod config;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use journey_core::{JourneyStore, LoadOutcome};
use journey_narrate::{LlmGenerator, Narrator};

use crate::config::Config;
use crate::routes::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config();
    init_logging(&config);

    let addr: SocketAddr = config.addr.parse().inspect_err(|err| {
        error!(event = "invalid_addr", error = %err, addr = %config.addr);
    })?;

    let (store, outcome) = JourneyStore::load(&config.data);
    if let LoadOutcome::Failed { cause } = &outcome {
        warn!(event = "serving_empty_journey", cause = %cause);
    }
    let store = Arc::new(store);

    let settings = journey_core::read_settings();
    if !journey_core::ai_configured(&settings) {
        warn!(
            event = "ai_not_configured",
            provider = %settings.provider,
            "generation endpoints will return fallback content"
        );
    }
    let generator = LlmGenerator::new(settings);
    let timeout = generator.timeout();
    let narrator = Narrator::new(store.clone(), Arc::new(generator)).with_timeout(timeout);

    let app = build_router(Arc::new(AppState { store, narrator }), &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(addr).await.inspect_err(|err| {
        error!(event = "bind_failed", error = %err, addr = %addr);
    })?;
    info!(event = "server_start", addr = %addr, data = %config.data.display());

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!(event = "server_shutdown");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

fn init_logging(config: &Config) {
    let level = if config.debug {
        "debug".to_string()
    } else if let Ok(level) = std::env::var("JOURNEY_LOG_LEVEL") {
        level
    } else {
        "info".to_string()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("logging already initialised");
    }
}
