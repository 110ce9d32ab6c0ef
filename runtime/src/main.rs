use std::{env, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use studygraph_runtime::{
    AppState,
    ai::{LlmProvider, LlmSettings, build_llm_client},
    config::load_config,
    pipeline::Coordinator,
    routes,
    services::{HttpExtractionService, HttpGraphStore},
    storage::{JsonSourceStore, JsonSourceStoreConfig, SourceStore},
};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(error = %err, "Runtime crashed");
        eprintln!("Runtime crashed: {err}");
    }
}

async fn run() -> Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = load_config()
        .await
        .context("Failed to load application configuration")?;
    let working_dir = PathBuf::from(&config.working_dir);
    let workspace = env::var("WORKSPACE")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    let store: Arc<dyn SourceStore> = Arc::new(JsonSourceStore::new(JsonSourceStoreConfig {
        working_dir: working_dir.clone(),
        namespace: "sources".into(),
        workspace,
    }));
    store.initialize().await?;

    let extraction = Arc::new(HttpExtractionService::new(
        &config.extraction.base_url,
        Duration::from_secs(config.extraction.timeout_secs),
    )?);
    let graph_api = Arc::new(HttpGraphStore::new(
        &config.graph_store.base_url,
        Duration::from_secs(config.graph_store.timeout_secs),
    )?);

    let provider = LlmProvider::parse(&config.llm.provider)?;
    let api_key = env::var(provider.api_key_var()).ok();
    if api_key.as_deref().map(str::trim).unwrap_or_default().is_empty() {
        // Not fatal: analysis degrades per record instead.
        warn!(
            var = provider.api_key_var(),
            "no API key configured; analysis artifacts will be degraded"
        );
    }
    let llm_settings = LlmSettings {
        provider,
        model: config.llm.model.clone(),
        api_key,
        max_output_tokens: config.llm.max_output_tokens,
        artifact_timeout: Duration::from_secs(config.llm.artifact_timeout_secs),
    };
    let llm = build_llm_client(&llm_settings);

    let coordinator = Arc::new(Coordinator::new(
        store.clone(),
        extraction,
        graph_api,
        llm,
        llm_settings,
        Duration::from_secs(config.extraction.timeout_secs),
        config.pipeline.kg_batch_size,
    ));

    let state = Arc::new(AppState {
        config: Arc::new(config.clone()),
        store: store.clone(),
        coordinator,
    });

    let addr_string = format!("{}:{}", config.server.host, config.server.port);
    let addr = addr_string
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid server address: {addr_string}"))?;
    info!(host = %config.server.host, port = config.server.port, "Loaded configuration");

    let app = Router::new()
        .route("/health", get(health))
        .merge(routes::source_routes())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener on {addr}"))?;
    info!(%addr, "Runtime server listening");

    let server_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Err(err) = store.finalize().await {
        warn!(error = %err, "Failed to finalize source store");
    }

    server_result.context("Server encountered a fatal error")?;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[inline]
async fn health() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                if stream.recv().await.is_some() {
                    info!("Received SIGTERM");
                }
            }
            Err(err) => warn!(error = %err, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received termination signal (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received termination signal (SIGTERM)");
        }
    }
}
