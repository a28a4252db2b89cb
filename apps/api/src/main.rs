mod config;
mod errors;
mod llm_client;
mod parser;
mod routes;
mod state;
mod summary;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, ParserBackend};
use crate::llm_client::LlmClient;
use crate::parser::{DocumentParser, LlamaParseClient, LocalPdfParser, ParserSettings};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Summarizer API v{}", env!("CARGO_PKG_VERSION"));

    let upstream_timeout = Duration::from_secs(config.upstream_timeout_secs);

    // Initialize document parser
    let parser = build_parser(&config, upstream_timeout)?;
    info!("Document parser initialized (backend: {})", config.parser_backend.as_str());

    // Initialize LLM client
    let llm = LlmClient::new(
        config.groq_api_key.clone(),
        config.groq_base_url.clone(),
        upstream_timeout,
    )
    .context("Failed to build completion client")?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let state = AppState {
        parser,
        llm: Arc::new(llm),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs the parser selected by `PARSER_BACKEND`.
fn build_parser(config: &Config, request_timeout: Duration) -> Result<Arc<dyn DocumentParser>> {
    let settings = ParserSettings::default();

    match config.parser_backend {
        ParserBackend::LlamaParse => {
            let api_key = config
                .llama_cloud_api_key
                .clone()
                .context("LLAMA_CLOUD_API_KEY is required for the llama_parse backend")?;
            let client = LlamaParseClient::new(
                api_key,
                config.llama_parse_base_url.clone(),
                settings,
                request_timeout,
                Duration::from_millis(config.parse_poll_interval_ms),
                Duration::from_secs(config.parse_max_wait_secs),
            )
            .context("Failed to build LlamaParse client")?;
            Ok(Arc::new(client))
        }
        ParserBackend::Local => Ok(Arc::new(LocalPdfParser::new(settings))),
    }
}
