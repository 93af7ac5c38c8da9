use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use research_api_server::config::Settings;
use research_api_server::services::history::HistoryLimits;
use research_api_server::services::safety::{GuardScannerClient, OpenAiModerationClient};
use research_api_server::services::{
    GoogleSearchService, HistoryStore, ResearchAgent, SafetyGate, StreamOrchestrator, ToolBridge,
};
use research_api_server::{build_router, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::load()?;

    // Initialize logging
    logging::init(&settings.logging)?;

    info!("🚀 Starting Research API Server...");
    info!("✅ Configuration loaded");

    if settings.llm.api_key.is_empty() {
        warn!("llm.api_key is empty; chat completions will be rejected upstream");
    }
    if settings.search.api_key.is_empty() || settings.search.engine_id.is_empty() {
        warn!("search.api_key or search.engine_id is empty; web searches will fail");
    }

    // Safety classifiers
    let scanner = Arc::new(GuardScannerClient::new(&settings.safety)?);
    let moderation = Arc::new(OpenAiModerationClient::new(&settings.safety)?);
    let safety = Arc::new(SafetyGate::new(scanner.clone(), moderation, scanner));
    info!("✅ Safety gate ready (scanner: {})", settings.safety.scanner_base_url);

    // Search tool + research agent
    let search = Arc::new(GoogleSearchService::new(settings.search.clone())?);
    let tools = Arc::new(ToolBridge::new(search, &settings.search));
    let agent = Arc::new(ResearchAgent::new(
        settings.llm.clone(),
        tools,
        settings.search.max_search_depth,
    )?);
    info!("✅ Research agent ready (model: {})", settings.llm.model);

    // Session history
    let history = Arc::new(HistoryStore::new(HistoryLimits::from(&settings.session)));

    let orchestrator = Arc::new(StreamOrchestrator::new(history, safety, agent));
    let app = build_router(orchestrator);

    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
