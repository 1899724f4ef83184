use netlog_api::app;
use netlog_api::state::AppState;
use netlog_core::Settings;
use netlog_llm::Analyzer;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netlog_api=info,netlog_llm=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Startup never exits on configuration errors: the page shows them instead.
async fn build_state() -> AppState {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Settings rejected, serving halted page");
            return AppState::halted(Settings::default(), e.to_string());
        }
    };

    info!(
        preferred = %settings.model.preferred,
        max_log_chars = settings.ingest.max_log_chars,
        "Connecting to Gemini..."
    );
    match Analyzer::connect(&settings).await {
        Ok(analyzer) => {
            info!(
                model = %analyzer.model().name,
                streaming = analyzer.model().supports_streaming,
                "Analyzer ready!"
            );
            AppState::ready(settings, analyzer)
        }
        Err(e) => {
            error!(error = %e, "Analyzer unavailable, serving halted page");
            AppState::halted(settings, e.to_string())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    init_logging();

    let state = Arc::new(build_state().await);
    let bind_addr = state.settings.bind_addr.clone();
    if matches!(state.readiness, netlog_api::state::Readiness::Halted(_)) {
        warn!("Analysis disabled until the configuration is fixed");
    }

    // Server start
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server running on http://{}", bind_addr);
    axum::serve(listener, app(state)).await?;

    Ok(())
}
