use std::sync::Arc;

use anyhow::Context;

use drukcare::catalog::Catalog;
use drukcare::config::EngineConfig;
use drukcare::crisis::CrisisScreen;
use drukcare::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = EngineConfig::from_env();

    // Load and validate the questionnaire catalog up front; a malformed
    // definition must never survive to the first scoring event.
    let catalog = Catalog::load(config.catalog_path.as_deref())
        .context("failed to load questionnaire catalog")?;
    for definition in catalog.iter() {
        tracing::info!(
            id = %definition.id,
            name = %definition.display_name,
            questions = definition.questions.len(),
            "Questionnaire loaded"
        );
    }

    let state = AppState {
        catalog: Arc::new(catalog),
        crisis: Arc::new(CrisisScreen::default_rules()),
    };
    let app = server::routes(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "DrukCare engine listening");
    axum::serve(listener, app).await?;

    Ok(())
}
