use database::Database;
use llm_interface::LlmClient;
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod error;
mod handlers;
mod middleware;
mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("replyflow=info,pipeline=info,platform_client=info,database=info")
        }))
        .init();

    tracing::info!("Starting Replyflow - social reply automation service");

    let database_url = env::var("REPLYFLOW_DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://replyflow.db".to_string());
    let host = env::var("REPLYFLOW_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = env::var("REPLYFLOW_PORT").unwrap_or_else(|_| "8080".to_string());
    let internal_secret = env::var("REPLYFLOW_INTERNAL_SECRET").map_err(|_| {
        anyhow::anyhow!("REPLYFLOW_INTERNAL_SECRET must be set; the scheduler presents it on every run trigger")
    })?;

    let db = Database::connect(&database_url).await?;
    db.run_migrations().await?;
    tracing::info!("Connected to {}", database_url);

    // A non-default base points generation at any OpenAI-compatible host.
    let llm = match env::var("REPLYFLOW_LLM_API_BASE") {
        Ok(base) => LlmClient::with_api_base(&base),
        Err(_) => LlmClient::new(),
    };

    let state = Arc::new(AppState {
        db,
        llm,
        internal_secret,
    });
    let app = routes::create_router(state);

    let bind_addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
