use anyhow::Context;

use citypop::api::{self, AppState};
use citypop::config::ServerConfig;
use citypop::io::population::load_dataset_csv;
use citypop::logging;
use citypop::model::growth::GrowthModel;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging()?;

    let cfg = ServerConfig::from_env();

    // A bad dataset is fatal: never start serving without it.
    let dataset = load_dataset_csv(&cfg.data_path)
        .with_context(|| format!("failed to load dataset {}", cfg.data_path.display()))?;

    let state = AppState::new(dataset, GrowthModel::default(), cfg.static_dir.clone());
    let app = api::router(state);

    let addr = cfg.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind failed on {addr}"))?;
    tracing::info!("[citypop-api] listening on http://{}", addr);

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}
