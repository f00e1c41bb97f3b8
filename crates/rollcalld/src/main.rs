use std::sync::Arc;

use anyhow::{Context, Result};
use rollcall_core::Gallery;
use rollcall_store::Store;
use rollcalld::{enroll, session, CommandOracle, Config, Pipeline};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("rollcalld starting");

    let config = Config::from_env();
    let oracle_cmd = config
        .oracle_cmd
        .clone()
        .context("ROLLCALL_ORACLE_CMD must point at a face oracle helper")?;
    let oracle: Arc<CommandOracle> = Arc::new(CommandOracle::new(oracle_cmd));

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let store = Store::open(&config.db_path)
        .await
        .with_context(|| format!("opening database {}", config.db_path.display()))?;
    tracing::info!(db = %config.db_path.display(), "attendance store opened");

    let gallery = Arc::new(Gallery::new());
    {
        let gallery = Arc::clone(&gallery);
        let oracle = Arc::clone(&oracle);
        let faces_dir = config.faces_dir.clone();
        tokio::task::spawn_blocking(move || {
            enroll::load_gallery(&faces_dir, oracle.as_ref(), &gallery)
        })
        .await
        .context("gallery load task failed")?;
    }
    tracing::info!(enrolled = gallery.len(), "gallery ready");

    let pipeline = Pipeline::new(
        gallery,
        store,
        oracle,
        config.match_threshold,
        config.frame_scale,
    );

    tracing::info!(
        threshold = config.match_threshold,
        scale = config.frame_scale,
        "rollcalld ready, serving frames on stdio"
    );

    tokio::select! {
        result = session::run_stdio_session(pipeline) => {
            result.context("stdio session failed")?;
            tracing::info!("input closed");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received");
        }
    }

    tracing::info!("rollcalld shutting down");
    Ok(())
}
