use anyhow::{Context, Result};
use apiscope::{
    config::AppConfig,
    routes,
    services::{
        generator_client::GeneratorClient,
        kv_store::{KeyValueStore, MemoryStore, RedisStore},
    },
    state::AppState,
};
use axum::Router;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;
    tracing::info!("Starting apiscope with config: {:?}", cfg);

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Record store ---
    let store: Arc<dyn KeyValueStore> = if cfg.memory_store {
        tracing::warn!("Using in-memory record store; documents are lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        let redis = RedisStore::open(&cfg.redis_url)
            .with_context(|| format!("opening redis at {}", cfg.redis_url))?;
        redis
            .ping()
            .await
            .with_context(|| format!("connecting to redis at {}", cfg.redis_url))?;
        tracing::info!("Connected to redis at {}", cfg.redis_url);
        Arc::new(redis)
    };

    // --- Generator client ---
    let generator = GeneratorClient::new(cfg.generator_server.clone(), cfg.generator_enabled)?;
    if generator.is_enabled() {
        tracing::info!("SDK generator enabled at {}", cfg.generator_server);
    }

    // --- Build router ---
    let app: Router = routes::routes::routes(&cfg).with_state(AppState::new(
        cfg.clone(),
        store,
        generator,
    ));

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
