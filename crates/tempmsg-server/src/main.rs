#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use core::time::Duration;
use server::config::{BackendKind, CliArgs, ServerConfig};
use server::handler::{AppState, router};
use server::telemetry::init_telemetry;
use std::sync::Arc;
use tempmsg_core::{
    BoxError,
    lifecycle::{Lifecycle, shutdown_signals},
    storage::{DefaultStorage, MemoryBackend, RedisBackend, Storage},
    tempmsg_id::{MonotonicClock, SONYFLAKE_EPOCH, SonyflakeGenerator, machine_id_from_private_ip},
};
use tokio::{net::TcpListener, sync::oneshot};
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// How often the in-process backend drops expired records.
const PURGE_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_telemetry()?;

    let machine_id = match config.machine_id {
        Some(id) => id,
        None => machine_id_from_private_ip()?,
    };
    let clock = MonotonicClock::with_epoch(SONYFLAKE_EPOCH)?;
    let generator = Arc::new(SonyflakeGenerator::new(machine_id, clock));
    tracing::info!(machine_id, "ID generator ready");

    match config.backend {
        BackendKind::Redis => {
            let backend = RedisBackend::connect(&config.redis_url).await?;
            let storage = Arc::new(DefaultStorage::new(generator, backend));
            run_server(storage, config).await
        }
        BackendKind::Memory => {
            let storage = Arc::new(DefaultStorage::new(generator, MemoryBackend::new()));
            let purger = Arc::clone(&storage);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(PURGE_INTERVAL);
                loop {
                    interval.tick().await;
                    let purged = purger.backend().purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, "Purged expired records");
                    }
                }
            });
            run_server(storage, config).await
        }
    }
}

async fn run_server<S>(storage: Arc<S>, config: ServerConfig) -> anyhow::Result<()>
where
    S: Storage + 'static,
{
    let listener = TcpListener::bind(config.server_addr).await?;
    log_startup_info(&config);

    let app = router(AppState::new(
        storage,
        config.share_ttl,
        config.request_timeout,
    ));

    let token = CancellationToken::new();
    let (stopped_tx, stopped_rx) = oneshot::channel::<()>();

    let workload = {
        let token = token.clone();
        async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Server failed");
                std::process::exit(1);
            }
            let _ = stopped_tx.send(());
        }
    };

    // Stop accepting, then wait for in-flight requests to drain.
    let on_shutdown = move || async move {
        token.cancel();
        stopped_rx.await?;
        Ok::<_, BoxError>(())
    };

    Lifecycle::new(config.shutdown_timeout)
        .run(workload, on_shutdown, shutdown_signals)
        .await?;

    tracing::info!("Server exited");
    Ok(())
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting tempmsg server on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            "Starting tempmsg server on {} with {:?} backend",
            config.server_addr,
            config.backend
        );
    }
}
