//! Gramline - campaign orchestration server entry point

use anyhow::Result;
use gramline_common::config::Config;
use gramline_core::transport::{ClientFactory, DryRunClientFactory};
use gramline_core::{
    AccountHealthMonitor, CampaignExecutor, CampaignScheduler, MessageDispatcher, RateLimiter,
    TargetSelector, WarmupController, WorkerSupervisor,
};
use gramline_core::worker::WorkerContext;
use gramline_storage::kv::KvStore;
use gramline_storage::repository::HealthEventRepository;
use gramline_storage::{DatabasePool, RedisKv};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config.logging.filter);

    info!("Starting Gramline server...");

    // Initialize database
    let db_pool = DatabasePool::new(&config.database).await?;
    db_pool.migrate().await?;

    // Connect the ephemeral counter store
    let kv: Arc<dyn KvStore> = Arc::new(RedisKv::connect(&config.redis.url).await?);

    // One token cancels every loop at its next suspension point
    let shutdown = CancellationToken::new();

    // Engine pieces
    let limiter = Arc::new(RateLimiter::new(kv.clone()));
    let monitor = Arc::new(
        AccountHealthMonitor::new(kv.clone())
            .with_thresholds(
                config.limits.flood_threshold,
                config.limits.flood_window_minutes,
                config.limits.pause_minutes,
            )
            .with_event_log(HealthEventRepository::new(db_pool.pool().clone())),
    );
    let warmup = WarmupController::new(config.warmup.steady_daily_limit as i32);

    // The transport client is integrated at deployment; without one, sends
    // are logged and reported as successful
    let clients: Arc<dyn ClientFactory> = Arc::new(DryRunClientFactory);

    let dispatcher = Arc::new(MessageDispatcher::new(
        &db_pool,
        limiter.clone(),
        monitor.clone(),
        clients,
        Duration::from_secs(config.worker.protocol_backoff_secs),
    ));

    // Campaign scheduler
    let executor = Arc::new(
        CampaignExecutor::new(
            &db_pool,
            limiter.clone(),
            monitor.clone(),
            warmup.clone(),
            dispatcher.clone(),
            shutdown.clone(),
        )
        .with_send_delays(
            config.worker.min_send_delay_secs,
            config.worker.max_send_delay_secs,
        ),
    );

    let scheduler = CampaignScheduler::new(&db_pool, kv.clone(), executor, shutdown.clone())
        .with_timing(config.scheduler.tick_secs, config.scheduler.lock_ttl_secs);

    let scheduler_handle = tokio::spawn(async move {
        scheduler.run().await;
    });

    // Per-account send workers
    let selector = Arc::new(TargetSelector::new(&db_pool, limiter.clone()));
    let worker_ctx = WorkerContext::new(
        &db_pool,
        limiter,
        monitor,
        selector,
        warmup,
        dispatcher,
        config.worker.clone(),
    );
    let supervisor = WorkerSupervisor::new(worker_ctx, shutdown.clone());

    let supervisor_handle = tokio::spawn(async move {
        supervisor.run().await;
    });

    // Administrative API
    let api_handle = {
        let db_pool = db_pool.clone();
        let bind = config.api.bind.clone();
        let api_key = config.api.api_key.clone();
        tokio::spawn(async move {
            let app = gramline_api::create_router(db_pool, &api_key);
            let listener = match tokio::net::TcpListener::bind(&bind).await {
                Ok(listener) => listener,
                Err(e) => {
                    tracing::error!("Failed to bind API server on {}: {}", bind, e);
                    return;
                }
            };
            info!("API server listening on {}", bind);
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("API server error: {}", e);
            }
        })
    };

    info!("Gramline server started");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    shutdown.cancel();

    // The loops observe the token at every sleep; wait for them to drain
    let _ = scheduler_handle.await;
    let _ = supervisor_handle.await;
    api_handle.abort();

    info!("Gramline server shutdown complete");

    Ok(())
}

fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_level(true))
        .with(filter)
        .init();
}
