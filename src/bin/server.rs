//! Process entry point: loads configuration, runs startup recovery, spawns
//! the worker pool and sweeper, and serves the HTTP surface until a signal
//! requests shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use jobqueue_core::config::Config;
use jobqueue_core::domain::Metrics;
use jobqueue_core::http::{self, AppState};
use jobqueue_core::queue;
use jobqueue_core::recovery::recover;
use jobqueue_core::store::Store;
use jobqueue_core::sweeper::Sweeper;
use jobqueue_core::worker::Worker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();
    info!(?config, "starting job queue service");

    let store = Arc::new(Store::new());
    let metrics = Arc::new(Metrics::new());
    let (queue_tx, queue_rx) = queue::bounded(config.queue_capacity);

    // Two independent tokens: ingress stops taking new work first, workers
    // and the sweeper keep draining in-flight work until told separately.
    let shutdown_requested = CancellationToken::new();
    let workers_stop = CancellationToken::new();

    let report = recover(&store, &queue_tx, &workers_stop)
        .await
        .context("startup recovery failed")?;
    info!(demoted = report.demoted, requeued = report.requeued, "recovery finished");

    let mut background = JoinSet::new();
    for id in 0..config.worker_count {
        let worker = Worker {
            id,
            store: store.clone(),
            metrics: metrics.clone(),
            queue_rx: queue_rx.clone(),
            workers_stop: workers_stop.clone(),
        };
        background.spawn(worker.run());
    }

    let sweeper = Sweeper {
        store: store.clone(),
        metrics: metrics.clone(),
        queue_tx: queue_tx.clone(),
        interval: config.sweeper_interval,
        workers_stop: workers_stop.clone(),
    };
    background.spawn(sweeper.run());

    let state = AppState {
        store: store.clone(),
        metrics: metrics.clone(),
        queue_tx: queue_tx.clone(),
        shutdown_requested: shutdown_requested.clone(),
    };
    let app = http::build(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    // §5 shutdown sequence, in order: (1) trip "shutdown requested" so
    // ingress starts rejecting new work, (2) drain the HTTP listener with
    // a bounded deadline, (3) trip "workers and sweeper stop" and await
    // their completion, (4) close the queue. Any other order is a defect:
    // closing the queue before workers finish could leave a consumer
    // mid-receive on a closed channel, and stopping workers before the
    // listener drains could let an in-flight request race a shutting-down
    // worker pool.
    let shutdown_signal = shutdown_requested.clone();
    let serve_handle = tokio::spawn(
        axum::serve(listener, app).with_graceful_shutdown(async move {
            shutdown_signal.cancelled().await;
        }),
    );

    wait_for_shutdown_signal().await;
    info!("shutdown signal received");
    shutdown_requested.cancel();

    const HTTP_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);
    match tokio::time::timeout(HTTP_DRAIN_TIMEOUT, serve_handle).await {
        Ok(Ok(Ok(()))) => info!("http listener drained"),
        Ok(Ok(Err(err))) => error!(%err, "server exited with error"),
        Ok(Err(err)) => error!(%err, "server task panicked"),
        Err(_) => warn!("http listener did not drain within {HTTP_DRAIN_TIMEOUT:?}, proceeding anyway"),
    }

    // The listener is down (or we gave up waiting); now stop workers and
    // the sweeper and wait for whatever they were mid-flight on to finish.
    workers_stop.cancel();
    while let Some(result) = background.join_next().await {
        if let Err(err) = result {
            error!(%err, "background task panicked");
        }
    }

    // All producers (ingress, sweeper, recovery) and consumers (workers)
    // have stopped; dropping the last sender handles closes the channel.
    drop(queue_tx);

    info!("shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
