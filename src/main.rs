//! reset-herald server entry point.
//!
//! Starts the scheduler tasks and the Axum HTTP server with REST and
//! WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use reset_herald::api;
use reset_herald::app_state::AppState;
use reset_herald::config::HeraldConfig;
use reset_herald::domain::EventBus;
use reset_herald::persistence::{PostgresStore, StateStore};
use reset_herald::scheduler::{
    Clock, GuildResetTask, PersonalResetTask, RaidLaunchTask, RankCheckTask, ScheduledTask,
    SystemClock, TaskRunner,
};
use reset_herald::service::{RankTracker, ScheduleService};
use reset_herald::sink::broadcast::BroadcastSink;
use reset_herald::sink::webhook::WebhookSink;
use reset_herald::sink::{FanoutSink, NotificationSink};
use reset_herald::source::comlink::ComlinkSource;
use reset_herald::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = HeraldConfig::from_env().context("invalid LISTEN_ADDR")?;
    tracing::info!(addr = %config.listen_addr, "starting reset-herald");

    // Persistence
    let store: Option<Arc<dyn StateStore>> = if config.persistence_enabled {
        let pg = PostgresStore::connect(&config.database_url, config.database_max_connections)
            .await
            .context("failed to connect to PostgreSQL")?;
        Some(Arc::new(pg))
    } else {
        tracing::warn!("persistence disabled, state is kept in memory only");
        None
    };

    // Notification sinks
    let event_bus = EventBus::new(config.event_bus_capacity);
    let mut fanout = FanoutSink::new().with(Arc::new(BroadcastSink::new(event_bus.clone())));
    if let Some(url) = &config.notify_webhook_url {
        fanout = fanout.with(Arc::new(WebhookSink::new(url.as_str(), config.source_timeout())?));
        tracing::info!(%url, "webhook sink enabled");
    }
    let sink: Arc<dyn NotificationSink> = Arc::new(fanout);

    // Service layer
    let source = Arc::new(ComlinkSource::new(&config.comlink_url, config.source_timeout())?);
    let schedule = Arc::new(ScheduleService::new(
        store.clone(),
        config.raid_ticket_threshold,
    ));
    let tracker = Arc::new(RankTracker::new(source, Arc::clone(&sink), store.clone()));

    if let Some(store) = &store {
        let persisted = store.load_all().await.context("failed to load state")?;
        tracing::info!(entities = persisted.len(), "loaded persisted state");
        schedule.restore(&persisted).await;
        tracker.restore(&persisted).await;
    }

    // Scheduler
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cancel = CancellationToken::new();
    let interval = config.tick_interval();
    let handles = vec![
        spawn_task(
            GuildResetTask::new(Arc::clone(&schedule), Arc::clone(&sink)),
            interval,
            &clock,
            &cancel,
        ),
        spawn_task(
            PersonalResetTask::new(Arc::clone(&schedule), Arc::clone(&sink)),
            interval,
            &clock,
            &cancel,
        ),
        spawn_task(
            RaidLaunchTask::new(Arc::clone(&schedule), Arc::clone(&sink)),
            interval,
            &clock,
            &cancel,
        ),
        spawn_task(RankCheckTask::new(Arc::clone(&tracker)), interval, &clock, &cancel),
    ];

    // Build application state
    let app_state = AppState {
        schedule,
        tracker,
        event_bus,
        clock,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    config.request_timeout(),
                )),
        )
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the scheduler; a tick in progress completes first.
    cancel.cancel();
    for handle in handles {
        if tokio::time::timeout(config.shutdown_grace(), handle)
            .await
            .is_err()
        {
            tracing::warn!("scheduled task did not stop within the grace period");
        }
    }

    tracing::info!("graceful shutdown complete");
    Ok(())
}

fn spawn_task<T>(
    task: T,
    interval: std::time::Duration,
    clock: &Arc<dyn Clock>,
    cancel: &CancellationToken,
) -> JoinHandle<()>
where
    T: ScheduledTask + 'static,
{
    let runner = Arc::new(TaskRunner::new(task, interval));
    tokio::spawn(runner.run(Arc::clone(clock), cancel.clone()))
}

/// Waits for Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, starting graceful shutdown"),
        () = terminate => tracing::info!("received SIGTERM, starting graceful shutdown"),
    }
}
