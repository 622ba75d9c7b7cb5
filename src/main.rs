use anyhow::Result;
use siteprobe::*;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let store = Arc::new(
        store::SqliteStore::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
            app_config.database.retention_days,
        )
        .await?,
    );
    store.init().await?;

    if let Some(path) = &app_config.inventory.path
        && let Err(e) = inventory::import_file(&store, path).await
    {
        tracing::warn!(error = %e, path = %path, "inventory import failed; continuing with stored topology");
    }

    let reports_saved_total = Arc::new(AtomicU64::new(0));
    let (write_tx, write_rx) =
        tokio::sync::mpsc::channel(sink::writer_channel_capacity(app_config.database.flush_rate));
    let writer_handle = sink::spawn_result_writer(
        write_rx,
        store.clone(),
        sink::ResultWriterConfig {
            flush_rate: app_config.database.flush_rate,
            flush_interval_secs: app_config.database.flush_interval_secs,
            prune_interval_secs: app_config.database.prune_interval_secs,
        },
        reports_saved_total.clone(),
    );

    let probe_config = &app_config.probe;
    let executor = Arc::new(probe::CommandExecutor::new(
        probe_config.program.clone(),
        probe_config.effective_dialect(),
        Duration::from_secs(probe_config.reply_wait_secs),
    ));
    let orchestrator = Arc::new(orchestrator::Orchestrator::new(
        executor,
        Arc::new(sink::ChannelSink::new(write_tx)),
        Arc::new(orchestrator::SystemClock),
        orchestrator::ProbeSettings::from_config(probe_config),
    ));
    tracing::info!(
        count = probe_config.count,
        timeout_secs = probe_config.timeout_secs,
        max_concurrency = probe_config.effective_max_concurrency(),
        dialect = ?probe_config.effective_dialect(),
        "probe settings"
    );

    let app = routes::app(
        orchestrator.clone(),
        store.clone(),
        app_config.inventory.path.clone(),
    );
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Received shutdown signal");
    // The orchestrator owns the last sender; dropping it lets the writer flush and exit.
    drop(orchestrator);
    let _ = writer_handle.await;
    tracing::info!(
        reports_saved_total = reports_saved_total.load(std::sync::atomic::Ordering::Relaxed),
        "shutdown complete"
    );

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
