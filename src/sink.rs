// Result sink: where finished site reports go.
// `ChannelSink` hands reports to a dedicated writer task that batches them into the store,
// so a run never waits on the database.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};

use crate::models::SiteReport;
use crate::store::SqliteStore;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("result writer channel closed")]
    Closed,
    #[error("result writer queue full")]
    Full,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Persist the metrics of one run and its audit entry.
    async fn persist(&self, report: &SiteReport) -> Result<(), SinkError>;
}

#[async_trait]
impl ResultSink for SqliteStore {
    async fn persist(&self, report: &SiteReport) -> Result<(), SinkError> {
        self.save_report(report).await?;
        Ok(())
    }
}

/// Channel capacity for the result writer (backpressure if the writer falls behind).
pub fn writer_channel_capacity(flush_rate: u64) -> usize {
    (flush_rate as usize * 2).max(32)
}

pub struct ChannelSink {
    tx: mpsc::Sender<SiteReport>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<SiteReport>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ResultSink for ChannelSink {
    async fn persist(&self, report: &SiteReport) -> Result<(), SinkError> {
        self.tx.try_send(report.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Full,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

/// Writer batching and retention.
pub struct ResultWriterConfig {
    pub flush_rate: u64,
    pub flush_interval_secs: u64,
    pub prune_interval_secs: u64,
}

/// Spawns the task that receives reports and flushes them to the store.
/// Flushes when buffer len >= flush_rate, every flush_interval_secs, and when the channel
/// closes. Prunes results past retention every prune_interval_secs.
pub fn spawn_result_writer(
    mut rx: mpsc::Receiver<SiteReport>,
    store: Arc<SqliteStore>,
    config: ResultWriterConfig,
    reports_saved_total: Arc<AtomicU64>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut buffer: Vec<SiteReport> = Vec::new();
        let mut flush_tick = interval(Duration::from_secs(config.flush_interval_secs));
        flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut prune_tick = interval(Duration::from_secs(config.prune_interval_secs));
        prune_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Some(report) => {
                            buffer.push(report);
                            if buffer.len() >= config.flush_rate as usize
                                && let Err(e) = flush_buffer(&store, &mut buffer, &reports_saved_total).await
                            {
                                tracing::warn!(error = %e, "result writer: save_reports failed");
                            }
                        }
                        None => break,
                    }
                }
                _ = flush_tick.tick() => {
                    if let Err(e) = flush_buffer(&store, &mut buffer, &reports_saved_total).await {
                        tracing::warn!(error = %e, "result writer: save_reports failed");
                    }
                }
                _ = prune_tick.tick() => {
                    match store.prune_old_results().await {
                        Ok(n) => tracing::debug!(operation = "prune_old_results", rows = n, "old results pruned"),
                        Err(e) => tracing::warn!(error = %e, operation = "prune_old_results", "failed to prune old results"),
                    }
                }
            }
        }
        if let Err(e) = flush_buffer(&store, &mut buffer, &reports_saved_total).await {
            tracing::warn!(error = %e, "result writer: final flush failed");
        }
        tracing::debug!("result writer shutting down");
    })
}

async fn flush_buffer(
    store: &SqliteStore,
    buffer: &mut Vec<SiteReport>,
    reports_saved_total: &AtomicU64,
) -> anyhow::Result<()> {
    if buffer.is_empty() {
        return Ok(());
    }
    let n = buffer.len();
    store.save_reports(buffer).await?;
    reports_saved_total.fetch_add(n as u64, std::sync::atomic::Ordering::Relaxed);
    buffer.clear();
    tracing::debug!(operation = "save_reports", reports_count = n, "reports saved");
    Ok(())
}
