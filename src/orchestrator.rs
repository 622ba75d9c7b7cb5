// Site run: resolve addresses in reporting order, probe them with bounded concurrency,
// absorb per-address failures into DOWN metrics, assemble the grouped report.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::StreamExt;
use tokio::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use crate::classifier::classify;
use crate::config::ProbeConfig;
use crate::models::{FailureKind, IpRole, ProbeMetric, Site, SiteReport};
use crate::parser;
use crate::probe::ProbeExecutor;
use crate::sink::ResultSink;

/// Source of wall-clock time for report and metric timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Read access to the topology, keyed by site id.
#[async_trait]
pub trait TopologySource: Send + Sync {
    async fn load_site(&self, site_id: i64) -> anyhow::Result<Option<Site>>;
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("site {0} not found")]
    SiteNotFound(i64),
    #[error(transparent)]
    Topology(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub count: u32,
    pub timeout: Duration,
    pub max_concurrency: usize,
    pub run_deadline: Duration,
}

/// Slack added per address when bounding a run by the sum of probe timeouts.
const PER_PROBE_SLACK: Duration = Duration::from_secs(1);

impl ProbeSettings {
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self {
            count: config.count,
            timeout: Duration::from_secs_f64(config.timeout_secs),
            max_concurrency: config.effective_max_concurrency(),
            run_deadline: Duration::from_secs(config.run_deadline_secs),
        }
    }

    /// Overall budget for `targets` addresses: the sum of their timeouts, capped by
    /// `run_deadline`.
    pub fn deadline_for(&self, targets: usize) -> Duration {
        let per_probe = self.timeout + PER_PROBE_SLACK;
        u32::try_from(targets)
            .ok()
            .and_then(|n| per_probe.checked_mul(n))
            .unwrap_or(self.run_deadline)
            .min(self.run_deadline)
    }
}

/// One address to probe and the group it reports under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub address: Ipv4Addr,
    pub role: IpRole,
}

/// All addresses of a site in reporting order: gateways (one per distinct derived
/// gateway), bases, clients (grouped by base), loopbacks.
pub fn resolve_targets(site: &Site) -> Vec<Target> {
    let mut targets = Vec::new();

    let mut seen_gateways = HashSet::new();
    for base in &site.bases {
        let gateway = base.gateway();
        if seen_gateways.insert(gateway) {
            targets.push(Target {
                address: gateway,
                role: IpRole::Gateway,
            });
        }
    }
    targets.extend(site.bases.iter().map(|b| Target {
        address: b.address(),
        role: IpRole::Base,
    }));
    targets.extend(
        site.bases
            .iter()
            .flat_map(|b| &b.clients)
            .map(|c| Target {
                address: c.address,
                role: IpRole::Client,
            }),
    );
    targets.extend(site.loopbacks.iter().map(|l| Target {
        address: l.address,
        role: IpRole::Loopback,
    }));
    targets
}

pub struct Orchestrator {
    executor: Arc<dyn ProbeExecutor>,
    sink: Arc<dyn ResultSink>,
    clock: Arc<dyn Clock>,
    settings: ProbeSettings,
}

impl Orchestrator {
    pub fn new(
        executor: Arc<dyn ProbeExecutor>,
        sink: Arc<dyn ResultSink>,
        clock: Arc<dyn Clock>,
        settings: ProbeSettings,
    ) -> Self {
        Self {
            executor,
            sink,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// Look up a site and run it. Only lookup failures escalate.
    pub async fn run_site_by_id(
        &self,
        source: &dyn TopologySource,
        site_id: i64,
    ) -> Result<SiteReport, RunError> {
        let site = source
            .load_site(site_id)
            .await?
            .ok_or(RunError::SiteNotFound(site_id))?;
        Ok(self.run_site(&site).await)
    }

    /// Probe every address of `site`, hand the report to the sink and return it.
    /// A sink failure is logged and does not affect the returned report.
    pub async fn run_site(&self, site: &Site) -> SiteReport {
        let report = self.probe_site(site).await;
        if let Err(e) = self.sink.persist(&report).await {
            warn!(
                site_id = site.id,
                error = %e,
                operation = "persist_report",
                "result sink failed; report still returned"
            );
        }
        report
    }

    /// Probe without persisting.
    #[instrument(skip(self, site), fields(site_id = site.id, site = %site.name))]
    pub async fn probe_site(&self, site: &Site) -> SiteReport {
        let started_at = self.clock.now();
        let started = Instant::now();
        let mut report = SiteReport::empty(
            site.id,
            site.name.clone(),
            site.site_type,
            started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        );

        if site.has_no_addresses() {
            info!("no addresses configured; returning empty report");
            return report;
        }

        let targets = resolve_targets(site);
        let deadline = started + self.settings.deadline_for(targets.len());
        let mut slots: Vec<Option<ProbeMetric>> = vec![None; targets.len()];

        {
            let mut in_flight = futures_util::stream::iter(
                targets
                    .iter()
                    .copied()
                    .enumerate()
                    .map(|(i, target)| async move { (i, self.probe_one(target).await) }),
            )
            .buffer_unordered(self.settings.max_concurrency.max(1));

            loop {
                match tokio::time::timeout_at(deadline, in_flight.next()).await {
                    Ok(Some((i, metric))) => slots[i] = Some(metric),
                    Ok(None) => break,
                    Err(_) => {
                        warn!(
                            remaining = slots.iter().filter(|s| s.is_none()).count(),
                            "run deadline expired; marking remaining addresses DOWN"
                        );
                        break;
                    }
                }
            }
            // Dropping the stream here cancels in-flight probes; their children are killed.
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let now_ms = self.clock.now().timestamp_millis();
        for (target, slot) in targets.iter().zip(slots) {
            let metric = slot.unwrap_or_else(|| {
                ProbeMetric::failed(
                    target.address,
                    target.role,
                    self.settings.count,
                    FailureKind::DeadlineExceeded,
                    elapsed_ms,
                    now_ms,
                )
            });
            report.group_mut(target.role).push(metric);
        }
        report.execution_duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        info!(
            gateway = report.gateway.len(),
            base = report.base.len(),
            clients = report.clients.len(),
            loopback = report.loopback.len(),
            duration_ms = report.execution_duration_ms,
            "site run complete"
        );
        report
    }

    /// Executor -> parser -> classifier for one address; never fails.
    async fn probe_one(&self, target: Target) -> ProbeMetric {
        let started = Instant::now();
        let count = self.settings.count;

        let outcome = match self
            .executor
            .execute(target.address, count, self.settings.timeout)
            .await
        {
            Ok(raw) => parser::parse(&raw).map_err(|e| {
                warn!(address = %target.address, role = %target.role, error = %e, "probe output not parsed");
                e.kind()
            }),
            Err(e) => {
                warn!(address = %target.address, role = %target.role, error = %e, "probe failed");
                Err(e.kind())
            }
        };

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        let timestamp = self.clock.now().timestamp_millis();
        match outcome {
            Ok(metrics) => {
                let status = classify(&metrics);
                ProbeMetric::measured(
                    target.address,
                    target.role,
                    metrics,
                    status,
                    duration_ms,
                    timestamp,
                )
            }
            Err(kind) => ProbeMetric::failed(
                target.address,
                target.role,
                count,
                kind,
                duration_ms,
                timestamp,
            ),
        }
    }
}
