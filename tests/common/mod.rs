// Shared test helpers: fake executor, recording sink, fixed clock, canned ping output

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use siteprobe::models::*;
use siteprobe::orchestrator::{Clock, Orchestrator, ProbeSettings, TopologySource};
use siteprobe::probe::{Dialect, ExecutionFailure, ProbeExecutor, RawProbeOutput};
use siteprobe::sink::{ResultSink, SinkError};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

/// iputils-style output with `received` replies out of `sent`.
pub fn unix_output(addr: &str, sent: u32, received: u32) -> String {
    let mut out = format!("PING {addr} ({addr}) 56(84) bytes of data.\n");
    for seq in 1..=received {
        out.push_str(&format!(
            "64 bytes from {addr}: icmp_seq={seq} ttl=64 time=0.{seq}5 ms\n"
        ));
    }
    let loss = (sent - received) * 100 / sent;
    out.push_str(&format!(
        "\n--- {addr} ping statistics ---\n{sent} packets transmitted, {received} received, {loss}% packet loss, time 3004ms\n"
    ));
    if received > 0 {
        out.push_str("rtt min/avg/max/mdev = 0.150/0.250/0.350/0.050 ms\n");
    }
    out
}

#[derive(Clone)]
pub enum FakeResponse {
    Output(String),
    Fail(ExecutionFailure),
    /// Sleep for the given duration, then answer with the text.
    Delay(Duration, String),
    /// Never completes.
    Stall,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Executor that answers from a table keyed by address; unknown addresses reply 4/4.
#[derive(Default)]
pub struct FakeExecutor {
    responses: HashMap<Ipv4Addr, FakeResponse>,
    pub calls: Mutex<Vec<Ipv4Addr>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, addr: &str, response: FakeResponse) -> Self {
        self.responses.insert(ip(addr), response);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ProbeExecutor for FakeExecutor {
    async fn execute(
        &self,
        address: Ipv4Addr,
        count: u32,
        _timeout: Duration,
    ) -> Result<RawProbeOutput, ExecutionFailure> {
        self.calls.lock().unwrap().push(address);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let response = self
            .responses
            .get(&address)
            .cloned()
            .unwrap_or_else(|| FakeResponse::Output(unix_output(&address.to_string(), count, count)));
        let text = match response {
            FakeResponse::Output(text) => text,
            FakeResponse::Fail(failure) => return Err(failure),
            FakeResponse::Delay(d, text) => {
                tokio::time::sleep(d).await;
                text
            }
            FakeResponse::Stall => std::future::pending().await,
        };
        Ok(RawProbeOutput {
            text,
            dialect: Dialect::Unix,
        })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub reports: Mutex<Vec<SiteReport>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            reports: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl ResultSink for RecordingSink {
    async fn persist(&self, report: &SiteReport) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Closed);
        }
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
    ))
}

/// In-memory topology keyed by site id.
#[derive(Default)]
pub struct MapTopology(pub HashMap<i64, Site>);

#[async_trait]
impl TopologySource for MapTopology {
    async fn load_site(&self, site_id: i64) -> anyhow::Result<Option<Site>> {
        Ok(self.0.get(&site_id).cloned())
    }
}

pub fn settings() -> ProbeSettings {
    ProbeSettings {
        count: 4,
        timeout: Duration::from_secs(10),
        max_concurrency: 8,
        run_deadline: Duration::from_secs(120),
    }
}

pub fn orchestrator(
    executor: Arc<FakeExecutor>,
    sink: Arc<RecordingSink>,
    settings: ProbeSettings,
) -> Orchestrator {
    Orchestrator::new(executor, sink, fixed_clock(), settings)
}

/// BTS site: base 192.168.1.2 (gateway .1) with clients .10 and .11, loopback 10.255.0.1.
pub fn sample_site() -> Site {
    let mut site = Site::new(7, "BTS-Alpha", SiteType::PrimaryStation);
    site.bases.push(
        BaseAddress::new(1, ip("192.168.1.2"))
            .unwrap()
            .with_clients(vec![
                ClientAddress {
                    id: 1,
                    address: ip("192.168.1.10"),
                },
                ClientAddress {
                    id: 2,
                    address: ip("192.168.1.11"),
                },
            ]),
    );
    site.loopbacks.push(LoopbackAddress {
        id: 1,
        address: ip("10.255.0.1"),
    });
    site
}

pub fn addresses(metrics: &[ProbeMetric]) -> Vec<String> {
    metrics.iter().map(|m| m.ip_address.to_string()).collect()
}
