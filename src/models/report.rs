// Site report (transient result of one run) and the audit entry derived from it

use serde::{Deserialize, Serialize};
use wincode::{SchemaRead, SchemaWrite};

use super::{IpRole, ProbeMetric, SiteType, Status};

/// Grouped, ordered result of probing every address of one site.
/// Group order on the wire is fixed: gateway, base, clients, loopback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteReport {
    pub bts_pop_id: i64,
    pub bts_pop_name: String,
    pub site_type: SiteType,
    pub execution_timestamp: String,
    pub execution_duration_ms: f64,
    pub gateway: Vec<ProbeMetric>,
    pub base: Vec<ProbeMetric>,
    pub clients: Vec<ProbeMetric>,
    pub loopback: Vec<ProbeMetric>,
}

impl SiteReport {
    pub fn empty(
        bts_pop_id: i64,
        bts_pop_name: impl Into<String>,
        site_type: SiteType,
        execution_timestamp: impl Into<String>,
    ) -> Self {
        Self {
            bts_pop_id,
            bts_pop_name: bts_pop_name.into(),
            site_type,
            execution_timestamp: execution_timestamp.into(),
            execution_duration_ms: 0.0,
            gateway: Vec::new(),
            base: Vec::new(),
            clients: Vec::new(),
            loopback: Vec::new(),
        }
    }

    pub fn group(&self, role: IpRole) -> &[ProbeMetric] {
        match role {
            IpRole::Gateway => &self.gateway,
            IpRole::Base => &self.base,
            IpRole::Client => &self.clients,
            IpRole::Loopback => &self.loopback,
        }
    }

    pub fn group_mut(&mut self, role: IpRole) -> &mut Vec<ProbeMetric> {
        match role {
            IpRole::Gateway => &mut self.gateway,
            IpRole::Base => &mut self.base,
            IpRole::Client => &mut self.clients,
            IpRole::Loopback => &mut self.loopback,
        }
    }

    /// All metrics in reporting order.
    pub fn metrics(&self) -> impl Iterator<Item = &ProbeMetric> {
        self.gateway
            .iter()
            .chain(&self.base)
            .chain(&self.clients)
            .chain(&self.loopback)
    }

    pub fn total(&self) -> usize {
        self.gateway.len() + self.base.len() + self.clients.len() + self.loopback.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn count_status(&self, status: Status) -> usize {
        self.metrics().filter(|m| m.status == status).count()
    }
}

/// One audit row per run; stored as a wincode BLOB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SchemaRead, SchemaWrite)]
pub struct AuditEntry {
    pub site_id: i64,
    pub site_name: String,
    pub action: String,
    pub total: u32,
    pub up: u32,
    pub partial: u32,
    pub down: u32,
    pub duration_ms: f64,
    pub created_at: i64,
}

impl AuditEntry {
    pub const ACTION_PING: &'static str = "execute_ping";

    pub fn from_report(report: &SiteReport, created_at: i64) -> Self {
        Self {
            site_id: report.bts_pop_id,
            site_name: report.bts_pop_name.clone(),
            action: Self::ACTION_PING.to_string(),
            total: report.total() as u32,
            up: report.count_status(Status::Up) as u32,
            partial: report.count_status(Status::Partial) as u32,
            down: report.count_status(Status::Down) as u32,
            duration_ms: report.execution_duration_ms,
            created_at,
        }
    }
}
