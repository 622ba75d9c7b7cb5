// Probe metrics: parser output and the per-address record produced by one run

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// Which role an address plays in the site; serializes lowercase ("gateway", "base", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpRole {
    Gateway,
    Base,
    Client,
    Loopback,
}

impl IpRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpRole::Gateway => "gateway",
            IpRole::Base => "base",
            IpRole::Client => "client",
            IpRole::Loopback => "loopback",
        }
    }

    pub fn from_tag(s: &str) -> Option<Self> {
        match s {
            "gateway" => Some(IpRole::Gateway),
            "base" => Some(IpRole::Base),
            "client" => Some(IpRole::Client),
            "loopback" => Some(IpRole::Loopback),
            _ => None,
        }
    }
}

impl fmt::Display for IpRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reachability status; serializes uppercase ("UP", "DOWN", "PARTIAL").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Up,
    Down,
    Partial,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Up => "UP",
            Status::Down => "DOWN",
            Status::Partial => "PARTIAL",
        }
    }

    pub fn from_tag(s: &str) -> Option<Self> {
        match s {
            "UP" => Some(Status::Up),
            "DOWN" => Some(Status::Down),
            "PARTIAL" => Some(Status::Partial),
            _ => None,
        }
    }

    pub fn is_reachable(&self) -> bool {
        !matches!(self, Status::Down)
    }
}

/// Why a metric was synthesized as DOWN instead of measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    ExecutionError,
    UnrecognizedFormat,
    NoPacketsSent,
    ImpossibleCounts,
    /// The run's overall deadline expired before this address completed.
    DeadlineExceeded,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::ExecutionError => "execution_error",
            FailureKind::UnrecognizedFormat => "unrecognized_format",
            FailureKind::NoPacketsSent => "no_packets_sent",
            FailureKind::ImpossibleCounts => "impossible_counts",
            FailureKind::DeadlineExceeded => "deadline_exceeded",
        }
    }

    pub fn from_tag(s: &str) -> Option<Self> {
        match s {
            "timeout" => Some(FailureKind::Timeout),
            "execution_error" => Some(FailureKind::ExecutionError),
            "unrecognized_format" => Some(FailureKind::UnrecognizedFormat),
            "no_packets_sent" => Some(FailureKind::NoPacketsSent),
            "impossible_counts" => Some(FailureKind::ImpossibleCounts),
            "deadline_exceeded" => Some(FailureKind::DeadlineExceeded),
            _ => None,
        }
    }
}

/// Normalized numbers extracted from one probe's raw output.
///
/// Invariants (enforced by the parser): `packets_sent > 0`, `packets_received <= packets_sent`,
/// `loss_percent == (sent - received) / sent * 100`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeMetrics {
    pub packets_sent: u32,
    pub packets_received: u32,
    pub loss_percent: f64,
    pub min_rtt_ms: f64,
    pub avg_rtt_ms: f64,
    pub max_rtt_ms: f64,
    /// TTL of the first successful reply, if any.
    pub ttl: Option<u32>,
}

/// One address's outcome in one run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeMetric {
    pub ip_address: Ipv4Addr,
    pub ip_type: IpRole,
    pub packets_sent: u32,
    pub packets_received: u32,
    pub packet_loss_percent: f64,
    pub min_rtt_ms: f64,
    pub max_rtt_ms: f64,
    pub avg_rtt_ms: f64,
    pub ttl: Option<u32>,
    pub status: Status,
    pub execution_duration_ms: f64,
    /// Epoch milliseconds at which the probe finished.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl ProbeMetric {
    pub fn measured(
        ip_address: Ipv4Addr,
        ip_type: IpRole,
        metrics: ProbeMetrics,
        status: Status,
        execution_duration_ms: f64,
        timestamp: i64,
    ) -> Self {
        Self {
            ip_address,
            ip_type,
            packets_sent: metrics.packets_sent,
            packets_received: metrics.packets_received,
            packet_loss_percent: metrics.loss_percent,
            min_rtt_ms: metrics.min_rtt_ms,
            max_rtt_ms: metrics.max_rtt_ms,
            avg_rtt_ms: metrics.avg_rtt_ms,
            ttl: metrics.ttl,
            status,
            execution_duration_ms,
            timestamp,
            failure: None,
        }
    }

    /// DOWN record for an address whose probe could not produce metrics.
    /// `packets_sent` is the configured count; nothing was received.
    pub fn failed(
        ip_address: Ipv4Addr,
        ip_type: IpRole,
        packets_sent: u32,
        failure: FailureKind,
        execution_duration_ms: f64,
        timestamp: i64,
    ) -> Self {
        Self {
            ip_address,
            ip_type,
            packets_sent,
            packets_received: 0,
            packet_loss_percent: 100.0,
            min_rtt_ms: 0.0,
            max_rtt_ms: 0.0,
            avg_rtt_ms: 0.0,
            ttl: None,
            status: Status::Down,
            execution_duration_ms,
            timestamp,
            failure: Some(failure),
        }
    }
}
