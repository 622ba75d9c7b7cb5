// Root-cause verdict over a finished site report.
// Escalates client -> base -> loopback: the first reachable layer bounds the fault.

use std::net::Ipv4Addr;

use serde::Serialize;

use crate::models::{ProbeMetric, Site, SiteReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    NoAddresses,
    LinkUp,
    ClientRadioDown,
    BaseSectorFailure,
    BackhaulIssue,
    RouterDown,
    LoopbackMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RootCauseLevel {
    Client,
    Base,
    Loopback,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnosis {
    pub verdict: Verdict,
    pub root_cause_level: RootCauseLevel,
    pub final_status: &'static str,
}

impl Diagnosis {
    fn new(verdict: Verdict, root_cause_level: RootCauseLevel, final_status: &'static str) -> Self {
        Self {
            verdict,
            root_cause_level,
            final_status,
        }
    }
}

fn any_reachable(metrics: &[ProbeMetric]) -> bool {
    metrics.iter().any(|m| m.status.is_reachable())
}

fn address_reachable(metrics: &[ProbeMetric], address: Ipv4Addr) -> bool {
    metrics
        .iter()
        .any(|m| m.ip_address == address && m.status.is_reachable())
}

/// `report` must come from a run over `site`; clients are tied back to their base through
/// the site tree.
pub fn diagnose(site: &Site, report: &SiteReport) -> Diagnosis {
    if report.is_empty() {
        return Diagnosis::new(
            Verdict::NoAddresses,
            RootCauseLevel::Unknown,
            "ERROR - No addresses configured",
        );
    }
    if any_reachable(&report.clients) {
        return Diagnosis::new(
            Verdict::LinkUp,
            RootCauseLevel::Client,
            "LINK UP - Client reachable",
        );
    }
    // Every client is down from here on. A client whose own base answers points at the CPE.
    let radio_down = site
        .bases
        .iter()
        .filter(|b| !b.clients.is_empty())
        .any(|b| address_reachable(&report.base, b.address()));
    if radio_down {
        return Diagnosis::new(
            Verdict::ClientRadioDown,
            RootCauseLevel::Client,
            "FAULT - Client radio / CPE down",
        );
    }
    if any_reachable(&report.base) {
        // Another sector still answers: the fault is local to the silent bases.
        if report.base.iter().any(|m| !m.status.is_reachable()) {
            return Diagnosis::new(
                Verdict::BaseSectorFailure,
                RootCauseLevel::Base,
                "FAULT - Isolated base sector failure",
            );
        }
        return Diagnosis::new(Verdict::LinkUp, RootCauseLevel::Base, "LINK UP - Base reachable");
    }
    if report.loopback.is_empty() {
        return Diagnosis::new(
            Verdict::LoopbackMissing,
            RootCauseLevel::Unknown,
            "ERROR - Loopback address missing",
        );
    }
    if any_reachable(&report.loopback) {
        Diagnosis::new(
            Verdict::BackhaulIssue,
            RootCauseLevel::Loopback,
            "CRITICAL - Router alive, backhaul / fiber / power issue",
        )
    } else {
        Diagnosis::new(
            Verdict::RouterDown,
            RootCauseLevel::Loopback,
            "CRITICAL - POP / BTS router down",
        )
    }
}
