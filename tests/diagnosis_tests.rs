// Root-cause verdicts over hand-built sites and reports

use siteprobe::diagnosis::{Diagnosis, RootCauseLevel, Verdict, diagnose};
use siteprobe::models::*;
use std::net::Ipv4Addr;

fn metric(addr: Ipv4Addr, role: IpRole, status: Status) -> ProbeMetric {
    match status {
        Status::Down => ProbeMetric::failed(addr, role, 4, FailureKind::Timeout, 1.0, 0),
        _ => ProbeMetric::measured(
            addr,
            role,
            ProbeMetrics {
                packets_sent: 4,
                packets_received: if status == Status::Up { 4 } else { 2 },
                loss_percent: if status == Status::Up { 0.0 } else { 50.0 },
                min_rtt_ms: 1.0,
                avg_rtt_ms: 1.0,
                max_rtt_ms: 1.0,
                ttl: Some(64),
            },
            status,
            1.0,
            0,
        ),
    }
}

/// One entry per base: its own status and the statuses of its clients.
/// Base `i` is 10.0.i.2 and its clients are 10.0.i.10, 10.0.i.11, ...
fn run(bases: &[(Status, &[Status])], loopback: &[Status]) -> Diagnosis {
    let mut site = Site::new(1, "BTS-Alpha", SiteType::PrimaryStation);
    let mut report = SiteReport::empty(1, "BTS-Alpha", SiteType::PrimaryStation, "");
    for (i, (status, clients)) in bases.iter().enumerate() {
        let i = i as u8;
        let base_addr = Ipv4Addr::new(10, 0, i, 2);
        let mut base = BaseAddress::new(i64::from(i), base_addr).unwrap();
        report.base.push(metric(base_addr, IpRole::Base, *status));
        for (j, client_status) in clients.iter().enumerate() {
            let addr = Ipv4Addr::new(10, 0, i, 10 + j as u8);
            base.clients.push(ClientAddress {
                id: j as i64,
                address: addr,
            });
            report.clients.push(metric(addr, IpRole::Client, *client_status));
        }
        site.bases.push(base);
    }
    for s in loopback {
        let addr = Ipv4Addr::new(10, 255, 0, 1);
        site.loopbacks.push(LoopbackAddress { id: 1, address: addr });
        report.loopback.push(metric(addr, IpRole::Loopback, *s));
    }
    diagnose(&site, &report)
}

use Status::{Down, Partial, Up};

#[test]
fn empty_report_has_no_addresses() {
    let d = run(&[], &[]);
    assert_eq!(d.verdict, Verdict::NoAddresses);
    assert_eq!(d.root_cause_level, RootCauseLevel::Unknown);
}

#[test]
fn reachable_client_means_link_up() {
    let d = run(&[(Down, &[Down, Partial])], &[Down]);
    assert_eq!(d.verdict, Verdict::LinkUp);
    assert_eq!(d.root_cause_level, RootCauseLevel::Client);
    assert!(d.final_status.starts_with("LINK UP"));
}

#[test]
fn own_base_up_with_clients_down_is_client_radio() {
    let d = run(&[(Up, &[Down, Down])], &[Up]);
    assert_eq!(d.verdict, Verdict::ClientRadioDown);
    assert_eq!(d.root_cause_level, RootCauseLevel::Client);
}

#[test]
fn own_base_down_with_sibling_up_is_sector_failure() {
    // Base 10.0.0.2 answers but has no clients; 10.0.1.2 and its client are silent.
    let d = run(&[(Up, &[]), (Down, &[Down])], &[Up]);
    assert_eq!(d.verdict, Verdict::BaseSectorFailure);
    assert_eq!(d.root_cause_level, RootCauseLevel::Base);
    assert!(d.final_status.contains("base sector"));
}

#[test]
fn base_only_site_with_a_dead_sector() {
    let d = run(&[(Up, &[]), (Down, &[])], &[Up]);
    assert_eq!(d.verdict, Verdict::BaseSectorFailure);
    assert_eq!(d.root_cause_level, RootCauseLevel::Base);

    let d = run(&[(Up, &[]), (Up, &[])], &[]);
    assert_eq!(d.verdict, Verdict::LinkUp);
    assert_eq!(d.root_cause_level, RootCauseLevel::Base);
}

#[test]
fn everything_below_loopback_down() {
    let d = run(&[(Down, &[Down])], &[Up]);
    assert_eq!(d.verdict, Verdict::BackhaulIssue);
    assert_eq!(d.root_cause_level, RootCauseLevel::Loopback);

    let d = run(&[(Down, &[Down])], &[Down]);
    assert_eq!(d.verdict, Verdict::RouterDown);
    assert!(d.final_status.starts_with("CRITICAL"));

    let d = run(&[(Down, &[])], &[]);
    assert_eq!(d.verdict, Verdict::LoopbackMissing);
}

#[test]
fn diagnosis_serializes_snake_case() {
    let d = run(&[(Down, &[Down])], &[Up]);
    let json = serde_json::to_value(&d).unwrap();
    assert_eq!(json["verdict"], "backhaul_issue");
    assert_eq!(json["root_cause_level"], "loopback");
}
