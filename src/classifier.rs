// Packet counts -> reachability status

use crate::models::{ProbeMetrics, Status};

/// Every reply back is UP, none is DOWN, anything between is PARTIAL.
///
/// Decided on the counts, not on `loss_percent`, which is rounded for reporting and can
/// read 0 or 100 while some packets were lost or answered.
pub fn classify(metrics: &ProbeMetrics) -> Status {
    if metrics.packets_received == 0 {
        Status::Down
    } else if metrics.packets_received >= metrics.packets_sent {
        Status::Up
    } else {
        Status::Partial
    }
}

/// Status for an unrounded loss percentage.
pub fn classify_loss(loss_percent: f64) -> Status {
    if loss_percent <= 0.0 {
        Status::Up
    } else if loss_percent >= 100.0 {
        Status::Down
    } else {
        Status::Partial
    }
}
