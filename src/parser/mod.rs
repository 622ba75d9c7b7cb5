// Raw probe output -> ProbeMetrics. One parser per dialect, all behind `DialectParser`.
// A missing summary is a failure, never a zeroed record.

mod unix;
mod windows;

use crate::models::{FailureKind, ProbeMetrics};
use crate::probe::{Dialect, RawProbeOutput};

pub use unix::UnixParser;
pub use windows::WindowsParser;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("unrecognized probe output format")]
    UnrecognizedFormat,
    #[error("probe reported 0 packets sent")]
    NoPacketsSent,
    #[error("probe reported {received} received out of {sent} sent")]
    ImpossibleCounts { sent: u32, received: u32 },
}

impl ParseFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            ParseFailure::UnrecognizedFormat => FailureKind::UnrecognizedFormat,
            ParseFailure::NoPacketsSent => FailureKind::NoPacketsSent,
            ParseFailure::ImpossibleCounts { .. } => FailureKind::ImpossibleCounts,
        }
    }
}

pub trait DialectParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<ProbeMetrics, ParseFailure>;
}

static UNIX: UnixParser = UnixParser;
static WINDOWS: WindowsParser = WindowsParser;

pub fn parser_for(dialect: Dialect) -> &'static dyn DialectParser {
    match dialect {
        Dialect::Unix => &UNIX,
        Dialect::Windows => &WINDOWS,
    }
}

pub fn parse(raw: &RawProbeOutput) -> Result<ProbeMetrics, ParseFailure> {
    parser_for(raw.dialect).parse(&raw.text)
}

/// Round-trip times as (min, avg, max) in milliseconds.
pub(crate) type Rtt = (f64, f64, f64);

/// Shared validation once a dialect has pulled out its numbers.
/// Loss is always recomputed from the counts, rounded to two decimals.
pub(crate) fn build_metrics(
    sent: u32,
    received: u32,
    rtt: Option<Rtt>,
    ttl: Option<u32>,
) -> Result<ProbeMetrics, ParseFailure> {
    if sent == 0 {
        return Err(ParseFailure::NoPacketsSent);
    }
    if received > sent {
        return Err(ParseFailure::ImpossibleCounts { sent, received });
    }
    let (min_rtt_ms, avg_rtt_ms, max_rtt_ms) = if received == 0 {
        (0.0, 0.0, 0.0)
    } else {
        rtt.ok_or(ParseFailure::UnrecognizedFormat)?
    };
    Ok(ProbeMetrics {
        packets_sent: sent,
        packets_received: received,
        loss_percent: loss_percent(sent, received),
        min_rtt_ms,
        avg_rtt_ms,
        max_rtt_ms,
        ttl: if received == 0 { None } else { ttl },
    })
}

pub(crate) fn loss_percent(sent: u32, received: u32) -> f64 {
    let raw = f64::from(sent - received) / f64::from(sent) * 100.0;
    (raw * 100.0).round() / 100.0
}

/// Capture group `i` as a number; a missing or overflowing group counts as unrecognized.
pub(crate) fn capture<T: std::str::FromStr>(
    caps: &regex::Captures<'_>,
    i: usize,
) -> Result<T, ParseFailure> {
    caps.get(i)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or(ParseFailure::UnrecognizedFormat)
}
