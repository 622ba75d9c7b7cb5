// iputils and BSD/macOS ping summaries:
//   4 packets transmitted, 3 received, +1 errors, 25% packet loss, time 3004ms
//   rtt min/avg/max/mdev = 0.041/0.052/0.061/0.008 ms
//   4 packets transmitted, 4 packets received, 0.0% packet loss
//   round-trip min/avg/max/stddev = 1.021/1.100/1.202/0.070 ms

use std::sync::LazyLock;

use regex::Regex;

use super::{DialectParser, ParseFailure, build_metrics, capture};
use crate::models::ProbeMetrics;

static SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(\d+) packets transmitted, (\d+) (?:packets )?received")
        .expect("static regex")
});

static RTT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\s*(?:rtt|round-trip) min/avg/max(?:/(?:mdev|stddev))? = ([\d.]+)/([\d.]+)/([\d.]+)",
    )
    .expect("static regex")
});

static REPLY_TTL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\d+ bytes from .*\bttl=(\d+)").expect("static regex")
});

pub struct UnixParser;

impl DialectParser for UnixParser {
    fn parse(&self, text: &str) -> Result<ProbeMetrics, ParseFailure> {
        let summary = SUMMARY
            .captures(text)
            .ok_or(ParseFailure::UnrecognizedFormat)?;
        let sent: u32 = capture(&summary, 1)?;
        let received: u32 = capture(&summary, 2)?;

        let rtt = match RTT.captures(text) {
            Some(caps) => Some((capture(&caps, 1)?, capture(&caps, 2)?, capture(&caps, 3)?)),
            None => None,
        };
        let ttl = REPLY_TTL
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());

        build_metrics(sent, received, rtt, ttl)
    }
}
