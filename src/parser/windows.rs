// Windows ping.exe summary:
//   Reply from 10.0.0.1: bytes=32 time=2ms TTL=64
//   Packets: Sent = 4, Received = 4, Lost = 0 (0% loss),
//   Minimum = 1ms, Maximum = 3ms, Average = 2ms
//
// Windows counts "Destination host unreachable" answers as received. Only echo replies
// (lines carrying TTL=) are counted when they are fewer than the reported figure.

use std::sync::LazyLock;

use regex::Regex;

use super::{DialectParser, ParseFailure, build_metrics, capture};
use crate::models::ProbeMetrics;

static SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Packets: Sent = (\d+), Received = (\d+), Lost = (\d+)").expect("static regex")
});

static RTT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Minimum = (\d+)ms, Maximum = (\d+)ms, Average = (\d+)ms").expect("static regex")
});

static ECHO_REPLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Reply from [^:]+: bytes=\d+ time[=<]\d+ms TTL=(\d+)").expect("static regex")
});

pub struct WindowsParser;

impl DialectParser for WindowsParser {
    fn parse(&self, text: &str) -> Result<ProbeMetrics, ParseFailure> {
        let summary = SUMMARY
            .captures(text)
            .ok_or(ParseFailure::UnrecognizedFormat)?;
        let sent: u32 = capture(&summary, 1)?;
        let reported: u32 = capture(&summary, 2)?;
        let lost: u32 = capture(&summary, 3)?;
        if reported.checked_add(lost) != Some(sent) {
            return Err(ParseFailure::ImpossibleCounts {
                sent,
                received: reported,
            });
        }

        let mut replies = ECHO_REPLY.captures_iter(text);
        let ttl = replies
            .next()
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok());
        let echo_count = u32::from(ttl.is_some()) + replies.count() as u32;
        let received = reported.min(echo_count);

        // Windows prints Minimum, Maximum, Average; normalize to (min, avg, max).
        let rtt = match RTT.captures(text) {
            Some(caps) => {
                let min: f64 = capture(&caps, 1)?;
                let max: f64 = capture(&caps, 2)?;
                let avg: f64 = capture(&caps, 3)?;
                Some((min, avg, max))
            }
            None => None,
        };

        build_metrics(sent, received, rtt, ttl)
    }
}
