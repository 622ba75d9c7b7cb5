// Output parsing across dialects

use siteprobe::parser::{DialectParser, ParseFailure, parse, parser_for};
use siteprobe::probe::{Dialect, RawProbeOutput};

fn unix(text: &str) -> RawProbeOutput {
    RawProbeOutput {
        text: text.to_string(),
        dialect: Dialect::Unix,
    }
}

fn windows(text: &str) -> RawProbeOutput {
    RawProbeOutput {
        text: text.to_string(),
        dialect: Dialect::Windows,
    }
}

const LINUX_ALL_REPLIES: &str = "\
PING 192.168.1.1 (192.168.1.1) 56(84) bytes of data.
64 bytes from 192.168.1.1: icmp_seq=1 ttl=64 time=0.045 ms
64 bytes from 192.168.1.1: icmp_seq=2 ttl=64 time=0.052 ms
64 bytes from 192.168.1.1: icmp_seq=3 ttl=64 time=0.037 ms
64 bytes from 192.168.1.1: icmp_seq=4 ttl=64 time=0.049 ms

--- 192.168.1.1 ping statistics ---
4 packets transmitted, 4 received, 0% packet loss, time 3060ms
rtt min/avg/max/mdev = 0.037/0.045/0.052/0.006 ms
";

const LINUX_NO_REPLIES: &str = "\
PING 10.9.9.9 (10.9.9.9) 56(84) bytes of data.

--- 10.9.9.9 ping statistics ---
4 packets transmitted, 0 received, 100% packet loss, time 3071ms
";

const LINUX_ERRORS: &str = "\
PING 10.0.0.7 (10.0.0.7) 56(84) bytes of data.
From 10.0.0.2 icmp_seq=1 Destination Host Unreachable
64 bytes from 10.0.0.7: icmp_seq=3 ttl=63 time=2.10 ms

--- 10.0.0.7 ping statistics ---
4 packets transmitted, 1 received, +1 errors, 75% packet loss, time 3004ms
rtt min/avg/max/mdev = 2.100/2.100/2.100/0.000 ms
";

const MACOS_PARTIAL: &str = "\
PING 10.0.0.1 (10.0.0.1): 56 data bytes
64 bytes from 10.0.0.1: icmp_seq=0 ttl=255 time=1.021 ms
64 bytes from 10.0.0.1: icmp_seq=1 ttl=255 time=1.202 ms
Request timeout for icmp_seq 2
Request timeout for icmp_seq 3

--- 10.0.0.1 ping statistics ---
4 packets transmitted, 2 packets received, 50.0% packet loss
round-trip min/avg/max/stddev = 1.021/1.111/1.202/0.090 ms
";

const WINDOWS_ALL_REPLIES: &str = "\
Pinging 10.0.0.1 with 32 bytes of data:
Reply from 10.0.0.1: bytes=32 time=2ms TTL=64
Reply from 10.0.0.1: bytes=32 time<1ms TTL=64
Reply from 10.0.0.1: bytes=32 time=3ms TTL=64
Reply from 10.0.0.1: bytes=32 time=1ms TTL=64

Ping statistics for 10.0.0.1:
    Packets: Sent = 4, Received = 4, Lost = 0 (0% loss),
Approximate round trip times in milli-seconds:
    Minimum = 0ms, Maximum = 3ms, Average = 1ms
";

const WINDOWS_TIMED_OUT: &str = "\
Pinging 10.0.0.9 with 32 bytes of data:
Request timed out.
Request timed out.
Request timed out.
Request timed out.

Ping statistics for 10.0.0.9:
    Packets: Sent = 4, Received = 0, Lost = 4 (100% loss),
";

const WINDOWS_UNREACHABLE: &str = "\
Pinging 10.0.0.9 with 32 bytes of data:
Reply from 10.0.0.2: Destination host unreachable.
Reply from 10.0.0.2: Destination host unreachable.
Request timed out.
Request timed out.

Ping statistics for 10.0.0.9:
    Packets: Sent = 4, Received = 2, Lost = 2 (50% loss),
";

#[test]
fn linux_full_reply_summary() {
    let m = parse(&unix(LINUX_ALL_REPLIES)).unwrap();
    assert_eq!(m.packets_sent, 4);
    assert_eq!(m.packets_received, 4);
    assert_eq!(m.loss_percent, 0.0);
    assert_eq!(m.min_rtt_ms, 0.037);
    assert_eq!(m.avg_rtt_ms, 0.045);
    assert_eq!(m.max_rtt_ms, 0.052);
    assert_eq!(m.ttl, Some(64));
}

#[test]
fn linux_no_replies_is_valid_data_not_failure() {
    let m = parse(&unix(LINUX_NO_REPLIES)).unwrap();
    assert_eq!(m.packets_sent, 4);
    assert_eq!(m.packets_received, 0);
    assert_eq!(m.loss_percent, 100.0);
    assert_eq!(m.avg_rtt_ms, 0.0);
    assert_eq!(m.ttl, None);
}

#[test]
fn linux_error_counter_does_not_confuse_summary() {
    let m = parse(&unix(LINUX_ERRORS)).unwrap();
    assert_eq!(m.packets_received, 1);
    assert_eq!(m.loss_percent, 75.0);
    assert_eq!(m.ttl, Some(63));
}

#[test]
fn bsd_summary_with_packets_received_wording() {
    let m = parse(&unix(MACOS_PARTIAL)).unwrap();
    assert_eq!(m.packets_received, 2);
    assert_eq!(m.loss_percent, 50.0);
    assert_eq!(m.avg_rtt_ms, 1.111);
    assert_eq!(m.ttl, Some(255));
}

#[test]
fn windows_full_reply_summary_is_normalized() {
    let m = parse(&windows(WINDOWS_ALL_REPLIES)).unwrap();
    assert_eq!(m.packets_sent, 4);
    assert_eq!(m.packets_received, 4);
    assert_eq!(m.loss_percent, 0.0);
    assert_eq!(m.min_rtt_ms, 0.0);
    assert_eq!(m.avg_rtt_ms, 1.0);
    assert_eq!(m.max_rtt_ms, 3.0);
    assert_eq!(m.ttl, Some(64));
}

#[test]
fn windows_all_timed_out() {
    let m = parse(&windows(WINDOWS_TIMED_OUT)).unwrap();
    assert_eq!(m.packets_received, 0);
    assert_eq!(m.loss_percent, 100.0);
}

#[test]
fn windows_unreachable_replies_do_not_count_as_received() {
    let m = parse(&windows(WINDOWS_UNREACHABLE)).unwrap();
    assert_eq!(m.packets_sent, 4);
    assert_eq!(m.packets_received, 0);
    assert_eq!(m.loss_percent, 100.0);
}

#[test]
fn garbage_is_unrecognized_in_both_dialects() {
    let text = "ping: unknown host\nsomething else entirely";
    assert_eq!(parse(&unix(text)), Err(ParseFailure::UnrecognizedFormat));
    assert_eq!(parse(&windows(text)), Err(ParseFailure::UnrecognizedFormat));
    assert_eq!(parse(&unix("")), Err(ParseFailure::UnrecognizedFormat));
}

#[test]
fn wrong_dialect_is_unrecognized() {
    assert_eq!(
        parse(&windows(LINUX_ALL_REPLIES)),
        Err(ParseFailure::UnrecognizedFormat)
    );
    assert_eq!(
        parse(&unix(WINDOWS_ALL_REPLIES)),
        Err(ParseFailure::UnrecognizedFormat)
    );
}

#[test]
fn zero_sent_is_a_parse_failure() {
    let text = "0 packets transmitted, 0 received, 0% packet loss\n";
    assert_eq!(parse(&unix(text)), Err(ParseFailure::NoPacketsSent));
}

#[test]
fn received_above_sent_is_rejected() {
    let text = "2 packets transmitted, 3 received, 0% packet loss\n";
    assert!(matches!(
        parse(&unix(text)),
        Err(ParseFailure::ImpossibleCounts { sent: 2, received: 3 })
    ));
}

#[test]
fn summary_without_rtt_line_is_not_guessed() {
    let text = "4 packets transmitted, 4 received, 0% packet loss, time 3000ms\n";
    assert_eq!(parse(&unix(text)), Err(ParseFailure::UnrecognizedFormat));
}

#[test]
fn windows_inconsistent_lost_count_is_rejected() {
    let text = "Packets: Sent = 4, Received = 4, Lost = 2 (50% loss),\n";
    assert!(matches!(
        parse(&windows(text)),
        Err(ParseFailure::ImpossibleCounts { .. })
    ));
}

#[test]
fn dialect_detection_and_parser_selection_agree() {
    assert_eq!(Dialect::detect(LINUX_ALL_REPLIES), Some(Dialect::Unix));
    assert_eq!(Dialect::detect(WINDOWS_ALL_REPLIES), Some(Dialect::Windows));
    assert_eq!(Dialect::detect("nothing"), None);
    let m = parser_for(Dialect::Unix).parse(LINUX_ALL_REPLIES).unwrap();
    assert_eq!(m.packets_received, 4);
}

#[test]
fn loss_is_recomputed_from_counts() {
    let text = "\
64 bytes from 10.0.0.1: icmp_seq=1 ttl=64 time=1.0 ms
3 packets transmitted, 1 received, 66% packet loss, time 2002ms
rtt min/avg/max/mdev = 1.000/1.000/1.000/0.000 ms
";
    let m = parse(&unix(text)).unwrap();
    assert_eq!(m.loss_percent, 66.67);
}

#[test]
fn rounded_loss_does_not_hide_a_lost_packet() {
    let text = "\
64 bytes from 10.0.0.1: icmp_seq=1 ttl=64 time=1.0 ms
30000 packets transmitted, 29999 received, 0% packet loss, time 30002ms
rtt min/avg/max/mdev = 1.000/1.000/1.000/0.000 ms
";
    let m = parse(&unix(text)).unwrap();
    assert_eq!(m.loss_percent, 0.0);
    assert_eq!(siteprobe::classifier::classify(&m), siteprobe::models::Status::Partial);
}
