// Address validation, gateway derivation and the BaseAddress invariant

use siteprobe::models::{BaseAddress, Site, SiteType};
use siteprobe::topology::{TopologyError, derive_gateway, derive_gateway_str, validate_address};
use std::net::Ipv4Addr;

#[test]
fn validate_accepts_plain_dotted_quad() {
    assert_eq!(
        validate_address("192.168.1.2").unwrap(),
        Ipv4Addr::new(192, 168, 1, 2)
    );
    assert_eq!(validate_address("0.0.0.0").unwrap(), Ipv4Addr::UNSPECIFIED);
    assert_eq!(
        validate_address("255.255.255.255").unwrap(),
        Ipv4Addr::BROADCAST
    );
}

#[test]
fn validate_rejects_out_of_range_octet() {
    assert!(validate_address("999.1.1.1").is_err());
    assert!(validate_address("1.1.1.256").is_err());
}

#[test]
fn validate_rejects_shell_injection() {
    let err = validate_address("1.1.1.1; rm -rf /").unwrap_err();
    assert!(matches!(err, TopologyError::InvalidAddress { .. }));
    assert!(validate_address("1.1.1.1 && id").is_err());
    assert!(validate_address("$(reboot)").is_err());
}

#[test]
fn validate_rejects_hostnames_ipv6_and_cidr() {
    assert!(validate_address("localhost").is_err());
    assert!(validate_address("::1").is_err());
    assert!(validate_address("10.0.0.0/29").is_err());
}

#[test]
fn validate_rejects_leading_zeros_and_malformed_shapes() {
    assert!(validate_address("010.0.0.1").is_err());
    assert!(validate_address("10.00.0.1").is_err());
    assert!(validate_address("1.2.3").is_err());
    assert!(validate_address("1.2.3.4.5").is_err());
    assert!(validate_address("1..3.4").is_err());
    assert!(validate_address(" 1.2.3.4").is_err());
    assert!(validate_address("").is_err());
    assert!(validate_address("1.2.3.1234").is_err());
}

#[test]
fn gateway_is_base_minus_one() {
    assert_eq!(
        derive_gateway(Ipv4Addr::new(192, 168, 1, 2)).unwrap(),
        Ipv4Addr::new(192, 168, 1, 1)
    );
    assert_eq!(
        derive_gateway(Ipv4Addr::new(172, 16, 4, 130)).unwrap(),
        Ipv4Addr::new(172, 16, 4, 129)
    );
}

#[test]
fn gateway_borrows_across_octets() {
    assert_eq!(
        derive_gateway(Ipv4Addr::new(10, 0, 2, 0)).unwrap(),
        Ipv4Addr::new(10, 0, 1, 255)
    );
    assert_eq!(
        derive_gateway(Ipv4Addr::new(11, 0, 0, 0)).unwrap(),
        Ipv4Addr::new(10, 255, 255, 255)
    );
}

#[test]
fn gateway_of_zero_address_is_invalid() {
    let err = derive_gateway(Ipv4Addr::UNSPECIFIED).unwrap_err();
    assert!(matches!(err, TopologyError::InvalidAddress { .. }));
    assert!(derive_gateway_str("0.0.0.0").is_err());
}

#[test]
fn gateway_from_string_validates_first() {
    assert_eq!(
        derive_gateway_str("10.0.2.0").unwrap(),
        Ipv4Addr::new(10, 0, 1, 255)
    );
    assert!(derive_gateway_str("not-an-ip").is_err());
}

#[test]
fn base_address_rejects_zero_and_derives_gateway_on_read() {
    assert!(BaseAddress::new(1, Ipv4Addr::UNSPECIFIED).is_err());
    let base = BaseAddress::new(1, Ipv4Addr::new(10, 0, 2, 0)).unwrap();
    assert_eq!(base.gateway(), Ipv4Addr::new(10, 0, 1, 255));
}

#[test]
fn base_address_json_includes_derived_gateway() {
    let base = BaseAddress::new(3, Ipv4Addr::new(192, 168, 1, 2)).unwrap();
    let json = serde_json::to_value(&base).unwrap();
    assert_eq!(json["address"], "192.168.1.2");
    assert_eq!(json["gateway"], "192.168.1.1");
    assert_eq!(json["id"], 3);
}

#[test]
fn site_without_base_or_loopback_has_no_addresses() {
    let site = Site::new(1, "POP-1", SiteType::PointOfPresence);
    assert!(site.has_no_addresses());
}

#[test]
fn site_type_tags() {
    assert_eq!(SiteType::from_tag("bts"), Some(SiteType::PrimaryStation));
    assert_eq!(SiteType::from_tag("POP"), Some(SiteType::PointOfPresence));
    assert_eq!(SiteType::from_tag("core"), None);
    assert_eq!(
        serde_json::to_string(&SiteType::PointOfPresence).unwrap(),
        "\"POP\""
    );
}
