// Address validation and gateway derivation. Pure; shared by the store, the inventory
// import and the orchestrator.

use std::net::Ipv4Addr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: &'static str },
}

impl TopologyError {
    fn invalid(input: &str, reason: &'static str) -> Self {
        TopologyError::InvalidAddress {
            input: input.to_string(),
            reason,
        }
    }
}

/// Strict dotted-quad IPv4 parse.
///
/// Exactly four decimal octets of one to three ASCII digits, no leading zeros, no
/// whitespace, no suffixes. Anything that gets through here is safe to pass as a
/// discrete process argument.
pub fn validate_address(s: &str) -> Result<Ipv4Addr, TopologyError> {
    if s.is_empty() {
        return Err(TopologyError::invalid(s, "empty"));
    }
    if !s.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err(TopologyError::invalid(s, "only digits and dots are allowed"));
    }

    let mut octets = [0u8; 4];
    let mut count = 0;
    for part in s.split('.') {
        if count == 4 {
            return Err(TopologyError::invalid(s, "more than four octets"));
        }
        if part.is_empty() || part.len() > 3 {
            return Err(TopologyError::invalid(s, "octet must have 1-3 digits"));
        }
        if part.len() > 1 && part.starts_with('0') {
            return Err(TopologyError::invalid(s, "leading zero in octet"));
        }
        let value: u16 = part
            .parse()
            .map_err(|_| TopologyError::invalid(s, "octet is not a number"))?;
        if value > 255 {
            return Err(TopologyError::invalid(s, "octet out of range"));
        }
        octets[count] = value as u8;
        count += 1;
    }
    if count != 4 {
        return Err(TopologyError::invalid(s, "expected four octets"));
    }
    Ok(Ipv4Addr::from(octets))
}

/// Gateway paired with a base address: the base minus one, borrowing across octets
/// (`10.0.2.0` -> `10.0.1.255`). `0.0.0.0` has no predecessor.
pub fn derive_gateway(base: Ipv4Addr) -> Result<Ipv4Addr, TopologyError> {
    u32::from(base)
        .checked_sub(1)
        .map(Ipv4Addr::from)
        .ok_or_else(|| TopologyError::invalid(&base.to_string(), "no predecessor address"))
}

/// `validate_address` followed by `derive_gateway`, for string input.
pub fn derive_gateway_str(base: &str) -> Result<Ipv4Addr, TopologyError> {
    derive_gateway(validate_address(base)?)
}
