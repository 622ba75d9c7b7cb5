// Site topology: sites own base and loopback addresses; bases own client addresses.

use std::fmt;
use std::net::Ipv4Addr;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::topology::{TopologyError, derive_gateway};

/// Site kind; serializes as "BTS" (primary station) or "POP" (point of presence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteType {
    #[serde(rename = "BTS")]
    PrimaryStation,
    #[serde(rename = "POP")]
    PointOfPresence,
}

impl SiteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteType::PrimaryStation => "BTS",
            SiteType::PointOfPresence => "POP",
        }
    }

    /// Parse the stored / wire tag. Accepts "BTS" and "POP" in any case.
    pub fn from_tag(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BTS" => Some(SiteType::PrimaryStation),
            "POP" => Some(SiteType::PointOfPresence),
            _ => None,
        }
    }
}

impl fmt::Display for SiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientAddress {
    pub id: i64,
    pub address: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopbackAddress {
    pub id: i64,
    pub address: Ipv4Addr,
}

/// A base address. Its gateway is always `address - 1` and is derived on every read,
/// so the only way to build one is through [`BaseAddress::new`], which rejects addresses
/// without a predecessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseAddress {
    id: i64,
    address: Ipv4Addr,
    pub clients: Vec<ClientAddress>,
}

impl BaseAddress {
    pub fn new(id: i64, address: Ipv4Addr) -> Result<Self, TopologyError> {
        derive_gateway(address)?;
        Ok(Self {
            id,
            address,
            clients: Vec::new(),
        })
    }

    pub fn with_clients(mut self, clients: Vec<ClientAddress>) -> Self {
        self.clients = clients;
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn gateway(&self) -> Ipv4Addr {
        // Checked in `new`; the address is immutable afterwards.
        Ipv4Addr::from(u32::from(self.address) - 1)
    }
}

impl Serialize for BaseAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("BaseAddress", 4)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("address", &self.address)?;
        s.serialize_field("gateway", &self.gateway())?;
        s.serialize_field("clients", &self.clients)?;
        s.end()
    }
}

/// A site and its full address tree, as handed to the orchestrator (read-only for one run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub site_type: SiteType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub bases: Vec<BaseAddress>,
    pub loopbacks: Vec<LoopbackAddress>,
}

impl Site {
    pub fn new(id: i64, name: impl Into<String>, site_type: SiteType) -> Self {
        Self {
            id,
            name: name.into(),
            site_type,
            location: None,
            description: None,
            bases: Vec::new(),
            loopbacks: Vec::new(),
        }
    }

    /// True when there is nothing to probe (no base and no loopback addresses).
    pub fn has_no_addresses(&self) -> bool {
        self.bases.is_empty() && self.loopbacks.is_empty()
    }
}
