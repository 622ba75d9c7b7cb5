// Pipe-delimited inventory import.
//
//   Link_ID|POP_Name|BTS_Name|Client_Name|Base_IP|Client_IP|Loopback_IP|Location
//
// Rows group into sites by BTS name (falling back to POP name). Rows with an invalid base or
// client address are skipped; "N/A" or empty loopbacks are ignored.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::models::SiteType;
use crate::store::{NewSite, SqliteStore};
use crate::topology::{derive_gateway, validate_address};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryBase {
    pub address: String,
    pub clients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySite {
    pub name: String,
    pub site_type: SiteType,
    pub location: Option<String>,
    pub bases: Vec<InventoryBase>,
    pub loopbacks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryImport {
    pub sites: Vec<InventorySite>,
    pub rows_read: usize,
    pub rows_skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub sites_created: usize,
    pub sites_updated: usize,
}

fn cell<'a>(row: &HashMap<&str, &'a str>, key: &str) -> &'a str {
    row.get(key).copied().unwrap_or("")
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty() && !s.eq_ignore_ascii_case("N/A")).then(|| s.to_string())
}

/// Parse inventory text into per-site address trees. Pure; no store access.
pub fn parse_inventory(text: &str) -> anyhow::Result<InventoryImport> {
    let text = text.trim_start_matches('\u{feff}');
    let mut lines = text.lines();
    let header_line = lines
        .next()
        .ok_or_else(|| anyhow::anyhow!("inventory is empty"))?;
    let headers: Vec<&str> = header_line.split('|').map(str::trim).collect();
    for required in ["Base_IP", "Client_IP"] {
        anyhow::ensure!(
            headers.contains(&required),
            "inventory header is missing column {}",
            required
        );
    }

    let mut import = InventoryImport::default();
    let mut index: HashMap<String, usize> = HashMap::new();

    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        import.rows_read += 1;
        let values: Vec<&str> = line.split('|').map(str::trim).collect();
        let row: HashMap<&str, &str> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (*h, values.get(i).copied().unwrap_or("")))
            .collect();

        let base = cell(&row, "Base_IP");
        let client = cell(&row, "Client_IP");
        let base_ok = validate_address(base).and_then(derive_gateway).is_ok();
        if !base_ok || validate_address(client).is_err() {
            import.rows_skipped += 1;
            continue;
        }

        let bts = non_empty(cell(&row, "BTS_Name"));
        let Some(name) = bts.clone().or_else(|| non_empty(cell(&row, "POP_Name"))) else {
            import.rows_skipped += 1;
            continue;
        };

        let slot = *index.entry(name.clone()).or_insert_with(|| {
            import.sites.push(InventorySite {
                name: name.clone(),
                site_type: if bts.is_some() {
                    SiteType::PrimaryStation
                } else {
                    SiteType::PointOfPresence
                },
                location: non_empty(cell(&row, "Location")),
                bases: Vec::new(),
                loopbacks: Vec::new(),
            });
            import.sites.len() - 1
        });
        let site = &mut import.sites[slot];

        let base_slot = match site.bases.iter().position(|b| b.address == base) {
            Some(i) => i,
            None => {
                site.bases.push(InventoryBase {
                    address: base.to_string(),
                    clients: Vec::new(),
                });
                site.bases.len() - 1
            }
        };
        let base_entry = &mut site.bases[base_slot];
        if !base_entry.clients.iter().any(|c| c == client) {
            base_entry.clients.push(client.to_string());
        }

        if let Some(loopback) = non_empty(cell(&row, "Loopback_IP")) {
            if validate_address(&loopback).is_ok() {
                if !site.loopbacks.contains(&loopback) {
                    site.loopbacks.push(loopback);
                }
            } else {
                warn!(site = %site.name, loopback = %loopback, "invalid loopback address ignored");
            }
        }
    }

    Ok(import)
}

/// Write a parsed inventory into the store. Existing sites (by name) gain missing addresses;
/// nothing is removed.
pub async fn apply_inventory(
    store: &SqliteStore,
    import: &InventoryImport,
) -> anyhow::Result<ApplySummary> {
    let mut summary = ApplySummary::default();
    for site in &import.sites {
        let site_id = match store.find_site_id_by_name(&site.name).await? {
            Some(id) => {
                summary.sites_updated += 1;
                id
            }
            None => {
                summary.sites_created += 1;
                store
                    .create_site(&NewSite {
                        name: site.name.clone(),
                        site_type: site.site_type,
                        location: site.location.clone(),
                        description: None,
                    })
                    .await?
            }
        };
        for base in &site.bases {
            let base_id = store.ensure_base_address(site_id, &base.address).await?;
            for client in &base.clients {
                store.ensure_client_address(base_id, client).await?;
            }
        }
        for loopback in &site.loopbacks {
            store.ensure_loopback_address(site_id, loopback).await?;
        }
    }
    Ok(summary)
}

/// Read, parse and apply the inventory file at `path`.
pub async fn import_file(store: &SqliteStore, path: &str) -> anyhow::Result<ApplySummary> {
    let text = tokio::fs::read_to_string(path).await?;
    let import = parse_inventory(&text)?;
    let summary = apply_inventory(store, &import).await?;
    info!(
        path,
        rows_read = import.rows_read,
        rows_skipped = import.rows_skipped,
        sites_created = summary.sites_created,
        sites_updated = summary.sites_updated,
        "inventory imported"
    );
    Ok(summary)
}
