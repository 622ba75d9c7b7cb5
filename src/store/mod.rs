// SQLite topology + result store.
// Topology rows feed the orchestrator; ping_results and audit_log are written by the result
// sink. Audit payloads are version-prefixed wincode BLOBs.

mod blob;
mod schema;

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use tracing::instrument;

use crate::models::{
    AuditEntry, BaseAddress, ClientAddress, FailureKind, IpRole, LoopbackAddress, ProbeMetric,
    Site, SiteReport, SiteType, Status,
};
use crate::orchestrator::TopologySource;
use crate::topology::validate_address;

pub struct SqliteStore {
    pool: SqlitePool,
    retention_ms: i64,
}

/// Fields accepted when creating a site.
#[derive(Debug, Clone)]
pub struct NewSite {
    pub name: String,
    pub site_type: SiteType,
    pub location: Option<String>,
    pub description: Option<String>,
}

fn now_ms() -> anyhow::Result<i64> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_millis() as i64)
}

/// Report timestamp as epoch ms; falls back to now when it does not parse.
fn report_created_at(report: &SiteReport) -> anyhow::Result<i64> {
    match chrono::DateTime::parse_from_rfc3339(&report.execution_timestamp) {
        Ok(ts) => Ok(ts.timestamp_millis()),
        Err(_) => now_ms(),
    }
}

impl SqliteStore {
    pub async fn connect(path: &str, max_pool_size: u32, retention_days: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        let retention_ms = (retention_days as i64) * 24 * 60 * 60 * 1000;
        Ok(Self { pool, retention_ms })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (key TEXT PRIMARY KEY, value INTEGER NOT NULL)",
        )
        .execute(&self.pool)
        .await?;
        schema::init_topology_tables(&self.pool).await?;
        schema::init_result_tables(&self.pool).await?;
        Ok(())
    }

    // --- topology ---

    #[instrument(skip(self, site), fields(repo = "store", operation = "create_site", name = %site.name))]
    pub async fn create_site(&self, site: &NewSite) -> anyhow::Result<i64> {
        let r = sqlx::query(
            "INSERT INTO sites (name, site_type, location, description) VALUES ($1, $2, $3, $4)",
        )
        .bind(&site.name)
        .bind(site.site_type.as_str())
        .bind(&site.location)
        .bind(&site.description)
        .execute(&self.pool)
        .await?;
        Ok(r.last_insert_rowid())
    }

    pub async fn find_site_id_by_name(&self, name: &str) -> anyhow::Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM sites WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    /// Add a base address to a site. `Ok(None)` when the site does not exist.
    /// Fails with `TopologyError` when the address is invalid or has no gateway.
    #[instrument(skip(self), fields(repo = "store", operation = "add_base_address"))]
    pub async fn add_base_address(&self, site_id: i64, address: &str) -> anyhow::Result<Option<i64>> {
        let addr = validate_address(address)?;
        BaseAddress::new(0, addr)?;
        if !self.site_exists(site_id).await? {
            return Ok(None);
        }
        let r = sqlx::query("INSERT INTO base_addresses (site_id, address) VALUES ($1, $2)")
            .bind(site_id)
            .bind(addr.to_string())
            .execute(&self.pool)
            .await?;
        Ok(Some(r.last_insert_rowid()))
    }

    /// Add a client address under a base. `Ok(None)` when the base does not exist.
    #[instrument(skip(self), fields(repo = "store", operation = "add_client_address"))]
    pub async fn add_client_address(&self, base_id: i64, address: &str) -> anyhow::Result<Option<i64>> {
        let addr = validate_address(address)?;
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM base_addresses WHERE id = $1")
            .bind(base_id)
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        if !exists {
            return Ok(None);
        }
        let r = sqlx::query("INSERT INTO client_addresses (base_id, address) VALUES ($1, $2)")
            .bind(base_id)
            .bind(addr.to_string())
            .execute(&self.pool)
            .await?;
        Ok(Some(r.last_insert_rowid()))
    }

    /// Add a loopback address to a site. `Ok(None)` when the site does not exist.
    #[instrument(skip(self), fields(repo = "store", operation = "add_loopback_address"))]
    pub async fn add_loopback_address(&self, site_id: i64, address: &str) -> anyhow::Result<Option<i64>> {
        let addr = validate_address(address)?;
        if !self.site_exists(site_id).await? {
            return Ok(None);
        }
        let r = sqlx::query("INSERT INTO loopback_addresses (site_id, address) VALUES ($1, $2)")
            .bind(site_id)
            .bind(addr.to_string())
            .execute(&self.pool)
            .await?;
        Ok(Some(r.last_insert_rowid()))
    }

    /// Id of the site's base with this address, inserting it if missing.
    pub async fn ensure_base_address(&self, site_id: i64, address: &str) -> anyhow::Result<i64> {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM base_addresses WHERE site_id = $1 AND address = $2",
        )
        .bind(site_id)
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;
        match existing {
            Some(id) => Ok(id),
            None => self
                .add_base_address(site_id, address)
                .await?
                .ok_or_else(|| anyhow::anyhow!("site {} not found", site_id)),
        }
    }

    pub async fn ensure_client_address(&self, base_id: i64, address: &str) -> anyhow::Result<i64> {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM client_addresses WHERE base_id = $1 AND address = $2",
        )
        .bind(base_id)
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;
        match existing {
            Some(id) => Ok(id),
            None => self
                .add_client_address(base_id, address)
                .await?
                .ok_or_else(|| anyhow::anyhow!("base {} not found", base_id)),
        }
    }

    pub async fn ensure_loopback_address(&self, site_id: i64, address: &str) -> anyhow::Result<i64> {
        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM loopback_addresses WHERE site_id = $1 AND address = $2",
        )
        .bind(site_id)
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;
        match existing {
            Some(id) => Ok(id),
            None => self
                .add_loopback_address(site_id, address)
                .await?
                .ok_or_else(|| anyhow::anyhow!("site {} not found", site_id)),
        }
    }

    async fn site_exists(&self, site_id: i64) -> anyhow::Result<bool> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM sites WHERE id = $1")
            .bind(site_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id.is_some())
    }

    /// Full address tree of one site, in insertion order.
    #[instrument(skip(self), fields(repo = "store", operation = "get_site"))]
    pub async fn get_site(&self, site_id: i64) -> anyhow::Result<Option<Site>> {
        let row = sqlx::query(
            "SELECT id, name, site_type, location, description FROM sites WHERE id = $1",
        )
        .bind(site_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut site = Self::parse_site_row(&row)?;

        let base_rows = sqlx::query(
            "SELECT id, address FROM base_addresses WHERE site_id = $1 ORDER BY id ASC",
        )
        .bind(site_id)
        .fetch_all(&self.pool)
        .await?;
        for row in base_rows {
            let id: i64 = row.try_get("id")?;
            let address: String = row.try_get("address")?;
            let clients = sqlx::query(
                "SELECT id, address FROM client_addresses WHERE base_id = $1 ORDER BY id ASC",
            )
            .bind(id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|r| -> anyhow::Result<ClientAddress> {
                let address: String = r.try_get("address")?;
                Ok(ClientAddress {
                    id: r.try_get("id")?,
                    address: validate_address(&address)?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
            site.bases
                .push(BaseAddress::new(id, validate_address(&address)?)?.with_clients(clients));
        }

        site.loopbacks = sqlx::query(
            "SELECT id, address FROM loopback_addresses WHERE site_id = $1 ORDER BY id ASC",
        )
        .bind(site_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| -> anyhow::Result<LoopbackAddress> {
            let address: String = r.try_get("address")?;
            Ok(LoopbackAddress {
                id: r.try_get("id")?,
                address: validate_address(&address)?,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Some(site))
    }

    pub async fn list_sites(&self) -> anyhow::Result<Vec<Site>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM sites ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(site) = self.get_site(id).await? {
                out.push(site);
            }
        }
        Ok(out)
    }

    /// Delete a site and its address tree. Returns false when no such site exists.
    #[instrument(skip(self), fields(repo = "store", operation = "delete_site"))]
    pub async fn delete_site(&self, site_id: i64) -> anyhow::Result<bool> {
        let r = sqlx::query("DELETE FROM sites WHERE id = $1")
            .bind(site_id)
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected() > 0)
    }

    fn parse_site_row(row: &SqliteRow) -> anyhow::Result<Site> {
        let site_type: String = row.try_get("site_type")?;
        let site_type = SiteType::from_tag(&site_type)
            .ok_or_else(|| anyhow::anyhow!("unknown site_type {:?}", site_type))?;
        let mut site = Site::new(row.try_get("id")?, row.try_get::<String, _>("name")?, site_type);
        site.location = row.try_get("location")?;
        site.description = row.try_get("description")?;
        Ok(site)
    }

    // --- results ---

    /// Persist one report: an audit_log row (the run) plus one ping_results row per metric.
    pub async fn save_report(&self, report: &SiteReport) -> anyhow::Result<i64> {
        let ids = self.save_reports(std::slice::from_ref(report)).await?;
        ids.into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no run id returned"))
    }

    #[instrument(skip(self, reports), fields(repo = "store", operation = "save_reports", reports_count = reports.len()))]
    pub async fn save_reports(&self, reports: &[SiteReport]) -> anyhow::Result<Vec<i64>> {
        let mut run_ids = Vec::with_capacity(reports.len());
        if reports.is_empty() {
            return Ok(run_ids);
        }
        let mut tx = self.pool.begin().await?;
        for report in reports {
            let created_at = report_created_at(report)?;
            let entry = AuditEntry::from_report(report, created_at);
            let payload = blob::with_version_prefix(
                blob::AUDIT_BLOB_VERSION,
                wincode::serialize(&entry).map_err(|e| anyhow::anyhow!("wincode: {}", e))?,
            );
            let run_id = sqlx::query(
                "INSERT INTO audit_log (created_at, site_id, action, payload) VALUES ($1, $2, $3, $4)",
            )
            .bind(created_at)
            .bind(report.bts_pop_id)
            .bind(&entry.action)
            .bind(&payload)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            for m in report.metrics() {
                sqlx::query(
                    r#"
                    INSERT INTO ping_results
                    (run_id, site_id, created_at, ip_address, ip_type, packets_sent, packets_received,
                     packet_loss_percent, min_rtt_ms, avg_rtt_ms, max_rtt_ms, ttl, status, failure,
                     execution_duration_ms)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                    "#,
                )
                .bind(run_id)
                .bind(report.bts_pop_id)
                .bind(m.timestamp)
                .bind(m.ip_address.to_string())
                .bind(m.ip_type.as_str())
                .bind(m.packets_sent as i64)
                .bind(m.packets_received as i64)
                .bind(m.packet_loss_percent)
                .bind(m.min_rtt_ms)
                .bind(m.avg_rtt_ms)
                .bind(m.max_rtt_ms)
                .bind(m.ttl.map(i64::from))
                .bind(m.status.as_str())
                .bind(m.failure.map(|f| f.as_str()))
                .bind(m.execution_duration_ms)
                .execute(&mut *tx)
                .await?;
            }
            run_ids.push(run_id);
        }
        tx.commit().await?;
        Ok(run_ids)
    }

    /// Most recent metrics for a site, newest first.
    pub async fn get_recent_results(&self, site_id: i64, limit: u32) -> anyhow::Result<Vec<ProbeMetric>> {
        let rows = sqlx::query(
            "SELECT created_at, ip_address, ip_type, packets_sent, packets_received, packet_loss_percent,
                    min_rtt_ms, avg_rtt_ms, max_rtt_ms, ttl, status, failure, execution_duration_ms
             FROM ping_results WHERE site_id = $1 ORDER BY id DESC LIMIT $2",
        )
        .bind(site_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_result_row).collect()
    }

    /// Most recent audit entries, oldest first.
    pub async fn get_recent_audit(&self, limit: u32) -> anyhow::Result<Vec<AuditEntry>> {
        let rows = sqlx::query("SELECT payload FROM audit_log ORDER BY id DESC LIMIT $1")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: Vec<u8> = row.try_get("payload")?;
            match blob::split_version(&payload) {
                (blob::AUDIT_BLOB_VERSION, bytes) => out.push(
                    wincode::deserialize(bytes)
                        .map_err(|e| anyhow::anyhow!("wincode deserialize audit: {}", e))?,
                ),
                (version, _) => {
                    tracing::debug!(version, "skipping audit payload with unknown version");
                }
            }
        }
        out.reverse();
        Ok(out)
    }

    /// Drop results and audit rows older than the retention window.
    #[instrument(skip(self), fields(repo = "store", operation = "prune_old_results"))]
    pub async fn prune_old_results(&self) -> anyhow::Result<u64> {
        let cutoff = now_ms()? - self.retention_ms;
        let results = sqlx::query("DELETE FROM ping_results WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM audit_log WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(results.rows_affected())
    }

    fn parse_result_row(row: &SqliteRow) -> anyhow::Result<ProbeMetric> {
        let ip_address: String = row.try_get("ip_address")?;
        let ip_type: String = row.try_get("ip_type")?;
        let status: String = row.try_get("status")?;
        let failure: Option<String> = row.try_get("failure")?;
        let packets_sent: i64 = row.try_get("packets_sent")?;
        let packets_received: i64 = row.try_get("packets_received")?;
        let ttl: Option<i64> = row.try_get("ttl")?;
        Ok(ProbeMetric {
            ip_address: validate_address(&ip_address)?,
            ip_type: IpRole::from_tag(&ip_type)
                .ok_or_else(|| anyhow::anyhow!("unknown ip_type {:?}", ip_type))?,
            packets_sent: u32::try_from(packets_sent)?,
            packets_received: u32::try_from(packets_received)?,
            packet_loss_percent: row.try_get("packet_loss_percent")?,
            min_rtt_ms: row.try_get("min_rtt_ms")?,
            max_rtt_ms: row.try_get("max_rtt_ms")?,
            avg_rtt_ms: row.try_get("avg_rtt_ms")?,
            ttl: ttl.map(u32::try_from).transpose()?,
            status: Status::from_tag(&status)
                .ok_or_else(|| anyhow::anyhow!("unknown status {:?}", status))?,
            execution_duration_ms: row.try_get("execution_duration_ms")?,
            timestamp: row.try_get("created_at")?,
            failure: failure.as_deref().and_then(FailureKind::from_tag),
        })
    }
}

#[async_trait]
impl TopologySource for SqliteStore {
    async fn load_site(&self, site_id: i64) -> anyhow::Result<Option<Site>> {
        self.get_site(site_id).await
    }
}
