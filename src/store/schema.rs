// Table definitions. Gateways are not stored: they are derived from base addresses on read.

use sqlx::SqlitePool;

pub(super) async fn init_topology_tables(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sites (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            site_type TEXT NOT NULL,
            location TEXT,
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS base_addresses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            address TEXT NOT NULL,
            UNIQUE (site_id, address)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS client_addresses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            base_id INTEGER NOT NULL REFERENCES base_addresses(id) ON DELETE CASCADE,
            address TEXT NOT NULL,
            UNIQUE (base_id, address)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS loopback_addresses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            address TEXT NOT NULL,
            UNIQUE (site_id, address)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub(super) async fn init_result_tables(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at INTEGER NOT NULL,
            site_id INTEGER NOT NULL,
            action TEXT NOT NULL,
            payload BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // No FK to sites: results outlive a deleted site until retention prunes them.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ping_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL REFERENCES audit_log(id) ON DELETE CASCADE,
            site_id INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            ip_address TEXT NOT NULL,
            ip_type TEXT NOT NULL,
            packets_sent INTEGER NOT NULL,
            packets_received INTEGER NOT NULL,
            packet_loss_percent REAL NOT NULL,
            min_rtt_ms REAL NOT NULL,
            avg_rtt_ms REAL NOT NULL,
            max_rtt_ms REAL NOT NULL,
            ttl INTEGER,
            status TEXT NOT NULL,
            failure TEXT,
            execution_duration_ms REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_ping_results_site_created ON ping_results(site_id, created_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_log_created_at ON audit_log(created_at)")
        .execute(pool)
        .await?;

    Ok(())
}
