use serde::Deserialize;

use crate::probe::Dialect;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
    /// Reports per batch written by the result writer.
    pub flush_rate: u64,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

fn default_flush_interval_secs() -> u64 {
    5
}

fn default_retention_days() -> u32 {
    30
}

fn default_prune_interval_secs() -> u64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Echo requests per address.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Hard wall-clock limit for one probe process.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
    /// Per-reply wait handed to the ping program.
    #[serde(default = "default_reply_wait_secs")]
    pub reply_wait_secs: u64,
    /// Probes allowed in flight at once within one run.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    /// Upper bound for a whole site run.
    #[serde(default = "default_run_deadline_secs")]
    pub run_deadline_secs: u64,
    #[serde(default = "default_program")]
    pub program: String,
    /// Output dialect of `program`; defaults to the host platform's.
    #[serde(default)]
    pub dialect: Option<Dialect>,
}

pub const DEFAULT_MAX_CONCURRENCY: usize = 16;
/// Upper bound for `probe.timeout_secs` (one hour).
pub const MAX_PROBE_TIMEOUT_SECS: f64 = 3600.0;
/// Upper bound for `probe.run_deadline_secs` (one day).
pub const MAX_RUN_DEADLINE_SECS: u64 = 86_400;

fn default_count() -> u32 {
    4
}

fn default_timeout_secs() -> f64 {
    10.0
}

fn default_reply_wait_secs() -> u64 {
    1
}

fn default_run_deadline_secs() -> u64 {
    120
}

fn default_program() -> String {
    "ping".into()
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            timeout_secs: default_timeout_secs(),
            reply_wait_secs: default_reply_wait_secs(),
            max_concurrency: None,
            run_deadline_secs: default_run_deadline_secs(),
            program: default_program(),
            dialect: None,
        }
    }
}

impl ProbeConfig {
    pub fn effective_dialect(&self) -> Dialect {
        self.dialect.unwrap_or_else(Dialect::host)
    }

    pub fn effective_max_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryConfig {
    /// Pipe-delimited inventory file imported at startup.
    pub path: Option<String>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.flush_rate > 0,
            "database.flush_rate must be > 0, got {}",
            self.database.flush_rate
        );
        anyhow::ensure!(
            self.database.flush_interval_secs > 0,
            "database.flush_interval_secs must be > 0, got {}",
            self.database.flush_interval_secs
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            self.database.prune_interval_secs > 0,
            "database.prune_interval_secs must be > 0, got {}",
            self.database.prune_interval_secs
        );
        anyhow::ensure!(
            self.probe.count > 0,
            "probe.count must be > 0, got {}",
            self.probe.count
        );
        anyhow::ensure!(
            self.probe.timeout_secs.is_finite()
                && self.probe.timeout_secs > 0.0
                && self.probe.timeout_secs <= MAX_PROBE_TIMEOUT_SECS,
            "probe.timeout_secs must be in (0, {}], got {}",
            MAX_PROBE_TIMEOUT_SECS,
            self.probe.timeout_secs
        );
        anyhow::ensure!(
            self.probe.reply_wait_secs > 0,
            "probe.reply_wait_secs must be > 0, got {}",
            self.probe.reply_wait_secs
        );
        anyhow::ensure!(
            self.probe.max_concurrency != Some(0),
            "probe.max_concurrency must be > 0 when set"
        );
        anyhow::ensure!(
            self.probe.run_deadline_secs > 0
                && self.probe.run_deadline_secs <= MAX_RUN_DEADLINE_SECS,
            "probe.run_deadline_secs must be in 1..={}, got {}",
            MAX_RUN_DEADLINE_SECS,
            self.probe.run_deadline_secs
        );
        anyhow::ensure!(
            self.probe.reply_wait_secs <= MAX_PROBE_TIMEOUT_SECS as u64,
            "probe.reply_wait_secs must be <= {}, got {}",
            MAX_PROBE_TIMEOUT_SECS,
            self.probe.reply_wait_secs
        );
        anyhow::ensure!(
            !self.probe.program.trim().is_empty(),
            "probe.program must be non-empty"
        );
        Ok(())
    }
}
