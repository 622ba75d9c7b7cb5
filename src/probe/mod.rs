// Probe executor: one external reachability check per call.
// The trait is the seam; `CommandExecutor` spawns the system ping, tests inject fakes.

mod command;

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::FailureKind;

pub use command::CommandExecutor;

/// Textual format of raw probe output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// iputils / BSD `ping` summary ("packets transmitted", "rtt min/avg/max").
    Unix,
    /// Windows `ping.exe` summary ("Packets: Sent = ..").
    Windows,
}

impl Dialect {
    pub fn host() -> Self {
        if cfg!(windows) {
            Dialect::Windows
        } else {
            Dialect::Unix
        }
    }

    /// Guess the dialect from output text; `None` when neither summary marker is present.
    pub fn detect(text: &str) -> Option<Self> {
        if text.contains("Packets: Sent =") {
            Some(Dialect::Windows)
        } else if text.contains("packets transmitted") {
            Some(Dialect::Unix)
        } else {
            None
        }
    }
}

/// Stdout of a completed probe run, including runs where nothing was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProbeOutput {
    pub text: String,
    pub dialect: Dialect,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionFailure {
    #[error("probe timed out after {after:?}")]
    Timeout { after: Duration },
    #[error("probe execution failed: {message}")]
    ExecutionError { message: String },
}

impl ExecutionFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExecutionFailure::Timeout { .. } => FailureKind::Timeout,
            ExecutionFailure::ExecutionError { .. } => FailureKind::ExecutionError,
        }
    }
}

#[async_trait]
pub trait ProbeExecutor: Send + Sync {
    /// Run one probe of `count` packets against `address`, bounded by `timeout` wall-clock.
    async fn execute(
        &self,
        address: Ipv4Addr,
        count: u32,
        timeout: Duration,
    ) -> Result<RawProbeOutput, ExecutionFailure>;
}
