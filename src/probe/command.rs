// System ping via tokio::process. The address is passed as its own argv entry, never
// through a shell.

use std::net::Ipv4Addr;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{Dialect, ExecutionFailure, ProbeExecutor, RawProbeOutput};

/// Exit codes that still carry a complete summary: 0 = replies, 1 = no reply.
const COMPLETED_EXIT_CODES: [i32; 2] = [0, 1];

pub struct CommandExecutor {
    program: String,
    dialect: Dialect,
    reply_wait: Duration,
}

impl CommandExecutor {
    pub fn new(program: impl Into<String>, dialect: Dialect, reply_wait: Duration) -> Self {
        Self {
            program: program.into(),
            dialect,
            reply_wait,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Argument vector (without program name) for one probe.
    pub fn build_args(&self, address: Ipv4Addr, count: u32) -> Vec<String> {
        match self.dialect {
            Dialect::Unix => vec![
                "-n".into(),
                "-c".into(),
                count.to_string(),
                "-W".into(),
                self.reply_wait.as_secs().max(1).to_string(),
                address.to_string(),
            ],
            Dialect::Windows => vec![
                "-n".into(),
                count.to_string(),
                "-w".into(),
                self.reply_wait.as_millis().max(1).to_string(),
                address.to_string(),
            ],
        }
    }
}

#[async_trait]
impl ProbeExecutor for CommandExecutor {
    async fn execute(
        &self,
        address: Ipv4Addr,
        count: u32,
        timeout: Duration,
    ) -> Result<RawProbeOutput, ExecutionFailure> {
        let args = self.build_args(address, count);
        debug!(program = %self.program, ?args, "spawning probe");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutionFailure::ExecutionError {
                message: format!("spawn {}: {}", self.program, e),
            })?;

        // On expiry the wait future is dropped with the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| ExecutionFailure::ExecutionError {
                message: format!("wait {}: {}", self.program, e),
            })?,
            Err(_) => return Err(ExecutionFailure::Timeout { after: timeout }),
        };

        match output.status.code() {
            Some(code) if COMPLETED_EXIT_CODES.contains(&code) => Ok(RawProbeOutput {
                text: String::from_utf8_lossy(&output.stdout).into_owned(),
                dialect: self.dialect,
            }),
            Some(code) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stderr = stderr.trim();
                Err(ExecutionFailure::ExecutionError {
                    message: if stderr.is_empty() {
                        format!("exit code {}", code)
                    } else {
                        format!("exit code {}: {}", code, stderr)
                    },
                })
            }
            None => Err(ExecutionFailure::ExecutionError {
                message: "terminated by signal".into(),
            }),
        }
    }
}
