//! Command executor - runs a delivered command batch on the device

use gadget_shared::{DeviceId, SeqToken};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Result of executing a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Batch processed; safe to acknowledge
    Completed { lines: usize },
    /// Processing failed; the batch must stay queued
    Failed { message: String },
}

/// Executes command batches received from the server
pub struct CommandExecutor {
    device_id: DeviceId,
    /// Program receiving the batch on stdin; log-only when unset
    program: Option<PathBuf>,
}

impl CommandExecutor {
    /// Create a new command executor
    pub fn new(device_id: DeviceId, program: Option<PathBuf>) -> Self {
        Self { device_id, program }
    }

    /// Execute a batch and report whether it may be acknowledged
    pub async fn execute(&self, seq: &SeqToken, batch: &[u8]) -> CommandResult {
        let text = String::from_utf8_lossy(batch);
        let commands: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        info!(
            "Executing batch seq={} for {} ({} commands)",
            seq,
            self.device_id,
            commands.len()
        );

        match &self.program {
            None => {
                for command in &commands {
                    info!("  [{}] {}", self.device_id, command);
                }
                CommandResult::Completed {
                    lines: commands.len(),
                }
            }
            Some(program) => match self.run_program(program, seq, batch).await {
                Ok(()) => CommandResult::Completed {
                    lines: commands.len(),
                },
                Err(message) => CommandResult::Failed { message },
            },
        }
    }

    /// Pipe the batch to the configured program, unmodified
    async fn run_program(&self, program: &Path, seq: &SeqToken, batch: &[u8]) -> Result<(), String> {
        let mut child = Command::new(program)
            .env("GADGET_DEVICE", self.device_id.as_str())
            .env("GADGET_SEQ", seq.as_str())
            .stdin(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to start {}: {}", program.display(), e))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(batch).await {
                Ok(()) => {}
                // Program didn't read its input; its exit status decides
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!("  {} closed stdin early", program.display());
                }
                Err(e) => return Err(format!("failed to write batch: {}", e)),
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| format!("failed to wait for {}: {}", program.display(), e))?;

        if status.success() {
            Ok(())
        } else {
            Err(format!("{} exited with {}", program.display(), status))
        }
    }
}
