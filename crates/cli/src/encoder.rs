//! FIT encoding through an external program

use anyhow::{Context, Result};
use async_trait::async_trait;
use bodysync_lib::ports::BinaryEncoder;
use bodysync_lib::render::EncoderEntry;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Runs an encoder command that reads entries as JSON on stdin and writes the
/// artifact to stdout
#[derive(Debug, Clone)]
pub struct ProcessEncoder {
    program: String,
    args: Vec<String>,
}

impl ProcessEncoder {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl BinaryEncoder for ProcessEncoder {
    async fn encode(&self, entries: &[EncoderEntry]) -> Result<Vec<u8>> {
        let input = serde_json::to_vec(entries).context("Failed to serialize encoder entries")?;

        debug!(program = %self.program, entries = entries.len(), "Running encoder");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start encoder {:?}", self.program))?;

        let mut stdin = child.stdin.take().context("Encoder stdin unavailable")?;
        let writer = tokio::spawn(async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for encoder")?;
        let written = writer.await.context("Encoder input task panicked")?;

        if !output.status.success() {
            anyhow::bail!(
                "Encoder exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        written.context("Failed to write encoder input")?;
        if output.stdout.is_empty() {
            anyhow::bail!("Encoder produced no output");
        }

        Ok(output.stdout)
    }
}
