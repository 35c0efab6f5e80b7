//! Command plugins: external executables speaking JSON over stdio.
//!
//! The context is written to stdin and stdin is closed. The process must
//! print exactly one JSON object on stdout. It runs in the plugin directory
//! with a cleared environment: only `PATH`, `HOME` (the scratch directory)
//! and `ABDULLAHHUB_PLUGIN_DIR` are set.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::PluginError;
use crate::manifest::EntryPoint;
use crate::traits::{Invocation, Plugin};

const STDERR_LIMIT: usize = 64 * 1024;
const STDERR_TAIL: usize = 500;

/// A plugin backed by an external process.
#[derive(Debug, Clone)]
pub struct CommandPlugin {
    slug: String,
    directory: PathBuf,
    entry: EntryPoint,
    max_output_bytes: usize,
}

impl CommandPlugin {
    /// Create a command plugin rooted at `directory`.
    pub fn new(slug: &str, directory: &Path, entry: EntryPoint, max_output_bytes: usize) -> Self {
        Self {
            slug: slug.to_string(),
            directory: directory.to_path_buf(),
            entry,
            max_output_bytes,
        }
    }

    /// The executable to spawn. Paths with a separator are taken relative
    /// to the plugin directory; bare names are looked up on `PATH`.
    fn program(&self) -> PathBuf {
        let command = Path::new(&self.entry.command);
        if command.is_absolute() || command.components().count() == 1 {
            command.to_path_buf()
        } else {
            self.directory.join(command)
        }
    }
}

#[async_trait]
impl Plugin for CommandPlugin {
    async fn execute(&self, invocation: Invocation) -> Result<Value, PluginError> {
        let payload = serde_json::to_vec(&invocation.context)
            .map_err(|e| PluginError::Raised(format!("Failed to encode context: {e}")))?;

        let mut cmd = Command::new(self.program());
        cmd.args(&self.entry.args)
            .current_dir(&self.directory)
            .env_clear()
            .env("HOME", &invocation.scratch_dir)
            .env("ABDULLAHHUB_PLUGIN_DIR", &self.directory)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(path) = std::env::var_os("PATH") {
            cmd.env("PATH", path);
        }

        debug!(plugin = %self.slug, command = %self.entry.command, "Spawning command plugin");

        let mut child = cmd.spawn().map_err(|e| {
            PluginError::Raised(format!("Failed to start '{}': {e}", self.entry.command))
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PluginError::Raised("stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PluginError::Raised("stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| PluginError::Raised("stderr unavailable".into()))?;

        let write = async move {
            let result = stdin.write_all(&payload).await;
            drop(stdin);
            match result {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        };

        let (written, out, err) = tokio::join!(
            write,
            read_capped(stdout, self.max_output_bytes),
            read_capped(stderr, STDERR_LIMIT)
        );
        written?;
        let (out, overflowed) = out?;
        let (err, _) = err?;

        if overflowed {
            let _ = child.start_kill();
            let _ = child.wait().await;
            return Err(PluginError::InvalidOutput(format!(
                "output exceeds {} bytes",
                self.max_output_bytes
            )));
        }

        let status = child.wait().await?;
        let stderr_text = String::from_utf8_lossy(&err);

        if !status.success() {
            let tail: String = stderr_text
                .chars()
                .rev()
                .take(STDERR_TAIL)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            warn!(
                plugin = %self.slug,
                code = ?status.code(),
                stderr = %tail,
                "Command plugin exited with failure"
            );
            return Err(PluginError::Raised(match status.code() {
                Some(code) => format!("Plugin exited with code {code}: {}", tail.trim()),
                None => "Plugin terminated by signal".to_string(),
            }));
        }

        serde_json::from_slice::<Value>(trim_ascii(&out))
            .map_err(|e| PluginError::InvalidOutput(format!("stdout is not JSON: {e}")))
    }
}

/// Read up to `limit` bytes. The flag is set when more data was available.
async fn read_capped<R: AsyncRead + Unpin>(
    reader: R,
    limit: usize,
) -> std::io::Result<(Vec<u8>, bool)> {
    let mut buf = Vec::new();
    reader.take(limit as u64 + 1).read_to_end(&mut buf).await?;
    let overflowed = buf.len() > limit;
    buf.truncate(limit);
    Ok((buf, overflowed))
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &bytes[start..end]
}
