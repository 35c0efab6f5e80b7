//! Append-only JSON-lines log of plugin executions.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// One line of the execution log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Plugin ID from the context.
    pub plugin_id: String,
    /// Calling user.
    pub user_id: String,
    /// `success`, `failed`, or `error`.
    pub status: String,
    /// Error message, if any.
    pub error: Option<String>,
    /// Wall time.
    pub duration_ms: u64,
    /// Completion time.
    pub timestamp: DateTime<Utc>,
}

/// Serialised appender for the execution log file.
#[derive(Debug)]
pub struct ExecutionLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ExecutionLog {
    /// Log to `path`; parent directories are created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. Failures are logged and swallowed.
    pub async fn append(&self, record: &ExecutionRecord) {
        if let Err(e) = self.try_append(record).await {
            warn!(path = %self.path.display(), error = %e, "Failed to write execution log");
        }
    }

    async fn try_append(&self, record: &ExecutionRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(record).map_err(std::io::Error::other)?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: &str) -> ExecutionRecord {
        ExecutionRecord {
            plugin_id: "p".into(),
            user_id: "u".into(),
            status: status.into(),
            error: None,
            duration_ms: 5,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = ExecutionLog::new(dir.path().join("logs/plugin_executions.log"));
        log.append(&record("success")).await;
        log.append(&record("error")).await;

        let text = tokio::fs::read_to_string(log.path()).await.unwrap();
        let lines: Vec<ExecutionRecord> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].status, "error");
    }
}
