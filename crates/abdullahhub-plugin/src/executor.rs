//! Plugin execution with a scratch directory, timeout, and panic isolation.
//!
//! Each call runs in its own spawned task so that a panicking builtin
//! becomes a failed execution. The task is aborted on timeout, which also
//! kills a command plugin's child process. Every call appends a record to
//! the execution log.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use abdullahhub_core::error::{AppError, ErrorKind};

use crate::context::ExecutionContext;
use crate::error::PluginError;
use crate::log::{ExecutionLog, ExecutionRecord};
use crate::output::ExecutionOutcome;
use crate::registry::PluginRegistry;
use crate::traits::Invocation;

/// Failures that prevent a plugin from producing an answer.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// No plugin is loaded under this slug.
    #[error("Plugin not loaded: {0}")]
    NotLoaded(String),

    /// The plugin did not finish in time.
    #[error("Plugin execution timed out after {0} seconds")]
    Timeout(u64),

    /// The plugin panicked.
    #[error("Plugin crashed: {0}")]
    Panicked(String),

    /// The plugin task was cancelled before finishing.
    #[error("Plugin execution was cancelled")]
    Cancelled,

    /// The plugin raised or broke the output contract.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// The scratch directory could not be prepared.
    #[error("Failed to prepare execution sandbox: {0}")]
    Sandbox(#[from] std::io::Error),
}

impl From<ExecutorError> for AppError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::NotLoaded(_) => AppError::not_found(err.to_string()),
            other => AppError::with_source(ErrorKind::Plugin, other.to_string(), other),
        }
    }
}

/// Runs loaded plugins.
#[derive(Debug, Clone)]
pub struct PluginExecutor {
    registry: Arc<PluginRegistry>,
    temp_dir: PathBuf,
    timeout: Duration,
    log: Arc<ExecutionLog>,
}

impl PluginExecutor {
    /// Create an executor over `registry`.
    pub fn new(
        registry: Arc<PluginRegistry>,
        temp_dir: impl Into<PathBuf>,
        timeout: Duration,
        log: Arc<ExecutionLog>,
    ) -> Self {
        Self {
            registry,
            temp_dir: temp_dir.into(),
            timeout,
            log,
        }
    }

    /// Execute the plugin registered under `slug`.
    pub async fn execute(
        &self,
        slug: &str,
        context: ExecutionContext,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        let start = Instant::now();
        let plugin_id = context.plugin_id.clone();
        let user_id = context.user_id.clone();

        let result = self.run(slug, context).await;

        let duration_ms = start.elapsed().as_millis() as u64;
        let (status, error) = match &result {
            Ok(ExecutionOutcome::Succeeded(_)) => ("success", None),
            Ok(ExecutionOutcome::Declined { error, .. }) => ("failed", Some(error.clone())),
            Err(e) => ("error", Some(e.to_string())),
        };

        match &result {
            Err(e) => error!(plugin = %slug, user_id = %user_id, duration_ms, error = %e, "Plugin execution failed"),
            Ok(_) => info!(plugin = %slug, user_id = %user_id, duration_ms, status, "Plugin executed"),
        }

        self.log
            .append(&ExecutionRecord {
                plugin_id,
                user_id,
                status: status.to_string(),
                error,
                duration_ms,
                timestamp: Utc::now(),
            })
            .await;

        result
    }

    async fn run(
        &self,
        slug: &str,
        context: ExecutionContext,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        let loaded = self
            .registry
            .get(slug)
            .await
            .ok_or_else(|| ExecutorError::NotLoaded(slug.to_string()))?;

        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix("sandbox_")
            .tempdir_in(&self.temp_dir)?;

        let invocation = Invocation {
            context,
            scratch_dir: scratch.path().to_path_buf(),
        };
        let plugin = loaded.plugin.clone();
        let handle = tokio::spawn(async move { plugin.execute(invocation).await });
        let abort = handle.abort_handle();

        let result = match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(Ok(output))) => ExecutionOutcome::from_output(output).map_err(Into::into),
            Ok(Ok(Err(e))) => Err(ExecutorError::Plugin(e)),
            Ok(Err(join)) if join.is_panic() => {
                Err(ExecutorError::Panicked(panic_message(join.into_panic())))
            }
            Ok(Err(_)) => Err(ExecutorError::Cancelled),
            Err(_) => {
                abort.abort();
                Err(ExecutorError::Timeout(self.timeout.as_secs().max(1)))
            }
        };

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!(path = %scratch_path.display(), error = %e, "Failed to remove scratch directory");
        }

        result
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::log::ExecutionRecord;
    use crate::manifest::PluginManifest;
    use crate::output;
    use crate::registry::LoadedPlugin;
    use crate::traits::Plugin;

    #[derive(Debug)]
    enum Behaviour {
        Echo,
        Decline,
        Raise,
        Panic,
        Sleep,
    }

    #[derive(Debug)]
    struct TestPlugin {
        behaviour: Behaviour,
        seen_scratch: Mutex<Option<PathBuf>>,
    }

    #[async_trait]
    impl Plugin for TestPlugin {
        async fn execute(&self, invocation: Invocation) -> Result<Value, PluginError> {
            if let Ok(mut seen) = self.seen_scratch.lock() {
                *seen = Some(invocation.scratch_dir.clone());
            }
            match self.behaviour {
                Behaviour::Echo => {
                    tokio::fs::write(invocation.scratch_dir.join("out.txt"), b"x").await?;
                    Ok(output::success(json!({"echo": invocation.context.input})))
                }
                Behaviour::Decline => Ok(output::failure("No image provided")),
                Behaviour::Raise => Err(PluginError::Raised("boom".into())),
                Behaviour::Panic => panic!("plugin exploded"),
                Behaviour::Sleep => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(output::success(json!({})))
                }
            }
        }
    }

    async fn setup(
        behaviour: Behaviour,
    ) -> (PluginExecutor, Arc<TestPlugin>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let plugin = Arc::new(TestPlugin {
            behaviour,
            seen_scratch: Mutex::new(None),
        });
        let registry = Arc::new(PluginRegistry::new());
        registry
            .insert(
                "test",
                LoadedPlugin {
                    plugin: plugin.clone(),
                    manifest: PluginManifest::with_defaults("test"),
                    directory: dir.path().to_path_buf(),
                    loaded_at: Utc::now(),
                },
            )
            .await;
        let log = Arc::new(ExecutionLog::new(dir.path().join("exec.log")));
        let executor = PluginExecutor::new(
            registry,
            dir.path().join("tmp"),
            Duration::from_millis(200),
            log,
        );
        (executor, plugin, dir)
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new("user-1", "plugin-1").with_input(json!({"k": "v"}))
    }

    async fn log_lines(dir: &tempfile::TempDir) -> Vec<ExecutionRecord> {
        tokio::fs::read_to_string(dir.path().join("exec.log"))
            .await
            .unwrap_or_default()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_success_cleans_scratch_and_logs() {
        let (executor, plugin, dir) = setup(Behaviour::Echo).await;
        let outcome = executor.execute("test", context()).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.into_body()["result"]["echo"], json!({"k": "v"}));

        let scratch = plugin.seen_scratch.lock().unwrap().clone().unwrap();
        assert!(!scratch.exists());

        let lines = log_lines(&dir).await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].status, "success");
        assert_eq!(lines[0].plugin_id, "plugin-1");
    }

    #[tokio::test]
    async fn test_declined_is_an_outcome() {
        let (executor, _, dir) = setup(Behaviour::Decline).await;
        let outcome = executor.execute("test", context()).await.unwrap();
        assert_eq!(outcome.error(), Some("No image provided"));
        assert_eq!(log_lines(&dir).await[0].status, "failed");
    }

    #[tokio::test]
    async fn test_raise_and_panic_are_errors() {
        let (executor, _, _dir) = setup(Behaviour::Raise).await;
        let err = executor.execute("test", context()).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");

        let (executor, _, dir) = setup(Behaviour::Panic).await;
        let err = executor.execute("test", context()).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Panicked(ref m) if m.contains("exploded")));
        assert_eq!(log_lines(&dir).await[0].status, "error");
    }

    #[tokio::test]
    async fn test_timeout() {
        let (executor, _, _dir) = setup(Behaviour::Sleep).await;
        let err = executor.execute("test", context()).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_unknown_slug() {
        let (executor, _, _dir) = setup(Behaviour::Echo).await;
        let err = executor.execute("missing", context()).await.unwrap_err();
        assert!(matches!(err, ExecutorError::NotLoaded(_)));
        let app: AppError = err.into();
        assert_eq!(app.kind, ErrorKind::NotFound);
    }
}
