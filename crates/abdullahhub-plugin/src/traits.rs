//! The plugin entry-point contract.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::PluginError;

/// One call of a plugin's entry point.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// The request-scoped context.
    pub context: ExecutionContext,
    /// Fresh directory the plugin may write to; removed afterwards.
    pub scratch_dir: PathBuf,
}

/// Trait every loaded plugin implements.
///
/// `execute` returns the plugin's answer object (`{"success": bool, ...}`).
/// An `Err` means the plugin raised; a declined request is an `Ok` with
/// `success: false`.
#[async_trait]
pub trait Plugin: Send + Sync + std::fmt::Debug {
    /// Run the entry point.
    async fn execute(&self, invocation: Invocation) -> Result<Value, PluginError>;
}
