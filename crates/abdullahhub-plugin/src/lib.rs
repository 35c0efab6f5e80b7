//! # abdullahhub-plugin
//!
//! Runtime for AbdullahHub plugins. A plugin is a directory under the
//! plugin root holding a `plugin.json` manifest. It is either a builtin
//! Rust type registered through a factory, or an external command that
//! reads the execution context as JSON on stdin and answers with one JSON
//! object on stdout.

pub mod analyzer;
pub mod context;
pub mod error;
pub mod executor;
pub mod loader;
pub mod log;
pub mod manifest;
pub mod output;
pub mod process;
pub mod registry;
pub mod requirements;
pub mod traits;

pub use analyzer::{AnalysisReport, AnalyzerError, AnalyzerLimits, PluginAnalyzer, ScriptLanguage};
pub use context::{ExecutionContext, InputFile};
pub use error::PluginError;
pub use executor::{ExecutorError, PluginExecutor};
pub use loader::{BuiltinFactory, PluginLoader};
pub use log::ExecutionLog;
pub use manifest::{EntryPoint, PluginManifest, RuntimeKind};
pub use output::ExecutionOutcome;
pub use registry::{LoadedPluginInfo, PluginRegistry};
pub use traits::{Invocation, Plugin};
