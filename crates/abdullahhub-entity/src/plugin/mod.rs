//! Plugin catalog entities.

pub mod model;
pub mod runtime;

pub use model::{CreatePlugin, Plugin, PluginSummary};
pub use runtime::PluginRuntime;
