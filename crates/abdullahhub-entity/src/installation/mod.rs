//! Per-user plugin installations.

pub mod model;

pub use model::{PluginInstallation, merge_config};
