//! Admin dashboard: counters, host metrics, users, and logs.

pub mod logs;
pub mod service;
pub mod system;

pub use service::{AdminOverview, AdminService, PluginTotals, SystemView};
pub use system::SystemInfo;
