//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of a healthy `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy`.
    pub status: String,
    /// Check time.
    pub timestamp: DateTime<Utc>,
    /// Server version.
    pub version: String,
}

/// Body of an unhealthy `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnhealthyResponse {
    /// `unhealthy`.
    pub status: String,
    /// What failed.
    pub error: String,
}
