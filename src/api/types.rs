//! Response bodies of the REST layer

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Metrics;
use crate::alerts::{AlertKey, MetricKind};

/// Envelope of every `/api/v1` response except health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Status of one monitored server as shown to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Online,
    Offline,
    /// Only process alerts are active
    Warning,
    /// A cpu, memory or disk alert is active
    Alert,
}

impl ServerStatus {
    pub fn project<'a>(
        metrics: Option<&Metrics>,
        active: impl IntoIterator<Item = &'a AlertKey>,
    ) -> Self {
        if metrics.is_none() {
            return ServerStatus::Offline;
        }

        let mut status = ServerStatus::Online;
        for key in active {
            match key.kind {
                MetricKind::Proc => status = ServerStatus::Warning,
                _ => return ServerStatus::Alert,
            }
        }
        status
    }

    pub fn is_online(&self) -> bool {
        !matches!(self, ServerStatus::Offline)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Masked endpoint descriptor
    pub url: String,
    pub status: ServerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    pub last_update: Option<DateTime<Utc>>,
}

/// Response for GET /api/v1/servers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServersResponse {
    pub servers: Vec<ServerInfo>,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl From<MetricKind> for Severity {
    fn from(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Proc => Severity::Warning,
            MetricKind::Cpu | MetricKind::Mem | MetricKind::Disk => Severity::Critical,
        }
    }
}

/// One active alert condition, endpoint masked.
#[derive(Debug, Clone, Serialize)]
pub struct AlertInfo {
    pub id: String,
    pub server_url: String,
    pub hostname: Option<String>,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub sub_key: Option<String>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerHealth {
    pub url: String,
    pub hostname: Option<String>,
    pub status: ServerStatus,
}

/// Response for GET /api/v1/health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub servers: BTreeMap<String, ServerHealth>,
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub alerts: usize,
}
