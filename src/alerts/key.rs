use std::fmt;

use serde::{Serialize, Serializer};

use crate::endpoint::AgentEndpoint;

/// The metric family an alert belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Cpu,
    Mem,
    Disk,
    Proc,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Mem => "mem",
            MetricKind::Disk => "disk",
            MetricKind::Proc => "proc",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one alert condition: endpoint, metric and an optional
/// sub-key (mountpoint for disks, pid for processes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub endpoint: AgentEndpoint,
    pub kind: MetricKind,
    pub sub_key: Option<String>,
}

impl AlertKey {
    pub fn cpu(endpoint: &AgentEndpoint) -> Self {
        Self::new(endpoint, MetricKind::Cpu, None)
    }

    pub fn mem(endpoint: &AgentEndpoint) -> Self {
        Self::new(endpoint, MetricKind::Mem, None)
    }

    pub fn disk(endpoint: &AgentEndpoint, mountpoint: &str) -> Self {
        Self::new(endpoint, MetricKind::Disk, Some(mountpoint.to_string()))
    }

    pub fn process(endpoint: &AgentEndpoint, pid: i32) -> Self {
        Self::new(endpoint, MetricKind::Proc, Some(pid.to_string()))
    }

    fn new(endpoint: &AgentEndpoint, kind: MetricKind, sub_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.clone(),
            kind,
            sub_key,
        }
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.endpoint, self.kind)?;
        if let Some(sub_key) = &self.sub_key {
            write!(f, "|{sub_key}")?;
        }
        Ok(())
    }
}

impl Serialize for AlertKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
