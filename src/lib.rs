pub mod actors;
pub mod agent;
pub mod alerts;
#[cfg(feature = "api")]
pub mod api;
pub mod collector;
pub mod config;
pub mod endpoint;
pub mod notify;
pub mod state;
pub mod storage;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default bound for the top-processes list.
pub const DEFAULT_TOP_PROCESSES: usize = 5;

/// One snapshot of a host, produced by a single collection.
///
/// The JSON shape is what agents serve on `/metrics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metrics {
    pub hostname: String,
    pub uptime_seconds: u64,
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub disks: Vec<DiskInfo>,
    #[serde(rename = "topProcsByMem")]
    pub top_processes: Vec<ProcessInfo>,
    pub generated_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CpuInfo {
    pub cores: i32,
    pub used_percent: f64,
    pub model_name: String,
}

/// Memory usage in bytes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryInfo {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub used_percent: f64,
}

/// Usage of a single mount point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiskInfo {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub used_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessInfo {
    pub pid: i32,
    pub name: String,
    pub username: String,
    #[serde(rename = "rssBytes")]
    pub resident_bytes: u64,
    #[serde(rename = "percentRAM")]
    pub percent_ram: f32,
    pub cmdline: String,
}

/// `part / total * 100`, or `0` when `total` is zero.
pub fn percent_of(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

impl Metrics {
    /// Recompute every derived percentage and bound the process list to `top_n`.
    ///
    /// Process order is kept as delivered; both agents and the SSH command
    /// already rank by resident memory.
    pub fn normalize(mut self, top_n: usize) -> Self {
        self.memory.used_percent = percent_of(self.memory.used, self.memory.total);

        for disk in &mut self.disks {
            disk.used_percent = percent_of(disk.used, disk.total);
        }

        self.top_processes.truncate(top_n);
        let total_memory = self.memory.total;
        for process in &mut self.top_processes {
            process.percent_ram = percent_of(process.resident_bytes, total_memory) as f32;
        }

        self
    }
}
