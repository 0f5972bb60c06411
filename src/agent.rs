//! Local sampling for the agent binary.

use chrono::Utc;
use sysinfo::{Disks, MINIMUM_CPU_UPDATE_INTERVAL, System, Users};
use tracing::{instrument, trace};

use crate::{CpuInfo, DiskInfo, MemoryInfo, Metrics, ProcessInfo};

/// Take one snapshot of this host.
///
/// Blocks for at least [`MINIMUM_CPU_UPDATE_INTERVAL`] so the CPU usage has two
/// samples to compare; call it from a blocking context.
#[instrument]
pub fn sample_local_metrics(top_n: usize) -> Metrics {
    let mut sys = System::new_all();
    std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();

    let cpus = sys.cpus();
    let cpu = CpuInfo {
        cores: cpus.len() as i32,
        used_percent: f64::from(sys.global_cpu_usage()),
        model_name: cpus
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .unwrap_or_default(),
    };

    let total = sys.total_memory();
    let memory = MemoryInfo {
        total,
        used: total.saturating_sub(sys.available_memory()),
        free: sys.free_memory(),
        used_percent: 0.0,
    };

    let disks = Disks::new_with_refreshed_list()
        .iter()
        .map(|disk| {
            let total = disk.total_space();
            let free = disk.available_space();
            DiskInfo {
                device: disk.name().to_string_lossy().into_owned(),
                mountpoint: disk.mount_point().to_string_lossy().into_owned(),
                fstype: disk.file_system().to_string_lossy().into_owned(),
                total,
                used: total.saturating_sub(free),
                free,
                used_percent: 0.0,
            }
        })
        .collect();

    let users = Users::new_with_refreshed_list();
    let processes = sys
        .processes()
        .iter()
        .map(|(pid, process)| ProcessInfo {
            pid: pid.as_u32() as i32,
            name: process.name().to_string_lossy().into_owned(),
            username: process
                .user_id()
                .and_then(|uid| users.get_user_by_id(uid))
                .map(|user| user.name().to_string())
                .unwrap_or_default(),
            resident_bytes: process.memory(),
            percent_ram: 0.0,
            cmdline: process
                .cmd()
                .iter()
                .map(|arg| arg.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" "),
        })
        .collect();

    let metrics = Metrics {
        hostname: System::host_name().unwrap_or_default(),
        uptime_seconds: System::uptime(),
        cpu,
        memory,
        disks,
        top_processes: top_by_memory(processes, top_n),
        generated_at_utc: Utc::now(),
    }
    .normalize(top_n);

    trace!(
        cpu = metrics.cpu.used_percent,
        mem = metrics.memory.used_percent,
        "sampled local metrics"
    );
    metrics
}

/// The `top_n` processes with the largest resident set, largest first.
pub fn top_by_memory(mut processes: Vec<ProcessInfo>, top_n: usize) -> Vec<ProcessInfo> {
    processes.sort_by(|a, b| {
        b.resident_bytes
            .cmp(&a.resident_bytes)
            .then(a.pid.cmp(&b.pid))
    });
    processes.truncate(top_n);
    processes
}
