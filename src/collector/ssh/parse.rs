//! Parsers for the output of the remote commands.
//!
//! All of them are lenient: unparsable lines are skipped and missing
//! values come back as `None` or an empty collection.

use std::sync::LazyLock;

use regex::Regex;

use crate::{DiskInfo, MemoryInfo, ProcessInfo};

static IDLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)\s*id").expect("idle pattern is a valid regex"));

/// CPU usage from `top -bn2` output: `100 - idle` of the last `Cpu` line.
///
/// The first iteration of `top` reports averages since boot, so only the
/// last one is meaningful.
pub fn cpu_usage(top_output: &str) -> Option<f64> {
    let line = top_output
        .lines()
        .filter(|line| line.contains("Cpu(s)") || line.trim_start().starts_with("%Cpu"))
        .last()?;

    let idle: f64 = IDLE_PATTERN.captures(line)?.get(1)?.as_str().parse().ok()?;
    Some((100.0 - idle).clamp(0.0, 100.0))
}

pub fn core_count(nproc_output: &str) -> Option<i32> {
    nproc_output.trim().parse().ok()
}

/// Value of the first `model name` line of `/proc/cpuinfo`.
pub fn model_name(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .find(|line| line.starts_with("model name"))
        .and_then(|line| line.split_once(':'))
        .map(|(_, model)| model.trim().to_string())
}

/// `MemTotal` and `MemAvailable` from `/proc/meminfo`, converted from kB.
pub fn memory(meminfo: &str) -> MemoryInfo {
    let mut total = 0;
    let mut available = 0;

    for line in meminfo.lines() {
        let mut fields = line.split_whitespace();
        let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Ok(kib) = value.parse::<u64>() else {
            continue;
        };
        match key {
            "MemTotal:" => total = kib * 1024,
            "MemAvailable:" => available = kib * 1024,
            _ => {}
        }
    }

    let used = total.saturating_sub(available);
    MemoryInfo {
        total,
        used,
        free: available,
        used_percent: crate::percent_of(used, total),
    }
}

/// Mounted filesystems from `df -P -B1`.
///
/// The header and rows with fewer than six columns are skipped.
pub fn disks(df_output: &str) -> Vec<DiskInfo> {
    df_output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 || fields[0] == "Filesystem" {
                return None;
            }
            let total = fields[1].parse().unwrap_or(0);
            let used = fields[2].parse().unwrap_or(0);

            Some(DiskInfo {
                device: fields[0].to_string(),
                mountpoint: fields[5..].join(" "),
                fstype: String::new(),
                total,
                used,
                free: fields[3].parse().unwrap_or(0),
                used_percent: crate::percent_of(used, total),
            })
        })
        .collect()
}

/// Rows of `ps -eo pid,comm,user,rss`, kept in the order delivered.
pub fn processes(ps_output: &str, total_memory: u64) -> Vec<ProcessInfo> {
    ps_output
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return None;
            }
            let pid = fields[0].parse().ok()?;
            let resident_bytes = fields[3].parse::<u64>().unwrap_or(0) * 1024;

            Some(ProcessInfo {
                pid,
                name: fields[1].to_string(),
                username: fields[2].to_string(),
                resident_bytes,
                percent_ram: crate::percent_of(resident_bytes, total_memory) as f32,
                cmdline: String::new(),
            })
        })
        .collect()
}

/// Whole seconds from the first column of `/proc/uptime`.
pub fn uptime_seconds(proc_uptime: &str) -> Option<u64> {
    let seconds: f64 = proc_uptime.split_whitespace().next()?.parse().ok()?;
    Some(seconds as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TOP: &str = "\
top - 10:00:00 up 1 day,  1 user,  load average: 0.00, 0.01, 0.05
%Cpu(s): 50.0 us,  5.0 sy,  0.0 ni, 45.0 id,  0.0 wa,  0.0 hi,  0.0 si,  0.0 st
MiB Mem :   7940.0 total
top - 10:00:01 up 1 day,  1 user,  load average: 0.00, 0.01, 0.05
%Cpu(s):  5.2 us,  2.1 sy,  0.0 ni, 92.4 id,  0.3 wa,  0.0 hi,  0.0 si,  0.0 st
";

    #[test]
    fn test_cpu_uses_last_iteration() {
        let usage = cpu_usage(TOP).unwrap();
        assert!((usage - 7.6).abs() < 1e-9);
    }

    #[test]
    fn test_cpu_busybox_format() {
        let usage = cpu_usage("CPU:  Cpu(s): 10.0 us, 0.0 sy, 0.0 ni,90.0 id").unwrap();
        assert!((usage - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpu_without_cpu_line() {
        assert_eq!(cpu_usage("bash: top: command not found"), None);
        assert_eq!(cpu_usage(""), None);
    }

    #[test]
    fn test_cpu_line_without_idle_field() {
        assert_eq!(cpu_usage("%Cpu(s):  3.0 us,  1.0 sy"), None);
        // the shared pattern keeps working across calls
        assert_eq!(cpu_usage("%Cpu(s): 25.0 us, 75.0 id"), Some(25.0));
    }

    #[test]
    fn test_model_name() {
        let cpuinfo = "processor\t: 0\nvendor_id\t: GenuineIntel\nmodel name\t: Intel(R) Xeon(R) CPU @ 2.20GHz\nmodel name\t: other\n";
        assert_eq!(
            model_name(cpuinfo).as_deref(),
            Some("Intel(R) Xeon(R) CPU @ 2.20GHz")
        );
        assert_eq!(model_name("processor : 0"), None);
    }

    #[test]
    fn test_core_count() {
        assert_eq!(core_count("16\n"), Some(16));
        assert_eq!(core_count(""), None);
    }

    #[test]
    fn test_memory_from_meminfo() {
        let meminfo = "MemTotal:        1000 kB\nMemFree:          100 kB\nMemAvailable:     250 kB\n";
        let mem = memory(meminfo);
        assert_eq!(mem.total, 1_024_000);
        assert_eq!(mem.free, 256_000);
        assert_eq!(mem.used, 768_000);
        assert_eq!(mem.used_percent, 75.0);
    }

    #[test]
    fn test_memory_empty_is_zero() {
        assert_eq!(memory(""), MemoryInfo::default());
    }

    #[test]
    fn test_disks_skip_short_rows() {
        let df = "\
Filesystem     1-blocks      Used Available Capacity Mounted on
/dev/sda1      1000           900       100      90% /
tmpfs          0                0         0       -  /dev/shm
/dev/mapper/very-long-volume-name
garbage
";
        let disks = disks(df);
        assert_eq!(disks.len(), 2);
        assert_eq!(disks[0].mountpoint, "/");
        assert_eq!(disks[0].used_percent, 90.0);
        assert_eq!(disks[1].mountpoint, "/dev/shm");
        assert_eq!(disks[1].used_percent, 0.0);
    }

    #[test]
    fn test_processes_keep_order() {
        let ps = "  812 java  app 512000\n   42 postgres pg 256000\nbroken line\n";
        let procs = processes(ps, 1024 * 1024 * 1000);
        assert_eq!(procs.len(), 2);
        assert_eq!(procs[0].pid, 812);
        assert_eq!(procs[0].username, "app");
        assert_eq!(procs[0].resident_bytes, 512_000 * 1024);
        assert!((procs[1].percent_ram - 25.0).abs() < 1e-3);
    }

    #[test]
    fn test_processes_zero_total_memory() {
        let procs = processes("1 init root 100", 0);
        assert_eq!(procs[0].percent_ram, 0.0);
    }

    #[test]
    fn test_uptime() {
        assert_eq!(uptime_seconds("35462.52 140000.10\n"), Some(35462));
        assert_eq!(uptime_seconds(""), None);
    }
}
