//! The SSH collection pipeline over a scripted shell

use async_trait::async_trait;
use fleetwatch::collector::CollectError;
use fleetwatch::collector::ssh::{RemoteShell, collect_with_shell};
use pretty_assertions::assert_eq;

const TOP: &str = "\
top - 10:00:00 up 1 day,  1 user,  load average: 0.00, 0.01, 0.05
%Cpu(s):  1.0 us,  1.0 sy,  0.0 ni, 98.0 id,  0.0 wa,  0.0 hi,  0.0 si,  0.0 st
top - 10:00:01 up 1 day,  1 user,  load average: 0.00, 0.01, 0.05
%Cpu(s): 20.0 us,  5.0 sy,  0.0 ni, 75.0 id,  0.0 wa,  0.0 hi,  0.0 si,  0.0 st
";

const MEMINFO: &str = "\
MemTotal:        8000000 kB
MemFree:         1000000 kB
MemAvailable:    2000000 kB
";

const DF: &str = "\
Filesystem     1024-blocks      Used Available Capacity Mounted on
/dev/sda1        1000  900  100  90% /
tmpfs            100     0  100   0% /run/user data
";

const PS: &str = "\
 1234 postgres  postgres 3000000
   77 nginx     www-data  400000
";

struct FakeHost;

#[async_trait]
impl RemoteShell for FakeHost {
    async fn run(&mut self, command: &str) -> Result<String, CollectError> {
        let output = match command {
            c if c.starts_with("top") => TOP,
            "nproc" => "8\n",
            c if c.starts_with("grep") => "model name\t: Intel(R) Xeon(R) CPU E5-2680\n",
            "cat /proc/meminfo" => MEMINFO,
            c if c.starts_with("df") => DF,
            c if c.starts_with("ps") => PS,
            "hostname" => "scadanas\n",
            "cat /proc/uptime" => "3600.52 7000.00\n",
            other => return Err(CollectError::Command(other.to_string())),
        };
        Ok(output.to_string())
    }
}

#[tokio::test]
async fn test_full_snapshot_from_commands() {
    let metrics = collect_with_shell(&mut FakeHost, 5).await;

    assert_eq!(metrics.hostname, "scadanas");
    assert_eq!(metrics.uptime_seconds, 3600);
    assert_eq!(metrics.cpu.cores, 8);
    assert_eq!(metrics.cpu.used_percent, 25.0);
    assert_eq!(metrics.cpu.model_name, "Intel(R) Xeon(R) CPU E5-2680");

    assert_eq!(metrics.memory.total, 8_000_000 * 1024);
    assert_eq!(metrics.memory.used_percent, 75.0);

    assert_eq!(metrics.disks.len(), 2);
    assert_eq!(metrics.disks[0].mountpoint, "/");
    assert_eq!(metrics.disks[0].used_percent, 90.0);
    assert_eq!(metrics.disks[1].mountpoint, "/run/user data");

    assert_eq!(metrics.top_processes.len(), 2);
    assert_eq!(metrics.top_processes[0].pid, 1234);
    assert_eq!(metrics.top_processes[0].username, "postgres");
    assert_eq!(metrics.top_processes[0].resident_bytes, 3_000_000 * 1024);
}
