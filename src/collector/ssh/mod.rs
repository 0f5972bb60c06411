mod parse;
mod session;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument};

use crate::config::HostKeyPolicy;
use crate::endpoint::AgentEndpoint;
use crate::{CpuInfo, Metrics};

use super::{CollectError, Collector};

pub use parse::{core_count, cpu_usage, disks, memory, model_name, processes, uptime_seconds};
pub use session::SshSession;

/// Something that can run a command on the remote host and return its stdout.
#[async_trait]
pub trait RemoteShell: Send {
    async fn run(&mut self, command: &str) -> Result<String, CollectError>;
}

const CPU_COMMAND: &str = "top -bn2 -d 0.5";
const CORES_COMMAND: &str = "nproc";
const MODEL_COMMAND: &str = "grep -m1 'model name' /proc/cpuinfo";
const MEMORY_COMMAND: &str = "cat /proc/meminfo";
const DISKS_COMMAND: &str = "df -P -B1";
const HOSTNAME_COMMAND: &str = "hostname";
const UPTIME_COMMAND: &str = "cat /proc/uptime";

fn processes_command(top_n: usize) -> String {
    format!("ps -eo pid,comm,user,rss --no-headers | sort -k4 -nr | head -n {top_n}")
}

/// Run one command, degrading any failure to `None`.
async fn run_or_skip<S>(shell: &mut S, command: &str) -> Option<String>
where
    S: RemoteShell + ?Sized,
{
    match shell.run(command).await {
        Ok(output) => Some(output),
        Err(e) => {
            debug!("`{command}` failed: {e}");
            None
        }
    }
}

/// Assemble a snapshot from the fixed set of read-only commands.
///
/// A failing command leaves its section at the zero value; it never fails
/// the whole collection.
pub async fn collect_with_shell<S>(shell: &mut S, top_n: usize) -> Metrics
where
    S: RemoteShell + ?Sized,
{
    let used_percent = run_or_skip(shell, CPU_COMMAND)
        .await
        .and_then(|out| cpu_usage(&out))
        .unwrap_or_default();
    let cores = run_or_skip(shell, CORES_COMMAND)
        .await
        .and_then(|out| core_count(&out))
        .unwrap_or_default();
    let model_name = run_or_skip(shell, MODEL_COMMAND)
        .await
        .and_then(|out| model_name(&out))
        .unwrap_or_default();

    let memory = run_or_skip(shell, MEMORY_COMMAND)
        .await
        .map(|out| memory(&out))
        .unwrap_or_default();
    let disks = run_or_skip(shell, DISKS_COMMAND)
        .await
        .map(|out| disks(&out))
        .unwrap_or_default();
    let top_processes = run_or_skip(shell, &processes_command(top_n))
        .await
        .map(|out| processes(&out, memory.total))
        .unwrap_or_default();

    let hostname = run_or_skip(shell, HOSTNAME_COMMAND)
        .await
        .map(|out| out.trim().to_string())
        .unwrap_or_default();
    let uptime_seconds = run_or_skip(shell, UPTIME_COMMAND)
        .await
        .and_then(|out| uptime_seconds(&out))
        .unwrap_or_default();

    Metrics {
        hostname,
        uptime_seconds,
        cpu: CpuInfo {
            cores,
            used_percent,
            model_name,
        },
        memory,
        disks,
        top_processes,
        generated_at_utc: Utc::now(),
    }
    .normalize(top_n)
}

/// Collects over a fresh password-authenticated SSH session per call.
pub struct SshCollector {
    top_n: usize,
    host_keys: HostKeyPolicy,
}

impl SshCollector {
    pub fn new(top_n: usize, host_keys: HostKeyPolicy) -> Self {
        Self { top_n, host_keys }
    }
}

#[async_trait]
impl Collector for SshCollector {
    #[instrument(skip_all, fields(agent = %endpoint))]
    async fn collect(&self, endpoint: &AgentEndpoint) -> Result<Metrics, CollectError> {
        let target = endpoint.ssh_target()?;
        let mut session = SshSession::connect(&target, &self.host_keys).await?;

        let metrics = collect_with_shell(&mut session, self.top_n).await;
        session.close().await;

        Ok(metrics)
    }
}
