use std::collections::HashSet;

use serde::Serialize;

use crate::Metrics;
use crate::config::Thresholds;
use crate::endpoint::AgentEndpoint;

use super::{ActiveAlerts, AlertKey, MetricKind};

/// Where a single value stands relative to its threshold, given whether
/// its alert was already active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdEvaluation {
    /// Below threshold, nothing active
    Ok,
    /// At or above threshold, alert already active
    Exceeding,
    /// At or above threshold for the first time
    StartsToExceed,
    /// Below threshold with an active alert
    BackToOk,
}

impl ThresholdEvaluation {
    pub fn evaluate(value: f64, threshold: f64, active: bool) -> Self {
        match (value >= threshold, active) {
            (true, false) => ThresholdEvaluation::StartsToExceed,
            (true, true) => ThresholdEvaluation::Exceeding,
            (false, true) => ThresholdEvaluation::BackToOk,
            (false, false) => ThresholdEvaluation::Ok,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Raised,
    Recovered,
}

/// One raise or recovery, ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertTransition {
    pub key: AlertKey,
    pub state: AlertState,
    pub subject: String,
    pub body: String,
}

impl AlertTransition {
    pub fn is_recovery(&self) -> bool {
        self.state == AlertState::Recovered
    }
}

/// Evaluation context for one snapshot of one endpoint.
struct Evaluator<'a> {
    endpoint: &'a AgentEndpoint,
    host: &'a str,
    active: ActiveAlerts,
    transitions: Vec<AlertTransition>,
}

impl Evaluator<'_> {
    /// Apply one threshold check, emitting a transition on a state change.
    fn check(
        &mut self,
        key: AlertKey,
        value: f64,
        threshold: f64,
        raise: impl FnOnce() -> (String, String),
        recover: impl FnOnce() -> (String, String),
    ) -> ThresholdEvaluation {
        let evaluation = ThresholdEvaluation::evaluate(value, threshold, self.active.contains(&key));

        match evaluation {
            ThresholdEvaluation::StartsToExceed => {
                let (subject, body) = raise();
                self.active.insert(key.clone());
                self.transitions.push(AlertTransition {
                    key,
                    state: AlertState::Raised,
                    subject,
                    body,
                });
            }
            ThresholdEvaluation::BackToOk => {
                let (subject, body) = recover();
                self.active.remove(&key);
                self.transitions.push(AlertTransition {
                    key,
                    state: AlertState::Recovered,
                    subject,
                    body,
                });
            }
            ThresholdEvaluation::Ok | ThresholdEvaluation::Exceeding => {}
        }

        evaluation
    }
}

/// Compare a fresh snapshot against the thresholds.
///
/// Returns the transitions to notify and the updated active set. The
/// previous set is never mutated, so this is safe to call on a copy.
///
/// Process alerts whose pid is no longer confirmed above threshold in this
/// snapshot are recovered as well. A process that merely dropped out of the
/// top-`top_n` list is treated as recovered even if its usage did not change.
pub fn evaluate(
    previous: &ActiveAlerts,
    endpoint: &AgentEndpoint,
    metrics: &Metrics,
    thresholds: &Thresholds,
    top_n: usize,
) -> (Vec<AlertTransition>, ActiveAlerts) {
    let host = if metrics.hostname.is_empty() {
        endpoint.masked()
    } else {
        metrics.hostname.as_str()
    };
    let mut eval = Evaluator {
        endpoint,
        host,
        active: previous.clone(),
        transitions: Vec::new(),
    };

    let cpu = metrics.cpu.used_percent;
    eval.check(
        AlertKey::cpu(endpoint),
        cpu,
        thresholds.cpu,
        || {
            (
                format!("[ALERT] {host} CPU high"),
                format!("CPU used {cpu:.1}% (threshold {:.1}%)", thresholds.cpu),
            )
        },
        || (format!("[RECOVERED] {host} CPU"), format!("CPU back to {cpu:.1}%")),
    );

    let mem = metrics.memory.used_percent;
    eval.check(
        AlertKey::mem(endpoint),
        mem,
        thresholds.mem,
        || {
            (
                format!("[ALERT] {host} memory high"),
                format!("Memory used {mem:.1}% (threshold {:.1}%)", thresholds.mem),
            )
        },
        || {
            (
                format!("[RECOVERED] {host} memory"),
                format!("Memory back to {mem:.1}%"),
            )
        },
    );

    for disk in &metrics.disks {
        let mount = disk.mountpoint.as_str();
        let used = disk.used_percent;
        eval.check(
            AlertKey::disk(endpoint, mount),
            used,
            thresholds.disk,
            || {
                (
                    format!("[ALERT] {host} disk {mount} high"),
                    format!(
                        "Disk {mount} used {used:.1}% (threshold {:.1}%)",
                        thresholds.disk
                    ),
                )
            },
            || {
                (
                    format!("[RECOVERED] {host} disk {mount}"),
                    format!("Disk {mount} back to {used:.1}%"),
                )
            },
        );
    }

    let mut confirmed_above = HashSet::new();
    for process in &metrics.top_processes {
        let key = AlertKey::process(endpoint, process.pid);
        let (name, pid) = (process.name.as_str(), process.pid);
        let ram = f64::from(process.percent_ram);

        let evaluation = eval.check(
            key.clone(),
            ram,
            thresholds.proc,
            || {
                (
                    format!("[ALERT] {host} proc {name}({pid}) RAM high"),
                    format!(
                        "Process {name}({pid}) uses {ram:.1}% RAM (th {:.1}%)",
                        thresholds.proc
                    ),
                )
            },
            || {
                (
                    format!("[RECOVERED] {host} proc {name}({pid}) RAM"),
                    format!("Process {name}({pid}) back to {ram:.1}% RAM"),
                )
            },
        );
        if matches!(
            evaluation,
            ThresholdEvaluation::StartsToExceed | ThresholdEvaluation::Exceeding
        ) {
            confirmed_above.insert(key);
        }
    }

    sweep_processes(&mut eval, &confirmed_above, thresholds.proc, top_n);

    (eval.transitions, eval.active)
}

/// Recover every active process alert of the endpoint not confirmed above
/// threshold in this snapshot.
fn sweep_processes(
    eval: &mut Evaluator<'_>,
    confirmed_above: &HashSet<AlertKey>,
    threshold: f64,
    top_n: usize,
) {
    let mut stale: Vec<AlertKey> = eval
        .active
        .for_endpoint(eval.endpoint)
        .filter(|key| key.kind == MetricKind::Proc && !confirmed_above.contains(key))
        .cloned()
        .collect();
    stale.sort_by(|a, b| a.sub_key.cmp(&b.sub_key));

    for key in stale {
        let pid = key.sub_key.clone().unwrap_or_default();
        eval.active.remove(&key);
        eval.transitions.push(AlertTransition {
            subject: format!("[RECOVERED] {} proc ({pid}) RAM", eval.host),
            body: format!(
                "Process {pid} left the top-{top_n} list or dropped below {threshold:.1}%"
            ),
            key,
            state: AlertState::Recovered,
        });
    }
}
