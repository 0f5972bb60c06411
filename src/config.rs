use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::{trace, warn};

use crate::endpoint::AgentEndpoint;
use crate::util::is_true;

/// Alert thresholds in percent. A value at or above the threshold raises.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cpu: f64,
    pub mem: f64,
    pub disk: f64,
    pub proc: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu: 90.0,
            mem: 90.0,
            disk: 90.0,
            proc: 90.0,
        }
    }
}

/// Whom to trust when an SSH server presents its host key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    #[default]
    AcceptAny,
    KnownHosts { path: PathBuf },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub host_key_policy: HostKeyPolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub from: String,
    pub password: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SlackConfig {
    pub webhook_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

/// Category overrides for the `jenis` field of Kafka events.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KafkaCategories {
    pub memory_by_app: String,
    pub memory_server: String,
    pub disk_usage: String,
    pub cpu_usage: String,
    pub fallback: String,
}

impl Default for KafkaCategories {
    fn default() -> Self {
        Self {
            memory_by_app: "MEMORY_BY_APLIKASI".to_string(),
            memory_server: "MEMORY_SERVER".to_string(),
            disk_usage: "DISK_USAGE".to_string(),
            cpu_usage: "CPU_USAGE".to_string(),
            fallback: "ALERT_GENERIC".to_string(),
        }
    }
}

/// Static part of every Kafka event plus the producer settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub ip_address: String,
    pub protocol: String,
    pub id_rtu: String,
    pub action: String,
    pub address: String,
    pub channel: i64,
    pub event_type: String,
    pub ca: i64,
    pub group: String,
    pub value: f64,
    pub general_action: i64,
    pub categories: KafkaCategories,
    /// SASL PLAIN login; absent means an unauthenticated connection.
    pub sasl: Option<KafkaSasl>,
    /// Connect over TLS, verified against the bundled web PKI roots.
    pub tls_enable: bool,
    pub client_id: Option<String>,
}

#[derive(Clone, PartialEq, Deserialize)]
pub struct KafkaSasl {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for KafkaSasl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaSasl")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: Vec::new(),
            topic: "datapoint".to_string(),
            ip_address: String::new(),
            protocol: "TCP".to_string(),
            id_rtu: "EXT-30890".to_string(),
            action: "SPONTANEUS".to_string(),
            address: "244444".to_string(),
            channel: 623,
            event_type: "GROUP10_VAR2".to_string(),
            ca: 1,
            group: "fe547e84-3b20-4811-ad51-3fb72d806159".to_string(),
            value: 1.0,
            general_action: 1,
            categories: KafkaCategories::default(),
            sasl: None,
            tls_enable: false,
            client_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub cooldown_secs: u64,
    pub email: Option<EmailConfig>,
    pub slack: Option<SlackConfig>,
    pub discord: Option<DiscordConfig>,
    pub telegram: Option<TelegramConfig>,
    pub kafka: Option<KafkaConfig>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            email: None,
            slack: None,
            discord: None,
            telegram: None,
            kafka: None,
        }
    }
}

impl NotifyConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub bind_addr: String,
    pub auth_token: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            auth_token: None,
        }
    }
}

/// Everything the monitoring server needs to run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agents: Vec<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub log_thresholds: bool,
    #[serde(default = "default_collect_timeout")]
    pub collect_timeout_secs: u64,
    #[serde(default = "default_top_processes")]
    pub top_processes: usize,
    #[serde(default = "default_hub_buffer")]
    pub hub_subscriber_buffer: usize,
    #[serde(default)]
    pub ssh: SshConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub api: ApiSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agents: Vec::new(),
            poll_interval_secs: default_poll_interval(),
            thresholds: Thresholds::default(),
            log_thresholds: false,
            collect_timeout_secs: default_collect_timeout(),
            top_processes: default_top_processes(),
            hub_subscriber_buffer: default_hub_buffer(),
            ssh: SshConfig::default(),
            notify: NotifyConfig::default(),
            api: ApiSettings::default(),
        }
    }
}

fn default_poll_interval() -> u64 {
    5
}

fn default_collect_timeout() -> u64 {
    5
}

fn default_top_processes() -> usize {
    crate::DEFAULT_TOP_PROCESSES
}

fn default_hub_buffer() -> usize {
    256
}

fn default_cooldown_secs() -> u64 {
    30 * 60
}

fn default_smtp_port() -> u16 {
    587
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let number = |key: &str, default: f64| {
            get(key)
                .and_then(|value| value.parse::<f64>().ok())
                .unwrap_or(default)
        };
        let positive = |key: &str, default: u64| {
            get(key)
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|value| *value > 0)
                .unwrap_or(default)
        };

        let defaults = Config::default();
        let threshold_defaults = Thresholds::default();

        let agents = get("SERVERS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let host_key_policy = match get("SSH_HOST_KEY_POLICY").as_deref() {
            Some("known-hosts") | Some("known_hosts") => HostKeyPolicy::KnownHosts {
                path: get("SSH_KNOWN_HOSTS")
                    .map(PathBuf::from)
                    .unwrap_or_else(default_known_hosts),
            },
            Some("accept-any") | None => HostKeyPolicy::AcceptAny,
            Some(other) => {
                warn!("unknown SSH_HOST_KEY_POLICY {other:?}, accepting any host key");
                HostKeyPolicy::AcceptAny
            }
        };

        let email = match (
            get("EMAIL_SMTP_HOST"),
            get("EMAIL_FROM"),
            get("EMAIL_PASSWORD"),
            get("EMAIL_TO"),
        ) {
            (Some(smtp_host), Some(from), Some(password), Some(to)) => Some(EmailConfig {
                smtp_host,
                smtp_port: get("EMAIL_SMTP_PORT")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_smtp_port),
                from,
                password,
                to,
            }),
            _ => None,
        };

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig {
                bot_token,
                chat_id,
                api_base: default_telegram_api(),
            }),
            _ => None,
        };

        let kafka = get("KAFKA_BROKERS").map(|brokers| {
            let base = KafkaConfig::default();
            let int = |key: &str, default: i64| {
                get(key)
                    .and_then(|value| value.parse::<i64>().ok())
                    .unwrap_or(default)
            };
            let text = |key: &str, default: String| get(key).unwrap_or(default);
            let categories = base.categories.clone();

            KafkaConfig {
                brokers: brokers
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
                topic: text("KAFKA_TOPIC", base.topic),
                ip_address: text("KAFKA_IP_ADDRESS", base.ip_address),
                protocol: text("KAFKA_PROTOCOL", base.protocol),
                id_rtu: text("KAFKA_ID_RTU", base.id_rtu),
                action: text("KAFKA_ACTION", base.action),
                address: text("KAFKA_ADDRESS", base.address),
                channel: int("KAFKA_CHANNEL", base.channel),
                event_type: text("KAFKA_TYPE", base.event_type),
                ca: int("KAFKA_CA", base.ca),
                group: text("KAFKA_GROUP", base.group),
                value: number("KAFKA_VALUE", base.value),
                general_action: int("KAFKA_GENERAL_ACTION", base.general_action),
                categories: KafkaCategories {
                    memory_by_app: text("KAFKA_JENIS_MEM_BY_APP", categories.memory_by_app),
                    memory_server: text("KAFKA_JENIS_MEM_SERVER", categories.memory_server),
                    disk_usage: text("KAFKA_JENIS_DISK_USAGE", categories.disk_usage),
                    cpu_usage: text("KAFKA_JENIS_CPU_USAGE", categories.cpu_usage),
                    fallback: text("KAFKA_JENIS_DEFAULT", categories.fallback),
                },
                sasl: get("KAFKA_USERNAME").map(|username| KafkaSasl {
                    username,
                    password: get("KAFKA_PASSWORD").unwrap_or_default(),
                }),
                tls_enable: get("KAFKA_TLS_ENABLE").is_some_and(|value| is_true(&value)),
                client_id: get("KAFKA_CLIENT_ID"),
            }
        });

        let log_thresholds = get("LOG_THRESHOLDS")
            .or_else(|| get("LOG_THRESHOLD"))
            .is_some_and(|value| is_true(&value));

        Config {
            agents,
            poll_interval_secs: positive("POLL_INTERVAL_SECONDS", defaults.poll_interval_secs),
            thresholds: Thresholds {
                cpu: number("CPU_THRESHOLD_PERCENT", threshold_defaults.cpu),
                mem: number("MEM_THRESHOLD_PERCENT", threshold_defaults.mem),
                disk: number("DISK_THRESHOLD_PERCENT", threshold_defaults.disk),
                proc: number("PROC_RAM_THRESHOLD_PERCENT", threshold_defaults.proc),
            },
            log_thresholds,
            collect_timeout_secs: positive("COLLECT_TIMEOUT_SECONDS", defaults.collect_timeout_secs),
            top_processes: positive("TOP_PROCESSES", defaults.top_processes as u64) as usize,
            hub_subscriber_buffer: positive(
                "HUB_SUBSCRIBER_BUFFER",
                defaults.hub_subscriber_buffer as u64,
            ) as usize,
            ssh: SshConfig { host_key_policy },
            notify: NotifyConfig {
                cooldown_secs: positive("NOTIFY_COOLDOWN_MINUTES", 30) * 60,
                email,
                slack: get("SLACK_WEBHOOK_URL").map(|webhook_url| SlackConfig { webhook_url }),
                discord: get("DISCORD_WEBHOOK_URL").map(|webhook_url| DiscordConfig {
                    webhook_url,
                    user_id: get("DISCORD_USER_ID"),
                }),
                telegram,
                kafka,
            },
            api: ApiSettings {
                bind_addr: get("SERVER_PORT")
                    .map(|port| format!("0.0.0.0:{port}"))
                    .unwrap_or(defaults.api.bind_addr),
                auth_token: get("API_TOKEN"),
            },
        }
    }

    pub fn endpoints(&self) -> Vec<AgentEndpoint> {
        self.agents.iter().map(|a| AgentEndpoint::parse(a)).collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn collect_timeout(&self) -> Duration {
        Duration::from_secs(self.collect_timeout_secs.max(1))
    }
}

fn default_known_hosts() -> PathBuf {
    std::env::var("HOME")
        .map(|home| PathBuf::from(home).join(".ssh").join("known_hosts"))
        .unwrap_or_else(|_| PathBuf::from("known_hosts"))
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config: &Config| trace!("loaded config with {} agents", config.agents.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    use pretty_assertions::assert_eq;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_empty_env() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config, Config::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.notify.cooldown(), Duration::from_secs(1800));
    }

    #[test]
    fn test_servers_are_split_and_trimmed() {
        let config = Config::from_lookup(lookup(&[(
            "SERVERS",
            " http://a:9123 , ssh://u:p@b ,, ",
        )]));
        assert_eq!(config.agents, vec!["http://a:9123", "ssh://u:p@b"]);
        assert_eq!(config.endpoints().len(), 2);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("POLL_INTERVAL_SECONDS", "0"),
            ("MEM_THRESHOLD_PERCENT", "lots"),
            ("DISK_THRESHOLD_PERCENT", "75.5"),
        ]));
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.thresholds.mem, 90.0);
        assert_eq!(config.thresholds.disk, 75.5);
    }

    #[test]
    fn test_log_threshold_alias() {
        let config = Config::from_lookup(lookup(&[("LOG_THRESHOLD", "yes")]));
        assert!(config.log_thresholds);
    }

    #[test]
    fn test_channels_need_complete_settings() {
        let config = Config::from_lookup(lookup(&[
            ("EMAIL_SMTP_HOST", "smtp.example.com"),
            ("EMAIL_FROM", "ops@example.com"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "42"),
            ("SLACK_WEBHOOK_URL", "https://hooks.slack.test/x"),
        ]));
        assert_eq!(config.notify.email, None);
        assert_eq!(
            config.notify.telegram.map(|t| t.chat_id),
            Some("42".to_string())
        );
        assert!(config.notify.slack.is_some());
        assert!(config.notify.discord.is_none());
    }

    #[test]
    fn test_kafka_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("KAFKA_BROKERS", "k1:9092,k2:9092"),
            ("KAFKA_CHANNEL", "7"),
            ("KAFKA_JENIS_CPU_USAGE", "PROCESSOR"),
        ]));
        let kafka = config.notify.kafka.unwrap();
        assert_eq!(kafka.brokers, vec!["k1:9092", "k2:9092"]);
        assert_eq!(kafka.topic, "datapoint");
        assert_eq!(kafka.channel, 7);
        assert_eq!(kafka.categories.cpu_usage, "PROCESSOR");
        assert_eq!(kafka.categories.disk_usage, "DISK_USAGE");
        assert_eq!(kafka.sasl, None);
        assert!(!kafka.tls_enable);
        assert_eq!(kafka.client_id, None);
    }

    #[test]
    fn test_kafka_secured_broker() {
        let config = Config::from_lookup(lookup(&[
            ("KAFKA_BROKERS", "k1:9093"),
            ("KAFKA_USERNAME", "fleet"),
            ("KAFKA_PASSWORD", "hunter2"),
            ("KAFKA_TLS_ENABLE", "true"),
            ("KAFKA_CLIENT_ID", "fleetwatch-prod"),
        ]));
        let kafka = config.notify.kafka.unwrap();

        assert_eq!(
            kafka.sasl,
            Some(KafkaSasl {
                username: "fleet".to_string(),
                password: "hunter2".to_string(),
            })
        );
        assert!(kafka.tls_enable);
        assert_eq!(kafka.client_id.as_deref(), Some("fleetwatch-prod"));
        assert!(!format!("{kafka:?}").contains("hunter2"));
    }

    #[test]
    fn test_kafka_settings_from_file() {
        let config: KafkaConfig = serde_json::from_str(
            r#"{"brokers": ["k1:9093"], "sasl": {"username": "u", "password": "p"}, "tls_enable": true}"#,
        )
        .unwrap();

        assert_eq!(config.sasl.map(|s| s.username), Some("u".to_string()));
        assert!(config.tls_enable);
        assert_eq!(config.topic, "datapoint");
    }

    #[test]
    fn test_known_hosts_policy() {
        let config = Config::from_lookup(lookup(&[
            ("SSH_HOST_KEY_POLICY", "known-hosts"),
            ("SSH_KNOWN_HOSTS", "/etc/fleet/known_hosts"),
        ]));
        assert_eq!(
            config.ssh.host_key_policy,
            HostKeyPolicy::KnownHosts {
                path: PathBuf::from("/etc/fleet/known_hosts")
            }
        );
    }

    #[test]
    fn test_read_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "agents": ["http://10.0.0.1:9123"],
                "thresholds": {{"cpu": 80}},
                "notify": {{"slack": {{"webhook_url": "https://hooks.slack.test/x"}}}}
            }}"#
        )
        .unwrap();

        let config = read_config_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.agents.len(), 1);
        assert_eq!(config.thresholds.cpu, 80.0);
        assert_eq!(config.thresholds.mem, 90.0);
        assert_eq!(config.notify.cooldown_secs, 1800);
        assert_eq!(config.top_processes, 5);
    }

    #[test]
    fn test_read_config_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(read_config_file(file.path().to_str().unwrap()).is_err());
    }
}
