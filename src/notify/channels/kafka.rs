use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rskafka::client::{ClientBuilder, SaslConfig};
use rskafka::client::partition::{Compression, PartitionClient, UnknownTopicHandling};
use rskafka::record::Record;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::config::{KafkaCategories, KafkaConfig};
use crate::notify::{Notifier, NotifyError, Result};

const PRODUCE_TIMEOUT: Duration = Duration::from_secs(5);

/// The JSON event produced for every notification.
///
/// Everything but `tag`, `jenis`, `time` and `subject` is static
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KafkaPayload {
    pub ip_address: String,
    pub protocol: String,
    pub id_rtu: String,
    pub action: String,
    pub address: String,
    pub channel: i64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub ca: i64,
    pub tag: String,
    pub jenis: String,
    pub group: String,
    pub value: f64,
    pub time: i64,
    pub general_action: i64,
    pub subject: String,
}

impl KafkaPayload {
    pub fn for_subject(config: &KafkaConfig, subject: &str, time_millis: i64) -> Self {
        Self {
            ip_address: config.ip_address.clone(),
            protocol: config.protocol.clone(),
            id_rtu: config.id_rtu.clone(),
            action: config.action.clone(),
            address: config.address.clone(),
            channel: config.channel,
            event_type: config.event_type.clone(),
            ca: config.ca,
            tag: tag(subject),
            jenis: category(&config.categories, subject).to_string(),
            group: config.group.clone(),
            value: config.value,
            time: time_millis,
            general_action: config.general_action,
            subject: subject.to_string(),
        }
    }
}

/// Upper-cased subject with spaces removed.
pub fn tag(subject: &str) -> String {
    subject.replace(' ', "").to_uppercase()
}

/// Classify a subject into one of the configured categories.
pub fn category<'a>(categories: &'a KafkaCategories, subject: &str) -> &'a str {
    let upper = subject.to_uppercase();
    if upper.contains("MEMORY BY") || upper.contains("PROC") {
        &categories.memory_by_app
    } else if upper.contains("MEMORY") {
        &categories.memory_server
    } else if upper.contains("DISK") {
        &categories.disk_usage
    } else if upper.contains("CPU") {
        &categories.cpu_usage
    } else {
        &categories.fallback
    }
}

/// Produces one record per notification to partition 0 of the topic.
///
/// The broker connection is opened on first use and reused afterwards.
pub struct KafkaChannel {
    config: KafkaConfig,
    partition: OnceCell<PartitionClient>,
}

impl KafkaChannel {
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        if config.brokers.is_empty() {
            return Err(NotifyError::NotConfigured("kafka has no broker".to_string()));
        }
        if config.topic.is_empty() {
            return Err(NotifyError::NotConfigured("kafka has no topic".to_string()));
        }

        Ok(Self {
            config: config.clone(),
            partition: OnceCell::new(),
        })
    }

    async fn partition(&self) -> Result<&PartitionClient> {
        self.partition
            .get_or_try_init(|| async {
                debug!(
                    brokers = ?self.config.brokers,
                    topic = %self.config.topic,
                    tls = self.config.tls_enable,
                    sasl = self.config.sasl.is_some(),
                    "connecting to kafka"
                );
                let client = client_builder(&self.config)
                    .build()
                    .await
                    .map_err(|e| NotifyError::Kafka(e.to_string()))?;
                client
                    .partition_client(self.config.topic.clone(), 0, UnknownTopicHandling::Retry)
                    .await
                    .map_err(|e| NotifyError::Kafka(e.to_string()))
            })
            .await
    }
}

fn client_builder(config: &KafkaConfig) -> ClientBuilder {
    let mut builder = ClientBuilder::new(config.brokers.clone());
    if let Some(client_id) = &config.client_id {
        builder = builder.client_id(client_id.as_str());
    }
    if let Some(sasl) = &config.sasl {
        builder = builder.sasl_config(SaslConfig::Plain {
            username: sasl.username.clone(),
            password: sasl.password.clone(),
        });
    }
    if config.tls_enable {
        builder = builder.tls_config(tls_config());
    }
    builder
}

fn tls_config() -> Arc<rustls::ClientConfig> {
    let mut roots = rustls::RootCertStore::empty();
    roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|anchor| {
        rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));

    Arc::new(
        rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}

#[async_trait]
impl Notifier for KafkaChannel {
    #[instrument(skip(self, _body))]
    async fn send(&self, subject: &str, _body: &str) -> Result<()> {
        let now = Utc::now();
        let payload = KafkaPayload::for_subject(&self.config, subject, now.timestamp_millis());
        let record = Record {
            key: None,
            value: Some(serde_json::to_vec(&payload)?),
            headers: BTreeMap::new(),
            timestamp: now,
        };

        let produce = async {
            self.partition()
                .await?
                .produce(vec![record], Compression::NoCompression)
                .await
                .map_err(|e| NotifyError::Kafka(e.to_string()))
        };

        tokio::time::timeout(PRODUCE_TIMEOUT, produce)
            .await
            .map_err(|_| NotifyError::Kafka(format!("produce timed out after {PRODUCE_TIMEOUT:?}")))??;
        Ok(())
    }

    fn name(&self) -> &str {
        "kafka"
    }
}
