//! Kafka audit data provider implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use vigil_core::{
    AuditDataProvider, AuditError, AuditEvent, AuditEventRecord, AuditResult, EventSelector,
    Setting,
};

/// Topic used when no topic setting is configured or the configured
/// selector yields no value.
pub const DEFAULT_TOPIC: &str = "audit-topic";

/// Serializes a message key of type `K` to bytes.
type KeySerializer<K> = Arc<dyn Fn(&K) -> AuditResult<Vec<u8>> + Send + Sync>;

/// Serializes the JSON form of an audit event to message payload bytes.
type ValueSerializer = Arc<dyn Fn(&serde_json::Value) -> AuditResult<Vec<u8>> + Send + Sync>;

/// Computes message headers from an audit event.
type HeadersSelector = EventSelector<Vec<(String, Vec<u8>)>>;

/// Called with the delivery report of every produced message.
type ResultHandler = Arc<dyn Fn(&DeliveryReport) -> AuditResult<()> + Send + Sync>;

/// Applied to the client configuration right before the producer is built.
type ProducerCustomizer = Arc<dyn Fn(&mut ClientConfig) + Send + Sync>;

/// Delivery report for a produced audit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Topic the message was written to.
    pub topic: String,
    /// Partition the message landed on.
    pub partition: i32,
    /// Offset assigned by the broker.
    pub offset: i64,
}

/// Apache Kafka audit data provider.
///
/// Produces one message per inserted event. The destination topic and
/// partition are resolved per event from [`Setting`]s; an unset topic falls
/// back to [`DEFAULT_TOPIC`] and an unset partition leaves the choice to
/// the broker. Messages are optionally keyed: `K` is the key type, the key
/// selector computes a key per event, and the identifier returned from
/// insert is that (possibly absent) key.
///
/// The producer handle is built lazily on first use, exactly once per
/// provider instance, even under concurrent callers. A failed build is not
/// cached; the next call retries from scratch.
pub struct KafkaDataProvider<K = ()> {
    client_config: ClientConfig,
    producer: OnceCell<FutureProducer>,
    topic: Setting<String>,
    partition: Setting<i32>,
    key_selector: Option<EventSelector<K>>,
    key_serializer: Option<KeySerializer<K>>,
    value_serializer: Option<ValueSerializer>,
    headers_selector: Option<HeadersSelector>,
    result_handler: Option<ResultHandler>,
    producer_customizer: Option<ProducerCustomizer>,
    queue_timeout: Duration,
}

impl<K> KafkaDataProvider<K>
where
    K: Serialize + Clone + Send + Sync + 'static,
{
    /// Create a provider from a raw `rdkafka` client configuration.
    pub fn new(client_config: ClientConfig) -> Self {
        Self {
            client_config,
            producer: OnceCell::new(),
            topic: Setting::default(),
            partition: Setting::default(),
            key_selector: None,
            key_serializer: None,
            value_serializer: None,
            headers_selector: None,
            result_handler: None,
            producer_customizer: None,
            queue_timeout: Duration::from_secs(5),
        }
    }

    /// Create a provider for the given bootstrap broker list.
    pub fn from_brokers(brokers: impl AsRef<str>) -> Self {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", brokers.as_ref());
        Self::new(config)
    }

    /// Set a constant destination topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Setting::value(topic.into());
        self
    }

    /// Set the topic as a per-event setting.
    pub fn with_topic_setting(mut self, topic: Setting<String>) -> Self {
        self.topic = topic;
        self
    }

    /// Set a constant destination partition.
    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = Setting::value(partition);
        self
    }

    /// Set the partition as a per-event setting. Unset, or a selector
    /// yielding `None`, means any partition.
    pub fn with_partition_setting(mut self, partition: Setting<i32>) -> Self {
        self.partition = partition;
        self
    }

    /// Set the message key selector. Without one, messages are unkeyed.
    pub fn with_key_selector(
        mut self,
        selector: impl Fn(&AuditEvent) -> AuditResult<Option<K>> + Send + Sync + 'static,
    ) -> Self {
        self.key_selector = Some(Arc::new(selector));
        self
    }

    /// Set a custom key serializer. Defaults to JSON + UTF-8.
    pub fn with_key_serializer(
        mut self,
        serializer: impl Fn(&K) -> AuditResult<Vec<u8>> + Send + Sync + 'static,
    ) -> Self {
        self.key_serializer = Some(Arc::new(serializer));
        self
    }

    /// Set a custom payload serializer, applied to the JSON form of the
    /// event. Defaults to JSON + UTF-8.
    pub fn with_value_serializer(
        mut self,
        serializer: impl Fn(&serde_json::Value) -> AuditResult<Vec<u8>> + Send + Sync + 'static,
    ) -> Self {
        self.value_serializer = Some(Arc::new(serializer));
        self
    }

    /// Set the message headers selector. Without one, messages carry no
    /// headers.
    pub fn with_headers_selector(
        mut self,
        selector: impl Fn(&AuditEvent) -> AuditResult<Option<Vec<(String, Vec<u8>)>>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.headers_selector = Some(Arc::new(selector));
        self
    }

    /// Set a handler called with the delivery report of every produced
    /// message. A handler error surfaces to the caller, but the write has
    /// already committed by then.
    pub fn with_result_handler(
        mut self,
        handler: impl Fn(&DeliveryReport) -> AuditResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.result_handler = Some(Arc::new(handler));
        self
    }

    /// Set a callback applied to the client configuration right before the
    /// producer is built. Runs last, so it can override any setting.
    pub fn with_producer_customizer(
        mut self,
        customizer: impl Fn(&mut ClientConfig) + Send + Sync + 'static,
    ) -> Self {
        self.producer_customizer = Some(Arc::new(customizer));
        self
    }

    /// Set how long a produce call may wait for space in the local queue.
    pub fn with_queue_timeout(mut self, timeout: Duration) -> Self {
        self.queue_timeout = timeout;
        self
    }

    /// Get the underlying producer, building it on first use.
    ///
    /// The build runs exactly once per provider instance even under
    /// concurrent callers; every caller observes the same handle. A build
    /// failure leaves the handle unset and the next call retries.
    pub fn producer(&self) -> AuditResult<&FutureProducer> {
        self.producer.get_or_try_init(|| self.build_producer())
    }

    fn build_producer(&self) -> AuditResult<FutureProducer> {
        let mut config = self.client_config.clone();
        if let Some(customize) = &self.producer_customizer {
            customize(&mut config);
        }
        debug!("Building Kafka producer");
        config
            .create()
            .map_err(|e| AuditError::Configuration(e.to_string()))
    }

    /// Resolve the destination topic and partition for an event.
    ///
    /// Pure computation over the configured settings; selector errors
    /// propagate unmodified.
    pub fn resolve_destination(&self, event: &AuditEvent) -> AuditResult<(String, Option<i32>)> {
        let topic = self
            .topic
            .resolve(event)?
            .unwrap_or_else(|| DEFAULT_TOPIC.to_string());
        let partition = self.partition.resolve(event)?;
        Ok((topic, partition))
    }

    fn message_key(&self, event: &AuditEvent) -> AuditResult<Option<K>> {
        match &self.key_selector {
            Some(selector) => selector(event),
            None => Ok(None),
        }
    }

    fn serialize_key(&self, key: &K) -> AuditResult<Vec<u8>> {
        match &self.key_serializer {
            Some(serializer) => serializer(key),
            None => Ok(serde_json::to_vec(key)?),
        }
    }

    fn message_headers(&self, event: &AuditEvent) -> AuditResult<Option<Vec<(String, Vec<u8>)>>> {
        match &self.headers_selector {
            Some(selector) => selector(event),
            None => Ok(None),
        }
    }

    fn serialize_value(&self, value: &serde_json::Value) -> AuditResult<Vec<u8>> {
        match &self.value_serializer {
            Some(serializer) => serializer(value),
            None => Ok(serde_json::to_vec(value)?),
        }
    }

    async fn produce<E>(
        &self,
        event: &E,
        cancel: Option<&CancellationToken>,
    ) -> AuditResult<Option<K>>
    where
        E: AuditEventRecord,
    {
        let producer = self.producer()?;

        let base = event.base();
        let (topic, partition) = self.resolve_destination(base)?;
        let key = self.message_key(base)?;
        let key_bytes = match &key {
            Some(key) => Some(self.serialize_key(key)?),
            None => None,
        };
        let headers = self.message_headers(base)?;
        let value = serde_json::to_value(event)?;
        let payload = self.serialize_value(&value)?;

        let mut record = FutureRecord::<[u8], [u8]>::to(&topic).payload(payload.as_slice());
        if let Some(key_bytes) = &key_bytes {
            record = record.key(key_bytes.as_slice());
        }
        if let Some(partition) = partition {
            record = record.partition(partition);
        }
        if let Some(headers) = &headers {
            let mut owned = OwnedHeaders::new();
            for (name, value) in headers {
                owned = owned.insert(Header {
                    key: name,
                    value: Some(value.as_slice()),
                });
            }
            record = record.headers(owned);
        }

        debug!(topic = %topic, event_type = %base.event_type, "Producing audit event");

        let send = producer.send(record, self.queue_timeout);
        let delivery = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(AuditError::Cancelled),
                delivery = send => delivery,
            },
            None => send.await,
        };

        let (partition, offset) =
            delivery.map_err(|(e, _)| AuditError::RemoteWrite(e.to_string()))?;

        if let Some(handler) = &self.result_handler {
            handler(&DeliveryReport {
                topic,
                partition,
                offset,
            })?;
        }

        Ok(key)
    }
}

#[async_trait]
impl<K> AuditDataProvider for KafkaDataProvider<K>
where
    K: Serialize + Clone + Send + Sync + 'static,
{
    /// The (possibly absent) message key of the produced message. Kafka is
    /// append-only, so the identifier addresses no single record; it is
    /// returned for parity with the other providers.
    type Id = Option<K>;

    async fn insert_event<E>(&self, event: &E) -> AuditResult<Self::Id>
    where
        E: AuditEventRecord,
    {
        self.produce(event, None).await
    }

    async fn insert_event_cancellable<E>(
        &self,
        event: &E,
        cancel: &CancellationToken,
    ) -> AuditResult<Self::Id>
    where
        E: AuditEventRecord,
    {
        self.produce(event, Some(cancel)).await
    }

    /// Kafka has no true replace; the event is produced as another message.
    async fn replace_event<E>(&self, _id: &Self::Id, event: &E) -> AuditResult<()>
    where
        E: AuditEventRecord,
    {
        self.produce(event, None).await.map(|_| ())
    }

    async fn replace_event_cancellable<E>(
        &self,
        _id: &Self::Id,
        event: &E,
        cancel: &CancellationToken,
    ) -> AuditResult<()>
    where
        E: AuditEventRecord,
    {
        self.produce(event, Some(cancel)).await.map(|_| ())
    }

    // get_event stays unsupported: the broker is write-only in this design.
}

impl<K> std::fmt::Debug for KafkaDataProvider<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaDataProvider")
            .field("topic", &self.topic)
            .field("partition", &self.partition)
            .field("producer_built", &self.producer.get().is_some())
            .finish()
    }
}
