//! # Vigil Kafka
//!
//! Apache Kafka audit data provider.
//!
//! Publishes audit events as messages to an append-only Kafka topic. The
//! provider is a thin adapter over `rdkafka`'s [`FutureProducer`]: each
//! insert resolves a destination `(topic, partition)` from the event,
//! serializes the event (JSON + UTF-8 by default), and produces one message.
//! The producer handle is built lazily, exactly once per provider instance,
//! and shared across concurrent callers.
//!
//! Kafka is write-only in this design: `get_event` always fails with
//! [`AuditError::Unsupported`](vigil_core::AuditError::Unsupported), and
//! `replace_event` produces another message rather than overwriting.
//!
//! ## Example
//!
//! ```rust,no_run
//! use vigil_core::{AuditDataProvider, AuditEvent, Setting};
//! use vigil_kafka::KafkaDataProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = KafkaDataProvider::<String>::from_brokers("localhost:9092")
//!         .with_topic("audit-orders")
//!         .with_key_selector(|ev| Ok(Some(ev.event_type.clone())));
//!
//!     let key = provider.insert_event(&AuditEvent::new("order.create")).await?;
//!     assert_eq!(key.as_deref(), Some("order.create"));
//!     Ok(())
//! }
//! ```
//!
//! [`FutureProducer`]: rdkafka::producer::FutureProducer

#![warn(missing_docs)]
#![warn(clippy::all)]

mod provider;

pub use provider::{DEFAULT_TOPIC, DeliveryReport, KafkaDataProvider};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{DeliveryReport, KafkaDataProvider};
    pub use vigil_core::prelude::*;
}
