//! # Vigil OpenSearch
//!
//! OpenSearch audit data provider.
//!
//! Indexes audit events as JSON documents and supports typed retrieval by
//! the identifier returned at insert time. The provider is a thin adapter
//! over the official `opensearch` client: each insert resolves a
//! destination `(index, document id)` from the event, indexes the event's
//! JSON form, and returns an [`OpenSearchAuditEventId`]. The client handle
//! is built lazily, exactly once per provider instance, and shared across
//! concurrent callers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use vigil_core::{AuditDataProvider, AuditEvent};
//! use vigil_opensearch::{OpenSearchConfig, OpenSearchDataProvider};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = OpenSearchDataProvider::new(
//!         OpenSearchConfig::new("http://localhost:9200"),
//!     )
//!     .with_index("auditevent-orders");
//!
//!     let event = AuditEvent::new("order.create").with_custom_field("tenant", json!("acme"));
//!     let id = provider.insert_event(&event).await?;
//!
//!     let loaded: Option<AuditEvent> = provider.get_event(&id).await?;
//!     assert!(loaded.is_some());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod provider;

pub use config::OpenSearchConfig;
pub use provider::{DEFAULT_INDEX, OpenSearchAuditEventId, OpenSearchDataProvider};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{OpenSearchAuditEventId, OpenSearchConfig, OpenSearchDataProvider};
    pub use vigil_core::prelude::*;
}
