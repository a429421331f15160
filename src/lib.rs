// Vigil - audit event data providers for Kafka and OpenSearch.
//
// This umbrella crate re-exports the core audit event model together with
// the provider implementations selected via Cargo features.

// Re-export core functionality
pub use vigil_core::*;

// Re-export optional providers
#[cfg(feature = "kafka")]
pub use vigil_kafka;

#[cfg(feature = "opensearch")]
pub use vigil_opensearch;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        AuditDataProvider,
        AuditError,
        AuditEvent,
        AuditEventRecord,
        AuditResult,
        AuditTarget,
        CancellationToken,
        Setting,
    };

    #[cfg(feature = "kafka")]
    pub use vigil_kafka::KafkaDataProvider;

    #[cfg(feature = "opensearch")]
    pub use vigil_opensearch::{OpenSearchAuditEventId, OpenSearchDataProvider};
}
