//! # Vigil Core
//!
//! Core contract shared by the Vigil audit data providers.
//!
//! This crate defines:
//! - [`AuditEvent`], the base audit record, and [`AuditEventRecord`], the
//!   trait custom event types implement to round-trip polymorphically
//! - [`AuditDataProvider`], the insert/replace/get contract every provider
//!   implements, with blocking and cancellable twins for each operation
//! - [`Setting`], a per-event configuration value resolved as a constant or
//!   as a function of the event
//! - [`AuditError`], the error taxonomy shared across providers
//!
//! Providers live in their own crates (`vigil-kafka`, `vigil-opensearch`)
//! and only depend on the contract defined here.
//!
//! ## Example
//!
//! ```rust
//! use vigil_core::{AuditEvent, AuditTarget};
//! use serde_json::json;
//!
//! let event = AuditEvent::new("order.update")
//!     .with_target(AuditTarget::new("Order").with_old(json!("Created")))
//!     .with_custom_field("tenant", json!("acme"));
//!
//! assert_eq!(event.event_type, "order.update");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod event;
mod provider;
mod setting;

pub mod blocking;

pub use error::{AuditError, AuditResult};
pub use event::{AuditEnvironment, AuditEvent, AuditEventRecord, AuditTarget};
pub use provider::AuditDataProvider;
pub use setting::{EventSelector, Setting};

// Re-exported so callers do not need a direct tokio-util dependency to use
// the cancellable call paths.
pub use tokio_util::sync::CancellationToken;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        AuditDataProvider, AuditError, AuditEvent, AuditEventRecord, AuditResult, AuditTarget,
        CancellationToken, Setting,
    };
}
