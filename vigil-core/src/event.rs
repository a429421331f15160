//! Audit event structures and types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;

/// Before/after snapshot of the object being audited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTarget {
    /// Type name of the audited object.
    #[serde(rename = "type")]
    pub target_type: String,

    /// Value of the object when the audited operation started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<serde_json::Value>,

    /// Value of the object when the audited operation ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<serde_json::Value>,
}

impl AuditTarget {
    /// Create a new target snapshot for the given type name.
    pub fn new(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            old: None,
            new: None,
        }
    }

    /// Set the starting value.
    pub fn with_old(mut self, old: serde_json::Value) -> Self {
        self.old = Some(old);
        self
    }

    /// Set the final value.
    pub fn with_new(mut self, new: serde_json::Value) -> Self {
        self.new = Some(new);
        self
    }
}

/// Execution environment captured alongside an audit event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEnvironment {
    /// Operating system user running the audited code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// Host the audited code ran on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_name: Option<String>,

    /// Domain or realm of the host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,

    /// Locale the audited code ran under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,
}

/// Base audit event record.
///
/// Represents one audited operation. Arbitrary caller-defined data rides in
/// `custom_fields`, which is flattened into the serialized document so that
/// custom fields appear as top-level properties and survive round-trips
/// through any provider.
///
/// Custom event types embed an `AuditEvent` with `#[serde(flatten)]` and
/// implement [`AuditEventRecord`]; see the trait docs for an example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Kind of operation being audited (e.g. "order.update").
    pub event_type: String,

    /// Environment the operation ran in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<AuditEnvironment>,

    /// When the audited operation started.
    pub start_date: DateTime<Utc>,

    /// When the audited operation ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    /// Duration of the audited operation in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Before/after snapshot of the audited object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<AuditTarget>,

    /// Caller-defined fields, flattened into the serialized event.
    #[serde(flatten)]
    pub custom_fields: HashMap<String, serde_json::Value>,
}

impl AuditEvent {
    /// Create a new audit event of the given type, started now.
    ///
    /// # Examples
    ///
    /// ```
    /// use vigil_core::{AuditEvent, AuditTarget};
    /// use serde_json::json;
    ///
    /// let event = AuditEvent::new("user.login")
    ///     .with_custom_field("ip", json!("10.0.0.1"));
    /// ```
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            environment: None,
            start_date: Utc::now(),
            end_date: None,
            duration_ms: None,
            target: None,
            custom_fields: HashMap::new(),
        }
    }

    /// Set the environment.
    pub fn with_environment(mut self, environment: AuditEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Set the end date.
    pub fn with_end_date(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Set the duration.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Set the target snapshot.
    pub fn with_target(mut self, target: AuditTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Add a custom field.
    pub fn with_custom_field(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.custom_fields.insert(key.into(), value);
        self
    }

    /// Set a custom field on an existing event.
    pub fn set_custom_field(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.custom_fields.insert(key.into(), value);
    }

    /// Convert to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Trait for event types the providers can store and retrieve.
///
/// The base [`AuditEvent`] implements this trait; custom types embed the
/// base with `#[serde(flatten)]` so that subtype-specific fields serialize
/// next to the base fields and round-trip without loss.
///
/// # Example
///
/// ```
/// use vigil_core::{AuditEvent, AuditEventRecord};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct OrderAuditEvent {
///     #[serde(flatten)]
///     base: AuditEvent,
///     order_number: String,
/// }
///
/// impl AuditEventRecord for OrderAuditEvent {
///     fn base(&self) -> &AuditEvent {
///         &self.base
///     }
///     fn base_mut(&mut self) -> &mut AuditEvent {
///         &mut self.base
///     }
/// }
/// ```
pub trait AuditEventRecord: Serialize + DeserializeOwned + Send + Sync {
    /// Borrow the base audit event.
    fn base(&self) -> &AuditEvent;

    /// Mutably borrow the base audit event.
    fn base_mut(&mut self) -> &mut AuditEvent;
}

impl AuditEventRecord for AuditEvent {
    fn base(&self) -> &AuditEvent {
        self
    }

    fn base_mut(&mut self) -> &mut AuditEvent {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_builder() {
        let event = AuditEvent::new("user.login")
            .with_target(AuditTarget::new("Session").with_new(json!("active")))
            .with_custom_field("ip", json!("10.0.0.1"));

        assert_eq!(event.event_type, "user.login");
        assert_eq!(event.target.as_ref().unwrap().target_type, "Session");
        assert_eq!(event.custom_fields["ip"], json!("10.0.0.1"));
    }

    #[test]
    fn test_custom_fields_flatten_to_top_level() {
        let event = AuditEvent::new("test").with_custom_field("myCustomField", json!("value"));
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["myCustomField"], json!("value"));
        assert_eq!(value["eventType"], json!("test"));
    }

    #[test]
    fn test_event_round_trip() {
        let event = AuditEvent::new("order.update")
            .with_duration_ms(12)
            .with_target(
                AuditTarget::new("Order")
                    .with_old(json!("Created"))
                    .with_new(json!("Updated")),
            )
            .with_custom_field("tenant", json!("acme"));

        let json = event.to_json().unwrap();
        let back: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct CustomAuditEvent {
        #[serde(flatten)]
        base: AuditEvent,
        custom_property: String,
    }

    impl AuditEventRecord for CustomAuditEvent {
        fn base(&self) -> &AuditEvent {
            &self.base
        }
        fn base_mut(&mut self) -> &mut AuditEvent {
            &mut self.base
        }
    }

    #[test]
    fn test_subtype_round_trip_preserves_all_fields() {
        let event = CustomAuditEvent {
            base: AuditEvent::new("custom").with_custom_field("extra", json!(42)),
            custom_property: "test".to_string(),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["custom_property"], json!("test"));
        assert_eq!(value["extra"], json!(42));

        let back: CustomAuditEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }
}
