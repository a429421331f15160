//! Per-event configuration settings.

use crate::{AuditEvent, AuditResult};
use std::sync::Arc;

/// A selector computing an optional value from an audit event.
///
/// Selector failures are propagated to the caller unmodified; resolution is
/// never retried and has no side effects.
pub type EventSelector<T> = Arc<dyn Fn(&AuditEvent) -> AuditResult<Option<T>> + Send + Sync>;

/// A configuration value resolved per event.
///
/// A setting is either unset, a constant, or a function of the event. The
/// provider decides what an unset or `None` resolution means (typically a
/// default literal, or "let the remote store choose").
///
/// # Examples
///
/// ```
/// use vigil_core::{AuditEvent, Setting};
///
/// let constant = Setting::value("audit-topic".to_string());
/// let dynamic = Setting::from_fn(|ev: &AuditEvent| Some(format!("audit-{}", ev.event_type)));
///
/// let event = AuditEvent::new("login");
/// assert_eq!(constant.resolve(&event).unwrap().as_deref(), Some("audit-topic"));
/// assert_eq!(dynamic.resolve(&event).unwrap().as_deref(), Some("audit-login"));
/// ```
#[derive(Clone, Default)]
pub enum Setting<T> {
    /// No value configured.
    #[default]
    Unset,
    /// A constant value, used for every event.
    Value(T),
    /// A value computed per event.
    Selector(EventSelector<T>),
}

impl<T: Clone> Setting<T> {
    /// Create a constant setting.
    pub fn value(value: T) -> Self {
        Setting::Value(value)
    }

    /// Create a setting computed per event by an infallible selector.
    pub fn from_fn(selector: impl Fn(&AuditEvent) -> Option<T> + Send + Sync + 'static) -> Self {
        Setting::Selector(Arc::new(move |event| Ok(selector(event))))
    }

    /// Create a setting computed per event by a fallible selector.
    pub fn try_from_fn(
        selector: impl Fn(&AuditEvent) -> AuditResult<Option<T>> + Send + Sync + 'static,
    ) -> Self {
        Setting::Selector(Arc::new(selector))
    }

    /// Resolve the setting against an event.
    ///
    /// Returns `Ok(None)` when the setting is unset or the selector yields
    /// no value; selector errors propagate unmodified.
    pub fn resolve(&self, event: &AuditEvent) -> AuditResult<Option<T>> {
        match self {
            Setting::Unset => Ok(None),
            Setting::Value(value) => Ok(Some(value.clone())),
            Setting::Selector(selector) => selector(event),
        }
    }

    /// Check whether a value or selector is configured.
    pub fn is_set(&self) -> bool {
        !matches!(self, Setting::Unset)
    }
}

impl<T> From<T> for Setting<T> {
    fn from(value: T) -> Self {
        Setting::Value(value)
    }
}

impl<T> std::fmt::Debug for Setting<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Setting::Unset => write!(f, "Setting::Unset"),
            Setting::Value(value) => f.debug_tuple("Setting::Value").field(value).finish(),
            Setting::Selector(_) => write!(f, "Setting::Selector(..)"),
        }
    }
}
