//! The data provider contract.

use crate::{AuditError, AuditEventRecord, AuditResult, blocking};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Contract implemented by every audit data provider.
///
/// A provider translates audit events into writes against a remote store
/// and returns an identifier sufficient to address the written record
/// later. Every mutating operation comes in three flavors sharing one
/// underlying asynchronous implementation:
///
/// - the plain async form
/// - a cancellable form taking a [`CancellationToken`], observed only at
///   the network await point
/// - a `_blocking` form that synchronously waits on the same future
///
/// `get_event` defaults to [`AuditError::Unsupported`]; providers backed by
/// write-only stores keep the default instead of returning empty data.
///
/// Ordering: concurrent calls on different events are independent; the
/// provider gives no cross-call ordering guarantee. Sequential use is
/// assumed for insert/replace pairs on the same identifier.
#[async_trait]
pub trait AuditDataProvider: Send + Sync {
    /// Identifier returned after a successful write, addressing the same
    /// record for a later fetch or replace.
    type Id: Clone + Send + Sync + 'static;

    /// Insert an event and return its identifier.
    async fn insert_event<E>(&self, event: &E) -> AuditResult<Self::Id>
    where
        E: AuditEventRecord;

    /// Insert an event, failing with [`AuditError::Cancelled`] if the token
    /// fires before the write completes. A write already in flight may
    /// still land at the remote store.
    async fn insert_event_cancellable<E>(
        &self,
        event: &E,
        cancel: &CancellationToken,
    ) -> AuditResult<Self::Id>
    where
        E: AuditEventRecord;

    /// Replace the event stored under `id`.
    ///
    /// Providers over append-only stores implement this as another insert;
    /// the identifier semantics stay identical to [`insert_event`].
    ///
    /// [`insert_event`]: AuditDataProvider::insert_event
    async fn replace_event<E>(&self, id: &Self::Id, event: &E) -> AuditResult<()>
    where
        E: AuditEventRecord;

    /// Cancellable twin of [`replace_event`](AuditDataProvider::replace_event).
    async fn replace_event_cancellable<E>(
        &self,
        id: &Self::Id,
        event: &E,
        cancel: &CancellationToken,
    ) -> AuditResult<()>
    where
        E: AuditEventRecord;

    /// Fetch a previously written event by identifier.
    ///
    /// Returns `Ok(None)` when no record exists at the identifier. The type
    /// parameter may be any [`AuditEventRecord`], including the custom
    /// subtype used at insert time.
    async fn get_event<E>(&self, id: &Self::Id) -> AuditResult<Option<E>>
    where
        E: AuditEventRecord,
    {
        let _ = id;
        Err(AuditError::Unsupported("get_event"))
    }

    /// Blocking twin of [`insert_event`](AuditDataProvider::insert_event).
    fn insert_event_blocking<E>(&self, event: &E) -> AuditResult<Self::Id>
    where
        E: AuditEventRecord,
        Self: Sized,
    {
        blocking::wait(self.insert_event(event))
    }

    /// Blocking twin of [`replace_event`](AuditDataProvider::replace_event).
    fn replace_event_blocking<E>(&self, id: &Self::Id, event: &E) -> AuditResult<()>
    where
        E: AuditEventRecord,
        Self: Sized,
    {
        blocking::wait(self.replace_event(id, event))
    }

    /// Blocking twin of [`get_event`](AuditDataProvider::get_event).
    fn get_event_blocking<E>(&self, id: &Self::Id) -> AuditResult<Option<E>>
    where
        E: AuditEventRecord,
        Self: Sized,
    {
        blocking::wait(self.get_event(id))
    }
}
