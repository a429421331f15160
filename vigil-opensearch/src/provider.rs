//! OpenSearch audit data provider implementation.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use opensearch::http::StatusCode;
use opensearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use opensearch::{GetParts, IndexParts, OpenSearch, auth::Credentials};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::OpenSearchConfig;
use vigil_core::{
    AuditDataProvider, AuditError, AuditEvent, AuditEventRecord, AuditResult, EventSelector,
    Setting,
};

/// Index used when no index setting is configured or the configured
/// selector yields no value.
pub const DEFAULT_INDEX: &str = "auditevent";

/// Called with the raw index response of every written event.
type ResultHandler = Arc<dyn Fn(&serde_json::Value) -> AuditResult<()> + Send + Sync>;

/// Applied to the transport builder right before the client is built.
type TransportCustomizer = Arc<dyn Fn(TransportBuilder) -> TransportBuilder + Send + Sync>;

/// Identifier of an audit event stored in OpenSearch.
///
/// Returned from insert and sufficient to fetch or replace the same
/// document later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSearchAuditEventId {
    /// Document id, either produced by the id builder or auto-generated by
    /// the store.
    pub id: String,
    /// Index the document lives in.
    pub index: String,
}

impl std::fmt::Display for OpenSearchAuditEventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.index, self.id)
    }
}

/// OpenSearch audit data provider.
///
/// Indexes audit events as JSON documents. The destination index is
/// resolved per event from a [`Setting`] (default [`DEFAULT_INDEX`]); the
/// document id comes from the optional id builder, and an absent or empty
/// id lets the store auto-generate one on insert. Events round-trip
/// polymorphically: fetching with a custom [`AuditEventRecord`] type
/// restores subtype-specific fields and custom fields.
///
/// The client handle is built lazily on first use, exactly once per
/// provider instance, even under concurrent callers. A failed build is not
/// cached; the next call retries from scratch. Alternatively a pre-built
/// client can be supplied with [`from_client`](Self::from_client).
#[derive(Default)]
pub struct OpenSearchDataProvider {
    config: Option<OpenSearchConfig>,
    client: OnceCell<OpenSearch>,
    index: Setting<String>,
    id_builder: Option<EventSelector<String>>,
    result_handler: Option<ResultHandler>,
    transport_customizer: Option<TransportCustomizer>,
}

impl OpenSearchDataProvider {
    /// Create a provider from connection settings.
    pub fn new(config: OpenSearchConfig) -> Self {
        Self {
            config: Some(config),
            ..Self::default()
        }
    }

    /// Create a provider around an already-built client.
    pub fn from_client(client: OpenSearch) -> Self {
        Self {
            client: OnceCell::with_value(client),
            ..Self::default()
        }
    }

    /// Set a constant destination index.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Setting::value(index.into());
        self
    }

    /// Set the index as a per-event setting.
    pub fn with_index_setting(mut self, index: Setting<String>) -> Self {
        self.index = index;
        self
    }

    /// Set the document id builder. An absent or empty id lets the store
    /// auto-generate one on insert.
    pub fn with_id_builder(
        mut self,
        builder: impl Fn(&AuditEvent) -> AuditResult<Option<String>> + Send + Sync + 'static,
    ) -> Self {
        self.id_builder = Some(Arc::new(builder));
        self
    }

    /// Set a handler called with the raw index response of every written
    /// event. A handler error surfaces to the caller, but the write has
    /// already committed by then.
    pub fn with_result_handler(
        mut self,
        handler: impl Fn(&serde_json::Value) -> AuditResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.result_handler = Some(Arc::new(handler));
        self
    }

    /// Set a callback applied to the transport builder right before the
    /// client is built. Runs last, so it can override any setting.
    pub fn with_transport_customizer(
        mut self,
        customizer: impl Fn(TransportBuilder) -> TransportBuilder + Send + Sync + 'static,
    ) -> Self {
        self.transport_customizer = Some(Arc::new(customizer));
        self
    }

    /// Get the underlying client, building it on first use.
    ///
    /// The build runs exactly once per provider instance even under
    /// concurrent callers; every caller observes the same handle. A build
    /// failure leaves the handle unset and the next call retries.
    pub fn client(&self) -> AuditResult<&OpenSearch> {
        self.client.get_or_try_init(|| self.build_client())
    }

    fn build_client(&self) -> AuditResult<OpenSearch> {
        let config = self.config.as_ref().ok_or_else(|| {
            AuditError::Configuration(
                "no connection settings and no pre-built client".to_string(),
            )
        })?;

        let url = config
            .urls
            .first()
            .ok_or_else(|| AuditError::Configuration("no URLs provided".to_string()))?;
        let url = opensearch::http::Url::parse(url)
            .map_err(|e| AuditError::Configuration(format!("invalid URL: {e}")))?;

        debug!(url = %url, "Building OpenSearch client");

        let pool = SingleNodeConnectionPool::new(url);
        let mut builder = TransportBuilder::new(pool)
            .timeout(config.request_timeout)
            .disable_proxy();

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.auth(Credentials::Basic(user.clone(), pass.clone()));
        }

        if let Some(customize) = &self.transport_customizer {
            builder = customize(builder);
        }

        let transport = builder
            .build()
            .map_err(|e| AuditError::Configuration(e.to_string()))?;

        Ok(OpenSearch::new(transport))
    }

    /// Resolve the destination index and document id for an event.
    ///
    /// Pure computation over the configured settings; selector errors
    /// propagate unmodified. An empty id from the builder counts as absent.
    pub fn resolve_destination(
        &self,
        event: &AuditEvent,
    ) -> AuditResult<(String, Option<String>)> {
        let index = self
            .index
            .resolve(event)?
            .unwrap_or_else(|| DEFAULT_INDEX.to_string());
        let id = match &self.id_builder {
            Some(builder) => builder(event)?.filter(|id| !id.is_empty()),
            None => None,
        };
        Ok((index, id))
    }

    async fn write_event<E>(
        &self,
        index: String,
        id: Option<String>,
        event: &E,
        cancel: Option<&CancellationToken>,
    ) -> AuditResult<OpenSearchAuditEventId>
    where
        E: AuditEventRecord,
    {
        let client = self.client()?;
        let body = serde_json::to_value(event)?;

        debug!(index = %index, "Indexing audit event");

        let operation = async {
            let request = match &id {
                Some(id) => client.index(IndexParts::IndexId(&index, id)),
                None => client.index(IndexParts::Index(&index)),
            };
            let response = request
                .body(&body)
                .send()
                .await
                .map_err(|e| AuditError::RemoteWrite(e.to_string()))?;

            let status = response.status_code();
            let raw: serde_json::Value = response
                .json()
                .await
                .map_err(|e| AuditError::RemoteWrite(e.to_string()))?;

            if !status.is_success() {
                return Err(AuditError::RemoteWrite(error_reason(&raw)));
            }
            Ok(raw)
        };

        let raw = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(AuditError::Cancelled),
                result = operation => result?,
            },
            None => operation.await?,
        };

        if let Some(handler) = &self.result_handler {
            handler(&raw)?;
        }

        let assigned = raw
            .get("_id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or(id)
            .unwrap_or_default();

        Ok(OpenSearchAuditEventId {
            id: assigned,
            index,
        })
    }

    async fn fetch<E>(&self, id: &OpenSearchAuditEventId) -> AuditResult<Option<E>>
    where
        E: AuditEventRecord,
    {
        let client = self.client()?;

        debug!(index = %id.index, id = %id.id, "Fetching audit event");

        let response = client
            .get(GetParts::IndexId(&id.index, &id.id))
            .send()
            .await
            .map_err(|e| AuditError::RemoteRead(e.to_string()))?;

        let status = response.status_code();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AuditError::RemoteRead(e.to_string()))?;

        if !status.is_success() {
            return Err(AuditError::RemoteRead(error_reason(&body)));
        }

        if !body.get("found").and_then(|v| v.as_bool()).unwrap_or(false) {
            return Ok(None);
        }

        let source = body
            .get("_source")
            .ok_or_else(|| AuditError::RemoteRead("no _source in response".to_string()))?;

        Ok(Some(serde_json::from_value(source.clone())?))
    }
}

fn error_reason(body: &serde_json::Value) -> String {
    body.get("error")
        .and_then(|e| e.get("reason"))
        .and_then(|r| r.as_str())
        .unwrap_or("Unknown error")
        .to_string()
}

#[async_trait]
impl AuditDataProvider for OpenSearchDataProvider {
    type Id = OpenSearchAuditEventId;

    async fn insert_event<E>(&self, event: &E) -> AuditResult<Self::Id>
    where
        E: AuditEventRecord,
    {
        let (index, id) = self.resolve_destination(event.base())?;
        self.write_event(index, id, event, None).await
    }

    async fn insert_event_cancellable<E>(
        &self,
        event: &E,
        cancel: &CancellationToken,
    ) -> AuditResult<Self::Id>
    where
        E: AuditEventRecord,
    {
        let (index, id) = self.resolve_destination(event.base())?;
        self.write_event(index, id, event, Some(cancel)).await
    }

    /// Overwrites the document stored under `id`, keeping the same
    /// coordinate.
    async fn replace_event<E>(&self, id: &Self::Id, event: &E) -> AuditResult<()>
    where
        E: AuditEventRecord,
    {
        self.write_event(id.index.clone(), Some(id.id.clone()), event, None)
            .await
            .map(|_| ())
    }

    async fn replace_event_cancellable<E>(
        &self,
        id: &Self::Id,
        event: &E,
        cancel: &CancellationToken,
    ) -> AuditResult<()>
    where
        E: AuditEventRecord,
    {
        self.write_event(id.index.clone(), Some(id.id.clone()), event, Some(cancel))
            .await
            .map(|_| ())
    }

    async fn get_event<E>(&self, id: &Self::Id) -> AuditResult<Option<E>>
    where
        E: AuditEventRecord,
    {
        self.fetch(id).await
    }
}

impl std::fmt::Debug for OpenSearchDataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenSearchDataProvider")
            .field("config", &self.config)
            .field("index", &self.index)
            .field("client_built", &self.client.get().is_some())
            .finish()
    }
}
