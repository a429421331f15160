//! Integration tests for the OpenSearch audit data provider.
//!
//! Client construction does not contact the store, so the lazy
//! initialization tests run offline. Tests that need a reachable OpenSearch
//! are `#[ignore]`d and read the URL from `OPENSEARCH_URL`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::json;
use vigil_core::{
    AuditDataProvider, AuditError, AuditEvent, AuditEventRecord, AuditTarget, CancellationToken,
};
use vigil_opensearch::{OpenSearchConfig, OpenSearchDataProvider};

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
fn test_client_builds_exactly_once_under_concurrency() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();
    let provider = OpenSearchDataProvider::new(OpenSearchConfig::new("http://localhost:9200"))
        .with_transport_customizer(move |builder| {
            counter.fetch_add(1, Ordering::SeqCst);
            builder
        });

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                provider.client().expect("client build failed");
            });
        }
    });

    assert_eq!(builds.load(Ordering::SeqCst), 1);

    let first = provider.client().unwrap() as *const _;
    let second = provider.client().unwrap() as *const _;
    assert_eq!(first, second);
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn test_pre_built_client_skips_the_build() {
    let url = opensearch::http::Url::parse("http://localhost:9200").unwrap();
    let pool = opensearch::http::transport::SingleNodeConnectionPool::new(url);
    let transport = opensearch::http::transport::TransportBuilder::new(pool)
        .build()
        .unwrap();
    let provider = OpenSearchDataProvider::from_client(opensearch::OpenSearch::new(transport));

    // No connection settings were given, yet the handle is available.
    provider.client().expect("pre-built client should be usable");
}

#[test]
fn test_no_settings_and_no_client_is_a_configuration_error() {
    let provider = OpenSearchDataProvider::default();
    let err = provider.client().unwrap_err();
    assert!(matches!(err, AuditError::Configuration(_)));
}

#[tokio::test]
async fn test_pre_cancelled_token_short_circuits() {
    let provider = OpenSearchDataProvider::new(OpenSearchConfig::new("http://localhost:9200"));
    let token = CancellationToken::new();
    token.cancel();

    let err = provider
        .insert_event_cancellable(&AuditEvent::new("test"), &token)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
}

fn live_provider() -> OpenSearchDataProvider {
    let url =
        std::env::var("OPENSEARCH_URL").unwrap_or_else(|_| "http://localhost:9200".to_string());
    OpenSearchDataProvider::new(OpenSearchConfig::new(url))
}

fn random_index() -> String {
    format!("auto-{}", uuid::Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "requires a reachable OpenSearch"]
async fn test_polymorphic_round_trip() {
    let provider = live_provider()
        .with_index(random_index())
        .with_id_builder(|_| Ok(Some(uuid::Uuid::new_v4().to_string())));

    let event = CustomAuditEvent {
        base: AuditEvent::new("custom").with_custom_field("customField", json!("value")),
        custom_property: "test".to_string(),
    };

    let id = provider.insert_event(&event).await.unwrap();
    let loaded: CustomAuditEvent = provider.get_event(&id).await.unwrap().unwrap();

    assert_eq!(loaded.custom_property, "test");
    assert_eq!(loaded.base.custom_fields["customField"], json!("value"));
    assert_eq!(loaded, event);
}

#[tokio::test]
#[ignore = "requires a reachable OpenSearch"]
async fn test_replace_overwrites_stored_document() {
    let provider = live_provider().with_index(random_index());

    let mut event = CustomAuditEvent {
        base: AuditEvent::new("custom"),
        custom_property: "before".to_string(),
    };

    let id = provider.insert_event(&event).await.unwrap();
    event.custom_property = "after".to_string();
    provider.replace_event(&id, &event).await.unwrap();

    let loaded: CustomAuditEvent = provider.get_event(&id).await.unwrap().unwrap();
    assert_eq!(loaded.custom_property, "after");
}

#[tokio::test]
#[ignore = "requires a reachable OpenSearch"]
async fn test_get_missing_document_is_none() {
    let provider = live_provider().with_index(random_index());
    let id = provider
        .insert_event(&AuditEvent::new("seed"))
        .await
        .unwrap();

    let absent = vigil_opensearch::OpenSearchAuditEventId {
        id: "does-not-exist".to_string(),
        index: id.index.clone(),
    };
    let loaded: Option<AuditEvent> = provider.get_event(&absent).await.unwrap();
    assert!(loaded.is_none());
}

#[tokio::test]
#[ignore = "requires a reachable OpenSearch"]
async fn test_auto_generated_id_lands_exactly_one_document() {
    let index = random_index();
    let provider = live_provider()
        .with_index(index.clone())
        .with_id_builder(|_| Ok(None));

    let event = AuditEvent::new("eventType").with_target(
        AuditTarget::new("String")
            .with_old(json!("init"))
            .with_new(json!("init-end")),
    );

    let id = provider.insert_event(&event).await.unwrap();
    assert!(!id.id.is_empty(), "store should auto-generate an id");

    let client = provider.client().unwrap();
    client
        .indices()
        .refresh(opensearch::indices::IndicesRefreshParts::Index(&[&index]))
        .send()
        .await
        .unwrap();

    let response = client
        .search(opensearch::SearchParts::Index(&[&index]))
        .body(json!({ "query": { "match_all": {} } }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = response.json().await.unwrap();

    let hits = body["hits"]["hits"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["_source"]["target"]["old"], json!("init"));
    assert_eq!(hits[0]["_source"]["target"]["new"], json!("init-end"));
}
