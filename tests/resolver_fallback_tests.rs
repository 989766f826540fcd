//! # Resolver Fallback Integration Tests
//!
//! Exercises the static fallback policy: what callers see when the registry
//! cannot answer, when it answers with nothing, and when a fallback address
//! is configured for the service being resolved.

use async_trait::async_trait;
use consul_discovery::{
    DiscoveryError, DiscoveryResolver, DiscoveryResult, FallbackAddress, Registry,
    RegistrationHandle, ServiceDescriptor, ServiceInstance, StaticRegistry,
};
use std::sync::Arc;

/// A registry whose daemon is unreachable for every operation
struct FailingRegistry;

#[async_trait]
impl Registry for FailingRegistry {
    async fn register(
        &self,
        _descriptor: &ServiceDescriptor,
    ) -> DiscoveryResult<RegistrationHandle> {
        Err(DiscoveryError::unavailable("connection refused"))
    }

    async fn deregister(&self, _handle: &RegistrationHandle) -> DiscoveryResult<()> {
        Err(DiscoveryError::unavailable("connection refused"))
    }

    async fn list_healthy(&self, _name: &str) -> DiscoveryResult<Vec<ServiceInstance>> {
        Err(DiscoveryError::query_failed("connection refused"))
    }
}

fn payments_fallback() -> FallbackAddress {
    FallbackAddress {
        host: "10.0.0.5".to_string(),
        port: 3001,
    }
}

/// Test that a failed registry query falls back to the configured address
#[tokio::test]
async fn test_query_failure_with_fallback_returns_fallback() {
    let resolver = DiscoveryResolver::new(Arc::new(FailingRegistry))
        .with_fallback("payments", payments_fallback());

    let instance = resolver.resolve("payments").await.unwrap();

    assert_eq!(instance.host, "10.0.0.5");
    assert_eq!(instance.port, 3001);
    // Nothing has checked the fallback's health; callers treat it as usable
    assert!(instance.healthy);
}

/// Test that callers see "not found" rather than the underlying query failure
#[tokio::test]
async fn test_query_failure_without_fallback_is_service_not_found() {
    let resolver = DiscoveryResolver::new(Arc::new(FailingRegistry));

    let err = resolver.resolve("payments").await.unwrap_err();

    assert!(matches!(err, DiscoveryError::ServiceNotFound { .. }));
}

/// Test that an empty registry answer without a fallback is "not found"
#[tokio::test]
async fn test_empty_registry_without_fallback_is_service_not_found() {
    let resolver = DiscoveryResolver::new(Arc::new(StaticRegistry::new()));

    let err = resolver.resolve("payments").await.unwrap_err();

    assert!(matches!(err, DiscoveryError::ServiceNotFound { .. }));
}

/// Test that a fallback configured for one service covers only that service
#[tokio::test]
async fn test_fallback_does_not_cover_other_services() {
    let resolver = DiscoveryResolver::new(Arc::new(FailingRegistry))
        .with_fallback("payments", payments_fallback());

    let instance = resolver.resolve("payments").await.unwrap();
    assert_eq!(instance.host, "10.0.0.5");

    let err = resolver.resolve("ledger").await.unwrap_err();
    assert!(matches!(err, DiscoveryError::ServiceNotFound { .. }));
}

/// Test that a live registry answer wins over a configured fallback
#[tokio::test]
async fn test_registry_instance_preferred_over_fallback() {
    let registry = Arc::new(StaticRegistry::new());
    registry.add_instance("payments", ServiceInstance::new("10.0.0.7", 4000));

    let resolver =
        DiscoveryResolver::new(registry).with_fallback("payments", payments_fallback());

    let instance = resolver.resolve("payments").await.unwrap();

    assert_eq!(instance.host, "10.0.0.7");
    assert_eq!(instance.port, 4000);
}

/// Test the URL a fallback resolution hands to HTTP clients
#[tokio::test]
async fn test_fallback_url_format() {
    let resolver = DiscoveryResolver::new(Arc::new(FailingRegistry))
        .with_fallback("payments", payments_fallback());

    let url = resolver.resolve_url("payments").await.unwrap();

    assert_eq!(url, "http://10.0.0.5:3001");
}

/// Test that fallback resolutions carry a metric label distinguishing them
/// from genuine registry resolutions
#[test]
fn test_resolution_metric_labels_distinguish_fallback() {
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    metrics::with_local_recorder(&recorder, || {
        runtime.block_on(async {
            let registry = Arc::new(StaticRegistry::new());
            registry.add_instance("ledger", ServiceInstance::new("10.0.0.7", 4000));

            let resolver =
                DiscoveryResolver::new(registry).with_fallback("payments", payments_fallback());

            resolver.resolve("ledger").await.unwrap();
            resolver.resolve("payments").await.unwrap();
        });
    });

    let snapshot = snapshotter.snapshot().into_vec();
    let source_of = |service: &str| -> Option<String> {
        snapshot.iter().find_map(|(key, _, _, value)| {
            let key = key.key();
            if key.name() != "discovery_resolutions_total" {
                return None;
            }
            let labels: std::collections::HashMap<&str, &str> = key
                .labels()
                .map(|label| (label.key(), label.value()))
                .collect();
            if labels.get("service") != Some(&service) {
                return None;
            }
            assert!(matches!(value, DebugValue::Counter(1)));
            labels.get("source").map(|source| source.to_string())
        })
    };

    assert_eq!(source_of("ledger").as_deref(), Some("registry"));
    assert_eq!(source_of("payments").as_deref(), Some("fallback"));
}
