//! # Discovery Resolver Module
//!
//! Turns a logical service name into one concrete reachable address. The
//! selection policy is deliberately simple: take the first healthy instance
//! the registry reports (any ordering guarantee comes from the registry, not
//! from here). When discovery cannot produce an instance and a static
//! fallback is configured for the name, the fallback wins over failing —
//! availability over correctness during partial registry outages.

use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::config::FallbackAddress;
use crate::core::error::{DiscoveryError, DiscoveryResult};
use crate::core::types::ServiceInstance;
use crate::discovery::registry::Registry;

/// Resolves service names to addresses via a shared registry backend
pub struct DiscoveryResolver {
    registry: Arc<dyn Registry>,
    fallbacks: HashMap<String, FallbackAddress>,
}

impl DiscoveryResolver {
    /// Create a resolver with no fallbacks configured
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self {
            registry,
            fallbacks: HashMap::new(),
        }
    }

    /// Replace the fallback table with the configured one
    pub fn with_fallbacks(mut self, fallbacks: HashMap<String, FallbackAddress>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// Add a single fallback address for a service name
    pub fn with_fallback<S: Into<String>>(mut self, name: S, fallback: FallbackAddress) -> Self {
        self.fallbacks.insert(name.into(), fallback);
        self
    }

    /// Resolve a service name to one healthy instance
    ///
    /// A failed query is logged and then treated the same as an empty result:
    /// fallback if one is configured, `ServiceNotFound` otherwise. The
    /// distinct query error never reaches the caller, only the log.
    pub async fn resolve(&self, name: &str) -> DiscoveryResult<ServiceInstance> {
        match self.registry.list_healthy(name).await {
            Ok(instances) => {
                if let Some(instance) = instances.into_iter().next() {
                    debug!("Resolved {} to {}", name, instance.url());
                    counter!(
                        "discovery_resolutions_total",
                        "service" => name.to_string(),
                        "source" => "registry"
                    )
                    .increment(1);
                    Ok(instance)
                } else {
                    debug!("Registry reports no healthy instance of {}", name);
                    self.fall_back(name)
                }
            }
            Err(error) => {
                warn!("Discovery query for {} failed: {}", name, error);
                self.fall_back(name)
            }
        }
    }

    /// Resolve a service name and format the result as a base URL
    pub async fn resolve_url(&self, name: &str) -> DiscoveryResult<String> {
        let instance = self.resolve(name).await?;
        Ok(instance.url())
    }

    fn fall_back(&self, name: &str) -> DiscoveryResult<ServiceInstance> {
        match self.fallbacks.get(name) {
            Some(fallback) => {
                warn!(
                    "Using static fallback {}:{} for {}",
                    fallback.host, fallback.port, name
                );
                counter!(
                    "discovery_resolutions_total",
                    "service" => name.to_string(),
                    "source" => "fallback"
                )
                .increment(1);
                Ok(ServiceInstance::new(fallback.host.clone(), fallback.port))
            }
            None => Err(DiscoveryError::not_found(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::registry::StaticRegistry;

    #[tokio::test]
    async fn test_resolve_picks_first_instance() {
        let registry = StaticRegistry::new();
        registry.add_instance("service-a", ServiceInstance::new("10.0.0.5", 3001));
        registry.add_instance("service-a", ServiceInstance::new("10.0.0.6", 3001));

        let resolver = DiscoveryResolver::new(Arc::new(registry));
        let instance = resolver.resolve("service-a").await.unwrap();

        assert_eq!(instance.host, "10.0.0.5");
        assert_eq!(instance.port, 3001);
    }

    #[tokio::test]
    async fn test_resolve_empty_without_fallback_is_not_found() {
        let resolver = DiscoveryResolver::new(Arc::new(StaticRegistry::new()));

        let err = resolver.resolve("clients-service").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::ServiceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_resolve_empty_with_fallback_returns_fallback() {
        let resolver =
            DiscoveryResolver::new(Arc::new(StaticRegistry::new())).with_fallback(
                "clients-service",
                FallbackAddress {
                    host: "localhost".to_string(),
                    port: 3003,
                },
            );

        let instance = resolver.resolve("clients-service").await.unwrap();
        assert_eq!(instance.host, "localhost");
        assert_eq!(instance.port, 3003);
        assert!(instance.healthy);
    }

    #[tokio::test]
    async fn test_fallback_only_applies_to_its_own_service() {
        let resolver =
            DiscoveryResolver::new(Arc::new(StaticRegistry::new())).with_fallback(
                "clients-service",
                FallbackAddress {
                    host: "localhost".to_string(),
                    port: 3003,
                },
            );

        let err = resolver.resolve("other-service").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::ServiceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_resolve_url_format() {
        let registry = StaticRegistry::new();
        registry.add_instance("service-a", ServiceInstance::new("10.0.0.5", 3001));

        let resolver = DiscoveryResolver::new(Arc::new(registry));
        let url = resolver.resolve_url("service-a").await.unwrap();

        assert_eq!(url, "http://10.0.0.5:3001");
    }
}
