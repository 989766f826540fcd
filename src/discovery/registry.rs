//! # Registry Module
//!
//! This module provides the client side of service registration and discovery
//! against a Consul-compatible registry daemon. It defines a unified `Registry`
//! trait with an HTTP implementation for the real daemon and an in-memory
//! implementation for tests and simple deployments.
//!
//! The daemon is external; this module only speaks its agent HTTP API
//! (`/v1/agent/service/*` for registration, `/v1/health/service/*` for
//! discovery).

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::core::config::RegistryConfig;
use crate::core::error::{DiscoveryError, DiscoveryResult};
use crate::core::types::{RegistrationHandle, ServiceDescriptor, ServiceInstance};

/// Registry trait that all backend implementations must implement
///
/// Implementations are shared as `Arc<dyn Registry>`; nothing in this crate
/// holds a process-global registry instance.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Register a service instance under the handle derived from its descriptor
    async fn register(&self, descriptor: &ServiceDescriptor)
        -> DiscoveryResult<RegistrationHandle>;

    /// Remove a previous registration
    ///
    /// Failure is reported back; whether it matters is the caller's call
    /// (graceful shutdown treats it as best-effort).
    async fn deregister(&self, handle: &RegistrationHandle) -> DiscoveryResult<()>;

    /// List all instances of a service currently passing their health checks
    ///
    /// Zero instances is a successful empty answer, never an error.
    async fn list_healthy(&self, name: &str) -> DiscoveryResult<Vec<ServiceInstance>>;
}

/// Registration request body for the daemon's agent API
///
/// The daemon expects PascalCase keys; `ID` and the check's `HTTP` field are
/// fully capitalized on the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct RegisterRequest {
    #[serde(rename = "ID")]
    id: String,
    name: String,
    address: String,
    port: u16,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    meta: HashMap<String, String>,
    check: CheckDefinition,
}

/// HTTP health check the daemon runs against the registered instance
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CheckDefinition {
    #[serde(rename = "HTTP")]
    http: String,
    interval: String,
    timeout: String,
}

/// One entry of the daemon's health query response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HealthEntry {
    node: NodeInfo,
    service: AgentService,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NodeInfo {
    address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AgentService {
    #[serde(default)]
    address: String,
    port: u16,
}

// The daemon takes Go-style duration strings; config validation guarantees
// whole seconds.
fn wire_seconds(duration: Duration) -> String {
    format!("{}s", duration.as_secs())
}

/// HTTP client for a Consul-compatible registry daemon
///
/// Stateless apart from the pooled HTTP client, so a single instance can be
/// shared across tasks and used for concurrent queries. Every request carries
/// the configured timeout; an expired request surfaces as the operation's
/// transport error, never as a hang.
pub struct ConsulRegistry {
    client: Client,
    base_url: String,
}

impl ConsulRegistry {
    /// Create a registry client for the daemon described by the configuration
    pub fn new(config: &RegistryConfig) -> DiscoveryResult<Self> {
        let base_url = Url::parse(&config.base_url()).map_err(|e| {
            DiscoveryError::config(format!(
                "Invalid registry address '{}': {}",
                config.base_url(),
                e
            ))
        })?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DiscoveryError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.to_string().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Registry for ConsulRegistry {
    async fn register(
        &self,
        descriptor: &ServiceDescriptor,
    ) -> DiscoveryResult<RegistrationHandle> {
        let handle = RegistrationHandle::for_descriptor(descriptor);
        let request = RegisterRequest {
            id: handle.as_str().to_string(),
            name: descriptor.name.clone(),
            address: descriptor.host.clone(),
            port: descriptor.port,
            tags: descriptor.tags.clone(),
            meta: descriptor.meta.clone(),
            check: CheckDefinition {
                http: descriptor.health_check_url(),
                interval: wire_seconds(descriptor.health_check_interval),
                timeout: wire_seconds(descriptor.health_check_timeout),
            },
        };

        debug!("Registering {} with registry at {}", handle, self.base_url);

        let response = self
            .client
            .put(format!("{}/v1/agent/service/register", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| DiscoveryError::unavailable(format!("register request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            info!("Service registered with registry: {}", handle);
            return Ok(handle);
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(DiscoveryError::rejected(format!(
                "{}: {}",
                status,
                body.trim()
            )))
        } else {
            Err(DiscoveryError::unavailable(format!(
                "register returned {}: {}",
                status,
                body.trim()
            )))
        }
    }

    async fn deregister(&self, handle: &RegistrationHandle) -> DiscoveryResult<()> {
        debug!("Deregistering {} from registry", handle);

        let response = self
            .client
            .put(format!(
                "{}/v1/agent/service/deregister/{}",
                self.base_url, handle
            ))
            .send()
            .await
            .map_err(|e| {
                DiscoveryError::unavailable(format!("deregister request failed: {}", e))
            })?;

        let status = response.status();
        if status.is_success() {
            info!("Service deregistered from registry: {}", handle);
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DiscoveryError::unavailable(format!(
                "deregister returned {}: {}",
                status,
                body.trim()
            )))
        }
    }

    async fn list_healthy(&self, name: &str) -> DiscoveryResult<Vec<ServiceInstance>> {
        let response = self
            .client
            .get(format!("{}/v1/health/service/{}", self.base_url, name))
            .query(&[("passing", "true")])
            .send()
            .await
            .map_err(|e| DiscoveryError::query_failed(format!("health query failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::query_failed(format!(
                "health query returned {}: {}",
                status,
                body.trim()
            )));
        }

        let entries: Vec<HealthEntry> = response
            .json()
            .await
            .map_err(|e| DiscoveryError::query_failed(format!("invalid health response: {}", e)))?;

        let instances: Vec<ServiceInstance> = entries
            .into_iter()
            .map(|entry| {
                // The daemon reports node-addressed services with an empty
                // service address
                let host = if entry.service.address.is_empty() {
                    entry.node.address
                } else {
                    entry.service.address
                };
                ServiceInstance {
                    host,
                    port: entry.service.port,
                    healthy: true,
                }
            })
            .collect();

        debug!("Discovered {} healthy instance(s) of {}", instances.len(), name);
        Ok(instances)
    }
}

/// In-memory registry for testing and simple deployments
///
/// Honors the same contract as the HTTP implementation: an empty result and a
/// failed query stay distinct, and registration is keyed by the same derived
/// handle.
pub struct StaticRegistry {
    instances: DashMap<String, Vec<ServiceInstance>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self {
            instances: DashMap::new(),
        }
    }

    /// Add an instance under a service name without going through `register`
    pub fn add_instance<S: Into<String>>(&self, name: S, instance: ServiceInstance) {
        self.instances.entry(name.into()).or_default().push(instance);
    }

    /// Flip the health flag of every instance of `name` on `port`
    pub fn set_healthy(&self, name: &str, port: u16, healthy: bool) {
        if let Some(mut entry) = self.instances.get_mut(name) {
            for instance in entry.iter_mut() {
                if instance.port == port {
                    instance.healthy = healthy;
                }
            }
        }
    }
}

impl Default for StaticRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for StaticRegistry {
    async fn register(
        &self,
        descriptor: &ServiceDescriptor,
    ) -> DiscoveryResult<RegistrationHandle> {
        let handle = RegistrationHandle::for_descriptor(descriptor);
        self.add_instance(
            descriptor.name.clone(),
            ServiceInstance::new(descriptor.host.clone(), descriptor.port),
        );
        debug!("Service registered with static registry: {}", handle);
        Ok(handle)
    }

    async fn deregister(&self, handle: &RegistrationHandle) -> DiscoveryResult<()> {
        // The handle is "{name}-{port}"; split from the right because service
        // names may themselves contain dashes
        if let Some((name, port)) = handle.as_str().rsplit_once('-') {
            if let Ok(port) = port.parse::<u16>() {
                if let Some(mut entry) = self.instances.get_mut(name) {
                    entry.retain(|instance| instance.port != port);
                }
            }
        }
        Ok(())
    }

    async fn list_healthy(&self, name: &str) -> DiscoveryResult<Vec<ServiceInstance>> {
        Ok(self
            .instances
            .get(name)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|instance| instance.healthy)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
