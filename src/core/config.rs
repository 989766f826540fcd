//! # Configuration Module
//!
//! This module handles configuration for the discovery client: which service
//! to register, where the registry daemon lives, and which static fallback
//! addresses to use when discovery fails.
//!
//! ## Key Features
//! - YAML configuration parsing with serde
//! - Environment variable override support (the variables the deployed
//!   services already use: `SERVICE_NAME`, `PORT`, `CONSUL_HOST`, ...)
//! - Validation with detailed error messages collected across all fields
//! - Sensible defaults for local development

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::core::error::{DiscoveryError, DiscoveryResult};
use crate::core::types::ServiceDescriptor;

/// Top-level configuration for the discovery client
///
/// Every section has defaults, so a config file only needs to state what it
/// changes; an absent file plus environment variables is also a valid setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// The service this process registers as
    pub service: ServiceConfig,

    /// The registry daemon to register with and query
    pub registry: RegistryConfig,

    /// Static fallback addresses, keyed by service name
    pub fallbacks: HashMap<String, FallbackAddress>,

    /// Service names resolved once at startup (logged, used as a liveness probe
    /// of the discovery path)
    pub dependencies: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            registry: RegistryConfig::default(),
            fallbacks: HashMap::new(),
            dependencies: Vec::new(),
        }
    }
}

/// Identity and health-check settings for the registered service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Logical service name
    pub name: String,

    /// Address the registry advertises for this instance. Inside Docker the
    /// daemon must reach the container from outside, hence the default.
    pub host: String,

    /// Port this instance serves on
    pub port: u16,

    /// Tags attached to the registration
    pub tags: Vec<String>,

    /// Metadata attached to the registration
    pub meta: HashMap<String, String>,

    /// Path of the health endpoint the daemon polls
    pub health_check_path: String,

    /// Poll interval for the health check
    #[serde(with = "humantime_serde")]
    pub health_check_interval: Duration,

    /// Per-poll timeout for the health check
    #[serde(with = "humantime_serde")]
    pub health_check_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "service-a".to_string(),
            host: "host.docker.internal".to_string(),
            port: 3001,
            tags: Vec::new(),
            meta: HashMap::new(),
            health_check_path: "/health".to_string(),
            health_check_interval: Duration::from_secs(10),
            health_check_timeout: Duration::from_secs(5),
        }
    }
}

/// Location of the registry daemon and the bound on every call to it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry daemon host
    pub host: String,

    /// Registry daemon HTTP port
    pub port: u16,

    /// Timeout applied to every registry request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8500,
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl RegistryConfig {
    /// Base URL of the daemon's HTTP API
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Static address used when discovery of a service fails
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackAddress {
    /// Fallback host
    pub host: String,

    /// Fallback port
    pub port: u16,
}

impl DiscoveryConfig {
    /// Load configuration from a YAML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> DiscoveryResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DiscoveryError::config(format!("Failed to read config file: {}", e)))?;

        let mut config: DiscoveryConfig = serde_yaml::from_str(&content)
            .map_err(|e| DiscoveryError::config(format!("Failed to parse config: {}", e)))?;

        config.apply_env_overrides()?;

        config.validate()?;
        Ok(config)
    }

    /// Build configuration from defaults plus environment variables only
    pub fn from_env() -> DiscoveryResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    ///
    /// The variable names match what the deployed services already export:
    /// `SERVICE_NAME`, `SERVICE_HOST`, `SERVICE_PORT` (or plain `PORT`),
    /// `SERVICE_TAGS`, `HEALTH_CHECK_PATH`, `HEALTH_CHECK_INTERVAL`,
    /// `HEALTH_CHECK_TIMEOUT`, `CONSUL_HOST`, `CONSUL_PORT`.
    pub fn apply_env_overrides(&mut self) -> DiscoveryResult<()> {
        use std::env;

        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }

        if let Ok(host) = env::var("SERVICE_HOST") {
            self.service.host = host;
        }

        // SERVICE_PORT wins over the generic PORT most services export
        if let Ok(port) = env::var("SERVICE_PORT").or_else(|_| env::var("PORT")) {
            self.service.port = port
                .parse()
                .map_err(|e| DiscoveryError::config(format!("Invalid SERVICE_PORT: {}", e)))?;
        }

        if let Ok(tags) = env::var("SERVICE_TAGS") {
            self.service.tags = tags
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }

        if let Ok(path) = env::var("HEALTH_CHECK_PATH") {
            self.service.health_check_path = path;
        }

        if let Ok(interval) = env::var("HEALTH_CHECK_INTERVAL") {
            self.service.health_check_interval = humantime::parse_duration(&interval)
                .map_err(|e| {
                    DiscoveryError::config(format!("Invalid HEALTH_CHECK_INTERVAL: {}", e))
                })?;
        }

        if let Ok(timeout) = env::var("HEALTH_CHECK_TIMEOUT") {
            self.service.health_check_timeout = humantime::parse_duration(&timeout)
                .map_err(|e| {
                    DiscoveryError::config(format!("Invalid HEALTH_CHECK_TIMEOUT: {}", e))
                })?;
        }

        if let Ok(host) = env::var("CONSUL_HOST") {
            self.registry.host = host;
        }

        if let Ok(port) = env::var("CONSUL_PORT") {
            self.registry.port = port
                .parse()
                .map_err(|e| DiscoveryError::config(format!("Invalid CONSUL_PORT: {}", e)))?;
        }

        Ok(())
    }

    /// Comprehensive configuration validation with detailed error messages
    pub fn validate(&self) -> DiscoveryResult<()> {
        let mut errors = Vec::new();

        if self.service.name.is_empty() {
            errors.push("service.name cannot be empty".to_string());
        }

        if self.service.host.is_empty() {
            errors.push("service.host cannot be empty".to_string());
        }

        if self.service.port == 0 {
            errors.push("service.port must be greater than 0".to_string());
        }

        if !self.service.health_check_path.starts_with('/') {
            errors.push(format!(
                "health_check_path must start with '/', got: {}",
                self.service.health_check_path
            ));
        }

        // The registration wire format carries whole seconds
        if self.service.health_check_interval.as_secs() == 0 {
            errors.push("health_check_interval must be at least 1s".to_string());
        }

        if self.service.health_check_timeout.as_secs() == 0 {
            errors.push("health_check_timeout must be at least 1s".to_string());
        }

        if self.registry.host.is_empty() {
            errors.push("registry.host cannot be empty".to_string());
        }

        if self.registry.port == 0 {
            errors.push("registry.port must be greater than 0".to_string());
        }

        if self.registry.request_timeout.is_zero() {
            errors.push("registry.request_timeout must be greater than 0".to_string());
        }

        for (name, fallback) in &self.fallbacks {
            if fallback.host.is_empty() {
                errors.push(format!("Fallback for '{}' has empty host", name));
            }
            if fallback.port == 0 {
                errors.push(format!("Fallback for '{}' has port 0", name));
            }
        }

        if !errors.is_empty() {
            return Err(DiscoveryError::config(format!(
                "Configuration validation failed:\n{}",
                errors.join("\n")
            )));
        }

        Ok(())
    }

    /// The descriptor this configuration registers under
    pub fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor {
            name: self.service.name.clone(),
            host: self.service.host.clone(),
            port: self.service.port,
            tags: self.service.tags.clone(),
            meta: self.service.meta.clone(),
            health_check_path: self.service.health_check_path.clone(),
            health_check_interval: self.service.health_check_interval,
            health_check_timeout: self.service.health_check_timeout,
        }
    }
}
