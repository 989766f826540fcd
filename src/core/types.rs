//! # Core Types Module
//!
//! This module defines the foundational data structures for service
//! registration and discovery: the descriptor a service registers under, the
//! instances a discovery query returns, and the handle that ties a
//! registration to its later deregistration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Everything the registry needs to know about this service instance
///
/// Built from configuration once at startup and immutable afterwards. The
/// health-check fields describe the HTTP endpoint the registry daemon will
/// poll to decide whether this instance counts as healthy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Logical service name other services discover this instance by
    pub name: String,

    /// Address this instance is reachable at from the registry's viewpoint
    pub host: String,

    /// Port this instance serves on (1-65535)
    pub port: u16,

    /// Free-form tags attached to the registration
    pub tags: Vec<String>,

    /// Key/value metadata attached to the registration
    pub meta: HashMap<String, String>,

    /// Path of the HTTP health endpoint the daemon polls (must start with `/`)
    pub health_check_path: String,

    /// How often the daemon polls the health endpoint
    pub health_check_interval: Duration,

    /// How long the daemon waits for a health response before failing the check
    pub health_check_timeout: Duration,
}

impl ServiceDescriptor {
    /// Create a descriptor with the default health-check settings
    pub fn new<S: Into<String>>(name: S, host: S, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            tags: Vec::new(),
            meta: HashMap::new(),
            health_check_path: "/health".to_string(),
            health_check_interval: Duration::from_secs(10),
            health_check_timeout: Duration::from_secs(5),
        }
    }

    /// Full URL of the health endpoint, as declared to the registry daemon
    pub fn health_check_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.health_check_path)
    }
}

/// One discovered instance of a service
///
/// Transient product of a discovery query; identity is `(host, port)` only.
/// Queries ask the daemon for passing instances, so `healthy` is normally
/// true; a fallback instance is reported healthy as well because it is the
/// address the caller is being told to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Instance address
    pub host: String,

    /// Instance port
    pub port: u16,

    /// Health status as reported by the registry at query time
    pub healthy: bool,
}

impl ServiceInstance {
    /// Create a healthy instance
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            healthy: true,
        }
    }

    /// Get the instance base URL
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Opaque identifier tying a registration to its deregistration
///
/// Formatted `{name}-{port}` and derivable from the descriptor alone, so
/// shutdown can deregister even when the registration call itself failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationHandle(String);

impl RegistrationHandle {
    /// Derive the handle a descriptor registers under
    pub fn for_descriptor(descriptor: &ServiceDescriptor) -> Self {
        Self(format!("{}-{}", descriptor.name, descriptor.port))
    }

    /// The raw id as sent over the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
