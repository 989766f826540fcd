//! # Consul Discovery - Service Registration & Discovery Client
//!
//! A small, self-contained client for a Consul-compatible service registry:
//! register a service instance at process startup, deregister it at graceful
//! shutdown, and resolve logical service names to healthy network addresses
//! with a static fallback policy for when discovery fails.
//!
//! The registry daemon itself is an external collaborator; this crate only
//! speaks its HTTP API. The surrounding HTTP serving in the demo binary is
//! plain `axum`; nothing here implements a framework, broker, or transport.

/// Core functionality: error taxonomy, configuration, and data types
/// used throughout the crate
pub mod core;

/// The registry boundary, the name resolver, and the registration lifecycle
/// Contains everything that talks to or reasons about the registry daemon
pub mod discovery;

/// Observability: structured logging initialization for the demo binary
pub mod observability;

// Re-export commonly used types so callers don't need to know the module tree

/// Main error and result types
pub use crate::core::error::{DiscoveryError, DiscoveryResult};

/// Configuration surface, loadable from YAML and environment variables
pub use crate::core::config::{DiscoveryConfig, FallbackAddress, RegistryConfig, ServiceConfig};

/// The data model: what gets registered and what discovery returns
pub use crate::core::types::{RegistrationHandle, ServiceDescriptor, ServiceInstance};

/// The registry trait and its two implementations, plus resolver and lifecycle
pub use crate::discovery::{
    ConsulRegistry, DiscoveryResolver, LifecycleState, Registry, ServiceHandle, StaticRegistry,
};
