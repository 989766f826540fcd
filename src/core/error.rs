//! # Error Handling Module
//!
//! This module defines the error taxonomy for the discovery client using the
//! `thiserror` crate. The variants mirror the distinct failure modes of talking
//! to the registry daemon, and they are deliberately kept apart: an empty
//! discovery result is *not* an error, a failed lookup is, and the two must
//! never collapse into each other.

use thiserror::Error;

/// Main result type used throughout the discovery client
///
/// Type alias so call sites can write `DiscoveryResult<T>` instead of
/// `Result<T, DiscoveryError>`.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Error taxonomy for registry and discovery operations
///
/// Each variant represents a different category of failure. The `#[error("...")]`
/// attribute from `thiserror` implements `Display` with the given message.
#[derive(Debug, Error, Clone)]
pub enum DiscoveryError {
    /// The registry daemon could not be reached (connect failure, timeout).
    /// Recoverable via fallback or retry at a higher layer.
    #[error("registry unavailable: {reason}")]
    RegistryUnavailable { reason: String },

    /// The registry daemon rejected a registration request (validation error).
    /// Fatal to that registration attempt; not retried automatically.
    #[error("registry rejected registration: {reason}")]
    RegistryRejected { reason: String },

    /// A discovery query failed. Distinct from an empty result, which is a
    /// successful query returning zero instances.
    #[error("registry query failed: {reason}")]
    RegistryQueryFailed { reason: String },

    /// Discovery produced no usable address for the service: no healthy
    /// instance exists and no fallback was configured.
    #[error("service not found: no healthy instance of '{service}'")]
    ServiceNotFound { service: String },

    /// Configuration loading or validation errors.
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl DiscoveryError {
    /// Create a registry-unavailable error with a custom reason
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        Self::RegistryUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a registration-rejected error with a custom reason
    pub fn rejected<S: Into<String>>(reason: S) -> Self {
        Self::RegistryRejected {
            reason: reason.into(),
        }
    }

    /// Create a query-failed error with a custom reason
    pub fn query_failed<S: Into<String>>(reason: S) -> Self {
        Self::RegistryQueryFailed {
            reason: reason.into(),
        }
    }

    /// Create a service-not-found error for the given service name
    pub fn not_found<S: Into<String>>(service: S) -> Self {
        Self::ServiceNotFound {
            service: service.into(),
        }
    }

    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Check if this error may be retried at a higher layer
    ///
    /// Transport-level failures are transient; a rejection by the daemon or a
    /// definitive "no such service" answer is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RegistryUnavailable { .. } | Self::RegistryQueryFailed { .. }
        )
    }

    /// Get a string representation of the error type for logs and metrics
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::RegistryUnavailable { .. } => "registry_unavailable",
            Self::RegistryRejected { .. } => "registry_rejected",
            Self::RegistryQueryFailed { .. } => "registry_query_failed",
            Self::ServiceNotFound { .. } => "service_not_found",
            Self::Configuration { .. } => "configuration_error",
        }
    }
}
