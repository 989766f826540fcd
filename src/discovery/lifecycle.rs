//! # Service Lifecycle Module
//!
//! Ties one service registration to the process lifetime: register after
//! startup, deregister exactly once during graceful shutdown. The
//! exactly-once guarantee comes from this state machine, not from the
//! daemon's API, whose deregister call is not guaranteed idempotent.

use metrics::counter;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

use crate::core::error::DiscoveryResult;
use crate::core::types::{RegistrationHandle, ServiceDescriptor};
use crate::discovery::registry::Registry;

/// Lifecycle states of a service registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No registration has been attempted, or the last attempt failed
    Unregistered,
    /// A registration call is in flight
    Registering,
    /// The registry accepted the registration
    Registered,
    /// Shutdown has begun and the deregistration attempt is running
    Deregistering,
    /// Shutdown finished; no further registry calls will be made
    Deregistered,
}

/// Couples a service registration to graceful shutdown
///
/// The handle registers at most one registration id per process lifetime and
/// attempts deregistration exactly once during shutdown, regardless of
/// whether registration succeeded — the id is derived from the descriptor,
/// not assigned by the daemon, so the cleanup call is always well-formed.
pub struct ServiceHandle {
    registry: Arc<dyn Registry>,
    descriptor: ServiceDescriptor,
    handle: RegistrationHandle,
    state: Mutex<LifecycleState>,
    shutdown_started: AtomicBool,
    // Serializes registry calls so a deregister can never reach the daemon
    // while a register is still in flight
    registry_op: AsyncMutex<()>,
}

impl ServiceHandle {
    /// Create a handle for the given descriptor; no registry call happens here
    pub fn new(registry: Arc<dyn Registry>, descriptor: ServiceDescriptor) -> Self {
        let handle = RegistrationHandle::for_descriptor(&descriptor);
        Self {
            registry,
            descriptor,
            handle,
            state: Mutex::new(LifecycleState::Unregistered),
            shutdown_started: AtomicBool::new(false),
            registry_op: AsyncMutex::new(()),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    /// The registration id this handle registers and deregisters under
    pub fn registration_handle(&self) -> &RegistrationHandle {
        &self.handle
    }

    /// The descriptor this handle registers
    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// Register this service with the registry
    ///
    /// Skips with a warning unless the handle is currently `Unregistered`, so
    /// concurrent or repeated calls cannot double-register. A failed attempt
    /// returns the handle to `Unregistered` and propagates the error;
    /// retrying is the caller's decision, nothing is retried here.
    pub async fn register(&self) -> DiscoveryResult<()> {
        let _op = self.registry_op.lock().await;

        if self.shutdown_started.load(Ordering::Acquire) {
            warn!("Registration skipped; shutdown already initiated");
            return Ok(());
        }

        {
            let mut state = self.state.lock();
            if *state != LifecycleState::Unregistered {
                warn!("Registration skipped; handle is {:?}", *state);
                return Ok(());
            }
            *state = LifecycleState::Registering;
        }

        info!(
            "Registering service {} as {}",
            self.descriptor.name, self.handle
        );

        // The operation lock is held across the daemon call; shutdown cannot
        // change the state until it settles
        match self.registry.register(&self.descriptor).await {
            Ok(_) => {
                counter!("registry_registrations_total", "outcome" => "success").increment(1);
                *self.state.lock() = LifecycleState::Registered;
                Ok(())
            }
            Err(error) => {
                counter!(
                    "registry_registrations_total",
                    "outcome" => "failure",
                    "error" => error.error_type()
                )
                .increment(1);
                *self.state.lock() = LifecycleState::Unregistered;
                Err(error)
            }
        }
    }

    /// Deregister and mark this handle finished, exactly once
    ///
    /// Later calls, including concurrent ones racing the first, return
    /// immediately. A registration attempt still in flight is allowed to
    /// settle before the deregister goes out, so the daemon always sees the
    /// two calls in order. A failed deregistration is logged and swallowed;
    /// shutdown is never blocked by registry state. The attempt runs even
    /// when registration never succeeded.
    pub async fn shutdown(&self) {
        if self.shutdown_started.swap(true, Ordering::AcqRel) {
            warn!("Shutdown already initiated");
            return;
        }

        // An in-flight registration attempt must settle first; otherwise the
        // deregister would reach the daemon before the register it undoes,
        // leaving a live registration behind after the process exits
        let _op = self.registry_op.lock().await;

        *self.state.lock() = LifecycleState::Deregistering;
        info!(
            "Deregistering service {} ({})",
            self.descriptor.name, self.handle
        );

        match self.registry.deregister(&self.handle).await {
            Ok(()) => {
                counter!("registry_deregistrations_total", "outcome" => "success").increment(1);
            }
            Err(error) => {
                counter!(
                    "registry_deregistrations_total",
                    "outcome" => "failure",
                    "error" => error.error_type()
                )
                .increment(1);
                warn!("Deregistration of {} failed: {}", self.handle, error);
            }
        }

        *self.state.lock() = LifecycleState::Deregistered;
    }
}
