//! Diagnostics sink for client lifecycle events.
//!
//! The locator never touches process-wide logging state itself; it reports
//! lifecycle transitions to an injected sink. `NoopDiagnostics` is the default,
//! `TracingDiagnostics` forwards every event to `tracing`.

use std::fmt;
use tracing::{debug, info, warn};

use crate::types::ServiceKind;

/// Lifecycle event emitted by the service locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorEvent {
    Created { strategy: &'static str },
    TransportCreated,
    TransportClosed,
    /// Caller-supplied transport left open on teardown.
    TransportRetained,
    ServiceInitialized { service: ServiceKind, endpoint: String },
    ServiceInitFailed { service: ServiceKind, error: String },
    ServiceClosed { service: ServiceKind },
    Closed,
}

impl fmt::Display for LocatorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocatorEvent::Created { strategy } => write!(f, "locator created ({strategy})"),
            LocatorEvent::TransportCreated => f.write_str("transport created"),
            LocatorEvent::TransportClosed => f.write_str("transport closed"),
            LocatorEvent::TransportRetained => f.write_str("transport retained (caller-owned)"),
            LocatorEvent::ServiceInitialized { service, endpoint } => {
                write!(f, "{service} initialized at {endpoint}")
            }
            LocatorEvent::ServiceInitFailed { service, error } => {
                write!(f, "{service} init failed: {error}")
            }
            LocatorEvent::ServiceClosed { service } => write!(f, "{service} closed"),
            LocatorEvent::Closed => f.write_str("locator closed"),
        }
    }
}

/// Receiver of locator lifecycle events.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, event: &LocatorEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiagnostics;

impl DiagnosticsSink for NoopDiagnostics {
    fn record(&self, _event: &LocatorEvent) {}
}

/// Forwards events to the active `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn record(&self, event: &LocatorEvent) {
        match event {
            LocatorEvent::Created { strategy } => {
                info!(target: "client::locator", event = "created", strategy, "service locator created")
            }
            LocatorEvent::TransportCreated => {
                debug!(target: "client::locator", event = "transport_created", "shared transport created")
            }
            LocatorEvent::TransportClosed => {
                debug!(target: "client::locator", event = "transport_closed", "shared transport closed")
            }
            LocatorEvent::TransportRetained => {
                debug!(target: "client::locator", event = "transport_retained", "caller-owned transport left open")
            }
            LocatorEvent::ServiceInitialized { service, endpoint } => {
                debug!(target: "client::locator", event = "service_initialized", %service, %endpoint, "sub-client initialized")
            }
            LocatorEvent::ServiceInitFailed { service, error } => {
                warn!(target: "client::locator", event = "service_init_failed", %service, %error, "sub-client construction failed")
            }
            LocatorEvent::ServiceClosed { service } => {
                debug!(target: "client::locator", event = "service_closed", %service, "sub-client closed")
            }
            LocatorEvent::Closed => {
                info!(target: "client::locator", event = "closed", "service locator closed")
            }
        }
    }
}
