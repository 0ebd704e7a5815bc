//! TokenBeacon core protocol implementation.
//!
//! This crate provides the peripheral-role state machine for the
//! TokenBeacon proximity-token service: one advertised GATT service with a
//! single read-only characteristic that serves a rotating, expiring token
//! blob.
//!
//! ## Architecture
//!
//! The core is organized into several modules:
//!
//! - [`config`] - Peripheral configuration and identifier validation
//! - [`errors`] - Error types for tokens, radio failures, and configuration
//! - [`types`] - Timestamps, time sources, and opaque radio identifiers
//! - [`radio`] - The command/event protocol spoken with the radio stack
//! - [`token`] - Token storage and the refresh delegate capability
//! - [`registrar`] - Service registration and restoration after relaunch
//! - [`advertising`] - Advertisement control
//! - [`handlers`] - The read transaction protocol and the write rejector
//! - [`restart`] - Retry policies for failed registration and advertising
//! - [`peripheral`] - The state machine tying everything together
//!
//! The radio stack itself is an external collaborator: callers feed
//! [`radio::RadioEvent`]s into [`Peripheral::handle_event`] and forward the
//! returned [`radio::RadioCommand`]s to whatever backend owns the adapter.
//! All events are expected on one serialized stream; the peripheral holds
//! no locks and runs no tasks of its own.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod advertising;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod peripheral;
pub mod radio;
pub mod registrar;
pub mod restart;
pub mod token;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::PeripheralConfig;
pub use errors::{ConfigError, RadioError, TokenError};
pub use peripheral::{Peripheral, PeripheralStats};
pub use radio::{
    AttError, RadioCommand, RadioEvent, RadioPowerState, RestoredService, RetryOp,
    ServiceDescriptor, WriteAttempt,
};
pub use restart::{ExponentialBackoff, FixedDelay, RestartPolicy, RestartPolicyConfig};
pub use token::{Token, TokenDelegate, TokenStore};
pub use types::{
    RequestContext, ServiceHandle, SystemTimeSource, TimeSource, Timestamp,
};
