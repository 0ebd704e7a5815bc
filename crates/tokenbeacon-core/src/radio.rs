//! Radio-facing protocol types.
//!
//! The radio stack is an external collaborator consumed through a narrow
//! channel interface: the peripheral emits [`RadioCommand`]s and consumes
//! [`RadioEvent`]s, all delivered on one serialized stream. Nothing in this
//! module touches the air interface; MTU negotiation and fragmentation are
//! the collaborator's job.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::RadioError;
use crate::types::{RequestContext, ServiceHandle};

// ----------------------------------------------------------------------------
// Radio Power State
// ----------------------------------------------------------------------------

/// Power state of the radio adapter.
///
/// Only `PoweredOn` permits registrar and advertiser operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadioPowerState {
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
}

impl fmt::Display for RadioPowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioPowerState::Unknown => write!(f, "Unknown"),
            RadioPowerState::Resetting => write!(f, "Resetting"),
            RadioPowerState::Unsupported => write!(f, "Unsupported"),
            RadioPowerState::Unauthorized => write!(f, "Unauthorized"),
            RadioPowerState::PoweredOff => write!(f, "PoweredOff"),
            RadioPowerState::PoweredOn => write!(f, "PoweredOn"),
        }
    }
}

// ----------------------------------------------------------------------------
// Service Shape
// ----------------------------------------------------------------------------

/// Operations a characteristic supports on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacteristicProperties {
    pub read: bool,
    pub write: bool,
}

/// Access permissions attached to a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacteristicPermissions {
    pub readable: bool,
    pub writable: bool,
}

/// Shape of the single token characteristic.
///
/// Carries no static value; the payload is produced per read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacteristicDescriptor {
    pub uuid: Uuid,
    pub properties: CharacteristicProperties,
    pub permissions: CharacteristicPermissions,
}

/// Shape of the registered service: one primary service containing exactly
/// one characteristic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub service_uuid: Uuid,
    pub primary: bool,
    pub characteristic: CharacteristicDescriptor,
}

/// A previously-registered service handed back by the radio stack on
/// relaunch from saved state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoredService {
    pub handle: ServiceHandle,
    pub service_uuid: Uuid,
}

// ----------------------------------------------------------------------------
// ATT Responses
// ----------------------------------------------------------------------------

/// Protocol error codes surfaced to the remote party.
///
/// Terminal per request; the core never retries a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AttError {
    #[error("Read not permitted")]
    ReadNotPermitted,
    #[error("Invalid offset")]
    InvalidOffset,
    #[error("Write not permitted")]
    WriteNotPermitted,
}

/// One write attempt within an inbound batch.
///
/// The value and offset are carried for completeness; the peripheral never
/// inspects them, every attempt is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteAttempt {
    pub ctx: RequestContext,
    pub offset: usize,
    pub value: Vec<u8>,
}

/// Which failed operation a scheduled retry re-attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryOp {
    Registration,
    Advertising,
}

impl fmt::Display for RetryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryOp::Registration => write!(f, "registration"),
            RetryOp::Advertising => write!(f, "advertising"),
        }
    }
}

// ----------------------------------------------------------------------------
// RadioCommand: Peripheral → Radio Stack
// ----------------------------------------------------------------------------

/// Commands sent from the peripheral to the radio stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadioCommand {
    /// Register the service; completion arrives as
    /// [`RadioEvent::ServiceAdded`].
    AddService(ServiceDescriptor),
    /// Begin identifier-only advertisement; completion arrives as
    /// [`RadioEvent::AdvertisingStarted`].
    StartAdvertising { service_uuid: Uuid },
    /// Resolve a pending read request.
    RespondToRead {
        ctx: RequestContext,
        result: Result<Vec<u8>, AttError>,
    },
    /// Reject one write attempt.
    RespondToWrite { ctx: RequestContext, error: AttError },
    /// Re-deliver [`RadioEvent::RetryDue`] after the delay. Realized by the
    /// runtime with a timer, never forwarded to the radio stack.
    ScheduleRetry { delay: Duration, op: RetryOp },
}

// ----------------------------------------------------------------------------
// RadioEvent: Radio Stack → Peripheral
// ----------------------------------------------------------------------------

/// Events delivered by the radio stack, serialized on one logical queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadioEvent {
    /// The adapter's power state changed.
    PowerStateChanged(RadioPowerState),
    /// Result of a previous [`RadioCommand::AddService`].
    ServiceAdded(Result<ServiceHandle, RadioError>),
    /// Result of a previous [`RadioCommand::StartAdvertising`].
    AdvertisingStarted(Result<(), RadioError>),
    /// A remote party issued a read at the given offset. Expects exactly one
    /// [`RadioCommand::RespondToRead`] carrying the same context.
    ReadRequest { offset: usize, ctx: RequestContext },
    /// A batch of write attempts. Expects one
    /// [`RadioCommand::RespondToWrite`] per attempt.
    WriteRequests(Vec<WriteAttempt>),
    /// Previously-registered services handed back on relaunch from saved
    /// state; delivered once, before the radio reaches `PoweredOn`.
    ServicesRestored(Vec<RestoredService>),
    /// A retry scheduled via [`RadioCommand::ScheduleRetry`] is due.
    RetryDue(RetryOp),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
