//! Error types for the TokenBeacon peripheral core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors raised by token storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token payload must not be empty")]
    EmptyPayload,
}

/// Failure reported by the radio stack for an asynchronous command.
///
/// Carried inside [`crate::radio::RadioEvent::ServiceAdded`] and
/// [`crate::radio::RadioEvent::AdvertisingStarted`] results; never surfaced
/// to the remote party.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Radio operation failed: {reason}")]
pub struct RadioError {
    pub reason: String,
}

impl RadioError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors raised by peripheral configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Service and characteristic identifiers must differ")]
    IdentifierClash,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", TokenError::EmptyPayload),
            "Token payload must not be empty"
        );
        assert_eq!(
            format!("{}", RadioError::new("adapter busy")),
            "Radio operation failed: adapter busy"
        );
    }
}
