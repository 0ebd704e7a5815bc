//! Peripheral configuration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ConfigError;
use crate::restart::RestartPolicyConfig;

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the TokenBeacon peripheral.
///
/// The service and characteristic identifiers are supplied by the owner at
/// construction; nothing in the core hardcodes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralConfig {
    /// 128-bit identifier of the advertised service.
    pub service_uuid: Uuid,
    /// 128-bit identifier of the token characteristic.
    pub characteristic_uuid: Uuid,
    /// Retry policy for failed registration and advertising attempts.
    pub restart_policy: RestartPolicyConfig,
}

impl PeripheralConfig {
    /// Create a configuration with the default restart policy.
    pub fn new(service_uuid: Uuid, characteristic_uuid: Uuid) -> Result<Self, ConfigError> {
        let config = Self {
            service_uuid,
            characteristic_uuid,
            restart_policy: RestartPolicyConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the restart policy.
    pub fn with_restart_policy(mut self, policy: RestartPolicyConfig) -> Self {
        self.restart_policy = policy;
        self
    }

    /// Validate identifier constraints.
    ///
    /// Deserialized configurations bypass [`PeripheralConfig::new`], so
    /// loaders should call this before use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_uuid == self.characteristic_uuid {
            return Err(ConfigError::IdentifierClash);
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
