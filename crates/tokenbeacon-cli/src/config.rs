//! CLI configuration management.
//!
//! Configuration is loaded from an optional TOML file and then overridden
//! by command line arguments; every field has a usable default so the demo
//! runs with no arguments at all.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokenbeacon_core::{PeripheralConfig, RestartPolicyConfig};
use uuid::Uuid;

use crate::cli::Cli;

// ----------------------------------------------------------------------------
// Default Identifiers
// ----------------------------------------------------------------------------

/// Default TokenBeacon service UUID used by the demo.
pub const TOKENBEACON_SERVICE_UUID: Uuid = Uuid::from_u128(0x9A1C4E20_5D8B_4F36_A0C2_7B54D21E0001);

/// Default TokenBeacon token characteristic UUID used by the demo.
pub const TOKENBEACON_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x9A1C4E20_5D8B_4F36_A0C2_7B54D21E0002);

// ----------------------------------------------------------------------------
// Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the TokenBeacon demo application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Peripheral identifiers and retry policy.
    pub peripheral: PeripheralSection,
    /// Scripted demo behavior.
    pub demo: DemoConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            peripheral: PeripheralSection::default(),
            demo: DemoConfig::default(),
        }
    }
}

/// Peripheral settings as they appear in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeripheralSection {
    pub service_uuid: Uuid,
    pub characteristic_uuid: Uuid,
    pub restart_policy: RestartPolicyConfig,
}

impl Default for PeripheralSection {
    fn default() -> Self {
        Self {
            service_uuid: TOKENBEACON_SERVICE_UUID,
            characteristic_uuid: TOKENBEACON_CHARACTERISTIC_UUID,
            restart_policy: RestartPolicyConfig::default(),
        }
    }
}

impl PeripheralSection {
    /// Convert to the core configuration, validating identifiers.
    pub fn to_core_config(&self) -> Result<PeripheralConfig> {
        let config = PeripheralConfig {
            service_uuid: self.service_uuid,
            characteristic_uuid: self.characteristic_uuid,
            restart_policy: self.restart_policy.clone(),
        };
        config
            .validate()
            .context("Invalid peripheral configuration")?;
        Ok(config)
    }
}

/// Settings for the scripted demo scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Lifetime of each demo token in milliseconds.
    pub token_ttl_ms: u64,
    /// Simulated per-read transfer size in bytes.
    pub mtu: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            token_ttl_ms: 1_500,
            mtu: 4,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, or use defaults when no file is
    /// given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str(&text)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply command line overrides on top of the loaded configuration.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(service_uuid) = cli.service_uuid {
            self.peripheral.service_uuid = service_uuid;
        }
        if let Some(characteristic_uuid) = cli.characteristic_uuid {
            self.peripheral.characteristic_uuid = characteristic_uuid;
        }
        if let Some(token_ttl_ms) = cli.token_ttl_ms {
            self.demo.token_ttl_ms = token_ttl_ms;
        }
        if let Some(mtu) = cli.mtu {
            self.demo.mtu = mtu;
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
