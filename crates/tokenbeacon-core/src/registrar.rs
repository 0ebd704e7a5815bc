//! Service registration and restoration.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PeripheralConfig;
use crate::radio::{
    CharacteristicDescriptor, CharacteristicPermissions, CharacteristicProperties, RadioCommand,
    RestoredService, RetryOp, ServiceDescriptor,
};
use crate::restart::RestartPolicy;
use crate::types::ServiceHandle;

// ----------------------------------------------------------------------------
// Service Registrar
// ----------------------------------------------------------------------------

/// Owns the service handle and drives registration with the radio stack.
///
/// Registration is asynchronous: [`ServiceRegistrar::begin_registration`]
/// emits the add-service command and the result arrives later as a
/// `ServiceAdded` event. On relaunch the radio stack may instead hand back
/// a previously-registered service, which is adopted without re-issuing
/// registration.
#[derive(Debug)]
pub struct ServiceRegistrar {
    service_uuid: Uuid,
    characteristic_uuid: Uuid,
    handle: Option<ServiceHandle>,
    registration_pending: bool,
    failed_attempts: u32,
}

impl ServiceRegistrar {
    pub fn new(config: &PeripheralConfig) -> Self {
        Self {
            service_uuid: config.service_uuid,
            characteristic_uuid: config.characteristic_uuid,
            handle: None,
            registration_pending: false,
            failed_attempts: 0,
        }
    }

    /// Build the fixed service shape: one primary service holding exactly
    /// one read-only, readable characteristic with no static value.
    pub fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor {
            service_uuid: self.service_uuid,
            primary: true,
            characteristic: CharacteristicDescriptor {
                uuid: self.characteristic_uuid,
                properties: CharacteristicProperties {
                    read: true,
                    write: false,
                },
                permissions: CharacteristicPermissions {
                    readable: true,
                    writable: false,
                },
            },
        }
    }

    pub fn is_registered(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<ServiceHandle> {
        self.handle
    }

    /// Issue the add-service command unless a handle already exists or a
    /// registration is in flight.
    pub fn begin_registration(&mut self) -> Option<RadioCommand> {
        if self.handle.is_some() || self.registration_pending {
            return None;
        }
        self.registration_pending = true;
        debug!(service = %self.service_uuid, "Requesting service registration");
        Some(RadioCommand::AddService(self.descriptor()))
    }

    /// Record a successful registration.
    pub fn registration_succeeded(&mut self, handle: ServiceHandle) {
        self.registration_pending = false;
        self.failed_attempts = 0;
        self.handle = Some(handle);
        info!(service = %self.service_uuid, %handle, "Service registered");
    }

    /// Record a failed registration and schedule the next attempt per the
    /// restart policy.
    pub fn registration_failed(&mut self, policy: &dyn RestartPolicy) -> RadioCommand {
        self.registration_pending = false;
        self.failed_attempts += 1;
        let delay = policy.delay_for(self.failed_attempts);
        warn!(
            service = %self.service_uuid,
            attempt = self.failed_attempts,
            delay_ms = delay.as_millis() as u64,
            "Service registration failed, retry scheduled"
        );
        RadioCommand::ScheduleRetry {
            delay,
            op: RetryOp::Registration,
        }
    }

    /// Adopt a matching service restored by the radio stack after relaunch.
    ///
    /// Returns true if a restored service with the configured identifier was
    /// adopted as the current handle.
    pub fn adopt_restored(&mut self, services: &[RestoredService]) -> bool {
        if self.handle.is_some() {
            return false;
        }
        match services
            .iter()
            .find(|restored| restored.service_uuid == self.service_uuid)
        {
            Some(restored) => {
                self.handle = Some(restored.handle);
                self.registration_pending = false;
                self.failed_attempts = 0;
                info!(
                    service = %self.service_uuid,
                    handle = %restored.handle,
                    "Adopted restored service"
                );
                true
            }
            None => {
                debug!(
                    service = %self.service_uuid,
                    restored = services.len(),
                    "No restored service matches the configured identifier"
                );
                false
            }
        }
    }

    /// Forget the handle and any in-flight registration. Called whenever the
    /// radio leaves the powered-on state; the stack is assumed to have
    /// dropped all registrations.
    pub fn reset(&mut self) {
        self.handle = None;
        self.registration_pending = false;
        self.failed_attempts = 0;
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restart::FixedDelay;
    use std::time::Duration;

    fn test_config() -> PeripheralConfig {
        PeripheralConfig::new(
            Uuid::from_u128(0x8C271E92_44B3_4A70_9D11_56F2E10A0001),
            Uuid::from_u128(0x8C271E92_44B3_4A70_9D11_56F2E10A0002),
        )
        .unwrap()
    }

    #[test]
    fn test_descriptor_is_read_only() {
        let registrar = ServiceRegistrar::new(&test_config());
        let descriptor = registrar.descriptor();

        assert!(descriptor.primary);
        assert_eq!(descriptor.service_uuid, test_config().service_uuid);
        assert_eq!(
            descriptor.characteristic.uuid,
            test_config().characteristic_uuid
        );
        assert!(descriptor.characteristic.properties.read);
        assert!(!descriptor.characteristic.properties.write);
        assert!(descriptor.characteristic.permissions.readable);
        assert!(!descriptor.characteristic.permissions.writable);
    }

    #[test]
    fn test_begin_registration_emits_once_while_pending() {
        let mut registrar = ServiceRegistrar::new(&test_config());

        let command = registrar.begin_registration();
        assert!(matches!(command, Some(RadioCommand::AddService(_))));
        // A second request while the first is in flight is suppressed
        assert!(registrar.begin_registration().is_none());
    }

    #[test]
    fn test_registration_success_stores_handle() {
        let mut registrar = ServiceRegistrar::new(&test_config());
        registrar.begin_registration();
        registrar.registration_succeeded(ServiceHandle::new(3));

        assert!(registrar.is_registered());
        assert_eq!(registrar.handle(), Some(ServiceHandle::new(3)));
        // No duplicate registration once a handle exists
        assert!(registrar.begin_registration().is_none());
    }

    #[test]
    fn test_registration_failure_schedules_retry() {
        let mut registrar = ServiceRegistrar::new(&test_config());
        let policy = FixedDelay::new(Duration::from_millis(100));

        registrar.begin_registration();
        let command = registrar.registration_failed(&policy);

        assert!(!registrar.is_registered());
        assert_eq!(
            command,
            RadioCommand::ScheduleRetry {
                delay: Duration::from_millis(100),
                op: RetryOp::Registration,
            }
        );
        // The failure cleared the pending flag, so the retry can re-issue
        assert!(registrar.begin_registration().is_some());
    }

    #[test]
    fn test_adopt_restored_matching_service() {
        let mut registrar = ServiceRegistrar::new(&test_config());
        let restored = vec![
            RestoredService {
                handle: ServiceHandle::new(1),
                service_uuid: Uuid::from_u128(0xDEAD),
            },
            RestoredService {
                handle: ServiceHandle::new(2),
                service_uuid: test_config().service_uuid,
            },
        ];

        assert!(registrar.adopt_restored(&restored));
        assert_eq!(registrar.handle(), Some(ServiceHandle::new(2)));
        // Adoption replaces registration entirely
        assert!(registrar.begin_registration().is_none());
    }

    #[test]
    fn test_adopt_restored_ignores_non_matching() {
        let mut registrar = ServiceRegistrar::new(&test_config());
        let restored = vec![RestoredService {
            handle: ServiceHandle::new(1),
            service_uuid: Uuid::from_u128(0xDEAD),
        }];

        assert!(!registrar.adopt_restored(&restored));
        assert!(!registrar.is_registered());
        // Normal registration still proceeds
        assert!(registrar.begin_registration().is_some());
    }

    #[test]
    fn test_reset_forces_fresh_registration() {
        let mut registrar = ServiceRegistrar::new(&test_config());
        registrar.begin_registration();
        registrar.registration_succeeded(ServiceHandle::new(3));

        registrar.reset();

        assert!(!registrar.is_registered());
        assert!(registrar.begin_registration().is_some());
    }
}
