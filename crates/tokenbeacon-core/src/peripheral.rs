//! The peripheral state machine.
//!
//! [`Peripheral`] consumes the radio stack's serialized event stream and
//! produces the commands that drive it: power transitions gate service
//! registration and advertising, ATT requests are answered through the
//! handlers, and failed registrations or advertising starts are rescheduled
//! through the restart policy. All state is touched from one logical thread
//! of control; there is no internal locking.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::advertising::AdvertisingController;
use crate::config::PeripheralConfig;
use crate::errors::{RadioError, TokenError};
use crate::handlers;
use crate::radio::{RadioCommand, RadioEvent, RadioPowerState, RestoredService, RetryOp};
use crate::registrar::ServiceRegistrar;
use crate::restart::RestartPolicy;
use crate::token::{TokenDelegate, TokenStore};
use crate::types::{ServiceHandle, SystemTimeSource, TimeSource, Timestamp};

// ----------------------------------------------------------------------------
// Statistics
// ----------------------------------------------------------------------------

/// Counters for peripheral activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralStats {
    pub events_processed: u64,
    pub reads_served: u64,
    pub reads_denied: u64,
    pub reads_invalid_offset: u64,
    pub writes_rejected: u64,
    pub expiry_notifications: u64,
    pub services_registered: u64,
    pub advertising_starts: u64,
}

// ----------------------------------------------------------------------------
// Peripheral
// ----------------------------------------------------------------------------

/// Peripheral-role state machine for the token service.
///
/// Construct with a [`PeripheralConfig`] and a [`TokenDelegate`], feed it
/// radio events via [`Peripheral::handle_event`], and forward the returned
/// commands to the radio stack.
pub struct Peripheral<C: TimeSource = SystemTimeSource> {
    config: PeripheralConfig,
    power: RadioPowerState,
    registrar: ServiceRegistrar,
    advertiser: AdvertisingController,
    store: TokenStore,
    delegate: Box<dyn TokenDelegate>,
    restart_policy: Box<dyn RestartPolicy>,
    clock: C,
    stats: PeripheralStats,
}

impl Peripheral<SystemTimeSource> {
    /// Create a peripheral backed by the system clock.
    pub fn new(config: PeripheralConfig, delegate: Box<dyn TokenDelegate>) -> Self {
        Self::with_clock(config, delegate, SystemTimeSource)
    }
}

impl<C: TimeSource> Peripheral<C> {
    /// Create a peripheral with an explicit time source.
    pub fn with_clock(
        config: PeripheralConfig,
        delegate: Box<dyn TokenDelegate>,
        clock: C,
    ) -> Self {
        let registrar = ServiceRegistrar::new(&config);
        let advertiser = AdvertisingController::new(config.service_uuid);
        let restart_policy = config.restart_policy.build();
        Self {
            config,
            power: RadioPowerState::Unknown,
            registrar,
            advertiser,
            store: TokenStore::new(),
            delegate,
            restart_policy,
            clock,
            stats: PeripheralStats::default(),
        }
    }

    /// Process one radio event and return the commands it produces.
    pub fn handle_event(&mut self, event: RadioEvent) -> Vec<RadioCommand> {
        self.stats.events_processed += 1;
        match event {
            RadioEvent::PowerStateChanged(state) => self.handle_power_change(state),
            RadioEvent::ServiceAdded(result) => self.handle_service_added(result),
            RadioEvent::AdvertisingStarted(result) => self.handle_advertising_started(result),
            RadioEvent::ReadRequest { offset, ctx } => {
                let now = self.clock.now();
                let result = handlers::handle_read_request(
                    &mut self.store,
                    self.delegate.as_mut(),
                    now,
                    offset,
                    &mut self.stats,
                );
                vec![RadioCommand::RespondToRead { ctx, result }]
            }
            RadioEvent::WriteRequests(batch) => {
                handlers::reject_write_batch(&batch, &mut self.stats)
            }
            RadioEvent::ServicesRestored(services) => self.handle_services_restored(services),
            RadioEvent::RetryDue(op) => self.handle_retry_due(op),
        }
    }

    /// Replace the served token. Usable from any power state; the token is
    /// independent of the radio lifecycle.
    pub fn update_token(
        &mut self,
        payload: Vec<u8>,
        expires_at: Timestamp,
    ) -> Result<(), TokenError> {
        self.store.update(payload, expires_at)
    }

    /// Drop the served token; subsequent reads are denied until a new one
    /// is installed.
    pub fn clear_token(&mut self) {
        self.store.clear();
    }

    pub fn power_state(&self) -> RadioPowerState {
        self.power
    }

    pub fn is_registered(&self) -> bool {
        self.registrar.is_registered()
    }

    pub fn is_advertising(&self) -> bool {
        self.advertiser.is_active()
    }

    pub fn config(&self) -> &PeripheralConfig {
        &self.config
    }

    pub fn stats(&self) -> &PeripheralStats {
        &self.stats
    }

    // ------------------------------------------------------------------------
    // Event Handlers
    // ------------------------------------------------------------------------

    fn handle_power_change(&mut self, state: RadioPowerState) -> Vec<RadioCommand> {
        let previous = self.power;
        self.power = state;
        info!(%previous, current = %state, "Radio power state changed");

        if state == RadioPowerState::PoweredOn {
            let mut commands = Vec::new();
            if let Some(command) = self.registrar.begin_registration() {
                commands.push(command);
            } else if let Some(command) = self
                .advertiser
                .start_if_needed(self.power, self.registrar.is_registered())
            {
                commands.push(command);
            }
            return commands;
        }

        if previous == RadioPowerState::PoweredOn {
            // The stack has dropped registrations and advertisement;
            // everything is redone from scratch on the next power-on.
            self.registrar.reset();
            self.advertiser.reset();
        }
        Vec::new()
    }

    fn handle_service_added(
        &mut self,
        result: Result<ServiceHandle, RadioError>,
    ) -> Vec<RadioCommand> {
        if self.power != RadioPowerState::PoweredOn {
            debug!("Ignoring registration result while radio is not powered on");
            return Vec::new();
        }
        match result {
            Ok(handle) => {
                self.registrar.registration_succeeded(handle);
                self.stats.services_registered += 1;
                self.advertiser
                    .start_if_needed(self.power, true)
                    .into_iter()
                    .collect()
            }
            Err(error) => {
                error!(%error, "Radio stack rejected service registration");
                vec![self.registrar.registration_failed(self.restart_policy.as_ref())]
            }
        }
    }

    fn handle_advertising_started(
        &mut self,
        result: Result<(), RadioError>,
    ) -> Vec<RadioCommand> {
        if self.power != RadioPowerState::PoweredOn {
            debug!("Ignoring advertising result while radio is not powered on");
            return Vec::new();
        }
        match result {
            Ok(()) => {
                self.advertiser.start_succeeded();
                self.stats.advertising_starts += 1;
                Vec::new()
            }
            Err(error) => {
                error!(%error, "Radio stack rejected advertising start");
                vec![self.advertiser.start_failed(self.restart_policy.as_ref())]
            }
        }
    }

    fn handle_services_restored(&mut self, services: Vec<RestoredService>) -> Vec<RadioCommand> {
        if self.registrar.adopt_restored(&services) {
            // Restoration normally precedes power-on, in which case this is
            // a no-op and advertising starts on the power transition.
            self.advertiser
                .start_if_needed(self.power, true)
                .into_iter()
                .collect()
        } else {
            Vec::new()
        }
    }

    fn handle_retry_due(&mut self, op: RetryOp) -> Vec<RadioCommand> {
        if self.power != RadioPowerState::PoweredOn {
            debug!(%op, "Retry due while radio is not powered on, dropping");
            return Vec::new();
        }
        match op {
            RetryOp::Registration => self.registrar.begin_registration().into_iter().collect(),
            RetryOp::Advertising => self
                .advertiser
                .start_if_needed(self.power, self.registrar.is_registered())
                .into_iter()
                .collect(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::{AttError, WriteAttempt};
    use crate::restart::RestartPolicyConfig;
    use crate::token::Token;
    use crate::types::RequestContext;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use uuid::Uuid;

    const SERVICE_UUID: Uuid = Uuid::from_u128(0x8C271E92_44B3_4A70_9D11_56F2E10A0001);
    const CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x8C271E92_44B3_4A70_9D11_56F2E10A0002);

    #[derive(Clone)]
    struct TestClock(Arc<AtomicU64>);

    impl TestClock {
        fn at(millis: u64) -> Self {
            Self(Arc::new(AtomicU64::new(millis)))
        }

        fn advance(&self, millis: u64) {
            self.0.fetch_add(millis, Ordering::SeqCst);
        }
    }

    impl TimeSource for TestClock {
        fn now(&self) -> Timestamp {
            Timestamp::new(self.0.load(Ordering::SeqCst))
        }
    }

    /// Does nothing on expiry.
    struct InertDelegate;

    impl TokenDelegate for InertDelegate {
        fn token_expired(&mut self, _previous: Option<Token>, _store: &mut TokenStore) {}
    }

    /// Installs a fresh token on every expiry notification and records the
    /// previous tokens it saw.
    struct RefreshingDelegate {
        payload: Vec<u8>,
        ttl_ms: u64,
        clock: TestClock,
        seen: Arc<Mutex<Vec<Option<Token>>>>,
    }

    impl TokenDelegate for RefreshingDelegate {
        fn token_expired(&mut self, previous: Option<Token>, store: &mut TokenStore) {
            self.seen.lock().unwrap().push(previous);
            let expires_at = self.clock.now() + self.ttl_ms;
            store.update(self.payload.clone(), expires_at).unwrap();
        }
    }

    fn test_config() -> PeripheralConfig {
        PeripheralConfig::new(SERVICE_UUID, CHARACTERISTIC_UUID)
            .unwrap()
            .with_restart_policy(RestartPolicyConfig::Fixed { delay_ms: 100 })
    }

    fn powered_peripheral(clock: TestClock) -> Peripheral<TestClock> {
        let mut peripheral =
            Peripheral::with_clock(test_config(), Box::new(InertDelegate), clock);
        peripheral.handle_event(RadioEvent::PowerStateChanged(RadioPowerState::PoweredOn));
        peripheral.handle_event(RadioEvent::ServiceAdded(Ok(ServiceHandle::new(1))));
        peripheral.handle_event(RadioEvent::AdvertisingStarted(Ok(())));
        peripheral
    }

    #[test]
    fn test_power_on_registers_then_advertises() {
        let mut peripheral = Peripheral::with_clock(
            test_config(),
            Box::new(InertDelegate),
            TestClock::at(1_000),
        );
        assert_eq!(peripheral.power_state(), RadioPowerState::Unknown);

        let commands =
            peripheral.handle_event(RadioEvent::PowerStateChanged(RadioPowerState::PoweredOn));
        assert!(matches!(commands.as_slice(), [RadioCommand::AddService(_)]));

        let commands =
            peripheral.handle_event(RadioEvent::ServiceAdded(Ok(ServiceHandle::new(1))));
        assert_eq!(
            commands,
            vec![RadioCommand::StartAdvertising {
                service_uuid: SERVICE_UUID,
            }]
        );

        let commands = peripheral.handle_event(RadioEvent::AdvertisingStarted(Ok(())));
        assert!(commands.is_empty());
        assert!(peripheral.is_registered());
        assert!(peripheral.is_advertising());
    }

    #[test]
    fn test_power_loss_forces_fresh_registration() {
        let mut peripheral = powered_peripheral(TestClock::at(1_000));

        let commands =
            peripheral.handle_event(RadioEvent::PowerStateChanged(RadioPowerState::PoweredOff));
        assert!(commands.is_empty());
        assert!(!peripheral.is_registered());
        assert!(!peripheral.is_advertising());

        let commands =
            peripheral.handle_event(RadioEvent::PowerStateChanged(RadioPowerState::PoweredOn));
        assert!(matches!(commands.as_slice(), [RadioCommand::AddService(_)]));
    }

    #[test]
    fn test_restoration_skips_duplicate_registration() {
        let mut peripheral = Peripheral::with_clock(
            test_config(),
            Box::new(InertDelegate),
            TestClock::at(1_000),
        );

        let commands = peripheral.handle_event(RadioEvent::ServicesRestored(vec![
            RestoredService {
                handle: ServiceHandle::new(9),
                service_uuid: SERVICE_UUID,
            },
        ]));
        // Before power-on, adoption alone produces no commands
        assert!(commands.is_empty());
        assert!(peripheral.is_registered());

        let commands =
            peripheral.handle_event(RadioEvent::PowerStateChanged(RadioPowerState::PoweredOn));
        assert_eq!(
            commands,
            vec![RadioCommand::StartAdvertising {
                service_uuid: SERVICE_UUID,
            }]
        );
    }

    #[test]
    fn test_restoration_without_match_registers_normally() {
        let mut peripheral = Peripheral::with_clock(
            test_config(),
            Box::new(InertDelegate),
            TestClock::at(1_000),
        );

        peripheral.handle_event(RadioEvent::ServicesRestored(vec![RestoredService {
            handle: ServiceHandle::new(9),
            service_uuid: Uuid::from_u128(0xDEAD),
        }]));
        assert!(!peripheral.is_registered());

        let commands =
            peripheral.handle_event(RadioEvent::PowerStateChanged(RadioPowerState::PoweredOn));
        assert!(matches!(commands.as_slice(), [RadioCommand::AddService(_)]));
    }

    #[test]
    fn test_registration_failure_schedules_and_retry_reissues() {
        let mut peripheral = Peripheral::with_clock(
            test_config(),
            Box::new(InertDelegate),
            TestClock::at(1_000),
        );
        peripheral.handle_event(RadioEvent::PowerStateChanged(RadioPowerState::PoweredOn));

        let commands = peripheral.handle_event(RadioEvent::ServiceAdded(Err(RadioError::new(
            "adapter busy",
        ))));
        assert_eq!(
            commands,
            vec![RadioCommand::ScheduleRetry {
                delay: Duration::from_millis(100),
                op: RetryOp::Registration,
            }]
        );

        let commands = peripheral.handle_event(RadioEvent::RetryDue(RetryOp::Registration));
        assert!(matches!(commands.as_slice(), [RadioCommand::AddService(_)]));
    }

    #[test]
    fn test_advertising_failure_schedules_and_retry_reissues() {
        let mut peripheral = Peripheral::with_clock(
            test_config(),
            Box::new(InertDelegate),
            TestClock::at(1_000),
        );
        peripheral.handle_event(RadioEvent::PowerStateChanged(RadioPowerState::PoweredOn));
        peripheral.handle_event(RadioEvent::ServiceAdded(Ok(ServiceHandle::new(1))));

        let commands = peripheral.handle_event(RadioEvent::AdvertisingStarted(Err(
            RadioError::new("too many advertisers"),
        )));
        assert_eq!(
            commands,
            vec![RadioCommand::ScheduleRetry {
                delay: Duration::from_millis(100),
                op: RetryOp::Advertising,
            }]
        );

        let commands = peripheral.handle_event(RadioEvent::RetryDue(RetryOp::Advertising));
        assert_eq!(
            commands,
            vec![RadioCommand::StartAdvertising {
                service_uuid: SERVICE_UUID,
            }]
        );
    }

    #[test]
    fn test_retry_dropped_after_power_loss() {
        let mut peripheral = Peripheral::with_clock(
            test_config(),
            Box::new(InertDelegate),
            TestClock::at(1_000),
        );
        peripheral.handle_event(RadioEvent::PowerStateChanged(RadioPowerState::PoweredOn));
        peripheral.handle_event(RadioEvent::ServiceAdded(Err(RadioError::new("busy"))));
        peripheral.handle_event(RadioEvent::PowerStateChanged(RadioPowerState::PoweredOff));

        let commands = peripheral.handle_event(RadioEvent::RetryDue(RetryOp::Registration));
        assert!(commands.is_empty());
    }

    #[test]
    fn test_stale_completion_ignored_after_power_loss() {
        let mut peripheral = Peripheral::with_clock(
            test_config(),
            Box::new(InertDelegate),
            TestClock::at(1_000),
        );
        peripheral.handle_event(RadioEvent::PowerStateChanged(RadioPowerState::PoweredOn));
        peripheral.handle_event(RadioEvent::PowerStateChanged(RadioPowerState::Resetting));

        let commands =
            peripheral.handle_event(RadioEvent::ServiceAdded(Ok(ServiceHandle::new(1))));
        assert!(commands.is_empty());
        assert!(!peripheral.is_registered());
    }

    #[test]
    fn test_read_request_served_and_answered_in_context() {
        let clock = TestClock::at(1_000);
        let mut peripheral = powered_peripheral(clock.clone());
        peripheral
            .update_token(b"ABCDEFGH".to_vec(), clock.now() + 60_000)
            .unwrap();

        let commands = peripheral.handle_event(RadioEvent::ReadRequest {
            offset: 4,
            ctx: RequestContext::new(42),
        });
        assert_eq!(
            commands,
            vec![RadioCommand::RespondToRead {
                ctx: RequestContext::new(42),
                result: Ok(b"EFGH".to_vec()),
            }]
        );
        assert_eq!(peripheral.stats().reads_served, 1);
    }

    #[test]
    fn test_expired_read_refreshed_by_delegate() {
        let clock = TestClock::at(1_000);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let delegate = RefreshingDelegate {
            payload: b"NEWDATA".to_vec(),
            ttl_ms: 60_000,
            clock: clock.clone(),
            seen: seen.clone(),
        };
        let mut peripheral =
            Peripheral::with_clock(test_config(), Box::new(delegate), clock.clone());
        peripheral
            .update_token(b"OLD".to_vec(), clock.now() + 500)
            .unwrap();

        clock.advance(1_000);

        let commands = peripheral.handle_event(RadioEvent::ReadRequest {
            offset: 0,
            ctx: RequestContext::new(7),
        });
        assert_eq!(
            commands,
            vec![RadioCommand::RespondToRead {
                ctx: RequestContext::new(7),
                result: Ok(b"NEWDATA".to_vec()),
            }]
        );
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].as_ref().unwrap().payload, b"OLD");
    }

    #[test]
    fn test_write_batch_rejected_without_state_change() {
        let clock = TestClock::at(1_000);
        let mut peripheral = powered_peripheral(clock.clone());
        peripheral
            .update_token(b"TOKEN".to_vec(), clock.now() + 60_000)
            .unwrap();

        let commands = peripheral.handle_event(RadioEvent::WriteRequests(vec![
            WriteAttempt {
                ctx: RequestContext::new(1),
                offset: 0,
                value: b"x".to_vec(),
            },
            WriteAttempt {
                ctx: RequestContext::new(2),
                offset: 0,
                value: b"y".to_vec(),
            },
        ]));

        assert_eq!(commands.len(), 2);
        for command in &commands {
            assert!(matches!(
                command,
                RadioCommand::RespondToWrite {
                    error: AttError::WriteNotPermitted,
                    ..
                }
            ));
        }
        assert!(peripheral.is_registered());
        // The stored token is untouched
        let commands = peripheral.handle_event(RadioEvent::ReadRequest {
            offset: 0,
            ctx: RequestContext::new(3),
        });
        assert_eq!(
            commands,
            vec![RadioCommand::RespondToRead {
                ctx: RequestContext::new(3),
                result: Ok(b"TOKEN".to_vec()),
            }]
        );
    }

    #[test]
    fn test_clear_token_denies_following_reads() {
        let clock = TestClock::at(1_000);
        let mut peripheral = powered_peripheral(clock.clone());
        peripheral
            .update_token(b"TOKEN".to_vec(), clock.now() + 60_000)
            .unwrap();
        peripheral.clear_token();

        let commands = peripheral.handle_event(RadioEvent::ReadRequest {
            offset: 0,
            ctx: RequestContext::new(1),
        });
        assert_eq!(
            commands,
            vec![RadioCommand::RespondToRead {
                ctx: RequestContext::new(1),
                result: Err(AttError::ReadNotPermitted),
            }]
        );
    }

    #[test]
    fn test_stats_advance_across_lifecycle() {
        let clock = TestClock::at(1_000);
        let mut peripheral = powered_peripheral(clock.clone());
        peripheral
            .update_token(b"TOKEN".to_vec(), clock.now() + 60_000)
            .unwrap();
        peripheral.handle_event(RadioEvent::ReadRequest {
            offset: 0,
            ctx: RequestContext::new(1),
        });

        let stats = peripheral.stats();
        assert_eq!(stats.events_processed, 4);
        assert_eq!(stats.services_registered, 1);
        assert_eq!(stats.advertising_starts, 1);
        assert_eq!(stats.reads_served, 1);
    }
}
