//! Advertisement control.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::radio::{RadioCommand, RadioPowerState, RetryOp};
use crate::restart::RestartPolicy;

// ----------------------------------------------------------------------------
// Advertising Controller
// ----------------------------------------------------------------------------

/// Starts identifier-only advertisement once the service is registered and
/// the radio is powered on.
///
/// There is no explicit stop: the radio stack tears down advertisement
/// whenever the adapter leaves the powered-on state, and
/// [`AdvertisingController::reset`] mirrors that locally.
#[derive(Debug)]
pub struct AdvertisingController {
    service_uuid: Uuid,
    active: bool,
    start_pending: bool,
    failed_attempts: u32,
}

impl AdvertisingController {
    pub fn new(service_uuid: Uuid) -> Self {
        Self {
            service_uuid,
            active: false,
            start_pending: false,
            failed_attempts: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Emit the advertise command if the radio is powered on, the service is
    /// registered, and advertisement is neither active nor already starting.
    pub fn start_if_needed(
        &mut self,
        power: RadioPowerState,
        service_registered: bool,
    ) -> Option<RadioCommand> {
        if power != RadioPowerState::PoweredOn
            || !service_registered
            || self.active
            || self.start_pending
        {
            return None;
        }
        self.start_pending = true;
        debug!(service = %self.service_uuid, "Requesting advertising start");
        Some(RadioCommand::StartAdvertising {
            service_uuid: self.service_uuid,
        })
    }

    pub fn start_succeeded(&mut self) {
        self.start_pending = false;
        self.failed_attempts = 0;
        self.active = true;
        info!(service = %self.service_uuid, "Advertising started");
    }

    /// Record a failed start and schedule the next attempt per the restart
    /// policy.
    pub fn start_failed(&mut self, policy: &dyn RestartPolicy) -> RadioCommand {
        self.start_pending = false;
        self.failed_attempts += 1;
        let delay = policy.delay_for(self.failed_attempts);
        warn!(
            service = %self.service_uuid,
            attempt = self.failed_attempts,
            delay_ms = delay.as_millis() as u64,
            "Advertising start failed, retry scheduled"
        );
        RadioCommand::ScheduleRetry {
            delay,
            op: RetryOp::Advertising,
        }
    }

    /// Forget advertisement state. Called whenever the radio leaves the
    /// powered-on state; the stack is assumed to have stopped advertising.
    pub fn reset(&mut self) {
        self.active = false;
        self.start_pending = false;
        self.failed_attempts = 0;
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
