//! The peripheral event-processing task.
//!
//! One tokio task owns the [`Peripheral`] and is the single consumer of
//! both the owner-command channel and the radio-event channel, preserving
//! the serialized callback model: no event is processed concurrently with
//! another, and the delegate's expiry notification blocks the loop until it
//! returns.

use tokenbeacon_core::radio::{RadioCommand, RadioEvent};
use tokenbeacon_core::{Peripheral, SystemTimeSource, TimeSource};
use tracing::{debug, info, warn};

use crate::channels::{
    OwnerCommandReceiver, RadioCommandSender, RadioEventReceiver, RadioEventSender,
};
use crate::error::RuntimeError;
use crate::messages::OwnerCommand;

// ----------------------------------------------------------------------------
// Peripheral Task
// ----------------------------------------------------------------------------

/// Runs the peripheral state machine over its channels until shut down.
pub struct PeripheralTask<C: TimeSource + Send + 'static = SystemTimeSource> {
    peripheral: Peripheral<C>,
    owner_rx: OwnerCommandReceiver,
    radio_event_rx: RadioEventReceiver,
    radio_command_tx: RadioCommandSender,
    /// Loopback sender used to re-deliver scheduled retries as events.
    retry_tx: RadioEventSender,
    running: bool,
}

impl<C: TimeSource + Send + 'static> PeripheralTask<C> {
    pub fn new(
        peripheral: Peripheral<C>,
        owner_rx: OwnerCommandReceiver,
        radio_event_rx: RadioEventReceiver,
        radio_command_tx: RadioCommandSender,
        retry_tx: RadioEventSender,
    ) -> Self {
        Self {
            peripheral,
            owner_rx,
            radio_event_rx,
            radio_command_tx,
            retry_tx,
            running: true,
        }
    }

    /// Run the event loop.
    ///
    /// Returns when a shutdown command arrives, when either inbound channel
    /// closes, or with an error when the radio backend stops consuming
    /// commands.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        info!("Peripheral task starting");

        while self.running {
            tokio::select! {
                command = self.owner_rx.recv() => {
                    match command {
                        Some(command) => self.process_owner_command(command),
                        None => {
                            info!("Owner channel closed, shutting down");
                            break;
                        }
                    }
                }

                event = self.radio_event_rx.recv() => {
                    match event {
                        Some(event) => self.process_radio_event(event).await?,
                        None => {
                            info!("Radio event channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        info!("Peripheral task stopped");
        Ok(())
    }

    fn process_owner_command(&mut self, command: OwnerCommand) {
        match command {
            OwnerCommand::UpdateToken {
                payload,
                expires_at,
            } => {
                if let Err(error) = self.peripheral.update_token(payload, expires_at) {
                    warn!(%error, "Rejected token update");
                }
            }
            OwnerCommand::ClearToken => self.peripheral.clear_token(),
            OwnerCommand::GetStats { reply } => {
                // The owner may have dropped the reply half; nothing to do
                let _ = reply.send(self.peripheral.stats().clone());
            }
            OwnerCommand::Shutdown => {
                info!("Shutdown requested");
                self.running = false;
            }
        }
    }

    async fn process_radio_event(&mut self, event: RadioEvent) -> Result<(), RuntimeError> {
        for command in self.peripheral.handle_event(event) {
            self.dispatch(command).await?;
        }
        Ok(())
    }

    /// Forward a command to the radio backend, realizing retry scheduling
    /// locally with a timer.
    async fn dispatch(&mut self, command: RadioCommand) -> Result<(), RuntimeError> {
        match command {
            RadioCommand::ScheduleRetry { delay, op } => {
                let retry_tx = self.retry_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if retry_tx.send(RadioEvent::RetryDue(op)).await.is_err() {
                        debug!(%op, "Retry fired after the event channel closed");
                    }
                });
                Ok(())
            }
            command => self
                .radio_command_tx
                .send(command)
                .await
                .map_err(|_| RuntimeError::ChannelClosed {
                    channel: "radio-command",
                }),
        }
    }
}
