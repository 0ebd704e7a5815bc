//! Runtime construction: channel wiring and task spawning.

use tokenbeacon_core::{Peripheral, PeripheralConfig, TokenDelegate};
use tokio::task::JoinHandle;

use crate::channels::{
    create_owner_channel, create_radio_command_channel, create_radio_event_channel,
    ChannelConfig, RadioCommandReceiver, RadioEventSender,
};
use crate::error::RuntimeError;
use crate::handle::PeripheralHandle;
use crate::task::PeripheralTask;

// ----------------------------------------------------------------------------
// Radio Endpoint
// ----------------------------------------------------------------------------

/// The radio backend's side of the channel pair: it feeds events in and
/// consumes the peripheral's commands.
#[derive(Debug)]
pub struct RadioEndpoint {
    pub events: RadioEventSender,
    pub commands: RadioCommandReceiver,
}

// ----------------------------------------------------------------------------
// Runtime Builder
// ----------------------------------------------------------------------------

/// Builds and spawns a peripheral runtime.
pub struct PeripheralRuntimeBuilder {
    config: PeripheralConfig,
    delegate: Box<dyn TokenDelegate>,
    channels: ChannelConfig,
}

impl PeripheralRuntimeBuilder {
    pub fn new(config: PeripheralConfig, delegate: Box<dyn TokenDelegate>) -> Self {
        Self {
            config,
            delegate,
            channels: ChannelConfig::default(),
        }
    }

    pub fn with_channel_config(mut self, channels: ChannelConfig) -> Self {
        self.channels = channels;
        self
    }

    /// Wire the channels and spawn the peripheral task.
    ///
    /// Must be called from within a tokio runtime. The returned
    /// [`RadioEndpoint`] is handed to the radio backend.
    pub fn spawn(self) -> (PeripheralRuntime, RadioEndpoint) {
        let (owner_tx, owner_rx) = create_owner_channel(&self.channels);
        let (radio_event_tx, radio_event_rx) = create_radio_event_channel(&self.channels);
        let (radio_command_tx, radio_command_rx) = create_radio_command_channel(&self.channels);

        let peripheral = Peripheral::new(self.config, self.delegate);
        let task = PeripheralTask::new(
            peripheral,
            owner_rx,
            radio_event_rx,
            radio_command_tx,
            radio_event_tx.clone(),
        );

        let runtime = PeripheralRuntime {
            handle: PeripheralHandle::new(owner_tx),
            task: tokio::spawn(task.run()),
        };
        let endpoint = RadioEndpoint {
            events: radio_event_tx,
            commands: radio_command_rx,
        };
        (runtime, endpoint)
    }
}

// ----------------------------------------------------------------------------
// Running Runtime
// ----------------------------------------------------------------------------

/// A spawned peripheral task plus the handle controlling it.
pub struct PeripheralRuntime {
    handle: PeripheralHandle,
    task: JoinHandle<Result<(), RuntimeError>>,
}

impl PeripheralRuntime {
    pub fn handle(&self) -> PeripheralHandle {
        self.handle.clone()
    }

    /// Wait for the peripheral task to finish.
    pub async fn join(self) -> Result<(), RuntimeError> {
        self.task.await.map_err(|_| RuntimeError::TaskAborted)?
    }
}
