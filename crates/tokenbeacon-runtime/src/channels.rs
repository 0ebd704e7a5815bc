//! Channel plumbing between the owner, the peripheral task, and the radio
//! backend.

use tokenbeacon_core::radio::{RadioCommand, RadioEvent};

use crate::messages::OwnerCommand;

// ----------------------------------------------------------------------------
// Channel Type Aliases
// ----------------------------------------------------------------------------

pub type OwnerCommandSender = tokio::sync::mpsc::Sender<OwnerCommand>;
pub type OwnerCommandReceiver = tokio::sync::mpsc::Receiver<OwnerCommand>;
pub type RadioEventSender = tokio::sync::mpsc::Sender<RadioEvent>;
pub type RadioEventReceiver = tokio::sync::mpsc::Receiver<RadioEvent>;
pub type RadioCommandSender = tokio::sync::mpsc::Sender<RadioCommand>;
pub type RadioCommandReceiver = tokio::sync::mpsc::Receiver<RadioCommand>;

// ----------------------------------------------------------------------------
// Channel Configuration
// ----------------------------------------------------------------------------

/// Buffer sizes for the runtime's channels.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub owner_buffer_size: usize,
    pub radio_event_buffer_size: usize,
    pub radio_command_buffer_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            owner_buffer_size: 16,
            radio_event_buffer_size: 64,
            radio_command_buffer_size: 64,
        }
    }
}

// ----------------------------------------------------------------------------
// Channel Constructors
// ----------------------------------------------------------------------------

pub fn create_owner_channel(config: &ChannelConfig) -> (OwnerCommandSender, OwnerCommandReceiver) {
    tokio::sync::mpsc::channel(config.owner_buffer_size)
}

pub fn create_radio_event_channel(
    config: &ChannelConfig,
) -> (RadioEventSender, RadioEventReceiver) {
    tokio::sync::mpsc::channel(config.radio_event_buffer_size)
}

pub fn create_radio_command_channel(
    config: &ChannelConfig,
) -> (RadioCommandSender, RadioCommandReceiver) {
    tokio::sync::mpsc::channel(config.radio_command_buffer_size)
}
