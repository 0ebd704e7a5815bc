//! Owner handle for a running peripheral task.

use tokenbeacon_core::{PeripheralStats, Timestamp};

use crate::channels::OwnerCommandSender;
use crate::error::RuntimeError;
use crate::messages::OwnerCommand;

// ----------------------------------------------------------------------------
// Peripheral Handle
// ----------------------------------------------------------------------------

/// Cloneable handle exposing the owner-facing operations of a running
/// peripheral.
///
/// Commands are processed in order on the peripheral task; a token update
/// that fails validation there (empty payload) is logged by the task rather
/// than reported back through the handle.
#[derive(Debug, Clone)]
pub struct PeripheralHandle {
    commands: OwnerCommandSender,
}

impl PeripheralHandle {
    pub(crate) fn new(commands: OwnerCommandSender) -> Self {
        Self { commands }
    }

    /// Replace the served token.
    pub async fn update_token(
        &self,
        payload: Vec<u8>,
        expires_at: Timestamp,
    ) -> Result<(), RuntimeError> {
        self.send(OwnerCommand::UpdateToken {
            payload,
            expires_at,
        })
        .await
    }

    /// Drop the served token.
    pub async fn clear_token(&self) -> Result<(), RuntimeError> {
        self.send(OwnerCommand::ClearToken).await
    }

    /// Fetch the peripheral's activity counters.
    pub async fn stats(&self) -> Result<PeripheralStats, RuntimeError> {
        let (reply, response) = tokio::sync::oneshot::channel();
        self.send(OwnerCommand::GetStats { reply }).await?;
        response.await.map_err(|_| RuntimeError::ChannelClosed {
            channel: "stats-reply",
        })
    }

    /// Stop the peripheral task gracefully.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.send(OwnerCommand::Shutdown).await
    }

    async fn send(&self, command: OwnerCommand) -> Result<(), RuntimeError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RuntimeError::ChannelClosed { channel: "owner" })
    }
}
