//! Owner-facing command protocol.

use tokenbeacon_core::{PeripheralStats, Timestamp};

// ----------------------------------------------------------------------------
// OwnerCommand: Owner → Peripheral Task
// ----------------------------------------------------------------------------

/// Commands sent from the owner to the peripheral task.
#[derive(Debug)]
pub enum OwnerCommand {
    /// Replace the served token.
    UpdateToken {
        payload: Vec<u8>,
        expires_at: Timestamp,
    },
    /// Drop the served token; reads are denied until a new one arrives.
    ClearToken,
    /// Report the peripheral's activity counters.
    GetStats {
        reply: tokio::sync::oneshot::Sender<PeripheralStats>,
    },
    /// Stop the task gracefully.
    Shutdown,
}
