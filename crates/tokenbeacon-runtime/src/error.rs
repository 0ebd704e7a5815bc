//! Error types for the runtime engine.

use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors raised by the peripheral task and its owner handle.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Channel closed: {channel}")]
    ChannelClosed { channel: &'static str },

    #[error("Peripheral task terminated abnormally")]
    TaskAborted,
}
