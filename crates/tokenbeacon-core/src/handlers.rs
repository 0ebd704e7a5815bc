//! ATT request handling: the read transaction protocol and the write
//! rejector.
//!
//! Reads arrive one per protocol transaction with an offset and no
//! correlation to prior reads; a multi-chunk transfer is a sequence of
//! independent calls. The ordering of the checks below is load-bearing:
//! the expiry notification fires before any validity re-check, and the
//! continuation guard applies only when the token was expired on entry.

use tracing::{debug, warn};

use crate::peripheral::PeripheralStats;
use crate::radio::{AttError, RadioCommand, WriteAttempt};
use crate::token::{TokenDelegate, TokenStore};
use crate::types::Timestamp;

// ----------------------------------------------------------------------------
// Read Transaction Handler
// ----------------------------------------------------------------------------

/// Serve one read at `offset`.
///
/// 1. Note whether the stored token is invalid at `now`.
/// 2. If so, notify the delegate synchronously; it may install a
///    replacement before returning.
/// 3. No valid token after the notification: read-not-permitted.
/// 4. Token was invalid on entry and `offset != 0`: read-not-permitted.
///    A non-zero offset continues a chunked read of the previous token
///    generation; serving it would stitch bytes from two generations into
///    one transfer. A fresh read must restart at offset 0.
/// 5. Offset at or past the end of the payload: invalid-offset.
/// 6. Otherwise: the rest of the payload from `offset`. Fragmentation to
///    the negotiated transfer size is the radio stack's job.
///
/// Every successful response is therefore a suffix of exactly one token
/// generation.
pub fn handle_read_request(
    store: &mut TokenStore,
    delegate: &mut dyn TokenDelegate,
    now: Timestamp,
    offset: usize,
    stats: &mut PeripheralStats,
) -> Result<Vec<u8>, AttError> {
    let expired_now = !store.is_valid_at(now);

    if expired_now {
        let previous = store.current().cloned();
        stats.expiry_notifications += 1;
        debug!(had_token = previous.is_some(), "Notifying delegate of expired token");
        delegate.token_expired(previous, store);
    }

    let result = read_decision(store, now, offset, expired_now);

    match &result {
        Ok(bytes) => {
            stats.reads_served += 1;
            debug!(offset, served = bytes.len(), "Read served");
        }
        Err(AttError::InvalidOffset) => {
            stats.reads_invalid_offset += 1;
            warn!(offset, "Read rejected: offset past end of payload");
        }
        Err(error) => {
            stats.reads_denied += 1;
            warn!(offset, %error, "Read denied");
        }
    }

    result
}

/// Steps 3 through 6, after any delegate refresh has happened.
fn read_decision(
    store: &TokenStore,
    now: Timestamp,
    offset: usize,
    expired_now: bool,
) -> Result<Vec<u8>, AttError> {
    let token = match store.current() {
        Some(token) if token.is_valid_at(now) => token,
        _ => return Err(AttError::ReadNotPermitted),
    };

    if expired_now && offset != 0 {
        return Err(AttError::ReadNotPermitted);
    }

    if offset >= token.payload.len() {
        return Err(AttError::InvalidOffset);
    }

    Ok(token.payload[offset..].to_vec())
}

// ----------------------------------------------------------------------------
// Write Rejector
// ----------------------------------------------------------------------------

/// Reject every attempt in a write batch independently.
///
/// No attempt is accepted and none mutates any state; the order of the
/// responses within the batch carries no meaning.
pub fn reject_write_batch(
    batch: &[WriteAttempt],
    stats: &mut PeripheralStats,
) -> Vec<RadioCommand> {
    stats.writes_rejected += batch.len() as u64;
    warn!(attempts = batch.len(), "Rejecting write batch");
    batch
        .iter()
        .map(|attempt| RadioCommand::RespondToWrite {
            ctx: attempt.ctx,
            error: AttError::WriteNotPermitted,
        })
        .collect()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
