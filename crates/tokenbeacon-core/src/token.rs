//! Token storage and the refresh delegate capability.
//!
//! A token is either present with a non-empty payload and a concrete
//! expiry, or absent. "No token yet" and "token present but expired" are
//! distinct states; both deny reads, but only the latter carries a previous
//! token into the delegate notification.

use tracing::debug;

use crate::errors::TokenError;
use crate::types::Timestamp;

// ----------------------------------------------------------------------------
// Token
// ----------------------------------------------------------------------------

/// A token payload with its expiration instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Opaque token bytes served to readers. Never empty.
    pub payload: Vec<u8>,
    /// Instant after which the token no longer validates.
    pub expires_at: Timestamp,
}

impl Token {
    /// True iff the token is still valid at `now` (expiry is strictly in
    /// the future).
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        self.expires_at > now
    }
}

// ----------------------------------------------------------------------------
// Token Store
// ----------------------------------------------------------------------------

/// Holds the current token, if any.
///
/// Updates replace the stored token atomically; there is no partial
/// visibility of old and new fields.
#[derive(Debug, Default)]
pub struct TokenStore {
    current: Option<Token>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored token.
    ///
    /// An empty payload is rejected so that "present" always implies
    /// readable bytes; absence stays the only empty state.
    pub fn update(&mut self, payload: Vec<u8>, expires_at: Timestamp) -> Result<(), TokenError> {
        if payload.is_empty() {
            return Err(TokenError::EmptyPayload);
        }
        debug!(
            len = payload.len(),
            preview = %preview(&payload),
            %expires_at,
            "Token updated"
        );
        self.current = Some(Token { payload, expires_at });
        Ok(())
    }

    /// Drop the stored token, returning to the absent state.
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// The present token, or absence.
    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// True iff a token is present and not yet expired at `now`.
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        self.current
            .as_ref()
            .map(|token| token.is_valid_at(now))
            .unwrap_or(false)
    }
}

/// Short hex preview of a payload for log lines.
fn preview(payload: &[u8]) -> String {
    const PREVIEW_LEN: usize = 8;
    if payload.len() <= PREVIEW_LEN {
        hex::encode(payload)
    } else {
        format!("{}..", hex::encode(&payload[..PREVIEW_LEN]))
    }
}

// ----------------------------------------------------------------------------
// Token Delegate
// ----------------------------------------------------------------------------

/// Capability that supplies replacement tokens.
///
/// `token_expired` is a synchronous, blocking call made from inside read
/// handling on the single event-processing thread: the delegate may install
/// a replacement via [`TokenStore::update`] before returning, and the read
/// proceeds only once it has. Slow work here stalls the whole event queue,
/// which is the contract, not a defect; deferring the refresh would require
/// correlating a delayed response to a request the transport never
/// identifies.
pub trait TokenDelegate: Send {
    /// The stored token was found expired (or absent) while serving a read.
    fn token_expired(&mut self, previous: Option<Token>, store: &mut TokenStore);
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
