//! Foundational types shared across the peripheral protocol.
//!
//! Time is represented as millisecond Unix timestamps behind the
//! [`TimeSource`] trait so that expiry logic can be driven by a manual
//! clock in tests.

use core::ops::{Add, Sub};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Timestamps
// ----------------------------------------------------------------------------

/// Millisecond-precision Unix timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a new timestamp from milliseconds since the Unix epoch.
    pub fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the Unix epoch.
    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl Add<u64> for Timestamp {
    type Output = Timestamp;

    fn add(self, millis: u64) -> Timestamp {
        Timestamp(self.0.saturating_add(millis))
    }
}

impl Sub for Timestamp {
    type Output = u64;

    fn sub(self, other: Timestamp) -> u64 {
        self.0.saturating_sub(other.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Source of current timestamps.
///
/// Implementations should provide monotonically non-decreasing timestamps
/// when possible.
pub trait TimeSource {
    /// Get the current timestamp.
    fn now(&self) -> Timestamp;
}

/// System clock implementation of [`TimeSource`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::new(
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        )
    }
}

// ----------------------------------------------------------------------------
// Opaque Radio-Stack Identifiers
// ----------------------------------------------------------------------------

/// Opaque correlation value minted by the radio backend for one ATT request.
///
/// The peripheral echoes it back in the matching response command and never
/// stores it; two requests belonging to the same logical chunked transfer
/// carry unrelated contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestContext(u64);

impl RequestContext {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{:#x}", self.0)
    }
}

/// Opaque identifier for a service registered with the radio stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceHandle(u64);

impl ServiceHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "svc-{:#x}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_arithmetic() {
        let t = Timestamp::new(1_000);
        assert_eq!((t + 500).as_millis(), 1_500);
        assert_eq!((t + 500) - t, 500);
        // Subtraction saturates instead of wrapping
        assert_eq!(t - (t + 500), 0);
    }

    #[test]
    fn test_timestamp_ordering() {
        let earlier = Timestamp::new(1_000);
        let later = Timestamp::new(2_000);
        assert!(earlier < later);
        assert_eq!(earlier, Timestamp::new(1_000));
    }

    #[test]
    fn test_system_time_source_advances() {
        let clock = SystemTimeSource;
        let now = clock.now();
        assert!(now.as_millis() > 0);
        assert!(clock.now() >= now);
    }

    #[test]
    fn test_opaque_identifier_display() {
        assert_eq!(format!("{}", RequestContext::new(0x2a)), "req-0x2a");
        assert_eq!(format!("{}", ServiceHandle::new(7)), "svc-0x7");
    }
}
