//! TokenBeacon runtime engine.
//!
//! Wires the [`tokenbeacon_core::Peripheral`] state machine to a radio
//! backend over typed channels and runs it on a single tokio task, the
//! runtime analogue of the radio stack's serialized callback queue.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tokenbeacon_core::{
//!     PeripheralConfig, SystemTimeSource, TimeSource, Token, TokenDelegate, TokenStore,
//! };
//! use tokenbeacon_runtime::PeripheralRuntimeBuilder;
//! use uuid::Uuid;
//!
//! struct NoRefresh;
//!
//! impl TokenDelegate for NoRefresh {
//!     fn token_expired(&mut self, _previous: Option<Token>, _store: &mut TokenStore) {}
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PeripheralConfig::new(
//!     Uuid::from_u128(0x8C271E92_44B3_4A70_9D11_56F2E10A0001),
//!     Uuid::from_u128(0x8C271E92_44B3_4A70_9D11_56F2E10A0002),
//! )?;
//!
//! let (runtime, endpoint) = PeripheralRuntimeBuilder::new(config, Box::new(NoRefresh)).spawn();
//!
//! // Hand `endpoint` to the radio backend; it feeds events in through
//! // `endpoint.events` and consumes commands from `endpoint.commands`.
//!
//! let handle = runtime.handle();
//! handle.update_token(b"token".to_vec(), SystemTimeSource.now() + 60_000).await?;
//! # Ok(())
//! # }
//! ```

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod builder;
pub mod channels;
pub mod error;
pub mod handle;
pub mod messages;
pub mod task;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use builder::{PeripheralRuntime, PeripheralRuntimeBuilder, RadioEndpoint};
pub use channels::ChannelConfig;
pub use error::RuntimeError;
pub use handle::PeripheralHandle;
pub use messages::OwnerCommand;
pub use task::PeripheralTask;
