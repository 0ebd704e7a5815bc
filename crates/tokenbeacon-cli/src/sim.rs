//! In-memory scripted radio backend.
//!
//! Plays the role of the radio stack against a running peripheral: it
//! powers the adapter on, acknowledges registration and advertising, then
//! acts as a reading central performing a chunked transfer, a rejected
//! write batch, and an expiry round. The chunking mirrors what a real
//! stack does with the peripheral's rest-of-blob responses: each read
//! returns everything from the offset, and the backend takes one
//! MTU-sized slice before issuing the next offset.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokenbeacon_core::radio::{RadioCommand, RadioEvent, RadioPowerState, WriteAttempt};
use tokenbeacon_core::{
    AttError, RequestContext, ServiceHandle, SystemTimeSource, TimeSource, Token, TokenDelegate,
    TokenStore,
};
use tokenbeacon_runtime::builder::RadioEndpoint;
use tokio::time::timeout;
use tracing::{info, warn};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

// ----------------------------------------------------------------------------
// Rotating Token Source
// ----------------------------------------------------------------------------

/// Demo token source: installs `token-NNNN` payloads, each valid for the
/// configured lifetime, whenever the peripheral reports an expiry.
pub struct RotatingTokenSource {
    generation: u32,
    ttl_ms: u64,
}

impl RotatingTokenSource {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            generation: 0,
            ttl_ms,
        }
    }
}

impl TokenDelegate for RotatingTokenSource {
    fn token_expired(&mut self, previous: Option<Token>, store: &mut TokenStore) {
        self.generation += 1;
        let payload = format!("token-{:04}", self.generation).into_bytes();
        info!(
            generation = self.generation,
            had_previous = previous.is_some(),
            "Refreshing expired token"
        );
        let expires_at = SystemTimeSource.now() + self.ttl_ms;
        if let Err(error) = store.update(payload, expires_at) {
            warn!(%error, "Failed to install replacement token");
        }
    }
}

// ----------------------------------------------------------------------------
// Simulated Radio
// ----------------------------------------------------------------------------

/// Scripted backend driving one demo session over a [`RadioEndpoint`].
pub struct SimulatedRadio {
    endpoint: RadioEndpoint,
    mtu: usize,
    token_ttl_ms: u64,
    next_ctx: u64,
}

impl SimulatedRadio {
    pub fn new(endpoint: RadioEndpoint, mtu: usize, token_ttl_ms: u64) -> Self {
        Self {
            endpoint,
            mtu: mtu.max(1),
            token_ttl_ms,
            next_ctx: 0,
        }
    }

    /// Run the full scripted session.
    pub async fn run(mut self) -> Result<()> {
        self.bring_up().await?;

        let blob = self.read_blob().await?;
        info!(
            len = blob.len(),
            payload = %String::from_utf8_lossy(&blob),
            hex = %hex::encode(&blob),
            "Chunked read session complete"
        );

        self.reject_writes().await?;
        self.expiry_round().await?;

        info!("Simulated radio session finished");
        Ok(())
    }

    /// Power on and acknowledge registration and advertising.
    async fn bring_up(&mut self) -> Result<()> {
        self.send(RadioEvent::PowerStateChanged(RadioPowerState::PoweredOn))
            .await?;

        match self.recv().await? {
            RadioCommand::AddService(descriptor) => {
                info!(service = %descriptor.service_uuid, "Backend registering service");
                self.send(RadioEvent::ServiceAdded(Ok(ServiceHandle::new(1))))
                    .await?;
            }
            other => bail!("Expected AddService, got {:?}", other),
        }

        match self.recv().await? {
            RadioCommand::StartAdvertising { service_uuid } => {
                info!(service = %service_uuid, "Backend advertising");
                self.send(RadioEvent::AdvertisingStarted(Ok(()))).await?;
            }
            other => bail!("Expected StartAdvertising, got {:?}", other),
        }

        Ok(())
    }

    /// Read the full token blob the way a central does: successive reads at
    /// increasing offsets, taking one MTU-sized slice per response.
    async fn read_blob(&mut self) -> Result<Vec<u8>> {
        let mut blob = Vec::new();
        let mut offset = 0;

        loop {
            let rest = match self.read_at(offset).await? {
                Ok(rest) => rest,
                Err(error) => bail!("Read at offset {} failed: {}", offset, error),
            };
            let take = rest.len().min(self.mtu);
            blob.extend_from_slice(&rest[..take]);
            info!(offset, chunk = take, "Received chunk");
            if rest.len() <= self.mtu {
                return Ok(blob);
            }
            offset += take;
        }
    }

    /// Send a write batch and confirm every attempt is rejected.
    async fn reject_writes(&mut self) -> Result<()> {
        let attempts = vec![
            WriteAttempt {
                ctx: self.mint_ctx(),
                offset: 0,
                value: b"intruder".to_vec(),
            },
            WriteAttempt {
                ctx: self.mint_ctx(),
                offset: 8,
                value: b"data".to_vec(),
            },
        ];
        let expected = attempts.len();
        self.send(RadioEvent::WriteRequests(attempts)).await?;

        for _ in 0..expected {
            match self.recv().await? {
                RadioCommand::RespondToWrite { ctx, error } => {
                    info!(%ctx, %error, "Write attempt rejected");
                }
                other => bail!("Expected RespondToWrite, got {:?}", other),
            }
        }
        Ok(())
    }

    /// Let the token expire, then show both sides of the expiry race: a
    /// continuation offset is refused, a fresh read from zero serves the
    /// replacement token.
    async fn expiry_round(&mut self) -> Result<()> {
        info!(ttl_ms = self.token_ttl_ms, "Waiting for the token to expire");
        tokio::time::sleep(Duration::from_millis(self.token_ttl_ms + 100)).await;

        match self.read_at(4).await? {
            Err(AttError::ReadNotPermitted) => {
                info!("Continuation across expiry refused, restarting from offset 0");
            }
            other => bail!("Expected ReadNotPermitted for stale continuation, got {:?}", other),
        }

        let refreshed = match self.read_at(0).await? {
            Ok(rest) => rest,
            Err(error) => bail!("Fresh read after refresh failed: {}", error),
        };
        info!(
            payload = %String::from_utf8_lossy(&refreshed),
            "Fresh read served the replacement token"
        );
        Ok(())
    }

    async fn read_at(&mut self, offset: usize) -> Result<std::result::Result<Vec<u8>, AttError>> {
        let ctx = self.mint_ctx();
        self.send(RadioEvent::ReadRequest { offset, ctx }).await?;
        match self.recv().await? {
            RadioCommand::RespondToRead {
                ctx: reply_ctx,
                result,
            } => {
                if reply_ctx != ctx {
                    bail!("Response context {} does not match request {}", reply_ctx, ctx);
                }
                Ok(result)
            }
            other => bail!("Expected RespondToRead, got {:?}", other),
        }
    }

    fn mint_ctx(&mut self) -> RequestContext {
        self.next_ctx += 1;
        RequestContext::new(self.next_ctx)
    }

    async fn send(&self, event: RadioEvent) -> Result<()> {
        self.endpoint
            .events
            .send(event)
            .await
            .context("Peripheral task stopped consuming events")
    }

    async fn recv(&mut self) -> Result<RadioCommand> {
        timeout(COMMAND_TIMEOUT, self.endpoint.commands.recv())
            .await
            .context("Timed out waiting for a radio command")?
            .context("Peripheral task stopped emitting commands")
    }
}
