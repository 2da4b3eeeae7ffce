//! Shutter command transmission.
//!
//! Writes the trigger sequence to the camera's command characteristic.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, trace};

use crate::ble::connection::GattEndpoint;
use crate::ble::transport::Transport;
use crate::error::Result;
use crate::protocol::commands::{Command, TRIGGER_SEQUENCE};

/// Default pause after the take-picture and shutter-released writes.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Sends shutter commands to a connected camera.
pub struct CommandDispatcher {
    /// The radio stack.
    transport: Arc<dyn Transport>,
    /// Pause after writes that need the camera to settle.
    settle_delay: Duration,
    /// When the last trigger sequence started.
    last_fired: RwLock<Option<Instant>>,
}

impl CommandDispatcher {
    /// Create a dispatcher writing through `transport`.
    pub fn new(transport: Arc<dyn Transport>, settle_delay: Duration) -> Self {
        Self {
            transport,
            settle_delay,
            last_fired: RwLock::new(None),
        }
    }

    /// When the last trigger sequence started, if any.
    pub fn last_fired(&self) -> Option<Instant> {
        *self.last_fired.read()
    }

    /// Write a single command as a confirmed write.
    pub async fn send(&self, endpoint: &GattEndpoint, command: Command) -> Result<()> {
        trace!("Sending {}", command);
        self.transport
            .write(endpoint.service, endpoint.command, &command.opcode(), true)
            .await
    }

    /// Write the full trigger sequence, pausing where the camera needs to settle.
    ///
    /// Stops at the first failed write; later commands are never sent out of order.
    pub async fn fire(&self, endpoint: &GattEndpoint) -> Result<()> {
        for step in TRIGGER_SEQUENCE {
            self.send(endpoint, step.command).await?;
            if step.settle_after {
                tokio::time::sleep(self.settle_delay).await;
            }
        }
        Ok(())
    }

    /// Fire the shutter if an endpoint is available.
    ///
    /// Without an endpoint the call is dropped silently. The calling task is
    /// held for the whole sequence. Returns true if every command was written.
    pub async fn trigger(&self, endpoint: Option<GattEndpoint>) -> bool {
        let Some(endpoint) = endpoint else {
            debug!("Trigger dropped: camera not connected");
            return false;
        };

        *self.last_fired.write() = Some(Instant::now());

        match self.fire(&endpoint).await {
            Ok(()) => true,
            Err(e) => {
                error!("Trigger sequence aborted: {}", e);
                false
            }
        }
    }
}
