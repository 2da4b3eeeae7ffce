//! Radio stack abstraction.
//!
//! The remote-control client talks to the radio through [`Transport`] and
//! receives asynchronous radio activity as [`RadioEvent`]s on an [`EventSink`].

use async_trait::async_trait;
use btleplug::api::Service;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::ble::advertising::DiscoveryRecord;
use crate::ble::security::SecurityHandler;
use crate::error::Result;

/// Events raised by the radio stack from its own execution context.
#[derive(Debug, Clone)]
pub enum RadioEvent {
    /// An advertisement was received while scanning.
    Discovered(DiscoveryRecord),
    /// A scan cycle ended, by timeout or by an explicit stop.
    ScanFinished,
    /// The link to a peripheral went down.
    Disconnected {
        /// Address of the peripheral that disconnected.
        address: String,
    },
}

/// Producer side of the radio event queue.
pub type EventSink = mpsc::UnboundedSender<RadioEvent>;

/// Operations the remote-control client needs from a BLE radio stack.
///
/// Only one peripheral link is managed at a time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Bring up the radio under `local_name`, route radio events to `events`
    /// and answer pairing requests with `security`.
    async fn init(
        &self,
        local_name: &str,
        events: EventSink,
        security: Arc<dyn SecurityHandler>,
    ) -> Result<()>;

    /// Start an active scan that ends on its own after `duration`.
    async fn start_scan(&self, duration: Duration) -> Result<()>;

    /// Stop the running scan, if any.
    async fn stop_scan(&self) -> Result<()>;

    /// Open a link to the peripheral at `address`.
    async fn connect(&self, address: &str) -> Result<()>;

    /// Discover the GATT services of the connected peripheral.
    async fn discover_services(&self) -> Result<Vec<Service>>;

    /// Write `data` to a characteristic of the connected peripheral.
    ///
    /// With `with_response` set the call returns once the peripheral has
    /// acknowledged the write.
    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        data: &[u8],
        with_response: bool,
    ) -> Result<()>;

    /// Close the link to the connected peripheral.
    async fn disconnect(&self) -> Result<()>;
}
