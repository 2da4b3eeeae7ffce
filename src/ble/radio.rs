//! `btleplug` radio stack.
//!
//! Provides the [`Transport`] used on desktop hosts.

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter, Service, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::stream::StreamExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

use crate::ble::advertising::DiscoveryRecord;
use crate::ble::security::SecurityHandler;
use crate::ble::transport::{EventSink, RadioEvent, Transport};
use crate::error::{Error, Result};

/// [`Transport`] backed by the first Bluetooth adapter of the host.
///
/// Pairing is carried out by the platform's own agent (BlueZ, CoreBluetooth or
/// WinRT); the camera must be bonded through it once.
pub struct BtleplugRadio {
    /// The BLE adapter.
    adapter: Adapter,
    /// Where radio events go once `init` has run.
    events: Arc<RwLock<Option<EventSink>>>,
    /// Whether a scan cycle is running.
    is_scanning: Arc<AtomicBool>,
    /// Peripherals seen while scanning, by address.
    discovered: Arc<RwLock<HashMap<String, Peripheral>>>,
    /// The connected camera.
    connected: RwLock<Option<Peripheral>>,
    /// Handle to the adapter event task.
    event_handle: RwLock<Option<tokio::task::JoinHandle<()>>>,
    /// Handle to the scan timeout task.
    scan_timer: RwLock<Option<tokio::task::JoinHandle<()>>>,
}

impl BtleplugRadio {
    /// Open the first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self::with_adapter(adapter))
    }

    /// Use a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self {
            adapter,
            events: Arc::new(RwLock::new(None)),
            is_scanning: Arc::new(AtomicBool::new(false)),
            discovered: Arc::new(RwLock::new(HashMap::new())),
            connected: RwLock::new(None),
            event_handle: RwLock::new(None),
            scan_timer: RwLock::new(None),
        }
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Check if a scan cycle is running.
    pub fn is_scanning(&self) -> bool {
        self.is_scanning.load(Ordering::SeqCst)
    }

    /// Handle a BLE central event.
    async fn handle_event(
        event: CentralEvent,
        adapter: &Adapter,
        is_scanning: &AtomicBool,
        discovered: &RwLock<HashMap<String, Peripheral>>,
        events: &EventSink,
    ) {
        match event {
            CentralEvent::DeviceDiscovered(id)
            | CentralEvent::DeviceUpdated(id)
            | CentralEvent::ManufacturerDataAdvertisement { id, .. } => {
                if is_scanning.load(Ordering::SeqCst) {
                    Self::process_peripheral(adapter, id, discovered, events).await;
                }
            }
            CentralEvent::DeviceConnected(id) => {
                debug!("Device connected: {:?}", id);
            }
            CentralEvent::DeviceDisconnected(id) => {
                debug!("Device disconnected: {:?}", id);
                let _ = events.send(RadioEvent::Disconnected {
                    address: id.to_string(),
                });
            }
            CentralEvent::ServiceDataAdvertisement { .. } => {}
            CentralEvent::ServicesAdvertisement { .. } => {}
            CentralEvent::StateUpdate(_) => {}
        }
    }

    /// Turn a discovered peripheral into a discovery record.
    async fn process_peripheral(
        adapter: &Adapter,
        id: PeripheralId,
        discovered: &RwLock<HashMap<String, Peripheral>>,
        events: &EventSink,
    ) {
        let peripheral = match adapter.peripheral(&id).await {
            Ok(p) => p,
            Err(e) => {
                trace!("Failed to get peripheral: {}", e);
                return;
            }
        };

        let properties = match peripheral.properties().await {
            Ok(Some(p)) => p,
            _ => return,
        };

        let address = id.to_string();
        let record = DiscoveryRecord::from_properties(address.clone(), &properties);

        discovered.write().insert(address, peripheral);

        let _ = events.send(RadioEvent::Discovered(record));
    }

    /// Find a peripheral by address, falling back to the adapter's cache.
    async fn find_peripheral(&self, address: &str) -> Result<Peripheral> {
        let known = self.discovered.read().get(address).cloned();
        if let Some(peripheral) = known {
            return Ok(peripheral);
        }

        self.adapter
            .peripherals()
            .await?
            .into_iter()
            .find(|p| p.id().to_string() == address)
            .ok_or_else(|| Error::ConnectionFailed {
                reason: format!("Unknown device {}", address),
            })
    }

    fn connected_peripheral(&self) -> Result<Peripheral> {
        self.connected.read().clone().ok_or(Error::NotConnected)
    }

    fn send_event(&self, event: RadioEvent) {
        if let Some(events) = self.events.read().as_ref() {
            let _ = events.send(event);
        }
    }
}

#[async_trait]
impl Transport for BtleplugRadio {
    async fn init(
        &self,
        local_name: &str,
        events: EventSink,
        security: Arc<dyn SecurityHandler>,
    ) -> Result<()> {
        debug!(
            "Radio ready as {} (pairing by platform agent, encryption {:?})",
            local_name,
            security.encryption_level()
        );

        let mut adapter_events = self.adapter.events().await?;

        *self.events.write() = Some(events.clone());

        let adapter = self.adapter.clone();
        let is_scanning = self.is_scanning.clone();
        let discovered = self.discovered.clone();

        let handle = tokio::spawn(async move {
            while let Some(event) = adapter_events.next().await {
                if events.is_closed() {
                    break;
                }
                Self::handle_event(event, &adapter, &is_scanning, &discovered, &events).await;
            }

            debug!("Adapter event loop ended");
        });

        if let Some(previous) = self.event_handle.write().replace(handle) {
            previous.abort();
        }

        Ok(())
    }

    async fn start_scan(&self, duration: Duration) -> Result<()> {
        if self.is_scanning.swap(true, Ordering::SeqCst) {
            debug!("Already scanning, ignoring start request");
            return Ok(());
        }

        info!("Starting BLE scan for {:?}", duration);

        self.discovered.write().clear();

        if let Err(e) = self.adapter.start_scan(ScanFilter::default()).await {
            self.is_scanning.store(false, Ordering::SeqCst);
            return Err(Error::Bluetooth(e));
        }

        let adapter = self.adapter.clone();
        let is_scanning = self.is_scanning.clone();
        let events = self.events.clone();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(duration).await;

            if is_scanning.swap(false, Ordering::SeqCst) {
                if let Err(e) = adapter.stop_scan().await {
                    error!("Failed to stop scan: {}", e);
                }
                if let Some(events) = events.read().as_ref() {
                    let _ = events.send(RadioEvent::ScanFinished);
                }
            }
        });

        if let Some(previous) = self.scan_timer.write().replace(timer) {
            previous.abort();
        }

        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        if !self.is_scanning.swap(false, Ordering::SeqCst) {
            debug!("Not scanning, ignoring stop request");
            return Ok(());
        }

        info!("Stopping BLE scan");

        if let Some(timer) = self.scan_timer.write().take() {
            timer.abort();
        }

        let result = self.adapter.stop_scan().await.map_err(Error::Bluetooth);
        self.send_event(RadioEvent::ScanFinished);
        result
    }

    async fn connect(&self, address: &str) -> Result<()> {
        let peripheral = self.find_peripheral(address).await?;

        if !peripheral.is_connected().await.unwrap_or(false) {
            peripheral.connect().await?;
        }

        *self.connected.write() = Some(peripheral);
        Ok(())
    }

    async fn discover_services(&self) -> Result<Vec<Service>> {
        let peripheral = self.connected_peripheral()?;
        peripheral.discover_services().await?;
        Ok(peripheral.services().into_iter().collect())
    }

    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        data: &[u8],
        with_response: bool,
    ) -> Result<()> {
        let peripheral = self.connected_peripheral()?;

        let target = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == characteristic && c.service_uuid == service)
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: characteristic.to_string(),
            })?;

        let write_type = if with_response {
            WriteType::WithResponse
        } else {
            WriteType::WithoutResponse
        };

        peripheral.write(&target, data, write_type).await?;

        trace!("Wrote {} bytes to characteristic {}", data.len(), characteristic);

        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let Some(peripheral) = self.connected.write().take() else {
            return Ok(());
        };

        if peripheral.is_connected().await.unwrap_or(false) {
            peripheral.disconnect().await?;
            info!("Disconnected from {}", peripheral.id());
        }

        Ok(())
    }
}

impl Drop for BtleplugRadio {
    fn drop(&mut self) {
        self.is_scanning.store(false, Ordering::SeqCst);
        if let Some(handle) = self.event_handle.write().take() {
            handle.abort();
        }
        if let Some(timer) = self.scan_timer.write().take() {
            timer.abort();
        }
    }
}
