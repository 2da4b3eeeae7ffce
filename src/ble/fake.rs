//! In-memory radio stack for tests.

use async_trait::async_trait;
use btleplug::api::{CharPropFlags, Characteristic, Service};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::ble::security::SecurityHandler;
use crate::ble::transport::{EventSink, RadioEvent, Transport};
use crate::ble::uuids::*;
use crate::error::{Error, Result};

/// A characteristic write seen by the fake radio.
#[derive(Debug, Clone)]
pub(crate) struct RecordedWrite {
    pub service: Uuid,
    pub characteristic: Uuid,
    pub data: Vec<u8>,
    pub with_response: bool,
    pub at: Instant,
}

#[derive(Default)]
struct FakeState {
    local_name: Option<String>,
    events: Option<EventSink>,
    security: Option<Arc<dyn SecurityHandler>>,
    scans: Vec<Duration>,
    stop_scans: usize,
    connects: Vec<String>,
    connected: Option<String>,
    disconnects: usize,
    writes: Vec<RecordedWrite>,
    fail_connect: bool,
    fail_write_at: Option<usize>,
    services: Vec<Service>,
    disconnect_during_connect: bool,
}

/// Scriptable [`Transport`] that records every call.
pub(crate) struct FakeRadio {
    state: Mutex<FakeState>,
}

/// The camera's remote-control service with both characteristics.
pub(crate) fn remote_services() -> Vec<Service> {
    FakeRadio::services_without(Uuid::nil())
}

impl FakeRadio {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                services: remote_services(),
                ..Default::default()
            }),
        }
    }

    /// Remote-control service lacking the characteristic `missing`.
    pub fn services_without(missing: Uuid) -> Vec<Service> {
        let characteristics: BTreeSet<_> = [
            (COMMAND_CHARACTERISTIC_UUID, CharPropFlags::WRITE),
            (NOTIFY_CHARACTERISTIC_UUID, CharPropFlags::NOTIFY),
        ]
        .into_iter()
        .filter(|(uuid, _)| *uuid != missing)
        .map(|(uuid, properties)| Characteristic {
            uuid,
            service_uuid: REMOTE_SERVICE_UUID,
            properties,
            descriptors: BTreeSet::new(),
        })
        .collect();

        vec![Service {
            uuid: REMOTE_SERVICE_UUID,
            primary: true,
            characteristics,
        }]
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    pub fn fail_write_at(&self, index: usize) {
        self.state.lock().fail_write_at = Some(index);
    }

    pub fn set_services(&self, services: Vec<Service>) {
        self.state.lock().services = services;
    }

    /// Raise a `Disconnected` event while the next connect is in flight.
    pub fn disconnect_during_connect(&self) {
        self.state.lock().disconnect_during_connect = true;
    }

    /// Raise an event as the radio stack would.
    pub fn emit(&self, event: RadioEvent) {
        let events = self.state.lock().events.clone();
        if let Some(events) = events {
            let _ = events.send(event);
        }
    }

    pub fn local_name(&self) -> Option<String> {
        self.state.lock().local_name.clone()
    }

    pub fn security(&self) -> Option<Arc<dyn SecurityHandler>> {
        self.state.lock().security.clone()
    }

    pub fn scans(&self) -> Vec<Duration> {
        self.state.lock().scans.clone()
    }

    pub fn stop_scans(&self) -> usize {
        self.state.lock().stop_scans
    }

    pub fn connects(&self) -> Vec<String> {
        self.state.lock().connects.clone()
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().disconnects
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state.lock().writes.clone()
    }
}

#[async_trait]
impl Transport for FakeRadio {
    async fn init(
        &self,
        local_name: &str,
        events: EventSink,
        security: Arc<dyn SecurityHandler>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.local_name = Some(local_name.to_string());
        state.events = Some(events);
        state.security = Some(security);
        Ok(())
    }

    async fn start_scan(&self, duration: Duration) -> Result<()> {
        self.state.lock().scans.push(duration);
        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        self.state.lock().stop_scans += 1;
        self.emit(RadioEvent::ScanFinished);
        Ok(())
    }

    async fn connect(&self, address: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.connects.push(address.to_string());
        if state.fail_connect {
            return Err(Error::ConnectionFailed {
                reason: "fake connect failure".to_string(),
            });
        }
        state.connected = Some(address.to_string());

        if std::mem::take(&mut state.disconnect_during_connect) {
            if let Some(events) = &state.events {
                let _ = events.send(RadioEvent::Disconnected {
                    address: address.to_string(),
                });
            }
        }
        Ok(())
    }

    async fn discover_services(&self) -> Result<Vec<Service>> {
        let state = self.state.lock();
        if state.connected.is_none() {
            return Err(Error::NotConnected);
        }
        Ok(state.services.clone())
    }

    async fn write(
        &self,
        service: Uuid,
        characteristic: Uuid,
        data: &[u8],
        with_response: bool,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if state.connected.is_none() {
            return Err(Error::NotConnected);
        }
        if state.fail_write_at == Some(state.writes.len()) {
            return Err(Error::ConnectionLost);
        }
        state.writes.push(RecordedWrite {
            service,
            characteristic,
            data: data.to_vec(),
            with_response,
            at: Instant::now(),
        });
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.disconnects += 1;
        if let Some(address) = state.connected.take() {
            if let Some(events) = &state.events {
                let _ = events.send(RadioEvent::Disconnected { address });
            }
        }
        Ok(())
    }
}
