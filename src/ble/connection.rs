//! BLE connection management.
//!
//! Owns the link lifecycle to the camera, from scanning through GATT
//! resolution, and announces every connected/disconnected transition.

use btleplug::api::Service;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ble::advertising::PairingReadiness;
use crate::ble::transport::Transport;
use crate::ble::uuids::*;
use crate::error::{Error, Result};

/// Connection state for the camera link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    /// No link and no scan running.
    #[default]
    Idle,
    /// Scanning for the camera.
    Scanning,
    /// Camera found in pairing mode.
    PairingRequired,
    /// Camera found, not in pairing mode.
    ConnectRequired,
    /// Connection attempt in flight.
    Connecting,
    /// Connected with the command endpoint resolved.
    Connected,
}

impl ConnectionState {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if a connection attempt is pending.
    pub fn is_connect_pending(&self) -> bool {
        matches!(self, Self::PairingRequired | Self::ConnectRequired)
    }

    /// Check if in a transitional state.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Scanning | Self::Connecting) || self.is_connect_pending()
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Scanning => write!(f, "Scanning"),
            Self::PairingRequired => write!(f, "Pairing Required"),
            Self::ConnectRequired => write!(f, "Connect Required"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// The camera being paired with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// Advertised name of the camera to pair with.
    pub target_name: String,
    /// Address of the camera, known once discovery matched.
    pub address: Option<String>,
}

impl DeviceIdentity {
    /// Create an identity with no resolved address.
    pub fn new(target_name: impl Into<String>) -> Self {
        Self {
            target_name: target_name.into(),
            address: None,
        }
    }
}

/// Resolved GATT handles of the remote-control service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GattEndpoint {
    /// Remote-control service UUID.
    pub service: Uuid,
    /// Command characteristic UUID (write).
    pub command: Uuid,
    /// Notify characteristic UUID.
    pub notify: Uuid,
}

impl GattEndpoint {
    /// Resolve the remote-control endpoint from discovered services.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceNotFound`] if the remote-control service is
    /// missing, or [`Error::CharacteristicNotFound`] if either characteristic is.
    pub fn resolve(services: &[Service]) -> Result<Self> {
        let service = services
            .iter()
            .find(|s| is_remote_service(&s.uuid))
            .ok_or_else(|| Error::ServiceNotFound {
                uuid: REMOTE_SERVICE_UUID.to_string(),
            })?;

        let find = |uuid: Uuid| {
            service
                .characteristics
                .iter()
                .find(|c| c.uuid == uuid)
                .map(|c| c.uuid)
                .ok_or_else(|| Error::CharacteristicNotFound {
                    uuid: uuid.to_string(),
                })
        };

        let command = find(COMMAND_CHARACTERISTIC_UUID)?;
        let notify = find(NOTIFY_CHARACTERISTIC_UUID)?;

        Ok(Self {
            service: service.uuid,
            command,
            notify,
        })
    }
}

/// Link state guarded by a single lock so that state, identity and endpoint
/// always change together.
#[derive(Debug)]
struct LinkState {
    state: ConnectionState,
    identity: DeviceIdentity,
    endpoint: Option<GattEndpoint>,
}

impl LinkState {
    /// Move to `Idle`, dropping the address and endpoint.
    ///
    /// Returns true if the link was connected.
    fn reset(&mut self) -> bool {
        let was_connected = self.state.is_connected();
        self.state = ConnectionState::Idle;
        self.identity.address = None;
        self.endpoint = None;
        was_connected
    }
}

/// Manages the connection to the camera.
///
/// The manager is the only writer of [`ConnectionState`], [`DeviceIdentity`]
/// and [`GattEndpoint`]. All transitions happen under one lock, and
/// connected-state notifications are sent while it is held so subscribers see
/// them in transition order.
pub struct ConnectionManager {
    /// The radio stack.
    transport: Arc<dyn Transport>,
    /// State, identity and endpoint.
    link: RwLock<LinkState>,
    /// Channel for connected-state changes.
    event_tx: broadcast::Sender<bool>,
}

impl ConnectionManager {
    /// Create a new connection manager for the camera named `target_name`.
    pub fn new(transport: Arc<dyn Transport>, target_name: impl Into<String>) -> Self {
        let (event_tx, _) = broadcast::channel(16);

        Self {
            transport,
            link: RwLock::new(LinkState {
                state: ConnectionState::Idle,
                identity: DeviceIdentity::new(target_name),
                endpoint: None,
            }),
            event_tx,
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.link.read().state
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Get the camera identity.
    pub fn identity(&self) -> DeviceIdentity {
        self.link.read().identity.clone()
    }

    /// Get the resolved endpoint, only while connected.
    pub fn connected_endpoint(&self) -> Option<GattEndpoint> {
        let link = self.link.read();
        if link.state.is_connected() {
            link.endpoint
        } else {
            None
        }
    }

    /// Subscribe to connected-state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<bool> {
        self.event_tx.subscribe()
    }

    /// Change the camera to pair with. Takes effect on the next discovery.
    pub fn set_target_name(&self, target_name: impl Into<String>) {
        self.link.write().identity.target_name = target_name.into();
    }

    /// Announce the current connected state to subscribers.
    pub fn publish_state(&self) {
        let link = self.link.read();
        let _ = self.event_tx.send(link.state.is_connected());
    }

    /// Move from `Idle` to `Scanning`. Returns false if not idle.
    pub fn begin_scan(&self) -> bool {
        self.transition(ConnectionState::Idle, ConnectionState::Scanning)
    }

    /// The scan cycle ended. Returns to `Idle` if nothing was found.
    pub fn scan_finished(&self) {
        let mut link = self.link.write();
        if link.state == ConnectionState::Scanning {
            debug!("Scan finished without a connectable camera");
            link.reset();
        }
    }

    /// Record a discovery match.
    ///
    /// The address is captured at most once per scan cycle, and only while
    /// scanning. With a readiness signal the state moves on to
    /// `PairingRequired` or `ConnectRequired`.
    ///
    /// Returns true if the match was accepted.
    pub fn on_discovery_match(
        &self,
        address: impl Into<String>,
        readiness: Option<PairingReadiness>,
    ) -> bool {
        let mut link = self.link.write();

        if link.state != ConnectionState::Scanning || link.identity.address.is_some() {
            debug!("Ignoring discovery match in state {}", link.state);
            return false;
        }

        link.identity.address = Some(address.into());
        if let Some(readiness) = readiness {
            let new_state = readiness.connection_state();
            debug!("Connection state changed: {} -> {}", link.state, new_state);
            link.state = new_state;
        }

        true
    }

    /// Connect to the discovered camera and resolve the command endpoint.
    ///
    /// Only runs from `PairingRequired` or `ConnectRequired`; any other state
    /// (including an attempt already in flight) makes this a no-op. Every
    /// failure returns the state to `Idle`.
    pub async fn request_connect(&self) -> Result<()> {
        let address = {
            let mut link = self.link.write();
            if !link.state.is_connect_pending() {
                debug!("No connection pending in state {}", link.state);
                return Ok(());
            }

            match link.identity.address.clone() {
                Some(address) => {
                    link.state = ConnectionState::Connecting;
                    address
                }
                None => {
                    link.reset();
                    return Err(Error::ConnectionFailed {
                        reason: "No camera address".to_string(),
                    });
                }
            }
        };

        info!("Connecting to camera at {}", address);

        if let Err(e) = self.transport.connect(&address).await {
            warn!("Failed to connect: {}", e);
            self.link.write().reset();
            return Err(e);
        }

        info!("Connected to camera");

        let endpoint = match self.resolve_endpoint().await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                warn!("{}", e);
                self.abort_link().await;
                return Err(e);
            }
        };

        info!("Camera BLE service and characteristics found");

        {
            let mut link = self.link.write();
            if link.state == ConnectionState::Connecting {
                debug!(
                    "Connection state changed: {} -> {}",
                    link.state,
                    ConnectionState::Connected
                );
                link.state = ConnectionState::Connected;
                link.endpoint = Some(endpoint);
                let _ = self.event_tx.send(true);
                return Ok(());
            }
        }

        warn!("Connection attempt superseded");
        self.abort_link().await;
        Err(Error::ConnectionLost)
    }

    /// Handle a disconnection event.
    ///
    /// Always ends in `Idle`. A `false` notification is sent only when the link
    /// was connected, so repeated calls notify once. Returns true if it was sent.
    pub fn on_disconnect(&self) -> bool {
        let mut link = self.link.write();
        let previous = link.state;
        if link.reset() {
            info!("Disconnected from camera");
            let _ = self.event_tx.send(false);
            true
        } else {
            if previous != ConnectionState::Idle {
                debug!("Connection state changed: {} -> {}", previous, ConnectionState::Idle);
            }
            false
        }
    }

    /// Disconnect from the camera.
    pub async fn disconnect(&self) -> Result<()> {
        if self.state() == ConnectionState::Idle {
            return Ok(());
        }

        let result = self.transport.disconnect().await;
        self.on_disconnect();
        result
    }

    async fn resolve_endpoint(&self) -> Result<GattEndpoint> {
        let services = self.transport.discover_services().await?;
        debug!("Discovered {} services", services.len());
        GattEndpoint::resolve(&services)
    }

    /// Drop a half-open link after a failed attempt.
    async fn abort_link(&self) {
        self.link.write().reset();
        if let Err(e) = self.transport.disconnect().await {
            debug!("Failed to disconnect after aborted attempt: {}", e);
        }
    }

    fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        let mut link = self.link.write();
        if link.state != from {
            return false;
        }
        debug!("Connection state changed: {} -> {}", from, to);
        link.state = to;
        true
    }
}
