//! Remote-control controller.
//!
//! [`RemoteControl`] is the single entry point for the application: it is
//! polled once per control-loop iteration, drives scanning and connecting, and
//! forwards shutter requests to the camera while connected.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::ble::advertising::{AdvertisementFilter, DiscoveryRecord, FilterOutcome};
use crate::ble::connection::{ConnectionManager, ConnectionState, DeviceIdentity};
use crate::ble::dispatcher::CommandDispatcher;
use crate::ble::radio::BtleplugRadio;
use crate::ble::security::{FixedPasskeyPolicy, SecurityHandler};
use crate::ble::transport::{EventSink, RadioEvent, Transport};
use crate::config::RemoteConfig;
use crate::error::Result;

/// Callback handle for unregistering callbacks.
pub struct CallbackHandle {
    id: u64,
    unregister_fn: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CallbackHandle {
    /// Create a new callback handle.
    pub(crate) fn new(id: u64, unregister_fn: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            unregister_fn: Some(Box::new(unregister_fn)),
        }
    }

    /// Unregister this callback.
    pub fn unregister(mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }

    /// Get the callback ID.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }
}

/// Bluetooth remote shutter for a single camera.
///
/// Radio activity arrives on an internal queue which is drained by
/// [`update`](Self::update), so all state changes caused by the radio are
/// applied on the polling task in arrival order.
pub struct RemoteControl {
    /// Configuration.
    config: RemoteConfig,
    /// The radio stack.
    transport: Arc<dyn Transport>,
    /// Pairing policy handed to the radio stack.
    security: Arc<dyn SecurityHandler>,
    /// Camera name filter.
    filter: parking_lot::RwLock<AdvertisementFilter>,
    /// Connection manager.
    connection: Arc<ConnectionManager>,
    /// Shutter command dispatcher.
    dispatcher: CommandDispatcher,
    /// Producer side of the radio event queue.
    event_tx: EventSink,
    /// Consumer side of the radio event queue. Held for the whole of `update`.
    event_rx: Mutex<mpsc::UnboundedReceiver<RadioEvent>>,
    /// Callback ID counter.
    callback_counter: AtomicU64,
}

impl RemoteControl {
    /// Create a remote control using the fixed-passkey pairing policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: RemoteConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let security = Arc::new(FixedPasskeyPolicy::new(config.passkey));
        Self::with_security(config, transport, security)
    }

    /// Create a remote control with a custom pairing policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_security(
        config: RemoteConfig,
        transport: Arc<dyn Transport>,
        security: Arc<dyn SecurityHandler>,
    ) -> Result<Self> {
        config.validate()?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Self {
            filter: parking_lot::RwLock::new(AdvertisementFilter::new(config.target_name.clone())),
            connection: Arc::new(ConnectionManager::new(
                transport.clone(),
                config.target_name.clone(),
            )),
            dispatcher: CommandDispatcher::new(transport.clone(), config.settle_delay),
            config,
            transport,
            security,
            event_tx,
            event_rx: Mutex::new(event_rx),
            callback_counter: AtomicU64::new(0),
        })
    }

    /// Create a remote control on the system's first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available or the configuration is invalid.
    pub async fn with_bluetooth(config: RemoteConfig) -> Result<Self> {
        let radio = BtleplugRadio::new().await?;
        Self::new(config, Arc::new(radio))
    }

    /// Bring up the radio and register for its events.
    ///
    /// Leaves the remote `Idle` and announces the disconnected state.
    pub async fn init(&self) -> Result<()> {
        info!("Initializing remote as {}", self.config.local_name);

        self.transport
            .init(
                &self.config.local_name,
                self.event_tx.clone(),
                self.security.clone(),
            )
            .await?;

        if !self.connection.on_disconnect() {
            self.connection.publish_state();
        }

        Ok(())
    }

    /// Pair with the camera advertising as `target_name`.
    ///
    /// Takes effect on the next scan cycle.
    pub fn pair_with(&self, target_name: impl Into<String>) {
        let target_name = target_name.into();
        info!("Pairing with {}", target_name);
        *self.filter.write() = AdvertisementFilter::new(target_name.clone());
        self.connection.set_target_name(target_name);
    }

    /// Advance the remote. Call once per control-loop iteration.
    ///
    /// While idle a scan cycle is started; once the camera has been found a
    /// connection attempt is made. Failures are logged and retried on later
    /// polls.
    pub async fn update(&self) {
        let mut events = self.event_rx.lock().await;
        self.drain_events(&mut events).await;

        match self.connection.state() {
            ConnectionState::Idle => self.start_scan().await,
            ConnectionState::PairingRequired | ConnectionState::ConnectRequired => {
                if let Err(e) = self.connection.request_connect().await {
                    warn!("Connection attempt failed: {}", e);
                }
            }
            _ => {}
        }

        self.drain_events(&mut events).await;
    }

    /// Fire the camera shutter.
    ///
    /// Dropped silently when the camera is not connected. Holds the calling
    /// task for the whole command sequence. Returns true if the shutter
    /// sequence was written.
    pub async fn trigger(&self) -> bool {
        let fired = self
            .dispatcher
            .trigger(self.connection.connected_endpoint())
            .await;
        if fired {
            info!("Took photo");
        }
        fired
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Check if the camera is connected.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Get the camera identity.
    pub fn identity(&self) -> DeviceIdentity {
        self.connection.identity()
    }

    /// Get the configuration.
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// When the shutter was last fired.
    pub fn last_fired(&self) -> Option<Instant> {
        self.dispatcher.last_fired()
    }

    /// Subscribe to connected-state changes.
    pub fn subscribe_connected(&self) -> broadcast::Receiver<bool> {
        self.connection.subscribe()
    }

    /// Register a callback for connected-state changes.
    pub fn on_connected_state_changed<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let callback_id = self.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.connection.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(connected) => callback(connected),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Missed {} connected-state changes", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }

    /// Disconnect from the camera.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down remote");

        if self.connection.state() == ConnectionState::Scanning {
            self.transport.stop_scan().await?;
        }
        self.connection.disconnect().await
    }

    async fn start_scan(&self) {
        if !self.connection.begin_scan() {
            return;
        }

        info!("Looking for camera");

        if let Err(e) = self.transport.start_scan(self.config.scan_duration).await {
            warn!("Failed to start scan: {}", e);
            self.connection.scan_finished();
        }
    }

    async fn drain_events(&self, events: &mut mpsc::UnboundedReceiver<RadioEvent>) {
        while let Ok(event) = events.try_recv() {
            self.handle_event(event).await;
        }
    }

    async fn handle_event(&self, event: RadioEvent) {
        match event {
            RadioEvent::Discovered(record) => self.handle_discovery(&record).await,
            RadioEvent::ScanFinished => {
                debug!("End of searching");
                self.connection.scan_finished();
            }
            RadioEvent::Disconnected { address } => {
                let state = self.connection.state();
                let is_camera =
                    self.connection.identity().address.as_deref() == Some(address.as_str());
                if is_camera
                    && matches!(state, ConnectionState::Connecting | ConnectionState::Connected)
                {
                    self.connection.on_disconnect();
                } else {
                    trace!("Ignoring disconnect from {} in state {}", address, state);
                }
            }
        }
    }

    async fn handle_discovery(&self, record: &DiscoveryRecord) {
        if self.connection.state() != ConnectionState::Scanning {
            trace!("Ignoring advertisement from {}", record.address);
            return;
        }

        let outcome = self.filter.read().classify(record);
        if let FilterOutcome::Matched { address, readiness } = outcome {
            if self.connection.on_discovery_match(address, readiness) {
                if let Err(e) = self.transport.stop_scan().await {
                    warn!("Failed to stop scan: {}", e);
                }
            }
        }
    }
}
