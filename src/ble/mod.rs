//! BLE communication module.
//!
//! This module provides the Bluetooth Low Energy pieces of the remote:
//! advertisement filtering, pairing policy, link management and command
//! transmission, on top of a swappable [`Transport`].

pub mod advertising;
pub mod connection;
pub mod dispatcher;
pub mod radio;
pub mod security;
pub mod transport;
pub mod uuids;

#[cfg(test)]
pub(crate) mod fake;

pub use advertising::{AdvertisementFilter, DiscoveryRecord, FilterOutcome, PairingReadiness};
pub use connection::{ConnectionManager, ConnectionState, DeviceIdentity, GattEndpoint};
pub use dispatcher::CommandDispatcher;
pub use radio::BtleplugRadio;
pub use security::{EncryptionLevel, FixedPasskeyPolicy, SecurityHandler};
pub use transport::{EventSink, RadioEvent, Transport};
pub use uuids::*;
