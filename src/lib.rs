// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # camera-remote-ble
//!
//! A cross-platform Rust library that acts as a Bluetooth Low Energy remote
//! shutter for Sony Alpha cameras.
//!
//! The library finds the camera by its advertised name, pairs with it using a
//! fixed passkey, and fires the shutter by writing the camera's remote-control
//! command sequence (focus, take picture, release, hold focus).
//!
//! ## Features
//!
//! - **Camera Discovery**: Scan for a camera by exact advertised name
//! - **Pairing Readiness**: Read the camera's pairing status from its advertisement
//! - **Automatic Reconnect**: Rescan and reconnect after the link drops
//! - **Shutter Trigger**: Send the full shutter sequence with settle pauses
//! - **Lightning Trigger**: Light-threshold logic for automatic firing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use camera_remote_ble::{RemoteConfig, RemoteControl, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let remote = RemoteControl::with_bluetooth(RemoteConfig::default()).await?;
//!     remote.init().await?;
//!     remote.pair_with("ILCE-7M4");
//!
//!     // Poll until the camera is connected
//!     while !remote.is_connected() {
//!         remote.update().await;
//!         tokio::time::sleep(std::time::Duration::from_millis(100)).await;
//!     }
//!
//!     if remote.trigger().await {
//!         println!("Shutter fired");
//!     }
//!
//!     remote.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! Pairing is performed by the operating system's Bluetooth agent. Pair the
//! camera once from the system settings (passkey `123456`) before first use.
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for configuration and state types

// Public modules
pub mod ble;
pub mod config;
pub mod error;
pub mod lightning;
pub mod protocol;
pub mod remote;

// Re-exports for convenience
pub use config::RemoteConfig;
pub use error::{Error, Result};
pub use lightning::{LightningTrigger, TriggerSettings};
pub use remote::{CallbackHandle, RemoteControl};

// Re-export commonly used types from submodules
pub use ble::advertising::{DiscoveryRecord, PairingReadiness};
pub use ble::connection::{ConnectionState, DeviceIdentity};
pub use ble::radio::BtleplugRadio;
pub use ble::security::{EncryptionLevel, FixedPasskeyPolicy, SecurityHandler};
pub use ble::transport::{RadioEvent, Transport};
pub use protocol::commands::Command;
