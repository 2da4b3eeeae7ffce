//! BLE Service and Characteristic UUIDs.
//!
//! Contains the UUID constants of the Sony camera remote-control profile.

use uuid::Uuid;

// Camera Remote Control Service (Sony Custom)
/// Sony camera remote-control service UUID.
pub const REMOTE_SERVICE_UUID: Uuid = Uuid::from_u128(0x8000_ff00_ff00_ffff_ffff_ffffffffffff);
/// Command characteristic UUID (Write), 16-bit short form `0xFF01`.
pub const COMMAND_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000_ff01_0000_1000_8000_00805f9b34fb);
/// Notify characteristic UUID (Notify), 16-bit short form `0xFF02`.
pub const NOTIFY_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000_ff02_0000_1000_8000_00805f9b34fb);

/// Check if a service UUID is the camera remote-control service.
pub fn is_remote_service(uuid: &Uuid) -> bool {
    *uuid == REMOTE_SERVICE_UUID
}
