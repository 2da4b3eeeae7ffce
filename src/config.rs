//! Remote-control configuration.

use std::time::Duration;

use crate::ble::dispatcher::DEFAULT_SETTLE_DELAY;
use crate::ble::security::DEFAULT_PASSKEY;
use crate::error::{Error, Result};

/// Name this device uses on the radio.
pub const DEFAULT_LOCAL_NAME: &str = "AB Lightning Trigger";
/// Advertised name of the camera to pair with.
pub const DEFAULT_TARGET_NAME: &str = "ILCE-7CM2";
/// How long one scan cycle runs.
pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(5);

/// Configuration for a [`RemoteControl`](crate::RemoteControl).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RemoteConfig {
    /// Name this device uses on the radio.
    pub local_name: String,
    /// Advertised name of the camera to pair with (exact match).
    pub target_name: String,
    /// How long one scan cycle runs before it is restarted.
    pub scan_duration: Duration,
    /// Pause after the take-picture and shutter-released commands.
    pub settle_delay: Duration,
    /// Passkey answered during pairing.
    pub passkey: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            local_name: DEFAULT_LOCAL_NAME.to_string(),
            target_name: DEFAULT_TARGET_NAME.to_string(),
            scan_duration: DEFAULT_SCAN_DURATION,
            settle_delay: DEFAULT_SETTLE_DELAY,
            passkey: DEFAULT_PASSKEY,
        }
    }
}

impl RemoteConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the local radio name.
    pub fn with_local_name(mut self, local_name: impl Into<String>) -> Self {
        self.local_name = local_name.into();
        self
    }

    /// Set the camera name to pair with.
    pub fn with_target_name(mut self, target_name: impl Into<String>) -> Self {
        self.target_name = target_name.into();
        self
    }

    /// Set the scan cycle duration.
    pub fn with_scan_duration(mut self, scan_duration: Duration) -> Self {
        self.scan_duration = scan_duration;
        self
    }

    /// Set the settle pause between shutter commands.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Set the pairing passkey.
    pub fn with_passkey(mut self, passkey: u32) -> Self {
        self.passkey = passkey;
        self
    }

    /// Check the configuration for values the camera cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for an empty target name, a zero
    /// scan duration, a zero settle delay or a passkey above 999999.
    pub fn validate(&self) -> Result<()> {
        if self.target_name.is_empty() {
            return Err(invalid("target_name", &self.target_name));
        }
        if self.scan_duration.is_zero() {
            return Err(invalid("scan_duration", format!("{:?}", self.scan_duration)));
        }
        if self.settle_delay.is_zero() {
            return Err(invalid("settle_delay", format!("{:?}", self.settle_delay)));
        }
        // Passkeys are six decimal digits
        if self.passkey > 999_999 {
            return Err(invalid("passkey", self.passkey.to_string()));
        }
        Ok(())
    }
}

fn invalid(name: &str, value: impl Into<String>) -> Error {
    Error::InvalidParameter {
        name: name.to_string(),
        value: value.into(),
    }
}
