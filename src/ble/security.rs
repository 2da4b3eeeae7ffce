//! Pairing and security handshake policy.
//!
//! The camera drives the bonding handshake; the radio stack forwards each
//! request to a [`SecurityHandler`] and uses its answer immediately.

use parking_lot::Mutex;
use tracing::{info, warn};

/// Static passkey answered to every passkey request.
pub const DEFAULT_PASSKEY: u32 = 123_456;

/// Link encryption level requested from the radio stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EncryptionLevel {
    /// No encryption.
    None,
    /// Encrypted link without man-in-the-middle protection.
    #[default]
    Encrypt,
    /// Encrypted link with unauthenticated pairing.
    EncryptNoMitm,
    /// Encrypted link with authenticated (MITM-protected) pairing.
    EncryptMitm,
}

/// Responds to security requests raised while pairing with the camera.
///
/// Implementations are called from the radio stack's own execution context.
pub trait SecurityHandler: Send + Sync {
    /// Encryption level to configure on the link.
    fn encryption_level(&self) -> EncryptionLevel;

    /// The peripheral asks for a passkey to authenticate the link.
    fn on_passkey_request(&self) -> u32;

    /// The peripheral supplies a passkey for display.
    fn on_passkey_notify(&self, passkey: u32);

    /// The peripheral asks whether to proceed with a secure connection.
    fn on_security_request(&self) -> bool;

    /// Numeric comparison: confirm the PIN shown by the peripheral.
    fn on_confirm_pin(&self, pin: u32) -> bool;

    /// The handshake finished.
    fn on_authentication_complete(&self, success: bool);
}

/// Zero-interaction, trust-on-first-use policy.
///
/// Always answers the same passkey and approves every request. Suitable for a
/// single bonded camera in a trusted environment only.
#[derive(Debug)]
pub struct FixedPasskeyPolicy {
    passkey: u32,
    encryption_level: EncryptionLevel,
    last_notified_passkey: Mutex<Option<u32>>,
    last_authentication: Mutex<Option<bool>>,
}

impl FixedPasskeyPolicy {
    /// Create a policy answering `passkey`.
    pub fn new(passkey: u32) -> Self {
        Self {
            passkey,
            encryption_level: EncryptionLevel::default(),
            last_notified_passkey: Mutex::new(None),
            last_authentication: Mutex::new(None),
        }
    }

    /// Use a different link encryption level.
    pub fn with_encryption_level(mut self, level: EncryptionLevel) -> Self {
        self.encryption_level = level;
        self
    }

    /// The passkey this policy answers with.
    pub fn passkey(&self) -> u32 {
        self.passkey
    }

    /// Last passkey the peripheral notified, for diagnostics.
    pub fn last_notified_passkey(&self) -> Option<u32> {
        *self.last_notified_passkey.lock()
    }

    /// Outcome of the last completed handshake, if any.
    pub fn last_authentication(&self) -> Option<bool> {
        *self.last_authentication.lock()
    }
}

impl Default for FixedPasskeyPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PASSKEY)
    }
}

impl SecurityHandler for FixedPasskeyPolicy {
    fn encryption_level(&self) -> EncryptionLevel {
        self.encryption_level
    }

    fn on_passkey_request(&self) -> u32 {
        info!("Passkey request");
        self.passkey
    }

    fn on_passkey_notify(&self, passkey: u32) {
        info!("Passkey notify: {}", passkey);
        *self.last_notified_passkey.lock() = Some(passkey);
    }

    fn on_security_request(&self) -> bool {
        info!("Security request");
        true
    }

    fn on_confirm_pin(&self, pin: u32) -> bool {
        info!("Confirm PIN: {}", pin);
        true
    }

    fn on_authentication_complete(&self, success: bool) {
        if success {
            info!("Pairing success");
        } else {
            warn!("Pairing failed");
        }
        *self.last_authentication.lock() = Some(success);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_policy_answers() {
        let policy = FixedPasskeyPolicy::default();
        assert_eq!(policy.on_passkey_request(), DEFAULT_PASSKEY);
        assert_eq!(policy.on_passkey_request(), 123456);
        assert!(policy.on_security_request());
        assert!(policy.on_confirm_pin(0));
        assert!(policy.on_confirm_pin(999_999));
        assert_eq!(policy.encryption_level(), EncryptionLevel::Encrypt);
    }

    #[test]
    fn test_custom_passkey() {
        let policy =
            FixedPasskeyPolicy::new(4242).with_encryption_level(EncryptionLevel::EncryptMitm);
        assert_eq!(policy.passkey(), 4242);
        assert_eq!(policy.on_passkey_request(), 4242);
        assert_eq!(policy.encryption_level(), EncryptionLevel::EncryptMitm);
    }

    #[test]
    fn test_diagnostics_recorded() {
        let policy = FixedPasskeyPolicy::default();
        assert_eq!(policy.last_notified_passkey(), None);
        assert_eq!(policy.last_authentication(), None);

        policy.on_passkey_notify(654321);
        policy.on_authentication_complete(false);
        assert_eq!(policy.last_notified_passkey(), Some(654321));
        assert_eq!(policy.last_authentication(), Some(false));

        policy.on_authentication_complete(true);
        assert_eq!(policy.last_authentication(), Some(true));
    }

    #[test]
    fn test_handler_is_object_safe() {
        let handler: std::sync::Arc<dyn SecurityHandler> =
            std::sync::Arc::new(FixedPasskeyPolicy::default());
        assert!(handler.on_security_request());
    }
}
