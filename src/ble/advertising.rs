//! Advertising data filtering.
//!
//! Decides whether a discovered peripheral is the target camera and whether
//! the camera is advertising that it is ready to pair.

use btleplug::api::PeripheralProperties;
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, info};

use crate::ble::connection::ConnectionState;

/// AD type for a complete local name.
const AD_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;
/// AD type for manufacturer-specific data.
const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

/// Tag byte preceding the camera's pairing status byte.
pub const PAIRING_STATUS_MARKER: u8 = 0x22;
/// Bits of the pairing status byte that must all be set for "ready to pair".
pub const PAIRING_READY_MASK: u8 = 0x40 | 0x02;

/// What the camera's advertisement says about how to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PairingReadiness {
    /// The camera is in pairing mode and expects a bonding handshake.
    PairingRequired,
    /// The camera is not in pairing mode; connect directly.
    ConnectRequired,
}

impl PairingReadiness {
    /// Classify a single pairing status byte.
    pub fn from_status_byte(status: u8) -> Self {
        if status & PAIRING_READY_MASK == PAIRING_READY_MASK {
            Self::PairingRequired
        } else {
            Self::ConnectRequired
        }
    }

    /// The connection state this readiness leads to.
    pub fn connection_state(&self) -> ConnectionState {
        match self {
            Self::PairingRequired => ConnectionState::PairingRequired,
            Self::ConnectRequired => ConnectionState::ConnectRequired,
        }
    }
}

/// Scan a raw advertisement payload for pairing status markers.
///
/// Every byte following a [`PAIRING_STATUS_MARKER`] is classified. When the
/// payload carries more than one marker, the last one observed wins.
pub fn pairing_readiness(payload: &[u8]) -> Option<PairingReadiness> {
    payload
        .windows(2)
        .filter(|pair| pair[0] == PAIRING_STATUS_MARKER)
        .map(|pair| PairingReadiness::from_status_byte(pair[1]))
        .last()
}

/// A single advertisement seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRecord {
    /// Advertised device name (empty if the peripheral sent none).
    pub name: String,
    /// Platform address / identifier of the peripheral.
    pub address: String,
    /// Raw advertisement payload as a sequence of AD structures.
    pub payload: Bytes,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
}

impl DiscoveryRecord {
    /// Create a record from its parts.
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            payload: payload.into(),
            rssi: None,
        }
    }

    /// Build a record from the properties reported by the platform stack.
    ///
    /// Desktop stacks hand out parsed properties rather than the raw packet, so
    /// the payload is re-encoded as AD structures: local name first, then one
    /// manufacturer-specific structure per company ID in ascending order.
    pub fn from_properties(address: impl Into<String>, properties: &PeripheralProperties) -> Self {
        let name = properties.local_name.clone().unwrap_or_default();
        let mut payload = BytesMut::new();

        if !name.is_empty() {
            put_ad_structure(&mut payload, AD_TYPE_COMPLETE_LOCAL_NAME, name.as_bytes());
        }

        let mut company_ids: Vec<_> = properties.manufacturer_data.keys().copied().collect();
        company_ids.sort_unstable();
        for company_id in company_ids {
            let data = &properties.manufacturer_data[&company_id];
            let mut body = Vec::with_capacity(data.len() + 2);
            body.extend_from_slice(&company_id.to_le_bytes());
            body.extend_from_slice(data);
            put_ad_structure(&mut payload, AD_TYPE_MANUFACTURER_DATA, &body);
        }

        Self {
            name,
            address: address.into(),
            payload: payload.freeze(),
            rssi: properties.rssi,
        }
    }
}

/// Append one `[length, type, data..]` AD structure. Oversized data is dropped.
fn put_ad_structure(buf: &mut BytesMut, ad_type: u8, data: &[u8]) {
    let Ok(length) = u8::try_from(data.len() + 1) else {
        return;
    };
    buf.put_u8(length);
    buf.put_u8(ad_type);
    buf.put_slice(data);
}

/// Result of filtering a discovery record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Not the target camera.
    Ignored,
    /// The target camera was found.
    Matched {
        /// Address to connect to.
        address: String,
        /// Pairing readiness, or `None` if the payload carried no status marker.
        readiness: Option<PairingReadiness>,
    },
}

impl FilterOutcome {
    /// Check if the record matched the target.
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// Matches discovery records against the configured camera name.
#[derive(Debug, Clone)]
pub struct AdvertisementFilter {
    target_name: String,
}

impl AdvertisementFilter {
    /// Create a filter for the given camera name.
    pub fn new(target_name: impl Into<String>) -> Self {
        Self {
            target_name: target_name.into(),
        }
    }

    /// The name this filter matches.
    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Classify a discovery record.
    pub fn classify(&self, record: &DiscoveryRecord) -> FilterOutcome {
        if record.name.is_empty() {
            return FilterOutcome::Ignored;
        }

        debug!("Something found: {}", record.name);

        if record.name != self.target_name {
            return FilterOutcome::Ignored;
        }

        info!("Camera {} found at {}", record.name, record.address);

        let readiness = pairing_readiness(&record.payload);
        match readiness {
            Some(PairingReadiness::PairingRequired) => info!("Camera is ready to pair"),
            Some(PairingReadiness::ConnectRequired) => {
                info!("Camera is not ready to pair, but trying to connect")
            }
            None => debug!("Camera advertisement carries no pairing status"),
        }

        FilterOutcome::Matched {
            address: record.address.clone(),
            readiness,
        }
    }
}
