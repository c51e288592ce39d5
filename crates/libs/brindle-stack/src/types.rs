use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a network interface inside the external stack.
///
/// The stack only hands out non-negative ids; absence of an interface is
/// modelled as `Option<InterfaceId>`, not a sentinel value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InterfaceId(pub i8);

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a registered PHY driver.
///
/// Drivers report their own id through status callbacks, so the full signed
/// domain is kept: a negative id means no driver was ever registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DriverId(pub i8);

impl DriverId {
    /// Sentinel for a driver slot that was never filled.
    pub const UNREGISTERED: DriverId = DriverId(-1);

    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a MAC adaptation object created by the stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MacHandle(pub i8);

impl fmt::Display for MacHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side of the border router an interface belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterfaceKind {
    Mesh,
    Backhaul,
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceKind::Mesh => write!(f, "mesh"),
            InterfaceKind::Backhaul => write!(f, "backhaul"),
        }
    }
}

/// IPv6 bootstrap flavor of the backhaul interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootstrapMode {
    /// Addressing and the default route come from static configuration.
    Static,
    /// Addressing and routing are learned from the link (SLAAC/DHCPv6).
    Autonomous,
}

impl fmt::Display for BootstrapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapMode::Static => write!(f, "static"),
            BootstrapMode::Autonomous => write!(f, "autonomous"),
        }
    }
}

/// Role the mesh interface bootstraps as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshRole {
    Router,
    Host,
}

/// Protocol mode of the mesh interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshProtocol {
    Thread,
    WiSun,
}

/// Descriptor-table sizing for a radio MAC adaptation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MacStorageSizes {
    pub key_lookup: u8,
    pub key_usage: u8,
    pub device_table: u8,
    pub key_table: u8,
}

impl Default for MacStorageSizes {
    fn default() -> Self {
        Self { key_lookup: 1, key_usage: 1, device_table: 32, key_table: 6 }
    }
}

/// Radio channel selection used for scanning and operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelList {
    pub channel_page: u8,
    pub channel_mask: u32,
}

/// Per-device commissioning material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Commissioning pass-phrase, 6 to 32 characters.
    pub pskd: String,
}

/// Mesh link and security configuration.
///
/// Built once from the loaded configuration and consumed exactly once at
/// mesh bring-up; never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkConfig {
    /// Network name, 1 to 16 bytes.
    pub network_name: String,
    pub extended_pan_id: [u8; 8],
    pub pan_id: u16,
    pub master_key: [u8; 16],
    pub pskc: [u8; 16],
    /// High 64 bits of the mesh-local /64.
    pub mesh_local_prefix: [u8; 8],
    pub channel: u8,
    pub channel_page: u8,
    pub channel_mask: u32,
    /// Thread key rotation interval in seconds.
    pub key_rotation: u32,
    pub key_sequence: u32,
}
