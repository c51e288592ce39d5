//! TOML configuration with startup validation.
//!
//! Everything the router needs is decided before the first event is
//! dispatched: the mesh link/security material, the backhaul bootstrap
//! mode and, in static mode, the on-link prefix and default route. A
//! malformed configuration is a fatal startup error, never a runtime one.

use std::fs;
use std::net::Ipv6Addr;
use std::path::Path;

use brindle_stack::{BootstrapMode, ChannelList, DeviceConfig, LinkConfig};
use serde::Deserialize;

use crate::mesh::MeshSettings;

/// Errors produced while loading or validating a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field, reason: reason.into() }
}

/// Static default-route description for the backhaul side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteConfig {
    pub prefix: Ipv6Addr,
    pub prefix_len: u8,
    /// As configured; the unspecified address means on-link.
    pub next_hop: Ipv6Addr,
}

impl RouteConfig {
    /// Next hop to hand to the stack; `::` resolves to on-link.
    pub fn resolved_next_hop(&self) -> Option<Ipv6Addr> {
        if self.next_hop.is_unspecified() {
            None
        } else {
            Some(self.next_hop)
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RouterConfig {
    pub mesh: MeshSection,
    pub backhaul: BackhaulSection,
    #[serde(default)]
    pub diagnostics: DiagnosticsSection,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MeshSection {
    /// Network name, 1 to 16 bytes.
    pub network_name: String,
    /// 8 bytes of hex.
    pub extended_pan_id: String,
    pub pan_id: u16,
    pub channel: u8,
    #[serde(default)]
    pub channel_page: u8,
    pub channel_mask: u32,
    /// 16 bytes of hex.
    pub master_key: String,
    /// 16 bytes of hex.
    pub pskc: String,
    /// Commissioning pass-phrase, 6 to 32 bytes.
    pub pskd: String,
    /// Only the high 64 bits are used.
    pub mesh_local_prefix: Ipv6Addr,
    #[serde(default = "default_key_rotation")]
    pub key_rotation: u32,
    #[serde(default)]
    pub key_sequence: u32,
    #[serde(default = "default_link_timeout")]
    pub link_timeout_secs: u32,
    #[serde(default = "default_max_child_count")]
    pub max_child_count: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BackhaulSection {
    pub bootstrap: BootstrapMode,
    /// On-link /64 prefix; required in static mode.
    pub prefix: Option<Ipv6Addr>,
    /// Destination in `prefix/len` form; required in static mode.
    pub default_route: Option<String>,
    /// Router to forward through; absent or `::` means on-link.
    #[serde(default)]
    pub next_hop: Option<Ipv6Addr>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DiagnosticsSection {
    #[serde(default)]
    pub enabled: bool,
}

fn default_key_rotation() -> u32 {
    3600
}

fn default_link_timeout() -> u32 {
    100
}

fn default_max_child_count() -> u16 {
    32
}

impl RouterConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.mesh_settings()?;
        self.backhaul_prefix()?;
        self.backhaul_route()?;
        Ok(())
    }

    /// Everything the mesh side consumes at bring-up.
    pub fn mesh_settings(&self) -> Result<MeshSettings, ConfigError> {
        Ok(MeshSettings {
            link: self.mesh_link_config()?,
            device: self.mesh_device_config()?,
            channels: self.mesh_channel_list(),
            link_timeout_secs: self.mesh.link_timeout_secs,
            max_child_count: self.mesh.max_child_count,
        })
    }

    pub fn mesh_link_config(&self) -> Result<LinkConfig, ConfigError> {
        let name_len = self.mesh.network_name.len();
        if name_len == 0 || name_len > 16 {
            return Err(invalid("mesh.network_name", "must be 1 to 16 bytes"));
        }
        let mut mesh_local_prefix = [0u8; 8];
        mesh_local_prefix.copy_from_slice(&self.mesh.mesh_local_prefix.octets()[..8]);
        Ok(LinkConfig {
            network_name: self.mesh.network_name.clone(),
            extended_pan_id: hex_array("mesh.extended_pan_id", &self.mesh.extended_pan_id)?,
            pan_id: self.mesh.pan_id,
            master_key: hex_array("mesh.master_key", &self.mesh.master_key)?,
            pskc: hex_array("mesh.pskc", &self.mesh.pskc)?,
            mesh_local_prefix,
            channel: self.mesh.channel,
            channel_page: self.mesh.channel_page,
            channel_mask: self.mesh.channel_mask,
            key_rotation: self.mesh.key_rotation,
            key_sequence: self.mesh.key_sequence,
        })
    }

    pub fn mesh_device_config(&self) -> Result<DeviceConfig, ConfigError> {
        let len = self.mesh.pskd.len();
        if !(6..=32).contains(&len) {
            return Err(invalid("mesh.pskd", "must be 6 to 32 bytes"));
        }
        Ok(DeviceConfig { pskd: self.mesh.pskd.clone() })
    }

    pub fn mesh_channel_list(&self) -> ChannelList {
        ChannelList {
            channel_page: self.mesh.channel_page,
            channel_mask: self.mesh.channel_mask,
        }
    }

    /// Backhaul on-link prefix with the host bits cleared.
    ///
    /// Autonomous mode needs none and gets the unspecified address.
    pub fn backhaul_prefix(&self) -> Result<Ipv6Addr, ConfigError> {
        match (self.backhaul.bootstrap, self.backhaul.prefix) {
            (BootstrapMode::Static, Some(prefix)) => Ok(network_prefix(prefix)),
            (BootstrapMode::Static, None) => {
                Err(invalid("backhaul.prefix", "required in static mode"))
            }
            (BootstrapMode::Autonomous, _) => Ok(Ipv6Addr::UNSPECIFIED),
        }
    }

    /// Static-mode default route; `None` in autonomous mode.
    pub fn backhaul_route(&self) -> Result<Option<RouteConfig>, ConfigError> {
        match (self.backhaul.bootstrap, &self.backhaul.default_route) {
            (BootstrapMode::Static, Some(route)) => {
                let (prefix, prefix_len) = parse_prefix("backhaul.default_route", route)?;
                Ok(Some(RouteConfig {
                    prefix,
                    prefix_len,
                    next_hop: self.backhaul.next_hop.unwrap_or(Ipv6Addr::UNSPECIFIED),
                }))
            }
            (BootstrapMode::Static, None) => {
                Err(invalid("backhaul.default_route", "required in static mode"))
            }
            (BootstrapMode::Autonomous, _) => Ok(None),
        }
    }
}

fn hex_array<const N: usize>(field: &'static str, input: &str) -> Result<[u8; N], ConfigError> {
    let bytes = hex::decode(input).map_err(|err| invalid(field, err.to_string()))?;
    bytes.try_into().map_err(|_| invalid(field, format!("expected {N} hex bytes")))
}

fn parse_prefix(field: &'static str, input: &str) -> Result<(Ipv6Addr, u8), ConfigError> {
    let (addr, len) = input
        .split_once('/')
        .ok_or_else(|| invalid(field, "expected `address/length`"))?;
    let prefix: Ipv6Addr =
        addr.parse().map_err(|_| invalid(field, "not an IPv6 address"))?;
    let prefix_len: u8 = len.parse().map_err(|_| invalid(field, "bad prefix length"))?;
    if prefix_len > 128 {
        return Err(invalid(field, "prefix length out of range"));
    }
    Ok((prefix, prefix_len))
}

/// Zeroes the host bits; the backhaul prefix is always treated as a /64.
fn network_prefix(addr: Ipv6Addr) -> Ipv6Addr {
    let mut octets = addr.octets();
    for octet in &mut octets[8..] {
        *octet = 0;
    }
    Ipv6Addr::from(octets)
}
