use std::fmt;
use std::net::Ipv6Addr;

use brindle_stack::InterfaceId;

/// Connectivity state of one interface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InterfaceState {
    /// Nothing known; no bring-up has succeeded.
    #[default]
    Unknown,
    /// The interface side exists but the link is absent.
    Disconnected,
    /// Link present, not bootstrapped.
    LinkReady,
    /// Bring-up requested, bootstrap in progress.
    Bootstrapping,
    /// Bootstrap complete, interface operational.
    Connected,
}

impl fmt::Display for InterfaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterfaceState::Unknown => "unknown",
            InterfaceState::Disconnected => "disconnected",
            InterfaceState::LinkReady => "link-ready",
            InterfaceState::Bootstrapping => "bootstrapping",
            InterfaceState::Connected => "connected",
        };
        write!(f, "{name}")
    }
}

/// Snapshot published on the watch channel after every dispatched event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouterStatus {
    pub mesh_state: InterfaceState,
    pub mesh_iface: Option<InterfaceId>,
    pub backhaul_state: InterfaceState,
    pub backhaul_iface: Option<InterfaceId>,
    pub backhaul_address: Option<Ipv6Addr>,
}

impl RouterStatus {
    /// Both sides fully operational.
    pub fn fully_connected(&self) -> bool {
        self.mesh_state == InterfaceState::Connected
            && self.backhaul_state == InterfaceState::Connected
    }
}
