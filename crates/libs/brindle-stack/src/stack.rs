use std::net::Ipv6Addr;
use std::sync::Arc;

use crate::error::StackError;
use crate::event::EventSink;
use crate::types::{
    BootstrapMode, ChannelList, DeviceConfig, DriverId, InterfaceId, InterfaceKind, LinkConfig,
    MacHandle, MacStorageSizes, MeshProtocol, MeshRole,
};

/// Synchronous call surface of the underlying network stack.
///
/// The router owns exactly one implementation and calls it from the
/// dispatcher task only. Every method either completes synchronously or is
/// fire-and-forget; completions that take real time (bootstrap, teardown)
/// are reported later through the [`EventSink`] registered with
/// [`backhaul_driver_init`](NetStack::backhaul_driver_init).
pub trait NetStack {
    /// Starts the backhaul driver and registers the sink that receives PHY
    /// status and interface bootstrap notifications.
    ///
    /// Must be called before any operation that could cause the stack to
    /// emit an event. The driver may report link status at any point
    /// afterwards, from any thread.
    fn backhaul_driver_init(&mut self, sink: Arc<dyn EventSink>);

    /// Registers the radio PHY driver.
    fn register_rf_driver(&mut self) -> Result<DriverId, StackError>;

    /// Creates the Ethernet MAC adaptation for `driver`.
    fn ethernet_mac_create(&mut self, driver: DriverId) -> Result<MacHandle, StackError>;

    /// Creates the radio MAC adaptation for `driver` with the given
    /// descriptor storage sizes.
    fn radio_mac_create(
        &mut self,
        driver: DriverId,
        sizes: &MacStorageSizes,
    ) -> Result<MacHandle, StackError>;

    /// Allocates a network interface on top of a MAC adaptation.
    fn create_interface(
        &mut self,
        kind: InterfaceKind,
        mac: MacHandle,
        name: &str,
    ) -> Result<InterfaceId, StackError>;

    /// Applies the IPv6 bootstrap mode and routing prefix to a backhaul
    /// interface. Fire-and-forget.
    fn configure_ipv6_bootstrap(&mut self, iface: InterfaceId, mode: BootstrapMode, prefix: Ipv6Addr);

    /// Applies role and protocol mode to a mesh interface. Fire-and-forget.
    fn configure_mesh_bootstrap(&mut self, iface: InterfaceId, role: MeshRole, protocol: MeshProtocol);

    /// Initializes the mesh management layer with channel selection,
    /// per-device commissioning material and the link configuration.
    fn mesh_management_init(
        &mut self,
        iface: InterfaceId,
        channels: &ChannelList,
        device: &DeviceConfig,
        link: &LinkConfig,
    ) -> Result<(), StackError>;

    /// Sets the mesh link timeout in seconds. Fire-and-forget.
    fn set_link_timeout(&mut self, iface: InterfaceId, timeout_secs: u32);

    /// Caps the number of children the mesh router accepts. Fire-and-forget.
    fn set_max_child_count(&mut self, iface: InterfaceId, count: u16);

    /// Requests the interface to come up. Completion is reported through
    /// the sink as a bootstrap status notification.
    fn interface_up(&mut self, iface: InterfaceId) -> Result<(), StackError>;

    /// Requests interface teardown.
    fn interface_down(&mut self, iface: InterfaceId) -> Result<(), StackError>;

    /// Returns the interface's global unicast address, if one is assigned.
    fn global_address(&self, iface: InterfaceId) -> Result<Ipv6Addr, StackError>;

    /// Sets the interface routing metric; lower values are preferred.
    fn set_interface_metric(&mut self, iface: InterfaceId, metric: u16) -> Result<(), StackError>;

    /// Installs a route through `iface`. A `next_hop` of `None` means
    /// on-link.
    #[allow(clippy::too_many_arguments)]
    fn add_route(
        &mut self,
        prefix: Ipv6Addr,
        prefix_len: u8,
        next_hop: Option<Ipv6Addr>,
        lifetime: u32,
        metric: u8,
        iface: InterfaceId,
    ) -> Result<(), StackError>;

    /// Advertises the /`prefix_len` prefix of `address` toward the mesh
    /// side. Fire-and-forget.
    fn advertise_prefix(&mut self, address: Ipv6Addr, prefix_len: u8);

    /// MAC address of the backhaul hardware.
    fn backhaul_mac(&self) -> [u8; 6];

    /// Human-readable routing table dump.
    fn routing_table(&self) -> String;

    /// Human-readable neighbor cache dump.
    fn neighbor_cache(&self) -> String;
}
