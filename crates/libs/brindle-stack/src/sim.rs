//! In-memory network stack.
//!
//! `SimStack` implements the full [`NetStack`] contract without any
//! hardware: it allocates ids, records every configuration call for later
//! inspection and, in auto-bootstrap mode, reports completions through the
//! registered [`EventSink`] as soon as a request is accepted. The daemon
//! runs on it in simulation mode; the test suites drive it directly.

use std::cell::Cell;
use std::net::Ipv6Addr;
use std::sync::Arc;

use crate::error::StackError;
use crate::event::{EventSink, InterfaceStatus};
use crate::stack::NetStack;
use crate::types::{
    BootstrapMode, ChannelList, DeviceConfig, DriverId, InterfaceId, InterfaceKind, LinkConfig,
    MacHandle, MacStorageSizes, MeshProtocol, MeshRole,
};

/// Tuning for a [`SimStack`].
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Report bootstrap-ready and set-down-complete through the sink as
    /// soon as an up/down request is accepted.
    pub auto_bootstrap: bool,
    /// Report the backhaul PHY link as up right after driver registration.
    pub link_present: bool,
    /// Driver id the backhaul PHY reports itself as.
    pub backhaul_driver: DriverId,
    /// Whether a radio device is attached.
    pub radio_present: bool,
    pub backhaul_mac: [u8; 6],
    /// Global unicast address handed to interfaces that complete bootstrap.
    pub global_address: Ipv6Addr,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            auto_bootstrap: true,
            link_present: false,
            backhaul_driver: DriverId(3),
            radio_present: true,
            backhaul_mac: [0x02, 0x00, 0x00, 0x00, 0x00, 0x01],
            global_address: Ipv6Addr::new(0x2001, 0xdb8, 0, 1, 0, 0, 0, 1),
        }
    }
}

/// Book-keeping record of one simulated interface.
#[derive(Clone, Debug)]
pub struct SimInterface {
    pub id: InterfaceId,
    pub kind: InterfaceKind,
    pub mac: MacHandle,
    pub name: String,
    pub up: bool,
    pub global: Option<Ipv6Addr>,
}

/// A route recorded by [`NetStack::add_route`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub prefix: Ipv6Addr,
    pub prefix_len: u8,
    pub next_hop: Option<Ipv6Addr>,
    pub lifetime: u32,
    pub metric: u8,
    pub iface: InterfaceId,
}

pub struct SimStack {
    opts: SimOptions,
    sink: Option<Arc<dyn EventSink>>,
    next_iface: i8,
    next_mac: i8,
    next_driver: i8,
    rf_driver: Option<DriverId>,
    interfaces: Vec<SimInterface>,
    ethernet_macs: Vec<DriverId>,
    radio_macs: Vec<(DriverId, MacStorageSizes)>,
    bootstrap_configs: Vec<(InterfaceId, BootstrapMode, Ipv6Addr)>,
    mesh_configs: Vec<(InterfaceId, MeshRole, MeshProtocol)>,
    mgmt_inits: Vec<(InterfaceId, LinkConfig)>,
    link_timeouts: Vec<(InterfaceId, u32)>,
    child_caps: Vec<(InterfaceId, u16)>,
    up_requests: Vec<InterfaceId>,
    down_requests: Vec<InterfaceId>,
    metrics: Vec<(InterfaceId, u16)>,
    routes: Vec<RouteEntry>,
    advertised: Vec<(Ipv6Addr, u8)>,
    fail_next_create: bool,
    fail_next_up: bool,
    mgmt_init_code: Option<i32>,
    dump_requests: Cell<usize>,
}

impl SimStack {
    pub fn new(opts: SimOptions) -> Self {
        Self {
            opts,
            sink: None,
            next_iface: 1,
            next_mac: 1,
            next_driver: 1,
            rf_driver: None,
            interfaces: Vec::new(),
            ethernet_macs: Vec::new(),
            radio_macs: Vec::new(),
            bootstrap_configs: Vec::new(),
            mesh_configs: Vec::new(),
            mgmt_inits: Vec::new(),
            link_timeouts: Vec::new(),
            child_caps: Vec::new(),
            up_requests: Vec::new(),
            down_requests: Vec::new(),
            metrics: Vec::new(),
            routes: Vec::new(),
            advertised: Vec::new(),
            fail_next_create: false,
            fail_next_up: false,
            mgmt_init_code: None,
            dump_requests: Cell::new(0),
        }
    }

    /// Makes the next `create_interface` call fail.
    pub fn fail_next_create(&mut self) {
        self.fail_next_create = true;
    }

    /// Makes the next `interface_up` call fail.
    pub fn fail_next_up(&mut self) {
        self.fail_next_up = true;
    }

    /// Makes the next mesh management init fail with `code`.
    pub fn reject_management_init(&mut self, code: i32) {
        self.mgmt_init_code = Some(code);
    }

    /// Replays a backhaul PHY transition through the registered sink.
    pub fn backhaul_link(&self, up: bool) {
        if let Some(sink) = &self.sink {
            sink.backhaul_phy(self.opts.backhaul_driver, up);
        }
    }

    /// Assigns the configured global address to `iface`, for driving
    /// bootstrap completion by hand with auto-bootstrap off.
    pub fn assign_global(&mut self, iface: InterfaceId) -> Result<(), StackError> {
        let global = self.opts.global_address;
        self.entry_mut(iface)?.global = Some(global);
        Ok(())
    }

    /// Number of routing-table/neighbor-cache dumps requested so far.
    pub fn diagnostic_dumps(&self) -> usize {
        self.dump_requests.get()
    }

    pub fn interfaces(&self) -> &[SimInterface] {
        &self.interfaces
    }

    pub fn interface(&self, iface: InterfaceId) -> Option<&SimInterface> {
        self.interfaces.iter().find(|entry| entry.id == iface)
    }

    pub fn ethernet_macs_created(&self) -> usize {
        self.ethernet_macs.len()
    }

    pub fn radio_macs_created(&self) -> usize {
        self.radio_macs.len()
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    pub fn advertised_prefixes(&self) -> &[(Ipv6Addr, u8)] {
        &self.advertised
    }

    /// Last metric written for `iface`, if any.
    pub fn metric_for(&self, iface: InterfaceId) -> Option<u16> {
        self.metrics.iter().rev().find(|(id, _)| *id == iface).map(|(_, metric)| *metric)
    }

    pub fn bootstrap_config_for(&self, iface: InterfaceId) -> Option<(BootstrapMode, Ipv6Addr)> {
        self.bootstrap_configs
            .iter()
            .rev()
            .find(|(id, _, _)| *id == iface)
            .map(|(_, mode, prefix)| (*mode, *prefix))
    }

    pub fn management_inits(&self) -> &[(InterfaceId, LinkConfig)] {
        &self.mgmt_inits
    }

    pub fn link_timeouts(&self) -> &[(InterfaceId, u32)] {
        &self.link_timeouts
    }

    pub fn child_caps(&self) -> &[(InterfaceId, u16)] {
        &self.child_caps
    }

    pub fn up_requests(&self) -> &[InterfaceId] {
        &self.up_requests
    }

    pub fn down_requests(&self) -> &[InterfaceId] {
        &self.down_requests
    }

    fn entry_mut(&mut self, iface: InterfaceId) -> Result<&mut SimInterface, StackError> {
        self.interfaces
            .iter_mut()
            .find(|entry| entry.id == iface)
            .ok_or(StackError::UnknownInterface { iface })
    }

    fn entry(&self, iface: InterfaceId) -> Result<&SimInterface, StackError> {
        self.interfaces
            .iter()
            .find(|entry| entry.id == iface)
            .ok_or(StackError::UnknownInterface { iface })
    }
}

impl Default for SimStack {
    fn default() -> Self {
        Self::new(SimOptions::default())
    }
}

/// Hands out the next id from a positive `i8` counter, failing once the
/// id space is used up instead of wrapping into the invalid range.
fn take_id(counter: &mut i8) -> Result<i8, StackError> {
    let id = *counter;
    *counter = id.checked_add(1).ok_or(StackError::InterfaceAllocation)?;
    Ok(id)
}

impl NetStack for SimStack {
    fn backhaul_driver_init(&mut self, sink: Arc<dyn EventSink>) {
        self.sink = Some(sink);
        log::debug!("sim: backhaul driver {} registered", self.opts.backhaul_driver);
        if self.opts.link_present {
            log::debug!("sim: backhaul link present, reporting phy up");
            self.backhaul_link(true);
        }
    }

    fn register_rf_driver(&mut self) -> Result<DriverId, StackError> {
        if !self.opts.radio_present {
            return Err(StackError::Rejected { reason: "no radio device attached" });
        }
        if let Some(driver) = self.rf_driver {
            return Ok(driver);
        }
        let driver = DriverId(take_id(&mut self.next_driver)?);
        self.rf_driver = Some(driver);
        log::debug!("sim: radio driver registered as {driver}");
        Ok(driver)
    }

    fn ethernet_mac_create(&mut self, driver: DriverId) -> Result<MacHandle, StackError> {
        if !driver.is_valid() {
            return Err(StackError::UnknownDriver { driver });
        }
        let mac = MacHandle(take_id(&mut self.next_mac)?);
        self.ethernet_macs.push(driver);
        log::debug!("sim: ethernet mac {mac} created for driver {driver}");
        Ok(mac)
    }

    fn radio_mac_create(
        &mut self,
        driver: DriverId,
        sizes: &MacStorageSizes,
    ) -> Result<MacHandle, StackError> {
        if !driver.is_valid() {
            return Err(StackError::UnknownDriver { driver });
        }
        let mac = MacHandle(take_id(&mut self.next_mac)?);
        self.radio_macs.push((driver, *sizes));
        log::debug!("sim: radio mac {mac} created for driver {driver}");
        Ok(mac)
    }

    fn create_interface(
        &mut self,
        kind: InterfaceKind,
        mac: MacHandle,
        name: &str,
    ) -> Result<InterfaceId, StackError> {
        if self.fail_next_create {
            self.fail_next_create = false;
            return Err(StackError::InterfaceAllocation);
        }
        let id = InterfaceId(take_id(&mut self.next_iface)?);
        self.interfaces.push(SimInterface {
            id,
            kind,
            mac,
            name: name.to_string(),
            up: false,
            global: None,
        });
        log::debug!("sim: created {kind} interface {id} ({name})");
        Ok(id)
    }

    fn configure_ipv6_bootstrap(&mut self, iface: InterfaceId, mode: BootstrapMode, prefix: Ipv6Addr) {
        self.bootstrap_configs.push((iface, mode, prefix));
        log::debug!("sim: interface {iface} ipv6 bootstrap {mode}, prefix {prefix}");
    }

    fn configure_mesh_bootstrap(&mut self, iface: InterfaceId, role: MeshRole, protocol: MeshProtocol) {
        self.mesh_configs.push((iface, role, protocol));
        log::debug!("sim: interface {iface} mesh bootstrap {role:?}/{protocol:?}");
    }

    fn mesh_management_init(
        &mut self,
        iface: InterfaceId,
        _channels: &ChannelList,
        _device: &DeviceConfig,
        link: &LinkConfig,
    ) -> Result<(), StackError> {
        self.entry(iface)?;
        if let Some(code) = self.mgmt_init_code.take() {
            return Err(StackError::Management { code });
        }
        self.mgmt_inits.push((iface, link.clone()));
        log::debug!("sim: interface {iface} management init, network {:?}", link.network_name);
        Ok(())
    }

    fn set_link_timeout(&mut self, iface: InterfaceId, timeout_secs: u32) {
        self.link_timeouts.push((iface, timeout_secs));
    }

    fn set_max_child_count(&mut self, iface: InterfaceId, count: u16) {
        self.child_caps.push((iface, count));
    }

    fn interface_up(&mut self, iface: InterfaceId) -> Result<(), StackError> {
        let fail = self.fail_next_up;
        self.fail_next_up = false;
        let auto = self.opts.auto_bootstrap;
        let global = self.opts.global_address;
        let entry = self.entry_mut(iface)?;
        if fail {
            return Err(StackError::Rejected { reason: "interface refused to start" });
        }
        entry.up = true;
        if auto {
            // Bootstrap completes immediately, address included.
            entry.global = Some(global);
        }
        self.up_requests.push(iface);
        log::debug!("sim: interface {iface} up requested");
        if auto {
            if let Some(sink) = &self.sink {
                sink.interface_status(iface, InterfaceStatus::BootstrapReady);
            }
        }
        Ok(())
    }

    fn interface_down(&mut self, iface: InterfaceId) -> Result<(), StackError> {
        let entry = self.entry_mut(iface)?;
        entry.up = false;
        entry.global = None;
        self.down_requests.push(iface);
        log::debug!("sim: interface {iface} down requested");
        if self.opts.auto_bootstrap {
            if let Some(sink) = &self.sink {
                sink.interface_status(iface, InterfaceStatus::SetDownComplete);
            }
        }
        Ok(())
    }

    fn global_address(&self, iface: InterfaceId) -> Result<Ipv6Addr, StackError> {
        self.entry(iface)?.global.ok_or(StackError::AddressUnassigned)
    }

    fn set_interface_metric(&mut self, iface: InterfaceId, metric: u16) -> Result<(), StackError> {
        self.entry(iface)?;
        self.metrics.push((iface, metric));
        log::debug!("sim: interface {iface} metric set to {metric}");
        Ok(())
    }

    fn add_route(
        &mut self,
        prefix: Ipv6Addr,
        prefix_len: u8,
        next_hop: Option<Ipv6Addr>,
        lifetime: u32,
        metric: u8,
        iface: InterfaceId,
    ) -> Result<(), StackError> {
        self.entry(iface)?;
        self.routes.push(RouteEntry { prefix, prefix_len, next_hop, lifetime, metric, iface });
        log::debug!("sim: route {prefix}/{prefix_len} added through interface {iface}");
        Ok(())
    }

    fn advertise_prefix(&mut self, address: Ipv6Addr, prefix_len: u8) {
        self.advertised.push((address, prefix_len));
        log::debug!("sim: advertising {address}/{prefix_len} toward the mesh");
    }

    fn backhaul_mac(&self) -> [u8; 6] {
        self.opts.backhaul_mac
    }

    fn routing_table(&self) -> String {
        self.dump_requests.set(self.dump_requests.get() + 1);
        if self.routes.is_empty() {
            return "no routes".to_string();
        }
        self.routes
            .iter()
            .map(|route| match route.next_hop {
                Some(next_hop) => format!(
                    "{}/{} via {} if {} metric {}",
                    route.prefix, route.prefix_len, next_hop, route.iface, route.metric
                ),
                None => format!(
                    "{}/{} on-link if {} metric {}",
                    route.prefix, route.prefix_len, route.iface, route.metric
                ),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn neighbor_cache(&self) -> String {
        self.dump_requests.set(self.dump_requests.get() + 1);
        let up = self.interfaces.iter().filter(|entry| entry.up).count();
        format!("no neighbor entries ({up} interfaces up)")
    }
}
