use std::net::Ipv6Addr;

use brindle_stack::{BootstrapMode, DriverId, InterfaceId, InterfaceKind, MacHandle, NetStack};

use crate::config::RouteConfig;
use crate::error::LifecycleError;
use crate::registry::StatusRegistry;
use crate::status::InterfaceState;

/// Name the backhaul interface registers under.
pub const BACKHAUL_IFACE_NAME: &str = "bh0";
/// Highest-priority interface metric, applied once the uplink is usable.
pub const BACKHAUL_METRIC: u16 = 0;
/// Metric of the static default route.
pub const BACKHAUL_ROUTE_METRIC: u8 = 128;
/// Static routes never expire.
pub const ROUTE_LIFETIME_FOREVER: u32 = 0xffff_ffff;

/// Lifecycle of the wired uplink.
///
/// Owns the interface handle; at most one is live at a time. The Ethernet
/// MAC adaptation is created on first use and reused across every
/// subsequent teardown/bring-up cycle.
pub struct BackhaulManager {
    state: InterfaceState,
    iface: Option<InterfaceId>,
    mac: Option<MacHandle>,
    mac48: [u8; 6],
    global: Option<Ipv6Addr>,
    mode: BootstrapMode,
    prefix: Ipv6Addr,
    route: Option<RouteConfig>,
}

impl BackhaulManager {
    pub fn new(mode: BootstrapMode, prefix: Ipv6Addr, route: Option<RouteConfig>) -> Self {
        Self {
            state: InterfaceState::Unknown,
            iface: None,
            mac: None,
            mac48: [0; 6],
            global: None,
            mode,
            prefix,
            route,
        }
    }

    pub fn state(&self) -> InterfaceState {
        self.state
    }

    pub fn iface(&self) -> Option<InterfaceId> {
        self.iface
    }

    pub fn global_address(&self) -> Option<Ipv6Addr> {
        self.global
    }

    pub fn mode(&self) -> BootstrapMode {
        self.mode
    }

    pub fn mac48(&self) -> [u8; 6] {
        self.mac48
    }

    pub fn route(&self) -> Option<RouteConfig> {
        self.route
    }

    pub(crate) fn set_state(&mut self, state: InterfaceState) {
        self.state = state;
    }

    pub(crate) fn set_global(&mut self, global: Option<Ipv6Addr>) {
        self.global = global;
    }

    /// Captures the hardware MAC address and marks the uplink disconnected.
    /// Part of the one-time init sequence.
    pub fn prepare<S: NetStack>(&mut self, stack: &mut S) {
        self.mac48 = stack.backhaul_mac();
        self.state = InterfaceState::Disconnected;
        let m = self.mac48;
        log::info!(
            "bh0: mac {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        );
    }

    /// Brings the uplink up after a PHY link-up report.
    ///
    /// The up request itself is allowed to fail without escalation:
    /// recovery arrives with the next PHY transition.
    pub fn bring_up<S: NetStack>(
        &mut self,
        stack: &mut S,
        registry: &mut StatusRegistry,
        driver: DriverId,
    ) -> Result<InterfaceId, LifecycleError> {
        if self.iface.is_some() {
            return Err(LifecycleError::AlreadyActive);
        }
        registry.set_driver(InterfaceKind::Backhaul, driver);
        let mac = match self.mac {
            Some(mac) => mac,
            None => {
                let mac = stack
                    .ethernet_mac_create(driver)
                    .map_err(LifecycleError::InterfaceCreationFailed)?;
                self.mac = Some(mac);
                mac
            }
        };
        let iface = stack
            .create_interface(InterfaceKind::Backhaul, mac, BACKHAUL_IFACE_NAME)
            .map_err(LifecycleError::InterfaceCreationFailed)?;
        self.iface = Some(iface);
        registry.set_interface(InterfaceKind::Backhaul, iface);
        stack.configure_ipv6_bootstrap(iface, self.mode, self.prefix);
        if let Err(err) = stack.interface_up(iface) {
            log::warn!("bh0: up request rejected: {err}");
        }
        self.state = InterfaceState::Bootstrapping;
        log::info!("bh0: interface {iface} created, {} bootstrap started", self.mode);
        Ok(iface)
    }

    /// Tears the uplink down after a PHY link-down report.
    ///
    /// The registry keeps the interface id so late teardown events still
    /// route to this side.
    pub fn bring_down<S: NetStack>(
        &mut self,
        stack: &mut S,
        registry: &mut StatusRegistry,
    ) -> Result<(), LifecycleError> {
        let Some(iface) = self.iface.take() else {
            return Err(LifecycleError::NotActive);
        };
        if let Err(err) = stack.interface_down(iface) {
            log::warn!("bh0: down request rejected: {err}");
        }
        self.global = None;
        self.state = InterfaceState::Disconnected;
        registry.set_connected(InterfaceKind::Backhaul, false);
        log::info!("bh0: interface {iface} down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use brindle_stack::SimStack;

    use super::*;

    fn manager() -> BackhaulManager {
        BackhaulManager::new(
            BootstrapMode::Static,
            "2001:db8:0:1::".parse().unwrap(),
            Some(RouteConfig {
                prefix: Ipv6Addr::UNSPECIFIED,
                prefix_len: 0,
                next_hop: Ipv6Addr::UNSPECIFIED,
            }),
        )
    }

    #[test]
    fn bring_up_creates_exactly_one_interface() {
        let mut stack = SimStack::default();
        let mut registry = StatusRegistry::new();
        let mut backhaul = manager();
        let iface = backhaul.bring_up(&mut stack, &mut registry, DriverId(3)).unwrap();
        assert_eq!(backhaul.state(), InterfaceState::Bootstrapping);
        assert_eq!(registry.interface(InterfaceKind::Backhaul), Some(iface));
        let err = backhaul.bring_up(&mut stack, &mut registry, DriverId(3)).unwrap_err();
        assert_eq!(err, LifecycleError::AlreadyActive);
        assert!(err.is_benign());
        assert_eq!(stack.interfaces().len(), 1);
    }

    #[test]
    fn mac_adaptation_survives_teardown_cycles() {
        let mut stack = SimStack::default();
        let mut registry = StatusRegistry::new();
        let mut backhaul = manager();
        let first = backhaul.bring_up(&mut stack, &mut registry, DriverId(3)).unwrap();
        backhaul.bring_down(&mut stack, &mut registry).unwrap();
        let second = backhaul.bring_up(&mut stack, &mut registry, DriverId(3)).unwrap();
        assert_ne!(first, second);
        assert_eq!(stack.ethernet_macs_created(), 1);
        assert_eq!(stack.interfaces().len(), 2);
        assert_eq!(stack.down_requests(), &[first]);
    }

    #[test]
    fn bring_down_without_a_handle_is_benign() {
        let mut stack = SimStack::default();
        let mut registry = StatusRegistry::new();
        let mut backhaul = manager();
        let err = backhaul.bring_down(&mut stack, &mut registry).unwrap_err();
        assert_eq!(err, LifecycleError::NotActive);
        assert!(err.is_benign());
    }

    #[test]
    fn registry_keeps_interface_id_after_teardown() {
        let mut stack = SimStack::default();
        let mut registry = StatusRegistry::new();
        let mut backhaul = manager();
        let iface = backhaul.bring_up(&mut stack, &mut registry, DriverId(3)).unwrap();
        backhaul.bring_down(&mut stack, &mut registry).unwrap();
        assert_eq!(backhaul.iface(), None);
        assert_eq!(backhaul.state(), InterfaceState::Disconnected);
        assert_eq!(registry.interface(InterfaceKind::Backhaul), Some(iface));
        assert!(!registry.connected(InterfaceKind::Backhaul));
    }

    #[test]
    fn creation_failure_leaves_no_handle() {
        let mut stack = SimStack::default();
        let mut registry = StatusRegistry::new();
        let mut backhaul = manager();
        stack.fail_next_create();
        let err = backhaul.bring_up(&mut stack, &mut registry, DriverId(3)).unwrap_err();
        assert!(matches!(err, LifecycleError::InterfaceCreationFailed(_)));
        assert_eq!(backhaul.iface(), None);
        assert_eq!(backhaul.state(), InterfaceState::Unknown);
    }

    #[test]
    fn prepare_captures_the_hardware_mac() {
        let mut stack = SimStack::default();
        let mut backhaul = manager();
        backhaul.prepare(&mut stack);
        assert_eq!(backhaul.mac48(), [0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(backhaul.state(), InterfaceState::Disconnected);
    }
}
