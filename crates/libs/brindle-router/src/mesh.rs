use brindle_stack::{
    ChannelList, DeviceConfig, DriverId, InterfaceId, InterfaceKind, LinkConfig, MacHandle,
    MacStorageSizes, MeshProtocol, MeshRole, NetStack, StackError,
};

use crate::error::LifecycleError;
use crate::registry::StatusRegistry;
use crate::status::InterfaceState;

/// Name the mesh interface registers under.
pub const MESH_IFACE_NAME: &str = "mesh0";
/// Fixed mesh routing metric; the uplink always wins at 0.
pub const MESH_METRIC: u16 = 1000;

/// Everything the mesh side consumes at bring-up.
#[derive(Clone, Debug)]
pub struct MeshSettings {
    pub link: LinkConfig,
    pub device: DeviceConfig,
    pub channels: ChannelList,
    pub link_timeout_secs: u32,
    pub max_child_count: u16,
}

/// Lifecycle of the radio mesh side.
///
/// Owns the interface handle and the link configuration. The radio MAC
/// adaptation is created on first use and reused for the life of the
/// process; a handle surviving a failed attempt is reused rather than
/// re-allocated.
pub struct MeshManager {
    state: InterfaceState,
    rf_driver: DriverId,
    iface: Option<InterfaceId>,
    mac: Option<MacHandle>,
    settings: MeshSettings,
}

impl MeshManager {
    pub fn new(settings: MeshSettings) -> Self {
        Self {
            state: InterfaceState::Unknown,
            rf_driver: DriverId::UNREGISTERED,
            iface: None,
            mac: None,
            settings,
        }
    }

    pub fn state(&self) -> InterfaceState {
        self.state
    }

    pub fn iface(&self) -> Option<InterfaceId> {
        self.iface
    }

    pub fn rf_driver(&self) -> DriverId {
        self.rf_driver
    }

    pub(crate) fn set_state(&mut self, state: InterfaceState) {
        self.state = state;
    }

    /// Registers the radio driver; part of the one-time init sequence.
    ///
    /// A missing radio is not fatal here: bring-up reports
    /// `DriverUnavailable` instead.
    pub fn register_driver<S: NetStack>(&mut self, stack: &mut S, registry: &mut StatusRegistry) {
        match stack.register_rf_driver() {
            Ok(driver) => {
                self.rf_driver = driver;
                registry.set_driver(InterfaceKind::Mesh, driver);
                log::debug!("mesh0: radio driver registered as {driver}");
            }
            Err(err) => {
                self.rf_driver = DriverId::UNREGISTERED;
                log::warn!("mesh0: radio driver registration failed: {err}");
            }
        }
    }

    /// Brings the mesh side up.
    ///
    /// Calling again while bootstrap is running or complete is a no-op
    /// returning the held handle.
    pub fn bring_up<S: NetStack>(
        &mut self,
        stack: &mut S,
        registry: &mut StatusRegistry,
    ) -> Result<InterfaceId, LifecycleError> {
        if matches!(self.state, InterfaceState::Connected | InterfaceState::Bootstrapping) {
            if let Some(iface) = self.iface {
                log::info!("mesh0: already up");
                return Ok(iface);
            }
        }
        if !self.rf_driver.is_valid() {
            return Err(LifecycleError::DriverUnavailable);
        }
        let mac = match self.mac {
            Some(mac) => mac,
            None => {
                let mac = stack
                    .radio_mac_create(self.rf_driver, &MacStorageSizes::default())
                    .map_err(LifecycleError::InterfaceCreationFailed)?;
                self.mac = Some(mac);
                mac
            }
        };
        let iface = match self.iface {
            Some(iface) => iface,
            None => {
                let iface = stack
                    .create_interface(InterfaceKind::Mesh, mac, MESH_IFACE_NAME)
                    .map_err(LifecycleError::InterfaceCreationFailed)?;
                self.iface = Some(iface);
                registry.set_interface(InterfaceKind::Mesh, iface);
                iface
            }
        };
        stack.configure_mesh_bootstrap(iface, MeshRole::Router, MeshProtocol::Thread);
        if let Err(err) = stack.mesh_management_init(
            iface,
            &self.settings.channels,
            &self.settings.device,
            &self.settings.link,
        ) {
            log::error!("mesh0: management init failed: {err}");
            let code = match err {
                StackError::Management { code } => code,
                _ => -1,
            };
            return Err(LifecycleError::ManagementInitFailed { code });
        }
        stack.set_link_timeout(iface, self.settings.link_timeout_secs);
        stack.set_max_child_count(iface, self.settings.max_child_count);
        if let Err(err) = stack.interface_up(iface) {
            log::error!("mesh0: up request rejected: {err}");
            self.state = InterfaceState::Unknown;
            return Err(LifecycleError::BringUpFailed(err));
        }
        self.state = InterfaceState::Bootstrapping;
        log::info!("mesh0: interface {iface} bootstrap started");
        Ok(iface)
    }
}

#[cfg(test)]
mod tests {
    use brindle_stack::{SimOptions, SimStack};

    use super::*;

    fn settings() -> MeshSettings {
        MeshSettings {
            link: LinkConfig {
                network_name: "testnet".to_string(),
                extended_pan_id: [0x00, 0x0d, 0xb8, 0x00, 0x00, 0x00, 0x00, 0x00],
                pan_id: 0x0700,
                master_key: [0x11; 16],
                pskc: [0x22; 16],
                mesh_local_prefix: [0xfd, 0x00, 0x0d, 0xb8, 0x00, 0x00, 0x00, 0x00],
                channel: 22,
                channel_page: 0,
                channel_mask: 0x07ff_f800,
                key_rotation: 3600,
                key_sequence: 0,
            },
            device: DeviceConfig { pskd: "ABCDEF".to_string() },
            channels: ChannelList { channel_page: 0, channel_mask: 0x07ff_f800 },
            link_timeout_secs: 100,
            max_child_count: 32,
        }
    }

    fn registered(stack: &mut SimStack) -> MeshManager {
        let mut registry = StatusRegistry::new();
        let mut mesh = MeshManager::new(settings());
        mesh.register_driver(stack, &mut registry);
        mesh
    }

    #[test]
    fn bring_up_without_a_radio_reports_driver_unavailable() {
        let mut stack = SimStack::default();
        let mut registry = StatusRegistry::new();
        let mut mesh = MeshManager::new(settings());
        let err = mesh.bring_up(&mut stack, &mut registry).unwrap_err();
        assert_eq!(err, LifecycleError::DriverUnavailable);
        assert_eq!(mesh.state(), InterfaceState::Unknown);
        assert_eq!(mesh.iface(), None);
    }

    #[test]
    fn registration_failure_leaves_the_driver_unregistered() {
        let mut stack = SimStack::new(SimOptions { radio_present: false, ..SimOptions::default() });
        let mut registry = StatusRegistry::new();
        let mut mesh = MeshManager::new(settings());
        mesh.register_driver(&mut stack, &mut registry);
        assert_eq!(mesh.rf_driver(), DriverId::UNREGISTERED);
        let err = mesh.bring_up(&mut stack, &mut registry).unwrap_err();
        assert_eq!(err, LifecycleError::DriverUnavailable);
    }

    #[test]
    fn bring_up_reaches_bootstrapping() {
        let mut stack = SimStack::default();
        let mut registry = StatusRegistry::new();
        let mut mesh = registered(&mut stack);
        let iface = mesh.bring_up(&mut stack, &mut registry).unwrap();
        assert_eq!(mesh.state(), InterfaceState::Bootstrapping);
        assert_eq!(stack.management_inits().len(), 1);
        assert_eq!(stack.link_timeouts(), &[(iface, 100)]);
        assert_eq!(stack.child_caps(), &[(iface, 32)]);
        assert_eq!(stack.up_requests(), &[iface]);
        assert_eq!(stack.radio_macs_created(), 1);
    }

    #[test]
    fn repeated_bring_up_is_a_noop() {
        let mut stack = SimStack::default();
        let mut registry = StatusRegistry::new();
        let mut mesh = registered(&mut stack);
        let first = mesh.bring_up(&mut stack, &mut registry).unwrap();
        let second = mesh.bring_up(&mut stack, &mut registry).unwrap();
        assert_eq!(first, second);
        assert_eq!(stack.up_requests().len(), 1);
        assert_eq!(stack.management_inits().len(), 1);
        assert_eq!(stack.interfaces().len(), 1);
    }

    #[test]
    fn management_failure_carries_the_stack_code() {
        let mut stack = SimStack::default();
        let mut registry = StatusRegistry::new();
        let mut mesh = registered(&mut stack);
        stack.reject_management_init(-3);
        let err = mesh.bring_up(&mut stack, &mut registry).unwrap_err();
        assert_eq!(err, LifecycleError::ManagementInitFailed { code: -3 });
        assert_eq!(mesh.state(), InterfaceState::Unknown);
        // The interface object survives; the retry reuses it.
        let iface = mesh.bring_up(&mut stack, &mut registry).unwrap();
        assert_eq!(mesh.iface(), Some(iface));
        assert_eq!(stack.interfaces().len(), 1);
        assert_eq!(stack.radio_macs_created(), 1);
    }

    #[test]
    fn up_rejection_reverts_to_unknown() {
        let mut stack = SimStack::default();
        let mut registry = StatusRegistry::new();
        let mut mesh = registered(&mut stack);
        stack.fail_next_up();
        let err = mesh.bring_up(&mut stack, &mut registry).unwrap_err();
        assert!(matches!(err, LifecycleError::BringUpFailed(_)));
        assert_eq!(mesh.state(), InterfaceState::Unknown);
        let iface = mesh.bring_up(&mut stack, &mut registry).unwrap();
        assert_eq!(mesh.state(), InterfaceState::Bootstrapping);
        assert_eq!(stack.interfaces().len(), 1);
        assert_eq!(stack.up_requests(), &[iface]);
    }
}
