//! The border router context and event dispatch.
//!
//! All state transitions happen here, on one task, one event at a time.
//! Interface status events are routed by originating interface id: the
//! backhaul side if the id matches the registry's backhaul interface,
//! otherwise the mesh side.

use std::sync::Arc;

use brindle_stack::{
    BootstrapMode, DriverId, InterfaceId, InterfaceKind, InterfaceStatus, NetStack,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backhaul::{
    BackhaulManager, BACKHAUL_IFACE_NAME, BACKHAUL_METRIC, BACKHAUL_ROUTE_METRIC,
    ROUTE_LIFETIME_FOREVER,
};
use crate::config::{ConfigError, RouterConfig};
use crate::diag::{self, DIAG_INTERVAL};
use crate::event::{Event, StackBridge};
use crate::mesh::{MeshManager, MESH_IFACE_NAME, MESH_METRIC};
use crate::registry::StatusRegistry;
use crate::status::{InterfaceState, RouterStatus};

/// Length of the prefix advertised toward the mesh once the uplink holds a
/// global address.
const ADVERTISED_PREFIX_LEN: u8 = 64;

/// The border router context: the stack handle, the registry, both
/// lifecycle managers and the dispatcher queue side.
///
/// Owned by a single task. [`dispatch`](BorderRouter::dispatch) runs one
/// event to completion at a time; nothing here blocks or suspends.
pub struct BorderRouter<S> {
    stack: S,
    registry: StatusRegistry,
    mesh: MeshManager,
    backhaul: BackhaulManager,
    diagnostics: bool,
    events: mpsc::UnboundedSender<Event>,
    cancel: CancellationToken,
    status_tx: watch::Sender<RouterStatus>,
    diag_task: Option<JoinHandle<()>>,
}

impl<S: NetStack> BorderRouter<S> {
    pub fn new(
        config: &RouterConfig,
        stack: S,
        events: mpsc::UnboundedSender<Event>,
        cancel: CancellationToken,
    ) -> Result<Self, ConfigError> {
        let mesh = MeshManager::new(config.mesh_settings()?);
        let backhaul = BackhaulManager::new(
            config.backhaul.bootstrap,
            config.backhaul_prefix()?,
            config.backhaul_route()?,
        );
        let (status_tx, _) = watch::channel(RouterStatus::default());
        Ok(Self {
            stack,
            registry: StatusRegistry::new(),
            mesh,
            backhaul,
            diagnostics: config.diagnostics.enabled,
            events,
            cancel,
            status_tx,
            diag_task: None,
        })
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut S {
        &mut self.stack
    }

    pub fn registry(&self) -> &StatusRegistry {
        &self.registry
    }

    pub fn mesh(&self) -> &MeshManager {
        &self.mesh
    }

    pub fn backhaul(&self) -> &BackhaulManager {
        &self.backhaul
    }

    /// Snapshot channel updated after every dispatched event.
    pub fn status(&self) -> watch::Receiver<RouterStatus> {
        self.status_tx.subscribe()
    }

    /// Queue handle for feeding events from outside the stack callbacks.
    pub fn events(&self) -> mpsc::UnboundedSender<Event> {
        self.events.clone()
    }

    /// Applies one event.
    pub fn dispatch(&mut self, event: Event) {
        log::trace!("router: dispatch {event:?}");
        match event {
            Event::Init => self.handle_init(),
            Event::BackhaulPhyUp(driver) => self.handle_phy_up(driver),
            Event::BackhaulPhyDown(driver) => self.handle_phy_down(driver),
            Event::InterfaceStatus { iface, status } => self.handle_interface_status(iface, status),
            Event::DiagnosticTick => self.handle_tick(),
        }
        self.publish_status();
    }

    /// Runs the dispatcher until the token is cancelled or the queue
    /// closes. `Init` is dispatched first, then events strictly in
    /// arrival order. Returns the context for post-shutdown inspection.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) -> Self {
        self.dispatch(Event::Init);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => break,
                },
            }
        }
        log::info!("router: dispatcher stopped");
        self
    }

    fn handle_init(&mut self) {
        // Sink registration comes first: nothing may fire before the
        // queue can take it.
        self.stack.backhaul_driver_init(Arc::new(StackBridge::new(self.events.clone())));
        self.registry.reset();
        self.backhaul.prepare(&mut self.stack);
        self.mesh.register_driver(&mut self.stack, &mut self.registry);
        match self.mesh.bring_up(&mut self.stack, &mut self.registry) {
            Ok(iface) => log::info!("router: mesh bring-up started on interface {iface}"),
            Err(err) => log::error!("router: mesh bring-up failed: {err}"),
        }
        if self.diag_task.is_none() {
            self.diag_task =
                Some(diag::spawn(self.events.clone(), DIAG_INTERVAL, self.cancel.clone()));
        }
    }

    fn handle_phy_up(&mut self, driver: DriverId) {
        match self.backhaul.bring_up(&mut self.stack, &mut self.registry, driver) {
            Ok(iface) => log::info!("router: backhaul bootstrap started on interface {iface}"),
            Err(err) if err.is_benign() => {
                log::debug!("router: phy up for driver {driver} while backhaul already active")
            }
            Err(err) => log::warn!("router: backhaul bootstrap start failed: {err}"),
        }
    }

    fn handle_phy_down(&mut self, driver: DriverId) {
        match self.backhaul.bring_down(&mut self.stack, &mut self.registry) {
            Ok(()) => log::info!("router: backhaul interface taken down"),
            // Expected while the link never came up.
            Err(err) if err.is_benign() => {
                log::debug!("router: phy down for driver {driver} while backhaul not active")
            }
            Err(err) => log::warn!("router: backhaul teardown failed: {err}"),
        }
    }

    fn handle_interface_status(&mut self, iface: InterfaceId, status: InterfaceStatus) {
        if self.registry.interface(InterfaceKind::Backhaul) == Some(iface) {
            self.handle_backhaul_status(iface, status);
        } else {
            self.handle_mesh_status(iface, status);
        }
    }

    fn handle_backhaul_status(&mut self, iface: InterfaceId, status: InterfaceStatus) {
        match status {
            InterfaceStatus::BootstrapReady => {
                let address = match self.stack.global_address(iface) {
                    Ok(address) => address,
                    Err(err) => {
                        // Never report a half-connected uplink.
                        log::warn!("bh0: bootstrap ready but no global address: {err}");
                        self.backhaul.set_global(None);
                        self.backhaul.set_state(InterfaceState::LinkReady);
                        self.registry.set_connected(InterfaceKind::Backhaul, false);
                        return;
                    }
                };
                log::info!("bh0: bootstrap ready, address {address}");
                self.backhaul.set_global(Some(address));
                self.backhaul.set_state(InterfaceState::Connected);
                self.registry.set_connected(InterfaceKind::Backhaul, true);
                if let Err(err) = self.stack.set_interface_metric(iface, BACKHAUL_METRIC) {
                    log::warn!("bh0: failed to set interface metric: {err}");
                }
                if self.backhaul.mode() == BootstrapMode::Static {
                    self.install_static_route(iface);
                }
                self.stack.advertise_prefix(address, ADVERTISED_PREFIX_LEN);
            }
            other => {
                log_bootstrap_noise(BACKHAUL_IFACE_NAME, iface, other);
                if self.backhaul.state() == InterfaceState::Connected {
                    self.backhaul.set_state(InterfaceState::LinkReady);
                    self.backhaul.set_global(None);
                    self.registry.set_connected(InterfaceKind::Backhaul, false);
                }
            }
        }
    }

    fn handle_mesh_status(&mut self, iface: InterfaceId, status: InterfaceStatus) {
        match status {
            InterfaceStatus::BootstrapReady => {
                log::info!("mesh0: bootstrap ready");
                if let Err(err) = self.stack.set_interface_metric(iface, MESH_METRIC) {
                    log::warn!("mesh0: failed to set interface metric: {err}");
                }
                self.mesh.set_state(InterfaceState::Connected);
                self.registry.set_connected(InterfaceKind::Mesh, true);
            }
            InterfaceStatus::SetDownComplete => {
                log::info!("mesh0: interface down complete");
                self.mesh.set_state(InterfaceState::LinkReady);
                self.registry.set_connected(InterfaceKind::Mesh, false);
            }
            other => log_bootstrap_noise(MESH_IFACE_NAME, iface, other),
        }
    }

    fn install_static_route(&mut self, iface: InterfaceId) {
        let Some(route) = self.backhaul.route() else {
            // Static mode without a route is rejected at config load.
            log::warn!("bh0: static bootstrap without a configured route");
            return;
        };
        let next_hop = route.resolved_next_hop();
        match self.stack.add_route(
            route.prefix,
            route.prefix_len,
            next_hop,
            ROUTE_LIFETIME_FOREVER,
            BACKHAUL_ROUTE_METRIC,
            iface,
        ) {
            Ok(()) => match next_hop {
                Some(next_hop) => {
                    log::debug!("bh0: default route {}/{} via {next_hop}", route.prefix, route.prefix_len)
                }
                None => {
                    log::debug!("bh0: default route {}/{} on-link", route.prefix, route.prefix_len)
                }
            },
            Err(err) => log::warn!("bh0: failed to install default route: {err}"),
        }
    }

    fn handle_tick(&mut self) {
        if !self.diagnostics {
            return;
        }
        // Dumps are taken whenever diagnostics are on, independent of the
        // active log level; only the records themselves are filterable.
        let routes = self.stack.routing_table();
        let neighbors = self.stack.neighbor_cache();
        log::debug!("router: routing table\n{routes}");
        log::debug!("router: neighbor cache\n{neighbors}");
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(RouterStatus {
            mesh_state: self.mesh.state(),
            mesh_iface: self.mesh.iface(),
            backhaul_state: self.backhaul.state(),
            backhaul_iface: self.backhaul.iface(),
            backhaul_address: self.backhaul.global_address(),
        });
    }
}

/// Logs a non-ready bootstrap code at the severity the condition merits.
fn log_bootstrap_noise(side: &str, iface: InterfaceId, status: InterfaceStatus) {
    match status {
        InterfaceStatus::ScanFail => log::warn!("{side}: network scan failed (interface {iface})"),
        InterfaceStatus::AddressAllocationFail => {
            log::error!("{side}: address allocation failed (interface {iface})")
        }
        InterfaceStatus::DuplicateAddress => {
            log::error!("{side}: duplicate address detected (interface {iface})")
        }
        InterfaceStatus::AuthenticationStartFail => {
            log::warn!("{side}: authentication start failed (interface {iface})")
        }
        InterfaceStatus::AuthenticationFail => {
            log::warn!("{side}: authentication failed (interface {iface})")
        }
        InterfaceStatus::ConnectionDown => {
            log::warn!("{side}: connection to network lost (interface {iface})")
        }
        InterfaceStatus::ParentPollFail => {
            log::warn!("{side}: parent poll failed (interface {iface})")
        }
        InterfaceStatus::PhyConnectionDown => {
            log::error!("{side}: phy connection lost (interface {iface})")
        }
        InterfaceStatus::Other(code) => {
            log::debug!("{side}: unhandled bootstrap status {code} (interface {iface})")
        }
        InterfaceStatus::BootstrapReady | InterfaceStatus::SetDownComplete => {}
    }
}
