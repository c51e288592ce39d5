use brindle_stack::{DriverId, InterfaceId, InterfaceKind};

/// Last known identifiers and connection flags, one slot per side.
///
/// Pure storage: no validation, no side effects, read by whoever needs to
/// route or report. Interface ids are kept after teardown so that late
/// status events (a set-down-complete arriving after the handle was
/// dropped) still route to the side that owned the interface.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatusRegistry {
    mesh: Slot,
    backhaul: Slot,
}

#[derive(Clone, Copy, Debug, Default)]
struct Slot {
    driver: Option<DriverId>,
    iface: Option<InterfaceId>,
    connected: bool,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops both slots back to the initial state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set_driver(&mut self, kind: InterfaceKind, driver: DriverId) {
        self.slot_mut(kind).driver = Some(driver);
    }

    pub fn driver(&self, kind: InterfaceKind) -> Option<DriverId> {
        self.slot(kind).driver
    }

    pub fn set_interface(&mut self, kind: InterfaceKind, iface: InterfaceId) {
        self.slot_mut(kind).iface = Some(iface);
    }

    pub fn interface(&self, kind: InterfaceKind) -> Option<InterfaceId> {
        self.slot(kind).iface
    }

    pub fn set_connected(&mut self, kind: InterfaceKind, connected: bool) {
        self.slot_mut(kind).connected = connected;
    }

    pub fn connected(&self, kind: InterfaceKind) -> bool {
        self.slot(kind).connected
    }

    fn slot(&self, kind: InterfaceKind) -> &Slot {
        match kind {
            InterfaceKind::Mesh => &self.mesh,
            InterfaceKind::Backhaul => &self.backhaul,
        }
    }

    fn slot_mut(&mut self, kind: InterfaceKind) -> &mut Slot {
        match kind {
            InterfaceKind::Mesh => &mut self.mesh,
            InterfaceKind::Backhaul => &mut self.backhaul,
        }
    }
}
