use brindle_stack::{DriverId, EventSink, InterfaceId, InterfaceStatus};
use tokio::sync::mpsc;

/// Everything the dispatcher reacts to.
///
/// Events from the stack, the PHY driver and the diagnostic timer all land
/// on one queue and are processed strictly in arrival order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// Dispatched exactly once when the run loop starts.
    Init,
    /// The backhaul PHY reported link up.
    BackhaulPhyUp(DriverId),
    /// The backhaul PHY reported link down.
    BackhaulPhyDown(DriverId),
    /// The stack reported a bootstrap status code for an interface.
    InterfaceStatus { iface: InterfaceId, status: InterfaceStatus },
    /// The periodic diagnostic task fired.
    DiagnosticTick,
}

/// Forwards stack callbacks into the dispatcher queue.
///
/// The only work done on the caller's thread is constructing the event and
/// enqueueing it. A send failure means the router is shutting down; late
/// callbacks are dropped.
#[derive(Clone)]
pub struct StackBridge {
    events: mpsc::UnboundedSender<Event>,
}

impl StackBridge {
    pub fn new(events: mpsc::UnboundedSender<Event>) -> Self {
        Self { events }
    }
}

impl EventSink for StackBridge {
    fn backhaul_phy(&self, driver: DriverId, up: bool) {
        let event = if up { Event::BackhaulPhyUp(driver) } else { Event::BackhaulPhyDown(driver) };
        if self.events.send(event).is_err() {
            log::trace!("router: queue closed, dropping phy event for driver {driver}");
        }
    }

    fn interface_status(&self, iface: InterfaceId, status: InterfaceStatus) {
        if self.events.send(Event::InterfaceStatus { iface, status }).is_err() {
            log::trace!("router: queue closed, dropping status event for interface {iface}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_maps_phy_transitions() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let bridge = StackBridge::new(tx);
        bridge.backhaul_phy(DriverId(3), true);
        bridge.backhaul_phy(DriverId(3), false);
        assert_eq!(rx.try_recv(), Ok(Event::BackhaulPhyUp(DriverId(3))));
        assert_eq!(rx.try_recv(), Ok(Event::BackhaulPhyDown(DriverId(3))));
    }

    #[test]
    fn bridge_preserves_status_payload() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let bridge = StackBridge::new(tx);
        bridge.interface_status(InterfaceId(2), InterfaceStatus::ScanFail);
        assert_eq!(
            rx.try_recv(),
            Ok(Event::InterfaceStatus { iface: InterfaceId(2), status: InterfaceStatus::ScanFail })
        );
    }

    #[test]
    fn bridge_survives_a_closed_queue() {
        let (tx, rx) = mpsc::unbounded_channel::<Event>();
        drop(rx);
        let bridge = StackBridge::new(tx);
        bridge.backhaul_phy(DriverId(1), true);
    }
}
