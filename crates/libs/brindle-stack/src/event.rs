use crate::types::{DriverId, InterfaceId};

/// Bootstrap status codes reported for a network interface.
///
/// Codes the router does not model explicitly arrive as
/// [`Other`](InterfaceStatus::Other) and are treated as diagnostic noise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterfaceStatus {
    /// Bootstrap finished; the interface is operational.
    BootstrapReady,
    /// A previously requested teardown has completed.
    SetDownComplete,
    ScanFail,
    AddressAllocationFail,
    DuplicateAddress,
    AuthenticationStartFail,
    AuthenticationFail,
    ConnectionDown,
    ParentPollFail,
    /// The PHY layer lost the link.
    PhyConnectionDown,
    /// A status code with no dedicated variant.
    Other(u8),
}

/// Callback surface the stack reports asynchronous completions through.
///
/// Implementations may be invoked from driver threads. They must only
/// construct and enqueue a notification; touching router state or calling
/// back into the stack from the callback is not allowed.
pub trait EventSink: Send + Sync {
    /// The backhaul PHY link status changed.
    fn backhaul_phy(&self, driver: DriverId, up: bool);

    /// A bootstrap status code was reported for an interface.
    fn interface_status(&self, iface: InterfaceId, status: InterfaceStatus);
}
