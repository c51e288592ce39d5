use crate::types::{DriverId, InterfaceId};

/// Failures reported by the external network stack.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StackError {
    /// The driver id does not name a registered PHY driver.
    #[error("driver {driver} is not registered")]
    UnknownDriver { driver: DriverId },

    /// The stack could not allocate a new interface.
    #[error("interface allocation failed")]
    InterfaceAllocation,

    /// The interface id does not name a live interface.
    #[error("interface {iface} is unknown to the stack")]
    UnknownInterface { iface: InterfaceId },

    /// The management layer rejected its initialization parameters.
    #[error("management init rejected with code {code}")]
    Management { code: i32 },

    /// The interface has no global unicast address assigned.
    #[error("no global address assigned")]
    AddressUnassigned,

    /// The stack refused the request.
    #[error("request rejected: {reason}")]
    Rejected { reason: &'static str },
}
