//! Collaborator contracts for the brindle border router.
//!
//! The router core never talks to radio or Ethernet hardware directly. This
//! crate defines the boundary it talks through:
//!
//! - [`NetStack`] — the synchronous call surface of the underlying network
//!   stack: driver registration, interface creation, bootstrap
//!   configuration, routes and metrics
//! - [`EventSink`] — the callback surface the stack reports completions
//!   through; implementations enqueue a notification and return
//! - [`SimStack`] — a complete in-memory stack used by the daemon's
//!   simulation mode and by the test suites
//!
//! A call into a [`NetStack`] either completes synchronously or is
//! fire-and-forget. Anything that takes real time (bootstrap, teardown)
//! is reported later through the [`EventSink`] as a distinct notification.

pub mod error;
pub mod event;
pub mod sim;
pub mod stack;
pub mod types;

pub use error::StackError;
pub use event::{EventSink, InterfaceStatus};
pub use sim::{SimOptions, SimStack};
pub use stack::NetStack;
pub use types::{
    BootstrapMode, ChannelList, DeviceConfig, DriverId, InterfaceId, InterfaceKind, LinkConfig,
    MacHandle, MacStorageSizes, MeshProtocol, MeshRole,
};
