//! Bring-up orchestration for a two-sided border router.
//!
//! One side is a meshed radio network, the other a wired backhaul uplink.
//! [`BorderRouter`] owns both interface lifecycles. Everything the stack
//! reports lands on one queue and is dispatched strictly in arrival
//! order, one event at a time.
//!
//! - [`config`] — TOML configuration with startup validation
//! - [`registry`] — last known driver/interface ids per side
//! - [`backhaul`] and [`mesh`] — the per-side lifecycle managers
//! - [`dispatcher`] — the [`BorderRouter`] context and run loop
//! - [`diag`] — the periodic diagnostic tick task

pub mod backhaul;
pub mod config;
pub mod diag;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod mesh;
pub mod registry;
pub mod status;

pub use backhaul::BackhaulManager;
pub use config::{ConfigError, RouteConfig, RouterConfig};
pub use dispatcher::BorderRouter;
pub use error::LifecycleError;
pub use event::{Event, StackBridge};
pub use mesh::{MeshManager, MeshSettings};
pub use registry::StatusRegistry;
pub use status::{InterfaceState, RouterStatus};
