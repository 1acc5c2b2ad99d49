//! Control ingress
//!
//! This module provides:
//! - The control router shared by the WebSocket and broker ingress paths
//! - The synchronous status/command surface used by HTTP routes

pub mod router;
pub mod surface;

pub use router::ControlRouter;
pub use surface::{ControlSurface, RelayStatus, ADMIN_ENABLED_ENV};
