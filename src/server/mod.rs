//! WebSocket relay server
//!
//! Accepts subscriber connections, routes each to a channel by request
//! path and forwards `/control` text messages to the control router.

pub mod config;
pub mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use connection::Connection;
pub use listener::RelayServer;
