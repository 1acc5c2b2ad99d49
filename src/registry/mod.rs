//! Channel registry for subscriber fan-out
//!
//! The registry owns one subscriber set per relay channel and fans encoded
//! frames out to every connection currently joined to it.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<ChannelRegistry>
//!                 ┌───────────────────────────────┐
//!                 │ channels: HashMap<Channel,    │
//!                 │   RwLock<ChannelEntry {       │
//!                 │     subscribers: id -> tx,    │
//!                 │   }>                          │
//!                 │ >                             │
//!                 └───────────────┬───────────────┘
//!                                 │
//!      ┌──────────────────────────┼──────────────────────────┐
//!      │                          │                          │
//!      ▼                          ▼                          ▼
//! [Coordinator]             [Connection]               [Connection]
//!  broadcast()               rx.recv()                  rx.recv()
//!      │                          │                          │
//!      └──► try_send() per handle ┴──► WebSocket writer ──► TCP
//! ```
//!
//! # Zero-Copy Design
//!
//! `bytes::Bytes` uses reference counting, so all subscribers share the same
//! encoded frame. Each per-subscriber queue holds a clone of the
//! `BroadcastFrame`, but the payload itself is only copied once per
//! subscriber, when the connection writer hands it to the socket.

pub mod channel;
pub mod config;
pub mod entry;
pub mod frame;
pub mod store;

pub use channel::Channel;
pub use config::RegistryConfig;
pub use entry::{ChannelEntry, ChannelStats, SubscriberHandle};
pub use frame::{BroadcastFrame, FrameKind};
pub use store::ChannelRegistry;
