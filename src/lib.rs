//! Real-time broadcast relay for emulator video and audio
//!
//! An emulation engine renders frames and audio; the relay converts and
//! encodes them and fans them out to every WebSocket subscriber of the
//! matching channel. Control commands arrive both on the `/control`
//! WebSocket channel and from an AMQP queue, and are applied to the engine.
//!
//! ```text
//!                     EngineEvent queue
//!  Engine ──────────────────────────────► StreamCoordinator
//!    ▲                                           │ encode
//!    │                                           ▼
//!    │                                    ChannelRegistry ──► /video /audio /rom-loaded
//!    │
//!  ControlRouter ◄── /control (WebSocket)
//!        ▲
//!        └────────── BrokerBridge (AMQP control_queue)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use emu_relay::{ChannelRegistry, ControlRouter, RelayServer, ServerConfig};
//! # use emu_relay::engine::Engine;
//!
//! # async fn serve(engine: Arc<dyn Engine>) -> emu_relay::Result<()> {
//! let registry = Arc::new(ChannelRegistry::new());
//! let server = RelayServer::new(ServerConfig::from_env(), registry, ControlRouter::new(engine));
//! server.run().await
//! # }
//! ```

pub mod broker;
pub mod control;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod media;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;

pub use broker::{BridgeState, BrokerBridge, BrokerConfig};
pub use control::{ControlRouter, ControlSurface, RelayStatus};
pub use coordinator::{CoordinatorConfig, StreamCoordinator};
pub use engine::{event_channel, Engine, EngineEvent, EngineEventSender, FrameInfo};
pub use error::{Error, Result};
pub use protocol::ControlCommand;
pub use registry::{BroadcastFrame, Channel, ChannelRegistry, RegistryConfig};
pub use server::{RelayServer, ServerConfig};
