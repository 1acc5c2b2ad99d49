//! Message broker ingress
//!
//! A second path for control commands: JSON bodies consumed from an AMQP
//! queue are decoded exactly like `/control` WebSocket messages and handed
//! to the same [`ControlRouter`](crate::control::ControlRouter).
//!
//! Each delivery is acknowledged on success and requeued on failure.
//! Well-formed JSON that names no command (not an object, no `type`, an
//! unknown `type`) is logged and acknowledged, since no retry can fix it. A body
//! that keeps failing is dead-lettered after
//! [`BrokerConfig::max_redeliveries`] attempts instead of looping forever.

pub mod bridge;
pub mod config;
pub mod consumer;

pub use bridge::{BridgeState, BrokerBridge};
pub use config::{BrokerConfig, ConsumerConfig, ExchangeType, BROKER_URL_ENV};
pub use consumer::{ConsumerOutcome, DeliveryProcessor, RetryTracker};
