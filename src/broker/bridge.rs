//! AMQP consumer bridge
//!
//! Connects to the broker, declares each consumer's topology and feeds
//! deliveries through a [`DeliveryProcessor`].
//!
//! ```text
//! Disconnected ──start()──► Connecting ──► Connected ──► Consuming
//!      ▲                        │                           │
//!      └──── error / stop() ────┴───────────────────────────┘
//! ```
//!
//! There is no reconnect loop: a lost connection is logged, the bridge
//! returns to `Disconnected`, and the rest of the relay keeps running.
//! A later `start()` replaces the lost connection.
//!
//! Each connection gets a generation number. Error callbacks and consumer
//! tasks from an older connection can never change the state of a newer one.

use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicCancelOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
    BasicRejectOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Connection, ConnectionProperties, Consumer};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::control::ControlRouter;
use crate::error::BrokerError;
use crate::stats::{BrokerCounters, BrokerStats};

use super::config::{BrokerConfig, ConsumerConfig, BROKER_URL_ENV};
use super::consumer::{ConsumerOutcome, DeliveryProcessor, RetryTracker};

/// AMQP reply code for a normal close
const REPLY_SUCCESS: u16 = 200;

/// Bridge lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Consuming = 3,
}

impl BridgeState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => BridgeState::Connecting,
            2 => BridgeState::Connected,
            3 => BridgeState::Consuming,
            _ => BridgeState::Disconnected,
        }
    }
}

#[derive(Debug, Default)]
struct StateCell {
    state: AtomicU8,
    generation: AtomicU64,
}

impl StateCell {
    fn get(&self) -> BridgeState {
        BridgeState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set(&self, state: BridgeState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Move `from` to `to`, leaving any other state alone
    fn advance(&self, from: BridgeState, to: BridgeState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Start a new connection generation
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }
}

/// Liveness of one connection's consumers
#[derive(Debug, Clone)]
struct Liveness {
    state: Arc<StateCell>,
    generation: u64,
    remaining: Arc<AtomicUsize>,
}

impl Liveness {
    fn new(state: Arc<StateCell>, generation: u64, consumers: usize) -> Self {
        Self {
            state,
            generation,
            remaining: Arc::new(AtomicUsize::new(consumers)),
        }
    }

    /// One consumer stream ended; the last one marks the connection lost
    fn consumer_stopped(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.lost();
        }
    }

    /// The connection failed
    fn lost(&self) {
        if self.state.is_current(self.generation) {
            self.state.set(BridgeState::Disconnected);
        }
    }
}

/// A live connection and its consumers
struct ActiveBridge {
    connection: Connection,
    channel: lapin::Channel,
    consumer_tags: Vec<String>,
    tasks: Vec<JoinHandle<()>>,
}

impl ActiveBridge {
    /// Cancel every consumer, then close the channel and connection
    async fn shutdown(self) {
        for tag in &self.consumer_tags {
            if let Err(e) = self
                .channel
                .basic_cancel(tag, BasicCancelOptions::default())
                .await
            {
                tracing::debug!(consumer_tag = %tag, error = %e, "Consumer cancel failed");
            }
        }
        for task in self.tasks {
            task.abort();
        }

        if let Err(e) = self.channel.close(REPLY_SUCCESS, "relay stopping").await {
            tracing::debug!(error = %e, "Broker channel close failed");
        }
        if let Err(e) = self.connection.close(REPLY_SUCCESS, "relay stopping").await {
            tracing::debug!(error = %e, "Broker connection close failed");
        }
    }
}

/// Second control ingress: broker queue → control router
pub struct BrokerBridge {
    config: BrokerConfig,
    router: ControlRouter,
    state: Arc<StateCell>,
    active: Mutex<Option<ActiveBridge>>,
    counters: Arc<BrokerCounters>,
}

impl BrokerBridge {
    pub fn new(config: BrokerConfig, router: ControlRouter) -> Self {
        Self {
            config,
            router,
            state: Arc::new(StateCell::default()),
            active: Mutex::new(None),
            counters: Arc::new(BrokerCounters::new()),
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state.get()
    }

    pub fn stats(&self) -> BrokerStats {
        self.counters.snapshot()
    }

    /// Connect, declare topology and start consuming
    ///
    /// Fails with [`BrokerError::MissingEndpoint`] when no URI is
    /// configured. Callers log the error and carry on without the broker.
    /// A connection that was lost since the last start is torn down and
    /// replaced; a live one yields [`BrokerError::AlreadyRunning`].
    pub async fn start(&self) -> Result<(), BrokerError> {
        let uri = self
            .config
            .uri
            .clone()
            .ok_or(BrokerError::MissingEndpoint(BROKER_URL_ENV))?;

        let mut active = self.active.lock().await;
        if active.is_some() && self.state.get() != BridgeState::Disconnected {
            return Err(BrokerError::AlreadyRunning);
        }
        if let Some(lost) = active.take() {
            tracing::info!("Replacing lost broker connection");
            lost.shutdown().await;
        }

        let generation = self.state.next_generation();
        self.state.set(BridgeState::Connecting);
        match self.connect(&uri, generation).await {
            Ok(bridge) => {
                *active = Some(bridge);
                // A consumer may already have ended while the rest were declared
                if !self.state.advance(BridgeState::Connected, BridgeState::Consuming) {
                    tracing::warn!("Broker connection lost during setup");
                }
                Ok(())
            }
            Err(e) => {
                self.state.set(BridgeState::Disconnected);
                Err(e)
            }
        }
    }

    async fn connect(&self, uri: &str, generation: u64) -> Result<ActiveBridge, BrokerError> {
        let connection = Connection::connect(uri, ConnectionProperties::default()).await?;
        tracing::info!(generation, "Broker connection established");
        self.state.set(BridgeState::Connected);

        let liveness = Liveness::new(
            Arc::clone(&self.state),
            generation,
            self.config.consumers.len(),
        );

        let on_error = liveness.clone();
        connection.on_error(move |e| {
            tracing::error!(error = %e, "Broker connection error");
            on_error.lost();
        });

        let channel = connection.create_channel().await?;
        channel
            .basic_qos(self.config.prefetch_count, BasicQosOptions::default())
            .await?;

        let mut consumer_tags = Vec::with_capacity(self.config.consumers.len());
        let mut tasks: Vec<JoinHandle<()>> = Vec::with_capacity(self.config.consumers.len());

        for consumer_config in &self.config.consumers {
            let consumer = match declare_and_consume(&channel, consumer_config).await {
                Ok(consumer) => consumer,
                Err(e) => {
                    for task in tasks {
                        task.abort();
                    }
                    return Err(e);
                }
            };
            consumer_tags.push(consumer.tag().as_str().to_string());

            let processor = Arc::new(DeliveryProcessor::new(
                consumer_config.name.clone(),
                self.router.clone(),
                RetryTracker::new(
                    self.config.max_redeliveries,
                    self.config.retry_tracking_capacity,
                ),
                Arc::clone(&self.counters),
            ));

            tracing::info!(
                consumer = %consumer_config.name,
                queue = %consumer_config.queue,
                "Broker consumer ready"
            );

            tasks.push(tokio::spawn(consume(consumer, processor, liveness.clone())));
        }

        Ok(ActiveBridge {
            connection,
            channel,
            consumer_tags,
            tasks,
        })
    }

    /// Cancel every consumer, then close the channel and connection
    ///
    /// Safe to call when already stopped. Commands already handed to the
    /// engine are unaffected.
    pub async fn stop(&self) {
        let Some(bridge) = self.active.lock().await.take() else {
            return;
        };

        // Late callbacks from this connection no longer count
        self.state.next_generation();
        bridge.shutdown().await;

        self.state.set(BridgeState::Disconnected);
        tracing::info!("Broker bridge stopped");
    }
}

/// Declare exchange, queue and binding, then start a consumer
async fn declare_and_consume(
    channel: &lapin::Channel,
    config: &ConsumerConfig,
) -> Result<Consumer, BrokerError> {
    channel
        .exchange_declare(
            &config.exchange,
            config.exchange_type.into(),
            ExchangeDeclareOptions {
                durable: config.durable,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    let mut queue_args = FieldTable::default();
    if let Some(ref dlx) = config.dead_letter_exchange {
        queue_args.insert(
            "x-dead-letter-exchange".into(),
            AMQPValue::LongString(dlx.as_str().into()),
        );
    }

    channel
        .queue_declare(
            &config.queue,
            QueueDeclareOptions {
                durable: config.durable,
                ..Default::default()
            },
            queue_args,
        )
        .await?;

    channel
        .queue_bind(
            &config.queue,
            &config.exchange,
            &config.routing_key,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;

    let tag = format!("emu-relay-{}", config.name);
    let consumer = channel
        .basic_consume(
            &config.queue,
            &tag,
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    Ok(consumer)
}

/// Consume deliveries until the consumer is cancelled or the connection drops
async fn consume(mut consumer: Consumer, processor: Arc<DeliveryProcessor>, liveness: Liveness) {
    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::error!(error = %e, "Broker consumer error");
                break;
            }
        };

        let outcome = processor.process(&delivery.data);
        if let Err(e) = settle(&delivery, outcome).await {
            tracing::warn!(error = %e, outcome = ?outcome, "Failed to settle broker delivery");
        }
    }

    liveness.consumer_stopped();
    tracing::info!("Broker consumer stopped");
}

async fn settle(delivery: &Delivery, outcome: ConsumerOutcome) -> Result<(), lapin::Error> {
    match outcome {
        ConsumerOutcome::Acknowledge => delivery.acker.ack(BasicAckOptions::default()).await,
        ConsumerOutcome::Requeue => {
            delivery
                .acker
                .nack(BasicNackOptions {
                    requeue: true,
                    ..Default::default()
                })
                .await
        }
        ConsumerOutcome::DeadLetter => {
            delivery
                .acker
                .reject(BasicRejectOptions { requeue: false })
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::RecordingEngine;

    fn bridge(config: BrokerConfig) -> BrokerBridge {
        let engine = Arc::new(RecordingEngine::new());
        BrokerBridge::new(config, ControlRouter::new(engine))
    }

    #[tokio::test]
    async fn test_start_without_endpoint() {
        let bridge = bridge(BrokerConfig::default());

        let err = bridge.start().await.unwrap_err();
        assert!(matches!(err, BrokerError::MissingEndpoint("CLOUDAMQP_URL")));
        assert_eq!(bridge.state(), BridgeState::Disconnected);
    }

    #[tokio::test]
    async fn test_stop_when_not_started() {
        let bridge = bridge(BrokerConfig::default());

        bridge.stop().await;
        bridge.stop().await;
        assert_eq!(bridge.state(), BridgeState::Disconnected);
    }

    #[tokio::test]
    async fn test_unreachable_broker_is_not_fatal() {
        // Port 1 on loopback refuses connections
        let bridge = bridge(BrokerConfig::default().uri("amqp://127.0.0.1:1/%2f"));

        assert!(bridge.start().await.is_err());
        assert_eq!(bridge.state(), BridgeState::Disconnected);
        assert_eq!(bridge.stats(), BrokerStats::default());
    }

    #[test]
    fn test_last_consumer_stopping_disconnects() {
        let state = Arc::new(StateCell::default());
        let generation = state.next_generation();
        state.set(BridgeState::Consuming);

        let liveness = Liveness::new(Arc::clone(&state), generation, 2);

        liveness.consumer_stopped();
        assert_eq!(state.get(), BridgeState::Consuming);

        liveness.consumer_stopped();
        assert_eq!(state.get(), BridgeState::Disconnected);
    }

    #[test]
    fn test_advance_only_from_expected_state() {
        let state = StateCell::default();
        assert!(!state.advance(BridgeState::Connected, BridgeState::Consuming));
        assert_eq!(state.get(), BridgeState::Disconnected);

        state.set(BridgeState::Connected);
        assert!(state.advance(BridgeState::Connected, BridgeState::Consuming));
        assert_eq!(state.get(), BridgeState::Consuming);
    }

    #[test]
    fn test_stale_connection_cannot_change_state() {
        let state = Arc::new(StateCell::default());
        let old = Liveness::new(Arc::clone(&state), state.next_generation(), 1);

        // A newer connection has since been started
        let current = state.next_generation();
        state.set(BridgeState::Consuming);

        old.lost();
        old.consumer_stopped();
        assert_eq!(state.get(), BridgeState::Consuming);

        Liveness::new(Arc::clone(&state), current, 1).lost();
        assert_eq!(state.get(), BridgeState::Disconnected);
    }

    #[tokio::test]
    async fn test_failed_start_can_be_retried() {
        let bridge = bridge(BrokerConfig::default().uri("amqp://127.0.0.1:1/%2f"));

        assert!(bridge.start().await.is_err());
        // Nothing is left holding the bridge, so a retry connects again
        // instead of reporting AlreadyRunning
        let err = bridge.start().await.unwrap_err();
        assert!(matches!(err, BrokerError::Amqp(_)));
        assert_eq!(bridge.state(), BridgeState::Disconnected);
    }

    #[test]
    fn test_state_round_trip() {
        let cell = StateCell::default();
        assert_eq!(cell.get(), BridgeState::Disconnected);

        for state in [
            BridgeState::Connecting,
            BridgeState::Connected,
            BridgeState::Consuming,
            BridgeState::Disconnected,
        ] {
            cell.set(state);
            assert_eq!(cell.get(), state);
        }
    }
}
