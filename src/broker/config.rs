//! Broker bridge configuration

/// Environment variable holding the AMQP URI
pub const BROKER_URL_ENV: &str = "CLOUDAMQP_URL";

/// Exchange type declared for a consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeType {
    Topic,
    Direct,
    Fanout,
}

impl From<ExchangeType> for lapin::ExchangeKind {
    fn from(kind: ExchangeType) -> Self {
        match kind {
            ExchangeType::Topic => lapin::ExchangeKind::Topic,
            ExchangeType::Direct => lapin::ExchangeKind::Direct,
            ExchangeType::Fanout => lapin::ExchangeKind::Fanout,
        }
    }
}

/// Topology of one logical consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Logical consumer name (used in logs and the consumer tag)
    pub name: String,
    pub queue: String,
    pub exchange: String,
    pub exchange_type: ExchangeType,
    pub routing_key: String,
    /// Declare exchange and queue as durable
    pub durable: bool,
    /// Dead-letter exchange set on the queue, if any
    ///
    /// Changing this on an existing queue makes the declare fail, so it
    /// is off by default.
    pub dead_letter_exchange: Option<String>,
}

impl ConsumerConfig {
    /// The control-command consumer
    pub fn control() -> Self {
        Self {
            name: "control".to_string(),
            queue: "control_queue".to_string(),
            exchange: "control_exchange".to_string(),
            exchange_type: ExchangeType::Topic,
            routing_key: "control".to_string(),
            durable: true,
            dead_letter_exchange: None,
        }
    }

    /// Set the dead-letter exchange for this consumer's queue
    pub fn dead_letter_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.dead_letter_exchange = Some(exchange.into());
        self
    }
}

/// Configuration for the broker bridge
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// AMQP URI; the bridge refuses to start without one
    pub uri: Option<String>,

    /// Consumers declared on connect
    pub consumers: Vec<ConsumerConfig>,

    /// Failed deliveries of the same body before it is dead-lettered
    pub max_redeliveries: u32,

    /// Distinct failing bodies remembered for redelivery counting
    pub retry_tracking_capacity: usize,

    /// Unacknowledged deliveries per consumer
    pub prefetch_count: u16,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            uri: None,
            consumers: vec![ConsumerConfig::control()],
            max_redeliveries: 5,
            retry_tracking_capacity: 1024,
            prefetch_count: 32,
        }
    }
}

impl BrokerConfig {
    /// Default topology with the URI taken from `CLOUDAMQP_URL`
    pub fn from_env() -> Self {
        Self {
            uri: std::env::var(BROKER_URL_ENV).ok().filter(|u| !u.is_empty()),
            ..Default::default()
        }
    }

    /// Set the broker URI
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Replace the consumer list
    pub fn consumers(mut self, consumers: Vec<ConsumerConfig>) -> Self {
        self.consumers = consumers;
        self
    }

    /// Set the redelivery bound (minimum 1)
    pub fn max_redeliveries(mut self, max: u32) -> Self {
        self.max_redeliveries = max.max(1);
        self
    }

    /// Set the per-consumer prefetch
    pub fn prefetch_count(mut self, count: u16) -> Self {
        self.prefetch_count = count;
        self
    }
}
