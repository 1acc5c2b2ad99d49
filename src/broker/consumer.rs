//! Broker message processing
//!
//! Everything that decides what happens to a delivery lives here, separate
//! from the AMQP plumbing, so it can be exercised without a broker.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, PoisonError};

use crate::control::ControlRouter;
use crate::stats::BrokerCounters;

/// What the broker should do with a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerOutcome {
    /// Processed; remove from the queue
    Acknowledge,
    /// Failed; put back for redelivery
    Requeue,
    /// Failed too many times; reject without requeue
    DeadLetter,
}

/// Counts failed deliveries per message body
///
/// AMQP only reports whether a delivery is a redelivery, not how many times
/// it has been tried, so failures are tracked by a hash of the body. The
/// table is bounded; the oldest entries are forgotten first.
#[derive(Debug)]
pub struct RetryTracker {
    max_failures: u32,
    capacity: usize,
    failures: HashMap<u64, u32>,
    order: VecDeque<u64>,
}

impl RetryTracker {
    pub fn new(max_failures: u32, capacity: usize) -> Self {
        Self {
            max_failures: max_failures.max(1),
            capacity: capacity.max(1),
            failures: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Record a failure; returns the outcome for this delivery
    pub fn record_failure(&mut self, body: &[u8]) -> ConsumerOutcome {
        let key = body_key(body);

        if !self.failures.contains_key(&key) {
            if self.failures.len() >= self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.failures.remove(&oldest);
                }
            }
            self.order.push_back(key);
        }

        let count = self.failures.entry(key).or_insert(0);
        *count += 1;

        if *count >= self.max_failures {
            self.failures.remove(&key);
            self.order.retain(|k| *k != key);
            ConsumerOutcome::DeadLetter
        } else {
            ConsumerOutcome::Requeue
        }
    }

    /// Forget a body after it was processed
    pub fn record_success(&mut self, body: &[u8]) {
        let key = body_key(body);
        if self.failures.remove(&key).is_some() {
            self.order.retain(|k| *k != key);
        }
    }

    /// Number of bodies currently tracked
    pub fn tracked(&self) -> usize {
        self.failures.len()
    }
}

fn body_key(body: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    hasher.finish()
}

/// Turns delivery bodies into control commands
#[derive(Debug)]
pub struct DeliveryProcessor {
    consumer: String,
    router: ControlRouter,
    retries: Mutex<RetryTracker>,
    counters: Arc<BrokerCounters>,
}

impl DeliveryProcessor {
    pub fn new(
        consumer: impl Into<String>,
        router: ControlRouter,
        retries: RetryTracker,
        counters: Arc<BrokerCounters>,
    ) -> Self {
        Self {
            consumer: consumer.into(),
            router,
            retries: Mutex::new(retries),
            counters,
        }
    }

    /// Decode and dispatch one delivery body
    pub fn process(&self, body: &[u8]) -> ConsumerOutcome {
        match self.router.handle_json(body) {
            Ok(command) => {
                tracing::debug!(
                    consumer = %self.consumer,
                    command = command.kind(),
                    "Control message from broker"
                );
                self.retries
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record_success(body);
                self.counters.record_acknowledged();
                ConsumerOutcome::Acknowledge
            }
            Err(e) if e.is_unroutable() => {
                tracing::warn!(
                    consumer = %self.consumer,
                    error = %e,
                    "Ignoring broker message with no command"
                );
                self.counters.record_acknowledged();
                ConsumerOutcome::Acknowledge
            }
            Err(e) => {
                let outcome = self
                    .retries
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record_failure(body);

                match outcome {
                    ConsumerOutcome::DeadLetter => {
                        tracing::error!(
                            consumer = %self.consumer,
                            error = %e,
                            "Broker message failed repeatedly, dead-lettering"
                        );
                        self.counters.record_dead_lettered();
                    }
                    _ => {
                        tracing::warn!(
                            consumer = %self.consumer,
                            error = %e,
                            "Failed to process broker message, requeueing"
                        );
                        self.counters.record_requeued();
                    }
                }
                outcome
            }
        }
    }
}
