//! Channel entry and subscriber handle types
//!
//! This module defines the per-channel state stored in the registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::{self, error::TrySendError};

use super::frame::BroadcastFrame;

/// Sending side of one subscriber connection
///
/// The handle is open for as long as the connection's writer holds the
/// matching receiver.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    id: u64,
    tx: mpsc::Sender<BroadcastFrame>,
}

impl SubscriberHandle {
    /// Create a handle and the receiver its connection drains
    pub fn new(id: u64, capacity: usize) -> (Self, mpsc::Receiver<BroadcastFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { id, tx }, rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the connection is still draining frames
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Result of a single non-blocking send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SendOutcome {
    Delivered,
    /// Subscriber queue full, frame dropped for this subscriber only
    Dropped,
    /// Connection gone, handle should be pruned
    Closed,
}

/// Entry for a single channel in the registry
#[derive(Debug, Default)]
pub struct ChannelEntry {
    /// Current subscribers keyed by id
    pub(super) subscribers: HashMap<u64, SubscriberHandle>,

    /// Number of broadcast calls
    pub(super) broadcasts: AtomicU64,

    /// Frames handed to subscriber queues
    pub(super) deliveries: AtomicU64,

    /// Frames dropped because a subscriber queue was full
    pub(super) dropped: AtomicU64,

    /// Handles removed because their connection had closed
    pub(super) pruned: AtomicU64,
}

impl ChannelEntry {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Get the number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Try to hand a frame to one subscriber without waiting
    pub(super) fn try_send(handle: &SubscriberHandle, frame: BroadcastFrame) -> SendOutcome {
        match handle.tx.try_send(frame) {
            Ok(()) => SendOutcome::Delivered,
            Err(TrySendError::Full(_)) => SendOutcome::Dropped,
            Err(TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }

    pub(super) fn record(&self, delivered: u64, dropped: u64, pruned: u64) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered, Ordering::Relaxed);
        self.dropped.fetch_add(dropped, Ordering::Relaxed);
        self.pruned.fetch_add(pruned, Ordering::Relaxed);
    }

    pub(super) fn stats(&self) -> ChannelStats {
        ChannelStats {
            subscriber_count: self.subscriber_count(),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
        }
    }
}

/// Statistics for a channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Number of active subscribers
    pub subscriber_count: usize,
    /// Broadcast calls that reached at least the subscriber set
    pub broadcasts: u64,
    /// Frames queued to subscribers
    pub deliveries: u64,
    /// Frames dropped for slow subscribers
    pub dropped: u64,
    /// Closed handles removed during broadcast
    pub pruned: u64,
}
