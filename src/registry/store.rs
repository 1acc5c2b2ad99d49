//! Channel registry implementation
//!
//! The central registry that tracks every subscriber connection and fans
//! encoded frames out to them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, RwLock};

use super::channel::Channel;
use super::config::RegistryConfig;
use super::entry::{ChannelEntry, ChannelStats, SendOutcome, SubscriberHandle};
use super::frame::BroadcastFrame;

/// Central registry for all relay channels
///
/// Every channel in [`Channel::ALL`] is created up front and lives as long
/// as the registry. Each channel's subscriber set sits behind its own
/// `RwLock`, so a disconnect on `/audio` never contends with a video
/// broadcast. Broadcast takes the write lock: sends are non-blocking, and
/// holding it keeps per-subscriber delivery in call order.
pub struct ChannelRegistry {
    /// Per-channel subscriber sets
    channels: HashMap<Channel, RwLock<ChannelEntry>>,

    /// Subscriber id allocator
    next_subscriber_id: AtomicU64,

    /// Configuration
    config: RegistryConfig,
}

impl ChannelRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        let channels = Channel::ALL
            .into_iter()
            .map(|channel| (channel, RwLock::new(ChannelEntry::new())))
            .collect();

        Self {
            channels,
            next_subscriber_id: AtomicU64::new(1),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Allocate a fresh subscriber handle and the receiver its connection drains
    pub fn new_subscriber(&self) -> (SubscriberHandle, mpsc::Receiver<BroadcastFrame>) {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        SubscriberHandle::new(id, self.config.subscriber_queue_capacity)
    }

    /// Add a subscriber to a channel
    pub async fn subscribe(&self, channel: Channel, handle: SubscriberHandle) {
        let Some(entry) = self.channels.get(&channel) else {
            return;
        };
        let mut entry = entry.write().await;
        let id = handle.id();
        entry.subscribers.insert(id, handle);

        tracing::info!(
            channel = %channel,
            subscriber = id,
            subscribers = entry.subscriber_count(),
            "Subscriber added"
        );
    }

    /// Add a subscriber to the channel named by a request path
    ///
    /// Unknown paths subscribe nowhere and return `None`; the caller keeps
    /// the connection but it will never receive broadcast traffic.
    pub async fn subscribe_path(&self, path: &str, handle: SubscriberHandle) -> Option<Channel> {
        match Channel::from_path(path) {
            Some(channel) => {
                self.subscribe(channel, handle).await;
                Some(channel)
            }
            None => {
                tracing::debug!(path = path, subscriber = handle.id(), "No channel for path");
                None
            }
        }
    }

    /// Remove a subscriber from a channel
    ///
    /// Safe to call more than once, or for a handle that never subscribed.
    pub async fn unsubscribe(&self, channel: Channel, subscriber_id: u64) {
        let Some(entry) = self.channels.get(&channel) else {
            return;
        };
        let mut entry = entry.write().await;

        if entry.subscribers.remove(&subscriber_id).is_some() {
            tracing::debug!(
                channel = %channel,
                subscriber = subscriber_id,
                subscribers = entry.subscriber_count(),
                "Subscriber removed"
            );
        }
    }

    /// Broadcast a frame to every open subscriber of a channel
    ///
    /// Each send is independent: a full subscriber queue drops this frame
    /// for that subscriber only, and a closed handle is skipped and pruned.
    /// Returns the number of subscribers the frame was queued to.
    pub async fn broadcast(&self, channel: Channel, frame: BroadcastFrame) -> usize {
        let Some(entry) = self.channels.get(&channel) else {
            return 0;
        };
        let mut entry = entry.write().await;

        if entry.subscribers.is_empty() {
            return 0;
        }

        let mut delivered = 0usize;
        let mut dropped = 0u64;
        let mut closed = Vec::new();

        for (id, handle) in entry.subscribers.iter() {
            match ChannelEntry::try_send(handle, frame.clone()) {
                SendOutcome::Delivered => delivered += 1,
                SendOutcome::Dropped => {
                    dropped += 1;
                    tracing::trace!(
                        channel = %channel,
                        subscriber = id,
                        "Subscriber lagging, frame dropped"
                    );
                }
                SendOutcome::Closed => closed.push(*id),
            }
        }

        for id in &closed {
            entry.subscribers.remove(id);
            tracing::debug!(channel = %channel, subscriber = id, "Pruned closed subscriber");
        }

        entry.record(delivered as u64, dropped, closed.len() as u64);
        delivered
    }

    /// Number of subscribers on a channel
    pub async fn subscriber_count(&self, channel: Channel) -> usize {
        match self.channels.get(&channel) {
            Some(entry) => entry.read().await.subscriber_count(),
            None => 0,
        }
    }

    /// Cheap check used to skip encoding work for empty channels
    pub async fn has_subscribers(&self, channel: Channel) -> bool {
        self.subscriber_count(channel).await > 0
    }

    /// Get channel statistics
    pub async fn channel_stats(&self, channel: Channel) -> ChannelStats {
        match self.channels.get(&channel) {
            Some(entry) => entry.read().await.stats(),
            None => ChannelStats::default(),
        }
    }

    /// Total subscribers across all channels
    pub async fn total_subscribers(&self) -> usize {
        let mut total = 0;
        for entry in self.channels.values() {
            total += entry.read().await.subscriber_count();
        }
        total
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
