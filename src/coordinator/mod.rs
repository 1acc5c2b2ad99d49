//! Stream coordinator
//!
//! Drains engine output and turns it into broadcast traffic:
//!
//! ```text
//! EngineEvent::Video    ─► RGB565→RGB24 ─► encode_video ─► /video
//! EngineEvent::Audio    ─────────────────► encode_audio ─► /audio
//! EngineEvent::RomLoaded ─► load quicksave ─► start execution ─► /rom-loaded
//! ```
//!
//! Encoding is skipped entirely while a channel has no subscribers.

pub mod config;

use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::{Engine, EngineEvent, FrameInfo};
use crate::media::{AudioFrame, VideoFrame};
use crate::protocol::codec;
use crate::registry::{BroadcastFrame, Channel, ChannelRegistry};
use crate::stats::{StreamCounters, StreamStats};

pub use config::CoordinatorConfig;

/// Wires engine output to the channel registry
pub struct StreamCoordinator {
    registry: Arc<ChannelRegistry>,
    engine: Arc<dyn Engine>,
    config: CoordinatorConfig,
    counters: StreamCounters,
    /// Geometry of the last video event, watched or not
    frame_info: RwLock<FrameInfo>,
}

impl StreamCoordinator {
    pub fn new(
        registry: Arc<ChannelRegistry>,
        engine: Arc<dyn Engine>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            registry,
            engine,
            config,
            counters: StreamCounters::new(),
            frame_info: RwLock::new(FrameInfo::default()),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn stats(&self) -> StreamStats {
        self.counters.snapshot()
    }

    /// Last known output geometry
    pub fn frame_info(&self) -> FrameInfo {
        *self.frame_info.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle a rendered RGB565 frame; returns the number of deliveries
    pub async fn on_video(&self, buffer: &[u8], width: u32, height: u32, stride: u32) -> usize {
        if !self.registry.has_subscribers(Channel::Video).await {
            self.counters.record_skipped_video();
            return 0;
        }

        let frame = VideoFrame::from_rgb565(buffer, width, height, stride);
        let encoded = codec::encode_video(&frame);
        self.counters.record_video();

        self.registry
            .broadcast(Channel::Video, BroadcastFrame::binary(encoded))
            .await
    }

    /// Handle a block of PCM; returns the number of deliveries
    pub async fn on_audio(&self, buffer: Bytes, samples: u32) -> usize {
        if !self.registry.has_subscribers(Channel::Audio).await {
            self.counters.record_skipped_audio();
            return 0;
        }

        let encoded = codec::encode_audio(&AudioFrame::new(samples, buffer));
        self.counters.record_audio();

        self.registry
            .broadcast(Channel::Audio, BroadcastFrame::binary(encoded))
            .await
    }

    /// Restore the quicksave, start the frame loop and notify viewers
    pub async fn on_rom_loaded(&self) -> usize {
        let quicksave = &self.config.quicksave_path;
        tracing::info!(quicksave = %quicksave.display(), "ROM loaded, restoring quicksave");

        if self.engine.load_state_from_file(quicksave) {
            tracing::info!("Quicksave loaded");
        } else {
            tracing::info!("No quicksave found or failed to load, starting fresh");
        }

        tracing::info!("Starting continuous execution");
        self.engine.start_continuous_execution();
        self.counters.record_rom_loaded();

        self.registry
            .broadcast(
                Channel::RomLoaded,
                BroadcastFrame::text(codec::rom_loaded_notification()),
            )
            .await
    }

    /// Dispatch one engine event
    pub async fn handle_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::Video {
                buffer,
                width,
                height,
                stride,
                frame_rate,
            } => {
                *self.frame_info.write().unwrap_or_else(PoisonError::into_inner) = FrameInfo {
                    width,
                    height,
                    frame_rate,
                };
                let delivered = self.on_video(&buffer, width, height, stride).await;
                tracing::trace!(width, height, frame_rate, delivered, "Video frame");
            }
            EngineEvent::Audio { buffer, samples } => {
                let delivered = self.on_audio(buffer, samples).await;
                tracing::trace!(samples, delivered, "Audio block");
            }
            EngineEvent::RomLoaded => {
                let notified = self.on_rom_loaded().await;
                tracing::debug!(notified, "Rom-loaded notification sent");
            }
        }
    }

    /// Drain engine events until every sender is dropped
    pub async fn run(&self, mut events: mpsc::Receiver<EngineEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        tracing::info!("Engine event stream closed");
    }

    /// Spawn the event loop as a background task
    pub fn spawn(self: &Arc<Self>, events: mpsc::Receiver<EngineEvent>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move { coordinator.run(events).await })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::engine::event_channel;
    use crate::engine::testing::{Call, RecordingEngine};
    use crate::protocol::{decode_audio, decode_video};
    use crate::registry::RegistryConfig;

    fn setup() -> (Arc<StreamCoordinator>, Arc<ChannelRegistry>, Arc<RecordingEngine>) {
        let registry = Arc::new(ChannelRegistry::new());
        let engine = Arc::new(RecordingEngine::new());
        let coordinator = Arc::new(StreamCoordinator::new(
            registry.clone(),
            engine.clone(),
            CoordinatorConfig::default().quicksave_path("saves/quick.sav"),
        ));
        (coordinator, registry, engine)
    }

    #[tokio::test]
    async fn test_video_skipped_without_subscribers() {
        let (coordinator, _registry, _engine) = setup();

        assert_eq!(coordinator.on_video(&[0; 8], 2, 2, 4).await, 0);

        let stats = coordinator.stats();
        assert_eq!(stats.skipped_video, 1);
        assert_eq!(stats.video_frames, 0);
    }

    #[tokio::test]
    async fn test_video_converted_and_broadcast() {
        let (coordinator, registry, _engine) = setup();
        let (handle, mut rx) = registry.new_subscriber();
        registry.subscribe(Channel::Video, handle).await;

        // 1x2 frame with a padded stride of 4 bytes
        let buffer = [0x00, 0xF8, 0xAA, 0xAA, 0x1F, 0x00, 0xAA, 0xAA];
        assert_eq!(coordinator.on_video(&buffer, 1, 2, 4).await, 1);

        let frame = rx.recv().await.unwrap();
        assert!(frame.is_binary());

        let decoded = decode_video(frame.data).unwrap();
        assert_eq!((decoded.width, decoded.height), (1, 2));
        assert_eq!(&decoded.rgb24[..], &[248, 0, 0, 0, 0, 248]);
    }

    #[tokio::test]
    async fn test_audio_broadcast() {
        let (coordinator, registry, _engine) = setup();
        let (handle, mut rx) = registry.new_subscriber();
        registry.subscribe(Channel::Audio, handle).await;

        let pcm = Bytes::from_static(&[1, 0, 2, 0, 3, 0, 4, 0]);
        assert_eq!(coordinator.on_audio(pcm.clone(), 2).await, 1);

        let decoded = decode_audio(rx.recv().await.unwrap().data).unwrap();
        assert_eq!(decoded.samples, 2);
        assert_eq!(decoded.pcm, pcm);
        assert_eq!(coordinator.stats().audio_blocks, 1);
    }

    #[tokio::test]
    async fn test_audio_skipped_without_subscribers() {
        let (coordinator, _registry, _engine) = setup();

        assert_eq!(coordinator.on_audio(Bytes::from_static(&[0; 8]), 2).await, 0);

        let stats = coordinator.stats();
        assert_eq!(stats.skipped_audio, 1);
        assert_eq!(stats.audio_blocks, 0);
    }

    #[tokio::test]
    async fn test_slow_video_subscriber_drops_frames() {
        let registry = Arc::new(ChannelRegistry::with_config(
            RegistryConfig::default().subscriber_queue_capacity(1),
        ));
        let coordinator = StreamCoordinator::new(
            registry.clone(),
            Arc::new(RecordingEngine::new()),
            CoordinatorConfig::default(),
        );

        // Never read, so the queue fills after one frame
        let (handle, _rx) = registry.new_subscriber();
        registry.subscribe(Channel::Video, handle).await;

        let buffer = [0u8; 8];
        assert_eq!(coordinator.on_video(&buffer, 2, 2, 4).await, 1);
        assert_eq!(coordinator.on_video(&buffer, 2, 2, 4).await, 0);
        assert_eq!(coordinator.on_video(&buffer, 2, 2, 4).await, 0);

        // Encoded every time; the full queue only costs this subscriber
        assert_eq!(coordinator.stats().video_frames, 3);
        let stats = registry.channel_stats(Channel::Video).await;
        assert_eq!(stats.dropped, 2);
        assert_eq!(registry.subscriber_count(Channel::Video).await, 1);
    }

    #[tokio::test]
    async fn test_rom_loaded_sequence() {
        let (coordinator, registry, engine) = setup();
        let (handle, mut rx) = registry.new_subscriber();
        registry.subscribe(Channel::RomLoaded, handle).await;

        // Missing quicksave is not an error
        assert_eq!(coordinator.on_rom_loaded().await, 1);

        assert_eq!(
            engine.calls(),
            vec![
                Call::LoadStateFromFile(PathBuf::from("saves/quick.sav")),
                Call::StartContinuousExecution,
            ]
        );

        let frame = rx.recv().await.unwrap();
        assert!(!frame.is_binary());
        assert_eq!(&frame.data[..], br#"{"type":"romLoaded"}"#);
    }

    #[tokio::test]
    async fn test_rom_loaded_with_quicksave() {
        let (coordinator, _registry, engine) = setup();
        engine.quicksave_present.store(true, Ordering::SeqCst);

        coordinator.on_rom_loaded().await;
        assert_eq!(engine.calls().len(), 2);
        assert_eq!(coordinator.stats().rom_loads, 1);
    }

    #[tokio::test]
    async fn test_run_drains_events() {
        let (coordinator, registry, engine) = setup();
        let (handle, mut rx) = registry.new_subscriber();
        registry.subscribe(Channel::Audio, handle).await;

        let (sender, events) = event_channel(8);
        let task = coordinator.spawn(events);

        sender.audio(Bytes::from_static(&[0; 4]), 1);
        sender.rom_loaded();
        drop(sender);

        task.await.unwrap();

        assert!(rx.recv().await.is_some());
        assert_eq!(engine.calls().last(), Some(&Call::StartContinuousExecution));
    }

    #[tokio::test]
    async fn test_video_event_updates_frame_info() {
        let (coordinator, _registry, _engine) = setup();
        assert_eq!(coordinator.frame_info(), FrameInfo::default());

        coordinator
            .handle_event(EngineEvent::Video {
                buffer: Bytes::from_static(&[0; 16]),
                width: 4,
                height: 2,
                stride: 8,
                frame_rate: 50.0,
            })
            .await;

        // Recorded even though nobody was watching
        assert_eq!(
            coordinator.frame_info(),
            FrameInfo {
                width: 4,
                height: 2,
                frame_rate: 50.0
            }
        );
        assert_eq!(coordinator.stats().skipped_video, 1);
    }
}
