//! Statistics for the relay pipeline

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by the stream coordinator
#[derive(Debug, Default)]
pub struct StreamCounters {
    video_frames: AtomicU64,
    audio_blocks: AtomicU64,
    skipped_video: AtomicU64,
    skipped_audio: AtomicU64,
    rom_loads: AtomicU64,
}

impl StreamCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_video(&self) {
        self.video_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_audio(&self) {
        self.audio_blocks.fetch_add(1, Ordering::Relaxed);
    }

    /// A video frame arrived with nobody watching
    pub fn record_skipped_video(&self) {
        self.skipped_video.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_audio(&self) {
        self.skipped_audio.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rom_loaded(&self) {
        self.rom_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StreamStats {
        StreamStats {
            video_frames: self.video_frames.load(Ordering::Relaxed),
            audio_blocks: self.audio_blocks.load(Ordering::Relaxed),
            skipped_video: self.skipped_video.load(Ordering::Relaxed),
            skipped_audio: self.skipped_audio.load(Ordering::Relaxed),
            rom_loads: self.rom_loads.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time stream statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Video frames encoded and broadcast
    pub video_frames: u64,
    /// Audio blocks encoded and broadcast
    pub audio_blocks: u64,
    /// Video frames skipped (no subscribers)
    pub skipped_video: u64,
    /// Audio blocks skipped (no subscribers)
    pub skipped_audio: u64,
    /// Rom-loaded events handled
    pub rom_loads: u64,
}

impl StreamStats {
    /// Fraction of video frames that were actually encoded
    pub fn video_utilization(&self) -> f64 {
        let total = self.video_frames + self.skipped_video;
        if total > 0 {
            self.video_frames as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Counters kept by the broker bridge
#[derive(Debug, Default)]
pub struct BrokerCounters {
    acknowledged: AtomicU64,
    requeued: AtomicU64,
    dead_lettered: AtomicU64,
}

impl BrokerCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_acknowledged(&self) {
        self.acknowledged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_requeued(&self) {
        self.requeued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dead_lettered(&self) {
        self.dead_lettered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BrokerStats {
        BrokerStats {
            acknowledged: self.acknowledged.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time broker statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerStats {
    pub acknowledged: u64,
    pub requeued: u64,
    pub dead_lettered: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_counters() {
        let counters = StreamCounters::new();
        counters.record_video();
        counters.record_skipped_video();
        counters.record_skipped_video();
        counters.record_skipped_video();
        counters.record_audio();

        let stats = counters.snapshot();
        assert_eq!(stats.video_frames, 1);
        assert_eq!(stats.skipped_video, 3);
        assert_eq!(stats.audio_blocks, 1);
        assert!((stats.video_utilization() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_utilization_without_frames() {
        assert_eq!(StreamStats::default().video_utilization(), 0.0);
    }

    #[test]
    fn test_broker_counters() {
        let counters = BrokerCounters::new();
        counters.record_acknowledged();
        counters.record_requeued();
        counters.record_requeued();
        counters.record_dead_lettered();

        assert_eq!(
            counters.snapshot(),
            BrokerStats {
                acknowledged: 1,
                requeued: 2,
                dead_lettered: 1
            }
        );
    }
}
