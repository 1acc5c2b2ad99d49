//! Engine output events
//!
//! The engine thread pushes output onto a bounded queue instead of calling
//! back into the relay. Sending never blocks: if the coordinator falls
//! behind, frames are dropped at the source.

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

/// One unit of engine output
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A rendered RGB565 frame
    Video {
        /// Raw framebuffer, little-endian RGB565
        buffer: Bytes,
        width: u32,
        height: u32,
        /// Source row length in bytes
        stride: u32,
        frame_rate: f64,
    },
    /// A block of interleaved stereo PCM
    Audio {
        /// Interleaved i16 little-endian samples
        buffer: Bytes,
        /// Number of stereo sample pairs
        samples: u32,
    },
    /// A ROM finished loading
    RomLoaded,
}

impl EngineEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::Video { .. } => "video",
            EngineEvent::Audio { .. } => "audio",
            EngineEvent::RomLoaded => "rom_loaded",
        }
    }
}

/// Create the engine event queue
pub fn event_channel(capacity: usize) -> (EngineEventSender, mpsc::Receiver<EngineEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EngineEventSender { tx }, rx)
}

/// Engine-thread side of the event queue
///
/// Safe to use from any thread, including ones outside the tokio runtime.
#[derive(Debug, Clone)]
pub struct EngineEventSender {
    tx: mpsc::Sender<EngineEvent>,
}

impl EngineEventSender {
    /// Queue a video frame
    pub fn video(
        &self,
        buffer: Bytes,
        width: u32,
        height: u32,
        stride: u32,
        frame_rate: f64,
    ) -> bool {
        self.send(EngineEvent::Video {
            buffer,
            width,
            height,
            stride,
            frame_rate,
        })
    }

    /// Queue an audio block
    pub fn audio(&self, buffer: Bytes, samples: u32) -> bool {
        self.send(EngineEvent::Audio { buffer, samples })
    }

    /// Signal that a ROM has loaded
    pub fn rom_loaded(&self) -> bool {
        self.send(EngineEvent::RomLoaded)
    }

    /// Queue an event without blocking; returns false if it was dropped
    pub fn send(&self, event: EngineEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                if matches!(event, EngineEvent::RomLoaded) {
                    tracing::warn!("Engine event queue full, rom-loaded event dropped");
                } else {
                    tracing::trace!(kind = event.kind(), "Engine event queue full, frame dropped");
                }
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the coordinator is still draining events
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let (tx, mut rx) = event_channel(1);

        assert!(tx.audio(Bytes::from_static(&[0; 4]), 1));
        assert!(!tx.audio(Bytes::from_static(&[0; 4]), 1));

        assert!(matches!(rx.try_recv(), Ok(EngineEvent::Audio { samples: 1, .. })));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = event_channel(4);
        drop(rx);

        assert!(tx.is_closed());
        assert!(!tx.rom_loaded());
    }

    #[test]
    fn test_send_from_plain_thread() {
        let (tx, mut rx) = event_channel(4);

        std::thread::spawn(move || {
            tx.video(Bytes::from_static(&[0; 8]), 2, 2, 4, 60.0);
        })
        .join()
        .unwrap();

        match rx.try_recv() {
            Ok(EngineEvent::Video { width, height, stride, .. }) => {
                assert_eq!((width, height, stride), (2, 2, 4));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_events_drain_in_send_order() {
        let (tx, mut rx) = event_channel(4);

        assert!(tx.rom_loaded());
        assert!(tx.audio(Bytes::from_static(&[0; 8]), 2));
        drop(tx);

        assert!(matches!(tokio_test::block_on(rx.recv()), Some(EngineEvent::RomLoaded)));
        assert!(matches!(
            tokio_test::block_on(rx.recv()),
            Some(EngineEvent::Audio { samples: 2, .. })
        ));
        assert!(tokio_test::block_on(rx.recv()).is_none());
    }
}
