//! Emulation engine boundary
//!
//! The engine itself lives outside this crate. The relay talks to it through
//! the [`Engine`] trait and receives its output as [`EngineEvent`] messages,
//! so engine-thread timing never couples to subscriber I/O.
//!
//! ```text
//!  engine thread                         tokio runtime
//! ┌──────────────┐  EngineEventSender  ┌──────────────────┐
//! │ frame loop   │ ───── try_send ───► │ StreamCoordinator │ ──► registry
//! └──────────────┘                     └──────────────────┘
//!        ▲
//!        └──── Engine::set_button_state() ◄── ControlRouter
//! ```

pub mod event;

use std::path::Path;

use serde::Serialize;

pub use event::{event_channel, EngineEvent, EngineEventSender};

/// Current output geometry of the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
}

impl Default for FrameInfo {
    fn default() -> Self {
        // SNES NTSC output
        Self {
            width: 256,
            height: 224,
            frame_rate: 60.0,
        }
    }
}

/// Commands and queries the relay issues to the emulation engine
///
/// Implementations serialize command application internally; every method
/// may be called concurrently from either control ingress path.
pub trait Engine: Send + Sync + 'static {
    /// Load a ROM image; the engine emits [`EngineEvent::RomLoaded`] on success
    fn load_rom(&self, path: &Path) -> bool;

    fn is_rom_loaded(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Geometry of the most recent frame
    fn frame_info(&self) -> FrameInfo;

    /// Replace the joypad state of a port
    fn set_button_state(&self, port: u32, buttons: u16);

    fn set_pointer_position(&self, port: u32, x: i32, y: i32);

    fn set_pointer_buttons(&self, port: u32, left: bool, right: bool);

    fn reset(&self);

    fn set_paused(&self, paused: bool);

    fn save_state(&self, slot: u32) -> bool;

    fn load_state(&self, slot: u32) -> bool;

    fn save_state_to_file(&self, path: &Path) -> bool;

    fn load_state_from_file(&self, path: &Path) -> bool;

    /// Start the engine's own frame loop
    fn start_continuous_execution(&self);

    fn stop_continuous_execution(&self);
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording engine used across the crate's tests

    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::{Engine, FrameInfo};

    /// One observed engine call
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        LoadRom(PathBuf),
        SetButtonState(u32, u16),
        SetPointerPosition(u32, i32, i32),
        SetPointerButtons(u32, bool, bool),
        Reset,
        SetPaused(bool),
        SaveState(u32),
        LoadState(u32),
        SaveStateToFile(PathBuf),
        LoadStateFromFile(PathBuf),
        StartContinuousExecution,
        StopContinuousExecution,
    }

    #[derive(Debug, Default)]
    pub struct RecordingEngine {
        calls: Mutex<Vec<Call>>,
        rom_loaded: AtomicBool,
        paused: AtomicBool,
        /// Result of `load_state_from_file`
        pub quicksave_present: AtomicBool,
    }

    impl RecordingEngine {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn push(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl Engine for RecordingEngine {
        fn load_rom(&self, path: &Path) -> bool {
            self.push(Call::LoadRom(path.to_path_buf()));
            self.rom_loaded.store(true, Ordering::SeqCst);
            true
        }

        fn is_rom_loaded(&self) -> bool {
            self.rom_loaded.load(Ordering::SeqCst)
        }

        fn is_paused(&self) -> bool {
            self.paused.load(Ordering::SeqCst)
        }

        fn frame_info(&self) -> FrameInfo {
            FrameInfo::default()
        }

        fn set_button_state(&self, port: u32, buttons: u16) {
            self.push(Call::SetButtonState(port, buttons));
        }

        fn set_pointer_position(&self, port: u32, x: i32, y: i32) {
            self.push(Call::SetPointerPosition(port, x, y));
        }

        fn set_pointer_buttons(&self, port: u32, left: bool, right: bool) {
            self.push(Call::SetPointerButtons(port, left, right));
        }

        fn reset(&self) {
            self.push(Call::Reset);
        }

        fn set_paused(&self, paused: bool) {
            self.paused.store(paused, Ordering::SeqCst);
            self.push(Call::SetPaused(paused));
        }

        fn save_state(&self, slot: u32) -> bool {
            self.push(Call::SaveState(slot));
            self.is_rom_loaded()
        }

        fn load_state(&self, slot: u32) -> bool {
            self.push(Call::LoadState(slot));
            self.is_rom_loaded()
        }

        fn save_state_to_file(&self, path: &Path) -> bool {
            self.push(Call::SaveStateToFile(path.to_path_buf()));
            self.is_rom_loaded()
        }

        fn load_state_from_file(&self, path: &Path) -> bool {
            self.push(Call::LoadStateFromFile(path.to_path_buf()));
            self.quicksave_present.load(Ordering::SeqCst)
        }

        fn start_continuous_execution(&self) {
            self.push(Call::StartContinuousExecution);
        }

        fn stop_continuous_execution(&self) {
            self.push(Call::StopContinuousExecution);
        }
    }
}
