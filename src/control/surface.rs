//! Synchronous status and command surface
//!
//! HTTP handlers (outside this crate) call these functions directly. Every
//! method is synchronous and safe to repeat.
//!
//! Save and load commands report `false` without touching the engine until
//! a ROM is loaded. Engines are not required to handle state operations
//! with nothing running.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::engine::{Engine, FrameInfo};

/// Environment variable that enables administrative actions
pub const ADMIN_ENABLED_ENV: &str = "ADMIN_ENABLED";

/// Snapshot of the engine as reported to status queries
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStatus {
    pub rom_loaded: bool,
    pub paused: bool,
    pub frame_info: FrameInfo,
}

/// Status queries and administrative commands
#[derive(Clone)]
pub struct ControlSurface {
    engine: Arc<dyn Engine>,
    quicksave_path: PathBuf,
    admin_enabled: bool,
}

impl ControlSurface {
    pub fn new(engine: Arc<dyn Engine>, quicksave_path: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            quicksave_path: quicksave_path.into(),
            admin_enabled: false,
        }
    }

    /// Surface with the admin flag taken from `ADMIN_ENABLED`
    pub fn from_env(engine: Arc<dyn Engine>, quicksave_path: impl Into<PathBuf>) -> Self {
        let enabled = std::env::var(ADMIN_ENABLED_ENV)
            .map(|v| is_enabled(&v))
            .unwrap_or(false);
        Self::new(engine, quicksave_path).with_admin_enabled(enabled)
    }

    /// Enable or disable administrative actions for the UI
    pub fn with_admin_enabled(mut self, enabled: bool) -> Self {
        self.admin_enabled = enabled;
        self
    }

    pub fn status(&self) -> RelayStatus {
        RelayStatus {
            rom_loaded: self.engine.is_rom_loaded(),
            paused: self.engine.is_paused(),
            frame_info: self.engine.frame_info(),
        }
    }

    pub fn admin_enabled(&self) -> bool {
        self.admin_enabled
    }

    /// Load a ROM; on success the engine emits a rom-loaded event
    pub fn load_rom(&self, path: &Path) -> Option<FrameInfo> {
        if self.engine.load_rom(path) {
            tracing::info!(rom = %path.display(), "ROM loaded");
            Some(self.engine.frame_info())
        } else {
            tracing::error!(rom = %path.display(), "Failed to load ROM");
            None
        }
    }

    pub fn reset(&self) {
        self.engine.reset();
    }

    /// Set the paused state, defaulting to paused; returns the engine's new state
    pub fn set_paused(&self, paused: Option<bool>) -> bool {
        self.engine.set_paused(paused.unwrap_or(true));
        self.engine.is_paused()
    }

    pub fn save_state(&self, slot: u32) -> bool {
        self.engine.is_rom_loaded() && self.engine.save_state(slot)
    }

    pub fn load_state(&self, slot: u32) -> bool {
        self.engine.is_rom_loaded() && self.engine.load_state(slot)
    }

    /// Save to the well-known quicksave file
    pub fn save_quicksave(&self) -> bool {
        self.engine.is_rom_loaded() && self.engine.save_state_to_file(&self.quicksave_path)
    }

    /// Restore from the well-known quicksave file
    pub fn load_quicksave(&self) -> bool {
        self.engine.is_rom_loaded() && self.engine.load_state_from_file(&self.quicksave_path)
    }

    pub fn quicksave_path(&self) -> &Path {
        &self.quicksave_path
    }
}

fn is_enabled(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{Call, RecordingEngine};

    fn surface() -> (ControlSurface, Arc<RecordingEngine>) {
        let engine = Arc::new(RecordingEngine::new());
        (ControlSurface::new(engine.clone(), "quicksave.sav"), engine)
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let (surface, _engine) = surface();
        let json = serde_json::to_value(surface.status()).unwrap();

        assert_eq!(json["romLoaded"], false);
        assert_eq!(json["paused"], false);
        assert_eq!(json["frameInfo"]["width"], 256);
        assert_eq!(json["frameInfo"]["frameRate"], 60.0);
    }

    #[test]
    fn test_pause_defaults_to_true() {
        let (surface, engine) = surface();

        assert!(surface.set_paused(None));
        assert!(!surface.set_paused(Some(false)));
        assert_eq!(
            engine.calls(),
            vec![Call::SetPaused(true), Call::SetPaused(false)]
        );
    }

    #[test]
    fn test_state_commands_require_rom() {
        let (surface, engine) = surface();

        assert!(!surface.save_state(1));
        assert!(!surface.save_quicksave());
        assert!(engine.calls().is_empty());

        assert!(surface.load_rom(Path::new("game.sfc")).is_some());
        assert!(surface.save_state(1));
        assert!(surface.save_quicksave());
        assert_eq!(
            engine.calls(),
            vec![
                Call::LoadRom(PathBuf::from("game.sfc")),
                Call::SaveState(1),
                Call::SaveStateToFile(PathBuf::from("quicksave.sav"))
            ]
        );
    }

    #[test]
    fn test_admin_flag() {
        let (surface, _engine) = surface();
        assert!(!surface.admin_enabled());
        assert!(surface.with_admin_enabled(true).admin_enabled());
    }

    #[test]
    fn test_admin_env_values() {
        assert!(is_enabled("true"));
        assert!(is_enabled("TRUE"));
        assert!(is_enabled("1"));
        assert!(!is_enabled("yes"));
        assert!(!is_enabled(""));
    }
}
