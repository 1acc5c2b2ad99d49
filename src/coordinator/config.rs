//! Stream coordinator configuration

use std::path::PathBuf;

/// Default quicksave file, restored whenever a ROM loads
pub const DEFAULT_QUICKSAVE_FILE: &str = "quicksave.sav";

/// Configuration for the stream coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Quicksave restored after each ROM load
    pub quicksave_path: PathBuf,

    /// Capacity of the engine event queue
    ///
    /// A few frames of slack; beyond that the engine drops output rather
    /// than building latency.
    pub event_queue_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            quicksave_path: PathBuf::from(DEFAULT_QUICKSAVE_FILE),
            event_queue_capacity: 16,
        }
    }
}

impl CoordinatorConfig {
    /// Set the quicksave path
    pub fn quicksave_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.quicksave_path = path.into();
        self
    }

    /// Set the engine event queue capacity
    pub fn event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = capacity.max(1);
        self
    }
}
