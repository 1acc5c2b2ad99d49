//! Control command routing
//!
//! The router is the single point where control commands from every ingress
//! path reach the engine. It holds no state beyond the engine reference.

use std::sync::Arc;

use crate::engine::Engine;
use crate::error::ControlDecodeError;
use crate::protocol::ControlCommand;

/// Translates control commands into engine calls
#[derive(Clone)]
pub struct ControlRouter {
    engine: Arc<dyn Engine>,
}

impl ControlRouter {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Apply one command to the engine
    pub fn dispatch(&self, command: ControlCommand) {
        match command {
            ControlCommand::Input { port, button_mask } => {
                self.engine.set_button_state(port, button_mask);
            }
            ControlCommand::Pointer {
                port,
                x,
                y,
                left,
                right,
            } => {
                self.engine.set_pointer_position(port, x, y);
                if left.is_some() || right.is_some() {
                    self.engine.set_pointer_buttons(
                        port,
                        left.unwrap_or(false),
                        right.unwrap_or(false),
                    );
                }
            }
            ControlCommand::Reset => self.engine.reset(),
            ControlCommand::Pause { paused } => self.engine.set_paused(paused),
        }
    }

    /// Decode a text message and dispatch it
    pub fn handle_text(&self, text: &str) -> Result<ControlCommand, ControlDecodeError> {
        let command = ControlCommand::from_json_str(text)?;
        self.dispatch(command);
        Ok(command)
    }

    /// Decode a raw JSON body and dispatch it
    pub fn handle_json(&self, body: &[u8]) -> Result<ControlCommand, ControlDecodeError> {
        let command = ControlCommand::from_json_slice(body)?;
        self.dispatch(command);
        Ok(command)
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }
}

impl std::fmt::Debug for ControlRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlRouter").finish_non_exhaustive()
    }
}
