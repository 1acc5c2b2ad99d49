//! Wire constants shared by the relay and its clients

/// Tag byte of a binary video frame
pub const VIDEO_FRAME_TAG: u8 = 0x01;

/// Tag byte of a binary audio frame
pub const AUDIO_FRAME_TAG: u8 = 0x02;

/// Video header: tag + width + height
pub const VIDEO_HEADER_SIZE: usize = 1 + 4 + 4;

/// Audio header: tag + sample count
pub const AUDIO_HEADER_SIZE: usize = 1 + 4;

/// Text notification sent on the rom-loaded channel
pub const ROM_LOADED_NOTIFICATION: &str = r#"{"type":"romLoaded"}"#;

// Controller button bits (SNES joypad layout)
pub const BUTTON_A: u16 = 0x0080;
pub const BUTTON_B: u16 = 0x8000;
pub const BUTTON_X: u16 = 0x0040;
pub const BUTTON_Y: u16 = 0x4000;
pub const BUTTON_L: u16 = 0x0020;
pub const BUTTON_R: u16 = 0x0010;
pub const BUTTON_START: u16 = 0x1000;
pub const BUTTON_SELECT: u16 = 0x2000;
pub const BUTTON_UP: u16 = 0x0800;
pub const BUTTON_DOWN: u16 = 0x0400;
pub const BUTTON_LEFT: u16 = 0x0200;
pub const BUTTON_RIGHT: u16 = 0x0100;

/// JSON field name to button bit
pub const BUTTON_FIELDS: [(&str, u16); 12] = [
    ("a", BUTTON_A),
    ("b", BUTTON_B),
    ("x", BUTTON_X),
    ("y", BUTTON_Y),
    ("l", BUTTON_L),
    ("r", BUTTON_R),
    ("start", BUTTON_START),
    ("select", BUTTON_SELECT),
    ("up", BUTTON_UP),
    ("down", BUTTON_DOWN),
    ("left", BUTTON_LEFT),
    ("right", BUTTON_RIGHT),
];
