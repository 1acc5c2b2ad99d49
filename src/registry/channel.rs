//! Broadcast channel identifiers

use std::fmt;

/// One of the fixed relay channels
///
/// Channel membership is decided by the request path a subscriber connects
/// on and never changes for the lifetime of that connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Inbound JSON control commands
    Control,
    /// Outbound binary video frames
    Video,
    /// Outbound binary audio blocks
    Audio,
    /// Outbound rom-loaded text notifications
    RomLoaded,
}

impl Channel {
    /// Every channel, in registry order
    pub const ALL: [Channel; 4] = [
        Channel::Control,
        Channel::Video,
        Channel::Audio,
        Channel::RomLoaded,
    ];

    /// Request path for this channel
    pub fn path(&self) -> &'static str {
        match self {
            Channel::Control => "/control",
            Channel::Video => "/video",
            Channel::Audio => "/audio",
            Channel::RomLoaded => "/rom-loaded",
        }
    }

    /// Resolve a request path (query string allowed) to a channel
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        Self::ALL.into_iter().find(|c| c.path() == path)
    }

    pub fn name(&self) -> &'static str {
        &self.path()[1..]
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(Channel::from_path("/video"), Some(Channel::Video));
        assert_eq!(Channel::from_path("/audio?codec=pcm"), Some(Channel::Audio));
        assert_eq!(Channel::from_path("/rom-loaded"), Some(Channel::RomLoaded));
        assert_eq!(Channel::from_path("/control"), Some(Channel::Control));
        assert_eq!(Channel::from_path("/"), None);
        assert_eq!(Channel::from_path("/video/extra"), None);
    }

    #[test]
    fn test_path_round_trip() {
        for channel in Channel::ALL {
            assert_eq!(Channel::from_path(channel.path()), Some(channel));
        }
        assert_eq!(Channel::RomLoaded.to_string(), "rom-loaded");
    }
}
