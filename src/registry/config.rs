//! Registry configuration

/// Configuration for the channel registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Frames buffered per subscriber before further frames are dropped
    ///
    /// Keep this small: video frames are large and a slow viewer should
    /// skip frames, not accumulate latency.
    pub subscriber_queue_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            subscriber_queue_capacity: 8,
        }
    }
}

impl RegistryConfig {
    /// Set the per-subscriber queue capacity (minimum 1)
    pub fn subscriber_queue_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_queue_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert_eq!(RegistryConfig::default().subscriber_queue_capacity, 8);
    }

    #[test]
    fn test_capacity_floor() {
        let config = RegistryConfig::default().subscriber_queue_capacity(0);
        assert_eq!(config.subscriber_queue_capacity, 1);
    }
}
