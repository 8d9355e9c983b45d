//! Context configuration.

/// Default number of auxiliary streams in a new context.
///
/// Internal parallelism is opt-in: a plain context serves every algorithm
/// call on the primary stream alone, and only callers that fan work out
/// across the pool pay for extra streams.
pub const DEFAULT_NUM_INTERNAL_STREAMS: usize = 0;

/// Configuration for a resource context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceConfig {
    /// Ordinal of the device to bind.
    pub device_ordinal: usize,
    /// Number of auxiliary streams to create, fixed for the context's
    /// lifetime. Zero is valid.
    pub num_internal_streams: usize,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            device_ordinal: 0,
            num_internal_streams: DEFAULT_NUM_INTERNAL_STREAMS,
        }
    }
}

impl ResourceConfig {
    /// Minimal configuration: device 0, primary stream only.
    #[must_use]
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Configuration with `num_internal_streams` auxiliary streams for
    /// intra-call parallelism.
    #[must_use]
    pub fn concurrent(num_internal_streams: usize) -> Self {
        Self {
            device_ordinal: 0,
            num_internal_streams,
        }
    }

    /// Rebind the configuration to another device ordinal.
    #[must_use]
    pub fn on_device(mut self, ordinal: usize) -> Self {
        self.device_ordinal = ordinal;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResourceConfig::default();
        assert_eq!(config.device_ordinal, 0);
        assert_eq!(config.num_internal_streams, DEFAULT_NUM_INTERNAL_STREAMS);
    }

    #[test]
    fn test_concurrent_preset() {
        let config = ResourceConfig::concurrent(4).on_device(1);
        assert_eq!(config.num_internal_streams, 4);
        assert_eq!(config.device_ordinal, 1);
    }
}
