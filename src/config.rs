//! Writer configuration

/// Configuration for the multi-file writer and its background worker
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// How long the worker waits on an empty queue before re-checking
    /// the completion flag, in milliseconds
    pub take_timeout_ms: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            take_timeout_ms: 1000,
        }
    }
}

impl WriterConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            take_timeout_ms: std::env::var("LINELOG_TAKE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.take_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_take_timeout() {
        assert_eq!(WriterConfig::default().take_timeout_ms, 1000);
    }
}
