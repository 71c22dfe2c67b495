use std::time::Duration;

/// Timing and encoding settings for an export run
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Pause after scrolling an item into view, before measuring it
    pub settle: Duration,

    /// Pause after every item, independent of retries
    pub throttle: Duration,

    /// Retries after the first capture attempt
    pub max_retries: u32,

    /// Backoff after a rate-limit failure
    pub rate_limit_backoff: Duration,

    /// Backoff after any other transient failure
    pub transient_backoff: Duration,

    /// JPEG quality for cropped images (1-100)
    pub jpeg_quality: u8,

    /// CSS outline applied to highlighted items
    pub highlight_outline: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(200),
            throttle: Duration::from_millis(200),
            max_retries: 3,
            rate_limit_backoff: Duration::from_millis(1500),
            transient_backoff: Duration::from_millis(500),
            jpeg_quality: 90,
            highlight_outline: "2px dashed red".to_string(),
        }
    }
}

impl CaptureConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config with every pause set to zero
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            throttle: Duration::ZERO,
            rate_limit_backoff: Duration::ZERO,
            transient_backoff: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Builder method: set settle interval
    pub fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Builder method: set per-item throttle
    pub fn throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Builder method: set retry budget
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Builder method: set both backoff delays
    pub fn backoff(mut self, rate_limit: Duration, transient: Duration) -> Self {
        self.rate_limit_backoff = rate_limit;
        self.transient_backoff = transient;
        self
    }

    /// Builder method: set JPEG quality, clamped to 1-100
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.settle, Duration::from_millis(200));
        assert_eq!(config.throttle, Duration::from_millis(200));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.rate_limit_backoff, Duration::from_millis(1500));
        assert_eq!(config.transient_backoff, Duration::from_millis(500));
        assert_eq!(config.jpeg_quality, 90);
    }

    #[test]
    fn test_builder() {
        let config = CaptureConfig::new()
            .settle(Duration::from_millis(50))
            .throttle(Duration::ZERO)
            .max_retries(1)
            .backoff(Duration::from_secs(2), Duration::from_millis(100))
            .jpeg_quality(0);

        assert_eq!(config.settle, Duration::from_millis(50));
        assert_eq!(config.throttle, Duration::ZERO);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.rate_limit_backoff, Duration::from_secs(2));
        assert_eq!(config.transient_backoff, Duration::from_millis(100));
        assert_eq!(config.jpeg_quality, 1);
    }

    #[test]
    fn test_immediate_has_no_pauses() {
        let config = CaptureConfig::immediate();
        assert_eq!(config.settle, Duration::ZERO);
        assert_eq!(config.rate_limit_backoff, Duration::ZERO);
        assert_eq!(config.max_retries, 3);
    }
}
