//! Simulated inference latency

use crate::AssistantError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounds of the artificial delay before each reply
///
/// The delay is sampled uniformly from `min_ms..=max_ms`.
///
/// # Examples
///
/// ```
/// use civic_assistant::LatencyConfig;
///
/// let config = LatencyConfig::default();
/// assert_eq!((config.min_ms, config.max_ms), (400, 1200));
///
/// let config = LatencyConfig::instant();
/// assert!(config.sample().is_zero());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyConfig {
    /// Shortest delay in milliseconds
    /// Default: 400
    pub min_ms: u64,

    /// Longest delay in milliseconds
    /// Default: 1200
    pub max_ms: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            min_ms: 400,
            max_ms: 1200,
        }
    }
}

impl LatencyConfig {
    /// No delay at all (tests, scripting)
    pub fn instant() -> Self {
        Self { min_ms: 0, max_ms: 0 }
    }

    /// Fixed delay
    pub fn fixed(ms: u64) -> Self {
        Self { min_ms: ms, max_ms: ms }
    }

    /// Reject inverted ranges
    pub fn validate(&self) -> Result<(), AssistantError> {
        if self.min_ms > self.max_ms {
            return Err(AssistantError::Config(format!(
                "latency min_ms ({}) exceeds max_ms ({})",
                self.min_ms, self.max_ms
            )));
        }
        Ok(())
    }

    /// Draw one delay from the configured range
    pub fn sample(&self) -> Duration {
        self.sample_with(&mut rand::thread_rng())
    }

    /// Draw one delay using the given random source
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rng.gen_range(self.min_ms..=self.max_ms))
    }

    /// Suspend the current task for one sampled delay
    pub async fn delay(&self) {
        let duration = self.sample();
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_samples_stay_in_range() {
        let config = LatencyConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let ms = config.sample_with(&mut rng).as_millis() as u64;
            assert!((400..=1200).contains(&ms));
        }
    }

    #[test]
    fn test_fixed_and_instant() {
        assert_eq!(LatencyConfig::fixed(25).sample(), Duration::from_millis(25));
        assert_eq!(LatencyConfig::instant().sample(), Duration::ZERO);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let config = LatencyConfig { min_ms: 900, max_ms: 100 };
        assert!(matches!(config.validate(), Err(AssistantError::Config(_))));
        assert!(LatencyConfig::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_delay_waits() {
        let start = tokio::time::Instant::now();
        LatencyConfig::fixed(20).delay().await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
