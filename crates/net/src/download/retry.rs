//! Retry policy and backoff calculation for artifact downloads

use repomirror_config::NetworkConfig;
use std::time::Duration;

/// Retry configuration for transient download failures
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total attempts per artifact, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound on the backoff delay
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each attempt
    pub backoff_multiplier: f64,
    /// Jitter factor in `[0.0, 1.0]` applied to the computed delay
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    /// Build a `RetryConfig` from the network section of the app configuration.
    #[must_use]
    pub fn from_network_config(network: &NetworkConfig) -> Self {
        Self {
            max_attempts: network.max_attempts.max(1),
            initial_delay: network.initial_retry_delay(),
            max_delay: network.max_retry_delay(),
            ..Self::default()
        }
    }
}

/// Calculate the delay before the next attempt.
///
/// `completed_attempts` is the number of attempts already made, so the
/// delay grows exponentially from `initial_delay` and saturates at
/// `max_delay` before jitter is applied.
#[must_use]
pub fn calculate_backoff_delay(config: &RetryConfig, completed_attempts: u32) -> Duration {
    let exponent = completed_attempts.saturating_sub(1);
    let base_ms = config.initial_delay.as_millis();

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    let mut delay_ms = base_ms as f64 * config.backoff_multiplier.powi(exponent as i32);

    #[allow(clippy::cast_precision_loss)]
    let max_ms = config.max_delay.as_millis() as f64;
    if delay_ms > max_ms {
        delay_ms = max_ms;
    }

    // Spread retries out so concurrent workers do not hammer the
    // upstream in lockstep.
    let jitter = 1.0 + (rand::random::<f64>() * 2.0 - 1.0) * config.jitter_factor;
    delay_ms *= jitter.max(0.0);

    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    Duration::from_millis(delay_ms.max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> RetryConfig {
        RetryConfig {
            jitter_factor: 0.0,
            ..RetryConfig::default()
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let config = no_jitter();
        assert_eq!(
            calculate_backoff_delay(&config, 1),
            Duration::from_millis(500)
        );
        assert_eq!(
            calculate_backoff_delay(&config, 2),
            Duration::from_millis(1000)
        );
        assert_eq!(
            calculate_backoff_delay(&config, 3),
            Duration::from_millis(2000)
        );
    }

    #[test]
    fn test_backoff_caps_at_max_delay() {
        let config = no_jitter();
        assert_eq!(calculate_backoff_delay(&config, 20), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let config = RetryConfig::default();
        for _ in 0..100 {
            let delay = calculate_backoff_delay(&config, 2);
            assert!(delay >= Duration::from_millis(900));
            assert!(delay <= Duration::from_millis(1100));
        }
    }

    #[test]
    fn test_from_network_config_floors_attempts() {
        let mut network = NetworkConfig::default();
        network.max_attempts = 0;
        let config = RetryConfig::from_network_config(&network);
        assert_eq!(config.max_attempts, 1);
    }
}
