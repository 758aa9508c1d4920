//! Token bucket bounding how often a polling cycle may start.
//!
//! Implemented as a generic cell rate algorithm over a single theoretical
//! arrival time: up to `burst` waits complete at once, after that one wait
//! completes per `interval`.

use std::time::Duration;

use annotator_core::{Error, LimiterSettings};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Errors that can occur during rate limiting.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    /// Interval must be positive.
    #[error("interval must be positive")]
    InvalidInterval,

    /// Burst must allow at least one cycle.
    #[error("burst must be at least 1, got {0}")]
    InvalidBurst(u32),

    /// The stop signal fired while waiting for a token.
    #[error("wait aborted by stop signal")]
    Aborted,

    /// The next slot lies beyond what `Instant` can represent.
    #[error("rate limiter schedule overflowed")]
    Overflow,
}

impl From<RateLimitError> for Error {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::InvalidInterval | RateLimitError::InvalidBurst(_) => {
                Self::invalid_config(err.to_string())
            }
            RateLimitError::Aborted | RateLimitError::Overflow => {
                Self::wait_aborted(err.to_string())
            }
        }
    }
}

/// Validated limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    interval: Duration,
    burst: u32,
}

impl RateLimitConfig {
    /// Create a configuration.
    ///
    /// # Errors
    ///
    /// Rejects a zero interval or a zero burst.
    pub const fn new(interval: Duration, burst: u32) -> Result<Self, RateLimitError> {
        if interval.is_zero() {
            return Err(RateLimitError::InvalidInterval);
        }
        if burst == 0 {
            return Err(RateLimitError::InvalidBurst(burst));
        }
        Ok(Self { interval, burst })
    }

    /// Minimum spacing between cycle starts once the burst is spent.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of cycles that may start back to back.
    #[must_use]
    pub const fn burst(&self) -> u32 {
        self.burst
    }

    /// How far ahead of schedule a wait may complete.
    fn tolerance(&self) -> Duration {
        self.interval.saturating_mul(self.burst.saturating_sub(1))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            burst: 5,
        }
    }
}

impl TryFrom<&LimiterSettings> for RateLimitConfig {
    type Error = RateLimitError;

    fn try_from(settings: &LimiterSettings) -> Result<Self, Self::Error> {
        Self::new(settings.interval, settings.burst)
    }
}

/// Rate limiter gating the start of each polling cycle.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    /// When the next token would be due if no burst were allowed.
    theoretical_arrival: Option<Instant>,
}

impl RateLimiter {
    /// Create a limiter with a full bucket.
    #[must_use]
    pub const fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            theoretical_arrival: None,
        }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Wait until a token is available.
    ///
    /// # Errors
    ///
    /// Returns `Aborted` if `stop` turns true (or its sender goes away)
    /// before the token is due.
    pub async fn wait(&mut self, stop: &mut watch::Receiver<bool>) -> Result<(), RateLimitError> {
        let ready_at = self.reserve(Instant::now())?;
        if ready_at <= Instant::now() {
            return Ok(());
        }

        tokio::select! {
            () = tokio::time::sleep_until(ready_at) => Ok(()),
            _ = stop.wait_for(|stopped| *stopped) => Err(RateLimitError::Aborted),
        }
    }

    /// Claim the next slot and return the instant it becomes usable.
    fn reserve(&mut self, now: Instant) -> Result<Instant, RateLimitError> {
        let arrival = self.theoretical_arrival.map_or(now, |t| t.max(now));
        let ready_at = arrival
            .checked_sub(self.config.tolerance())
            .map_or(now, |t| t.max(now));

        self.theoretical_arrival = Some(
            arrival
                .checked_add(self.config.interval)
                .ok_or(RateLimitError::Overflow)?,
        );
        Ok(ready_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(interval_ms: u64, burst: u32) -> Result<RateLimiter, RateLimitError> {
        RateLimitConfig::new(Duration::from_millis(interval_ms), burst).map(RateLimiter::new)
    }

    #[test]
    fn test_config_rejects_zero_interval() {
        assert_eq!(
            RateLimitConfig::new(Duration::ZERO, 1),
            Err(RateLimitError::InvalidInterval)
        );
    }

    #[test]
    fn test_config_rejects_zero_burst() {
        assert_eq!(
            RateLimitConfig::new(Duration::from_secs(1), 0),
            Err(RateLimitError::InvalidBurst(0))
        );
    }

    #[test]
    fn test_config_from_settings() {
        let settings = LimiterSettings::default();
        let config = RateLimitConfig::try_from(&settings);
        assert_eq!(config.ok(), Some(RateLimitConfig::default()));
    }

    #[test]
    fn test_abort_maps_to_fatal_core_error() {
        let err: Error = RateLimitError::Aborted.into();
        assert!(matches!(err, Error::WaitAborted { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_completes_immediately() -> Result<(), RateLimitError> {
        let mut limiter = limiter(1_000, 3)?;
        let (_tx, mut rx) = watch::channel(false);
        let start = Instant::now();

        for _ in 0..3 {
            limiter.wait(&mut rx).await?;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_are_spaced_after_burst() -> Result<(), RateLimitError> {
        let mut limiter = limiter(100, 1)?;
        let (_tx, mut rx) = watch::channel(false);
        let start = Instant::now();

        for _ in 0..5 {
            limiter.wait(&mut rx).await?;
        }

        assert!(start.elapsed() >= Duration::from_millis(400));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_bucket_refills_while_idle() -> Result<(), RateLimitError> {
        let mut limiter = limiter(100, 2)?;
        let (_tx, mut rx) = watch::channel(false);

        limiter.wait(&mut rx).await?;
        limiter.wait(&mut rx).await?;
        tokio::time::sleep(Duration::from_millis(500)).await;

        let start = Instant::now();
        limiter.wait(&mut rx).await?;
        limiter.wait(&mut rx).await?;
        assert_eq!(start.elapsed(), Duration::ZERO);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_signal_aborts_wait() -> Result<(), RateLimitError> {
        let mut limiter = limiter(10_000, 1)?;
        let (tx, mut rx) = watch::channel(false);

        limiter.wait(&mut rx).await?;
        let _ = tx.send(true);

        let result = limiter.wait(&mut rx).await;
        assert_eq!(result, Err(RateLimitError::Aborted));
        Ok(())
    }
}
