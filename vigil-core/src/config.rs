//! Configuration types shared across the broker, resolver, and stream adapter.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the resolver maps raw sensor angles onto `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AngleWrapMode {
    /// Wrap by `angle mod 360` (e.g. `-10` becomes `350`).
    #[default]
    Mod360,
}

/// Retry and cache tuning for the camera resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Per-entry lifetime of cached repository query results.
    pub cache_ttl: Duration,
    /// Retry attempts after the initial failure, transient errors only.
    pub max_retries: u32,
    /// Delay before the first retry; doubles per attempt.
    pub initial_backoff: Duration,
    /// Random jitter percentage [0, 100] added to each delay.
    pub jitter_percent: u8,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            jitter_percent: 20,
        }
    }
}

/// Tuning for the stream adapter's outbound envelope channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Capacity of the bounded envelope channel handed to the sink.
    pub channel_capacity: usize,
    /// `remaining_time` value stamped on outbound envelopes, in seconds.
    pub remaining_time_secs: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            remaining_time_secs: 30,
        }
    }
}

/// Global configuration for the broker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Resolver cache and retry tuning.
    pub resolver: ResolverConfig,
    /// Permit handler overrides without the per-call opt-in.
    pub allow_handler_override: bool,
    /// Angle normalization mode.
    pub angle_wrap: AngleWrapMode,
    /// Stream adapter tuning.
    pub stream: StreamConfig,
}
