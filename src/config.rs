use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_REVIEW_SECONDS: u64 = 30;
pub const DEFAULT_FIRST_QUERY_SECONDS: u64 = 60;
pub const DEFAULT_SECOND_QUERY_SECONDS: u64 = 60;

/// Lengths of the timed phases of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDurations {
    /// How long the describer studies the image before questions open
    pub review: Duration,
    /// First questioning window, closed by a decision prompt
    pub first_query: Duration,
    /// Second questioning window, opened after the hint
    pub second_query: Duration,
}

impl PhaseDurations {
    pub fn from_secs(review: u64, first_query: u64, second_query: u64) -> Self {
        Self {
            review: Duration::from_secs(review),
            first_query: Duration::from_secs(first_query),
            second_query: Duration::from_secs(second_query),
        }
    }
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self::from_secs(
            DEFAULT_REVIEW_SECONDS,
            DEFAULT_FIRST_QUERY_SECONDS,
            DEFAULT_SECOND_QUERY_SECONDS,
        )
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub durations: PhaseDurations,
}

impl Config {
    pub fn new() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 9000)),
            durations: PhaseDurations::default(),
        }
    }

    /// Reads `BIND_ADDRESS`, `REVIEW_SECONDS`, `FIRST_QUERY_SECONDS` and
    /// `SECOND_QUERY_SECONDS`, keeping the default for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::new();
        let durations = defaults.durations;

        Self {
            bind_address: env_or("BIND_ADDRESS", defaults.bind_address),
            durations: PhaseDurations {
                review: env_secs_or("REVIEW_SECONDS", durations.review),
                first_query: env_secs_or("FIRST_QUERY_SECONDS", durations.first_query),
                second_query: env_secs_or("SECOND_QUERY_SECONDS", durations.second_query),
            },
        }
    }

    pub fn with_bind_address(mut self, address: SocketAddr) -> Self {
        self.bind_address = address;
        self
    }

    pub fn with_review_seconds(mut self, seconds: u64) -> Self {
        self.durations.review = Duration::from_secs(seconds);
        self
    }

    pub fn with_first_query_seconds(mut self, seconds: u64) -> Self {
        self.durations.first_query = Duration::from_secs(seconds);
        self
    }

    pub fn with_second_query_seconds(mut self, seconds: u64) -> Self {
        self.durations.second_query = Duration::from_secs(seconds);
        self
    }

    pub fn with_durations(mut self, durations: PhaseDurations) -> Self {
        self.durations = durations;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, fallback = %default, "Ignoring unparsable setting");
            default
        }),
        Err(_) => default,
    }
}

fn env_secs_or(key: &str, default: Duration) -> Duration {
    Duration::from_secs(env_or(key, default.as_secs()))
}
