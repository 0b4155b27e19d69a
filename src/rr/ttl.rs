use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Time to live for synthesized records, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct TimeToLive(u32);

impl TimeToLive {
    pub const MAX: TimeToLive = TimeToLive(u32::MAX);
    pub const ZERO: TimeToLive = TimeToLive(0u32);

    /// Five minutes, used when no TTL is configured.
    pub const DEFAULT: TimeToLive = TimeToLive(300);

    pub const fn from_secs(secs: u32) -> Self {
        TimeToLive(secs)
    }

    pub const fn as_secs(&self) -> u32 {
        self.0
    }
}

impl Default for TimeToLive {
    fn default() -> Self {
        TimeToLive::DEFAULT
    }
}

impl fmt::Display for TimeToLive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TimeToLive {
    fn from(value: u32) -> Self {
        TimeToLive(value)
    }
}

impl From<TimeToLive> for u32 {
    fn from(value: TimeToLive) -> Self {
        value.0
    }
}

impl From<TimeToLive> for Duration {
    fn from(value: TimeToLive) -> Self {
        Duration::from_secs(value.0 as u64)
    }
}

impl TryFrom<Duration> for TimeToLive {
    type Error = std::num::TryFromIntError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        value.as_secs().try_into().map(TimeToLive)
    }
}
