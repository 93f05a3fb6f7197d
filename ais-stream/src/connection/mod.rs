//! Lifecycle of the websocket connection to the feed.
//!
//! [`ConnectionMachine`] is a pure transition table, [`ConnectionManager`]
//! drives it against a [`FeedTransport`] and owns every timer.

use std::time::Duration;

use serde::Deserialize;

mod backoff;
#[cfg(feature = "test")]
mod fake;
mod machine;
mod manager;
mod transport;

pub use backoff::*;
#[cfg(feature = "test")]
pub use fake::*;
pub use machine::*;
pub use manager::*;
pub use transport::*;

pub const NORMAL_CLOSURE: u16 = 1000;
pub const TRY_AGAIN_LATER: u16 = 1013;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectPolicy {
    #[default]
    Forever,
    Bounded { max_attempts: u32 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionSettings {
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub subscribe_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub heartbeat_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub stale_after: Duration,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(default)]
    pub reconnect_policy: ReconnectPolicy,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            subscribe_delay: Duration::from_millis(500),
            heartbeat_interval: Duration::from_secs(10),
            stale_after: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            reconnect_policy: ReconnectPolicy::Forever,
        }
    }
}
