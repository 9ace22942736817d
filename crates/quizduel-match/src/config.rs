//! Timing configuration for matchmaking and match sessions.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Durations used by the matchmaker and the session timers.
///
/// The defaults are the values the ranked server is built around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// How long to wait for `match_found` before giving up.
    pub matchmaking_timeout: Duration,

    /// Length of the per-question answer countdown.
    pub question_time_limit: Duration,

    /// How long a disconnected opponent may take to come back before the
    /// client shows them as unreachable.
    pub disconnect_grace: Duration,

    /// How long the local connection may stay down before the session is
    /// abandoned.
    pub connection_grace: Duration,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            matchmaking_timeout: Duration::from_secs(20),
            question_time_limit: Duration::from_secs(15),
            disconnect_grace: Duration::from_secs(30),
            connection_grace: Duration::from_secs(30),
        }
    }
}

impl MatchConfig {
    /// Shortest duration any timer may have.
    pub const MIN_DURATION: Duration = Duration::from_secs(1);

    /// Longest duration any timer may have.
    pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

    /// Sets the matchmaking timeout.
    #[must_use]
    pub fn with_matchmaking_timeout(mut self, timeout: Duration) -> Self {
        self.matchmaking_timeout = timeout;
        self
    }

    /// Sets the per-question countdown length.
    #[must_use]
    pub fn with_question_time_limit(mut self, limit: Duration) -> Self {
        self.question_time_limit = limit;
        self
    }

    /// Sets the opponent disconnect grace period.
    #[must_use]
    pub fn with_disconnect_grace(mut self, grace: Duration) -> Self {
        self.disconnect_grace = grace;
        self
    }

    /// Sets the local connection grace period.
    #[must_use]
    pub fn with_connection_grace(mut self, grace: Duration) -> Self {
        self.connection_grace = grace;
        self
    }

    /// Clamps every duration into
    /// [`Self::MIN_DURATION`]..=[`Self::MAX_DURATION`].
    ///
    /// A zero timeout would resolve before the server could ever answer.
    pub fn validated(mut self) -> Self {
        for (name, value) in [
            ("matchmaking_timeout", &mut self.matchmaking_timeout),
            ("question_time_limit", &mut self.question_time_limit),
            ("disconnect_grace", &mut self.disconnect_grace),
            ("connection_grace", &mut self.connection_grace),
        ] {
            if *value < Self::MIN_DURATION {
                warn!(
                    setting = name,
                    secs = value.as_secs_f64(),
                    "duration below minimum, clamping to 1s"
                );
                *value = Self::MIN_DURATION;
            } else if *value > Self::MAX_DURATION {
                warn!(
                    setting = name,
                    secs = value.as_secs(),
                    "duration above maximum, clamping to 24h"
                );
                *value = Self::MAX_DURATION;
            }
        }
        self
    }
}
