//! Matchmaking: join the pool, wait for an opponent, or give up.
//!
//! A search resolves exactly once, to one of:
//!
//! ```text
//!             ┌── match_found ──→ Found
//! Searching ──┼── timeout ──────→ TimedOut   (sends leave_matchmaking)
//!             └── cancel_match ─→ Cancelled  (sends leave_matchmaking)
//! ```

use std::fmt;
use std::time::Duration;

use quizduel_protocol::{ClientMessage, MatchFound};
use quizduel_timer::{Countdown, TimerHandle};

use crate::{InputSender, MatchmakingError, MatchmakingInput, Outbox};

/// Identifies one `find_match` call. Increases with every search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "search-{}", self.0)
    }
}

/// Where the most recent search stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchmakingStatus {
    /// No search was started yet.
    Idle,
    /// Waiting for the server to pair us.
    Searching,
    /// An opponent was found.
    Found,
    /// Nobody was found in time.
    TimedOut,
    /// The search was cancelled by the caller.
    Cancelled,
}

impl fmt::Display for MatchmakingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Searching => write!(f, "Searching"),
            Self::Found => write!(f, "Found"),
            Self::TimedOut => write!(f, "TimedOut"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// How a search resolved, as reported by [`Matchmaker::handle`].
#[derive(Debug)]
pub enum MatchmakingEvent {
    /// Start a session from this payload.
    Found {
        /// The search that succeeded.
        request: RequestId,
        /// The `match_found` payload.
        found: MatchFound,
    },
    /// The search ran out of time.
    TimedOut {
        /// The search that timed out.
        request: RequestId,
    },
}

/// The matchmaking state machine.
///
/// Only one search may be outstanding. It does not know whether a session
/// is running; the owner checks that before calling
/// [`find_match`](Self::find_match).
pub struct Matchmaker {
    status: MatchmakingStatus,
    request: Option<RequestId>,
    next_request: u64,
    timer: Option<TimerHandle>,
    timeout: Duration,
    outbox: Outbox,
    inputs: InputSender,
}

impl Matchmaker {
    /// Creates an idle matchmaker whose searches give up after `timeout`.
    pub fn new(outbox: Outbox, inputs: InputSender, timeout: Duration) -> Self {
        Self {
            status: MatchmakingStatus::Idle,
            request: None,
            next_request: 1,
            timer: None,
            timeout,
            outbox,
            inputs,
        }
    }

    /// Status of the most recent search.
    pub fn status(&self) -> MatchmakingStatus {
        self.status
    }

    /// The most recent search, if any.
    pub fn request(&self) -> Option<RequestId> {
        self.request
    }

    /// `true` while a search is outstanding.
    pub fn is_searching(&self) -> bool {
        self.status == MatchmakingStatus::Searching
    }

    /// Joins the matchmaking pool and starts the search countdown.
    ///
    /// # Errors
    /// - [`MatchmakingError::AlreadySearching`] if a search is running.
    ///   Nothing is sent.
    /// - [`MatchmakingError::Transport`] if `join_matchmaking` could not
    ///   be sent. The status is unchanged.
    pub fn find_match(&mut self) -> Result<RequestId, MatchmakingError> {
        if self.is_searching() {
            return Err(MatchmakingError::AlreadySearching);
        }

        self.outbox.send::<MatchmakingError>(&ClientMessage::join_matchmaking())?;

        let request = RequestId(self.next_request);
        self.next_request += 1;

        let countdown = Countdown::new(self.timeout);
        let timer = countdown.id();
        let inputs = self.inputs.clone();
        self.timer = Some(countdown.spawn(
            |_| {},
            move || {
                let _ = inputs
                    .send(MatchmakingInput::SearchTimedOut { request, timer }.into());
            },
        ));
        self.request = Some(request);
        self.status = MatchmakingStatus::Searching;

        tracing::info!(%request, timeout_secs = self.timeout.as_secs(), "searching for match");
        Ok(request)
    }

    /// Leaves the matchmaking pool.
    ///
    /// The search is cancelled even if `leave_matchmaking` cannot be sent;
    /// the failure is logged.
    ///
    /// # Errors
    /// Returns [`MatchmakingError::NotSearching`] if no search is running.
    pub fn cancel_match(&mut self) -> Result<RequestId, MatchmakingError> {
        let Some(request) = self.request.filter(|_| self.is_searching()) else {
            return Err(MatchmakingError::NotSearching);
        };

        self.stop_timer();
        self.status = MatchmakingStatus::Cancelled;
        self.leave(request);

        tracing::info!(%request, "search cancelled");
        Ok(request)
    }

    /// Applies one input. Returns how the search resolved, or `None` if
    /// the input was late or unsolicited and was ignored.
    pub fn handle(&mut self, input: MatchmakingInput) -> Option<MatchmakingEvent> {
        match input {
            MatchmakingInput::MatchFound(found) => {
                let Some(request) = self.request.filter(|_| self.is_searching()) else {
                    tracing::debug!(
                        game_id = %found.game_id,
                        status = %self.status,
                        "ignoring match_found while not searching"
                    );
                    return None;
                };
                self.stop_timer();
                self.status = MatchmakingStatus::Found;
                tracing::info!(
                    %request,
                    game_id = %found.game_id,
                    opponent = %found.opponent,
                    "match found"
                );
                Some(MatchmakingEvent::Found { request, found })
            }

            MatchmakingInput::SearchTimedOut { request, timer } => {
                let current_timer = self.timer.as_ref().map(TimerHandle::id);
                if !self.is_searching()
                    || self.request != Some(request)
                    || current_timer != Some(timer)
                {
                    tracing::debug!(%request, %timer, "ignoring stale search timeout");
                    return None;
                }
                self.timer = None;
                self.status = MatchmakingStatus::TimedOut;
                self.leave(request);
                tracing::info!(%request, "no match found in time");
                Some(MatchmakingEvent::TimedOut { request })
            }
        }
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    fn leave(&self, request: RequestId) {
        if let Err(e) = self
            .outbox
            .send::<MatchmakingError>(&ClientMessage::leave_matchmaking())
        {
            tracing::warn!(%request, error = %e, "could not send leave_matchmaking");
        }
    }
}

impl fmt::Debug for Matchmaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matchmaker")
            .field("status", &self.status)
            .field("request", &self.request)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
