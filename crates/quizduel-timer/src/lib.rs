//! Cancellable countdowns for the QuizDuel client.
//!
//! A [`Countdown`] runs on its own Tokio task, calls `on_tick` once per
//! second with the whole seconds left, then calls `on_expire` once. The
//! returned [`TimerHandle`] stops it.
//!
//! # Stale deliveries
//!
//! Cancelling stops any *further* callbacks, but a callback that already
//! ran may have queued a message the consumer has not read yet. Each handle
//! carries a unique [`TimerId`]; consumers tag their messages with it and
//! drop any whose id no longer matches the timer they hold.
//!
//! # Integration
//!
//! The callbacks usually just forward into the owning actor's channel so
//! the actor's `tokio::select!` loop stays the only place state changes:
//!
//! ```ignore
//! let (tick_tx, expire_tx) = (inputs.clone(), inputs.clone());
//! let handle = Countdown::start(
//!     Duration::from_secs(15),
//!     move |remaining| { let _ = tick_tx.send(Input::Tick(remaining)); },
//!     move || { let _ = expire_tx.send(Input::Expired); },
//! );
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, trace};

/// Counter for generating unique timer IDs.
static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

const ONE_SECOND: Duration = Duration::from_secs(1);

/// Stand-in deadline for durations that do not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identifies one started countdown. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    fn next() -> Self {
        Self(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Lifecycle of a countdown. Leaves `RUNNING` exactly once.
const RUNNING: u8 = 0;
const CANCELLED: u8 = 1;
const EXPIRED: u8 = 2;

#[derive(Debug)]
struct State(AtomicU8);

impl State {
    fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire) == RUNNING
    }

    /// Moves out of `RUNNING`. Only one caller ever gets `true`.
    fn finish(&self, to: u8) -> bool {
        self.0
            .compare_exchange(RUNNING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Whole seconds left, rounded up so a countdown never shows 0 early.
fn whole_seconds(remaining: Duration) -> u64 {
    remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
}

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// A countdown that has not started yet.
///
/// Most callers use [`Countdown::start`]. Creating the countdown first is
/// for callbacks that need to know the [`TimerId`] they will run under.
#[derive(Debug)]
pub struct Countdown {
    id: TimerId,
    duration: Duration,
}

impl Countdown {
    /// Allocates an id for a countdown of `duration`.
    pub fn new(duration: Duration) -> Self {
        Self {
            id: TimerId::next(),
            duration,
        }
    }

    /// The id the countdown will run under.
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Starts a countdown of `duration` on the current Tokio runtime.
    ///
    /// `on_tick(remaining)` runs one second after the start and every second
    /// after that while at least one whole second is left. `on_expire` runs
    /// once when `duration` has elapsed, unless the timer was cancelled
    /// first.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime, like [`tokio::spawn`].
    pub fn start<T, E>(duration: Duration, on_tick: T, on_expire: E) -> TimerHandle
    where
        T: FnMut(u64) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        Self::new(duration).spawn(on_tick, on_expire)
    }

    /// Starts this countdown. See [`Countdown::start`].
    pub fn spawn<T, E>(self, mut on_tick: T, on_expire: E) -> TimerHandle
    where
        T: FnMut(u64) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        let Self { id, duration } = self;
        let state = Arc::new(State(AtomicU8::new(RUNNING)));
        let task_state = Arc::clone(&state);
        let started = Instant::now();
        let deadline = started
            .checked_add(duration)
            .unwrap_or_else(|| started + FAR_FUTURE);

        debug!(%id, secs = duration.as_secs_f64(), "countdown started");

        let task = tokio::spawn(async move {
            let mut next = started + ONE_SECOND;
            while next < deadline {
                time::sleep_until(next).await;
                if !task_state.is_running() {
                    return;
                }
                let remaining = whole_seconds(deadline - next);
                trace!(%id, remaining, "countdown tick");
                on_tick(remaining);
                next += ONE_SECOND;
            }

            time::sleep_until(deadline).await;
            if task_state.finish(EXPIRED) {
                debug!(%id, "countdown expired");
                on_expire();
            }
        });

        TimerHandle {
            id,
            duration,
            state,
            task,
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owns a running countdown. Dropping the handle cancels it.
pub struct TimerHandle {
    id: TimerId,
    duration: Duration,
    state: Arc<State>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// This countdown's unique ID.
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// The duration the countdown was started with.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// `true` until the countdown expires or is cancelled.
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Stops the countdown. Expiry is never delivered after a successful
    /// cancel; a tick already running on another thread may still land,
    /// which consumers filter out by [`TimerId`].
    ///
    /// Returns `true` only for the call that actually stopped a running
    /// countdown; cancelling again, or after expiry, returns `false`.
    pub fn cancel(&self) -> bool {
        let stopped = self.state.finish(CANCELLED);
        self.task.abort();
        if stopped {
            debug!(id = %self.id, "countdown cancelled");
        }
        stopped
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.id)
            .field("duration", &self.duration)
            .field("running", &self.is_running())
            .finish()
    }
}
