//! Time control management for timed games.

use std::str::FromStr;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::ChessError;

/// Budget used when no time control is configured.
const DEFAULT_MOVE_TIME: Duration = Duration::from_secs(5);

/// Moves assumed to remain when dividing the clock.
pub const DEFAULT_MOVES_REMAINING: u32 = 20;

/// Fraction of the nominal share actually allocated.
const SAFETY_FACTOR: f64 = 0.8;

/// No single move may use more than this fraction of the clock.
const MAX_CLOCK_FRACTION: f64 = 0.1;

/// Smallest budget handed out while the clock is healthy.
const MIN_BUDGET: Duration = Duration::from_millis(100);

/// Below this much remaining time the emergency budget applies.
const EMERGENCY_THRESHOLD: Duration = Duration::from_secs(1);

/// Upper bound of the emergency budget.
const EMERGENCY_CAP: Duration = Duration::from_millis(100);

/// Time control mode for a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeControl {
    /// No time limit.
    #[default]
    Infinite,

    /// Fixed time per move.
    MoveTime { time_per_move: Duration },

    /// Clock with an increment added after each move.
    /// `main_time` is the initial time bank.
    Fischer {
        main_time: Duration,
        increment: Duration,
    },
}

impl FromStr for TimeControl {
    type Err = ChessError;

    /// Parses `base[+increment]` in seconds, e.g. `300+5` or `0.5`.
    /// `inf` and `infinite` select [`TimeControl::Infinite`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("inf") || s.eq_ignore_ascii_case("infinite") {
            return Ok(TimeControl::Infinite);
        }

        let invalid = || ChessError::InvalidTimeControl(s.to_string());
        let seconds = |part: &str| -> Result<Duration, ChessError> {
            let secs: f64 = part.trim().parse().map_err(|_| invalid())?;
            Duration::try_from_secs_f64(secs).map_err(|_| invalid())
        };

        let (base, increment) = match s.split_once('+') {
            Some((base, inc)) => (seconds(base)?, seconds(inc)?),
            None => (seconds(s)?, Duration::ZERO),
        };

        Ok(TimeControl::Fischer {
            main_time: base,
            increment,
        })
    }
}

/// Decides whether a search must stop.
///
/// # Arguments
///
/// * `elapsed` - Time spent on the current move
/// * `nodes` - Nodes (or simulations) searched so far
/// * `budget` - Time budget, `None` for unlimited
/// * `node_cap` - Node budget, `None` for unlimited
pub fn should_stop(
    elapsed: Duration,
    nodes: u64,
    budget: Option<Duration>,
    node_cap: Option<u64>,
) -> bool {
    budget.is_some_and(|b| elapsed >= b) || node_cap.is_some_and(|cap| nodes >= cap)
}

/// Converts a time control into per-move budgets.
#[derive(Debug, Clone)]
pub struct TimeManager {
    control: TimeControl,
    /// Remaining clock time for Fischer controls.
    time_left: Option<Duration>,
    moves_remaining: u32,
    start_time: Instant,
}

impl Default for TimeManager {
    /// A manager with a fixed five second budget per move.
    fn default() -> Self {
        TimeManager::new(TimeControl::MoveTime {
            time_per_move: DEFAULT_MOVE_TIME,
        })
    }
}

impl TimeManager {
    pub fn new(control: TimeControl) -> Self {
        let time_left = match control {
            TimeControl::Fischer { main_time, .. } => Some(main_time),
            _ => None,
        };
        TimeManager {
            control,
            time_left,
            moves_remaining: DEFAULT_MOVES_REMAINING,
            start_time: Instant::now(),
        }
    }

    /// Overrides the number of moves the clock is divided over.
    #[must_use]
    pub fn with_moves_remaining(mut self, moves: u32) -> Self {
        self.moves_remaining = moves.max(1);
        self
    }

    pub fn control(&self) -> TimeControl {
        self.control
    }

    /// Starts the clock for a new move and returns its budget.
    pub fn start_move(&mut self) -> Option<Duration> {
        self.start_time = Instant::now();
        let budget = self.budget();
        debug!(
            control = ?self.control,
            time_left_ms = self.time_left.map(|t| t.as_millis() as u64),
            budget_ms = budget.map(|b| b.as_millis() as u64),
            "time budget allocated"
        );
        budget
    }

    /// Returns the elapsed time since the current move started.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Updates the remaining clock time (Fischer only).
    pub fn update_time(&mut self, time_left: Duration) {
        if matches!(self.control, TimeControl::Fischer { .. }) {
            self.time_left = Some(time_left);
        }
    }

    #[inline]
    pub fn time_left(&self) -> Option<Duration> {
        self.time_left
    }

    /// Budget for the next move, `None` when unlimited.
    pub fn budget(&self) -> Option<Duration> {
        match self.control {
            TimeControl::Infinite => None,
            TimeControl::MoveTime { time_per_move } => Some(time_per_move),
            TimeControl::Fischer { increment, .. } => {
                let time_left = self.time_left.unwrap_or(Duration::ZERO);
                if self.is_emergency() {
                    return Some(self.emergency_time());
                }
                Some(Self::allocate_budget(
                    time_left,
                    increment,
                    self.moves_remaining,
                ))
            }
        }
    }

    /// `(time_left / moves + increment) * 0.8`, capped at a tenth of the
    /// clock and floored at [`MIN_BUDGET`].
    fn allocate_budget(time_left: Duration, increment: Duration, moves: u32) -> Duration {
        let share = time_left.as_secs_f64() / moves.max(1) as f64;
        let budget = (share + increment.as_secs_f64()) * SAFETY_FACTOR;
        let capped = budget.min(time_left.as_secs_f64() * MAX_CLOCK_FRACTION);
        Duration::from_secs_f64(capped).max(MIN_BUDGET)
    }

    /// Whether the clock is low enough for the emergency budget.
    pub fn is_emergency(&self) -> bool {
        self.time_left.is_some_and(|t| t < EMERGENCY_THRESHOLD)
    }

    /// `min(100 ms, 10% of time left)`.
    pub fn emergency_time(&self) -> Duration {
        let time_left = self.time_left.unwrap_or(Duration::ZERO);
        time_left.mul_f64(MAX_CLOCK_FRACTION).min(EMERGENCY_CAP)
    }

    /// Checks the current move against its budget and an optional node cap.
    pub fn should_stop(&self, nodes: u64, node_cap: Option<u64>) -> bool {
        should_stop(self.elapsed(), nodes, self.budget(), node_cap)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.budget().map(|b| self.start_time + b)
    }
}
