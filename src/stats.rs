//! Progress and timing statistics for the synthesis loop: an accumulating,
//! [`Display`]-able stats struct covering the iteration/timing counters a
//! `Synthesizer` accumulates across its run.

use std::fmt;
use std::time::{Duration, Instant};

/// A simple wall-clock stopwatch that can be paused and resumed, reporting
/// cumulative time spent across several start/stop spans rather than a
/// single elapsed duration.
#[derive(Debug, Clone)]
pub struct Timer {
    total: Duration,
    started: Option<Instant>,
}

impl Default for Timer {
    fn default() -> Self {
        Self {
            total: Duration::default(),
            started: None,
        }
    }
}

impl Timer {
    /// Creates a new, stopped timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or resumes) the timer. No-op if already running.
    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    /// Stops the timer, accumulating the elapsed time since the last start.
    pub fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.total += started.elapsed();
        }
    }

    /// Folds an externally-measured duration into the accumulated total,
    /// without needing to have been running for it.
    pub fn add(&mut self, extra: Duration) {
        self.total += extra;
    }

    /// Returns the total accumulated duration, including the current run if
    /// the timer is still started.
    pub fn elapsed(&self) -> Duration {
        match self.started {
            Some(started) => self.total + started.elapsed(),
            None => self.total,
        }
    }
}

/// A scoped guard that starts a [`Timer`] on construction and stops it on
/// drop, regardless of how the scope is exited.
pub struct ScopedTimer<'a> {
    timer: &'a mut Timer,
}

impl<'a> ScopedTimer<'a> {
    /// Starts `timer` and returns a guard that will stop it when dropped.
    pub fn new(timer: &'a mut Timer) -> Self {
        timer.start();
        Self { timer }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        self.timer.stop();
    }
}

/// Per-phase iteration counters and timers accumulated over a synthesis
/// run: iteration counts for AR and CEGIS phases, counts of
/// explored/accepted/rejected families, and the wall-clock budget used for
/// progress reporting.
#[derive(Debug, Clone, Default)]
pub struct Statistic {
    /// Number of families fully explored (accepted, rejected, or split).
    pub families_explored: usize,
    /// Number of families found to satisfy the specification.
    pub families_accepted: usize,
    /// Number of families found to violate the specification.
    pub families_rejected: usize,
    /// Number of AR (quotient-MDP model checking) iterations performed.
    pub iterations_ar: usize,
    /// Number of CEGIS (single-chain model checking) iterations performed.
    pub iterations_cegis: usize,
    /// Number of assignments rejected via SAT-based `exclude_assignment`
    /// without a model-checker call, due to a cached/propagated conflict.
    pub assignments_pruned: usize,
    /// Total time spent inside the model checker (AR + CEGIS).
    pub model_checking_time: Timer,
    /// Total time spent inside the SAT solver (encoding, pick, exclude).
    pub sat_time: Timer,
    /// Total wall-clock time of the synthesis run.
    pub total_time: Timer,
    /// Best optimum value found so far, if an optimality objective is set.
    pub best_value: Option<f64>,
}

impl Statistic {
    /// Creates an all-zero statistic with a started total-time timer.
    pub fn new() -> Self {
        let mut stats = Self::default();
        stats.total_time.start();
        stats
    }

    /// Records that a family was found to satisfy the specification.
    pub fn on_accept(&mut self) {
        self.families_explored += 1;
        self.families_accepted += 1;
    }

    /// Records that a family was found to violate the specification.
    pub fn on_reject(&mut self) {
        self.families_explored += 1;
        self.families_rejected += 1;
    }

    /// Updates the best known optimum, keeping the better of the two values
    /// according to `maximize`.
    pub fn update_best_value(&mut self, value: f64, maximize: bool) {
        let better = match self.best_value {
            None => true,
            Some(current) => {
                if maximize {
                    value > current
                } else {
                    value < current
                }
            }
        };
        if better {
            self.best_value = Some(value);
        }
    }

    /// Returns the fraction of families explored out of an estimate of the
    /// total family-space size, clamped to `[0, 1]`.
    pub fn progress(&self, family_space_size: u128) -> f64 {
        if family_space_size == 0 {
            return 1.0;
        }
        (self.families_explored as f64 / family_space_size as f64).min(1.0)
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "explored {} families ({} accepted, {} rejected), {} AR iterations, \
             {} CEGIS iterations, {} pruned, {:.2}s model checking, {:.2}s SAT, \
             {:.2}s total",
            self.families_explored,
            self.families_accepted,
            self.families_rejected,
            self.iterations_ar,
            self.iterations_cegis,
            self.assignments_pruned,
            self.model_checking_time.elapsed().as_secs_f64(),
            self.sat_time.elapsed().as_secs_f64(),
            self.total_time.elapsed().as_secs_f64(),
        )?;
        if let Some(value) = self.best_value {
            write!(f, ", best value {:.6}", value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_accumulates_across_pauses() {
        let mut timer = Timer::new();
        timer.start();
        timer.stop();
        let first = timer.elapsed();
        timer.start();
        timer.stop();
        assert!(timer.elapsed() >= first);
    }

    #[test]
    fn test_update_best_value_maximize() {
        let mut stats = Statistic::new();
        stats.update_best_value(0.5, true);
        stats.update_best_value(0.3, true);
        assert_eq!(stats.best_value, Some(0.5));
        stats.update_best_value(0.9, true);
        assert_eq!(stats.best_value, Some(0.9));
    }

    #[test]
    fn test_update_best_value_minimize() {
        let mut stats = Statistic::new();
        stats.update_best_value(0.5, false);
        stats.update_best_value(0.9, false);
        assert_eq!(stats.best_value, Some(0.5));
        stats.update_best_value(0.1, false);
        assert_eq!(stats.best_value, Some(0.1));
    }

    #[test]
    fn test_progress_clamped() {
        let mut stats = Statistic::new();
        stats.families_explored = 10;
        assert_eq!(stats.progress(5), 1.0);
        assert!((stats.progress(20) - 0.5).abs() < 1e-9);
    }
}
