//! Cycle Timer - Phase Timing Utilities
//!
//! One timer runs for a whole cycle; `lap` closes the current phase.

use std::time::{Duration, Instant};

/// CycleTimer - wall-clock timer with per-phase laps
#[derive(Debug, Clone)]
pub struct CycleTimer {
    start: Instant,
    lap_start: Instant,
    phases: Vec<(&'static str, Duration)>,
}

impl CycleTimer {
    /// Create new timer
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            lap_start: now,
            phases: Vec::new(),
        }
    }

    /// Close the current phase under `name` and start the next one
    pub fn lap(&mut self, name: &'static str) -> Duration {
        let now = Instant::now();
        let duration = now - self.lap_start;
        self.lap_start = now;
        self.phases.push((name, duration));
        duration
    }

    /// Phases closed so far, in order
    pub fn phases(&self) -> &[(&'static str, Duration)] {
        &self.phases
    }

    pub fn into_phases(self) -> Vec<(&'static str, Duration)> {
        self.phases
    }

    /// Get elapsed time since creation
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Get elapsed microseconds
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed().as_micros() as u64
    }

    /// Get elapsed milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for CycleTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_laps_in_order() {
        let mut timer = CycleTimer::new();
        timer.lap("repair");
        timer.lap("unlink");
        let names: Vec<_> = timer.phases().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["repair", "unlink"]);
        let total: Duration = timer.phases().iter().map(|(_, d)| *d).sum();
        assert!(total <= timer.elapsed());
    }
}
