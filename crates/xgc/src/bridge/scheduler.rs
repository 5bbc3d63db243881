//! Cycle Scheduler - call-driven collection triggers
//!
//! No background timer: every bridge call reports itself with the current
//! time and gets back what is due. Tests pass synthetic instants, so
//! scheduling is deterministic.

use crate::config::XgcConfig;
use std::time::{Duration, Instant};

/// What a call should carry out before crossing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tick {
    /// Scavenge dead references and release them on the peer
    pub piggyback: bool,
    /// Run a full collection cycle
    pub cycle_due: bool,
}

/// CycleScheduler - call counter plus clock
#[derive(Debug, Clone)]
pub struct CycleScheduler {
    piggyback_threshold: u32,
    cycle_call_threshold: u64,
    cycle_interval: Option<Duration>,

    calls_since_piggyback: u32,
    calls_since_cycle: u64,
    total_calls: u64,

    /// Set by the first call
    last_cycle: Option<Instant>,
}

impl CycleScheduler {
    pub fn new(config: &XgcConfig) -> Self {
        Self {
            piggyback_threshold: config.piggyback_threshold.max(1),
            cycle_call_threshold: config.cycle_call_threshold.max(1),
            cycle_interval: config.cycle_interval(),
            calls_since_piggyback: 0,
            calls_since_cycle: 0,
            total_calls: 0,
            last_cycle: None,
        }
    }

    /// Count one call made at `now`
    ///
    /// Every `piggyback_threshold`-th call piggybacks. A cycle is due once
    /// `cycle_call_threshold` calls or `cycle_interval` have passed since
    /// the last completed cycle, and stays due until
    /// [`cycle_completed`](Self::cycle_completed) is called.
    pub fn on_call(&mut self, now: Instant) -> Tick {
        self.total_calls += 1;
        self.calls_since_piggyback += 1;
        self.calls_since_cycle += 1;
        let last_cycle = *self.last_cycle.get_or_insert(now);

        let piggyback = self.calls_since_piggyback >= self.piggyback_threshold;
        if piggyback {
            self.calls_since_piggyback = 0;
        }

        let by_count = self.calls_since_cycle >= self.cycle_call_threshold;
        let by_time = self
            .cycle_interval
            .map_or(false, |interval| now.saturating_duration_since(last_cycle) >= interval);

        Tick {
            piggyback,
            cycle_due: by_count || by_time,
        }
    }

    /// Restart the cycle counters after a completed cycle
    pub fn cycle_completed(&mut self, now: Instant) {
        self.calls_since_cycle = 0;
        self.last_cycle = Some(now);
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls
    }

    pub fn calls_since_cycle(&self) -> u64 {
        self.calls_since_cycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(piggyback: u32, calls: u64, interval_ms: u64) -> XgcConfig {
        XgcConfig {
            piggyback_threshold: piggyback,
            cycle_call_threshold: calls,
            cycle_interval_ms: interval_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_piggyback_every_nth_call() {
        let mut scheduler = CycleScheduler::new(&config(3, 1000, 0));
        let now = Instant::now();
        let ticks: Vec<bool> = (0..7).map(|_| scheduler.on_call(now).piggyback).collect();
        assert_eq!(ticks, vec![false, false, true, false, false, true, false]);
        assert_eq!(scheduler.total_calls(), 7);
    }

    #[test]
    fn test_cycle_by_call_count() {
        let mut scheduler = CycleScheduler::new(&config(100, 4, 0));
        let now = Instant::now();
        for _ in 0..3 {
            assert!(!scheduler.on_call(now).cycle_due);
        }
        assert!(scheduler.on_call(now).cycle_due);
        // stays due until completed
        assert!(scheduler.on_call(now).cycle_due);
        scheduler.cycle_completed(now);
        assert_eq!(scheduler.calls_since_cycle(), 0);
        assert!(!scheduler.on_call(now).cycle_due);
    }

    #[test]
    fn test_cycle_by_interval() {
        let mut scheduler = CycleScheduler::new(&config(100, 1_000_000, 50));
        let start = Instant::now();
        assert!(!scheduler.on_call(start).cycle_due);
        assert!(!scheduler.on_call(start + Duration::from_millis(49)).cycle_due);
        let later = start + Duration::from_millis(50);
        assert!(scheduler.on_call(later).cycle_due);
        scheduler.cycle_completed(later);
        assert!(!scheduler.on_call(later + Duration::from_millis(10)).cycle_due);
    }
}
