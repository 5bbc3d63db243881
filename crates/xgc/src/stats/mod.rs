//! Stats Module - Collector Statistics
//!
//! Counts cycles, slots unlinked and repaired, and references released,
//! and keeps the size log: one `(root_count, edge_count)` pair per built
//! edge graph, drained by [`CollectorStats::take_size_log`].

pub mod timer;

pub use timer::CycleTimer;

use serde::Serialize;
use std::time::Duration;

/// CollectorStats - running totals for one collector instance
#[derive(Debug, Clone, Default)]
pub struct CollectorStats {
    cycles: u64,
    failed_cycles: u64,
    total_unlinked: u64,
    total_repaired: u64,
    total_released: u64,
    total_duration: Duration,
    max_duration: Duration,
    size_log: Vec<(usize, usize)>,
}

impl CollectorStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the size of a built edge graph
    pub fn record_graph(&mut self, root_count: usize, edge_count: usize) {
        self.size_log.push((root_count, edge_count));
    }

    /// Record a completed cycle
    pub fn record_cycle(&mut self, unlinked: usize, repaired: usize, duration: Duration) {
        self.cycles += 1;
        self.total_unlinked += unlinked as u64;
        self.total_repaired += repaired as u64;
        self.total_duration += duration;
        self.max_duration = self.max_duration.max(duration);
    }

    pub fn record_failure(&mut self) {
        self.failed_cycles += 1;
    }

    /// Record references released through dead-reference notifications
    pub fn record_released(&mut self, count: usize) {
        self.total_released += count as u64;
    }

    /// Drain the size log
    pub fn take_size_log(&mut self) -> Vec<(usize, usize)> {
        std::mem::take(&mut self.size_log)
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Get summary statistics
    pub fn summary(&self) -> StatsSummary {
        let avg_cycle_ms = if self.cycles == 0 {
            0.0
        } else {
            self.total_duration.as_secs_f64() * 1000.0 / self.cycles as f64
        };
        StatsSummary {
            cycles: self.cycles,
            failed_cycles: self.failed_cycles,
            total_unlinked: self.total_unlinked,
            total_repaired: self.total_repaired,
            total_released: self.total_released,
            avg_cycle_ms,
            max_cycle_ms: self.max_duration.as_secs_f64() * 1000.0,
        }
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Summary statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsSummary {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub total_unlinked: u64,
    pub total_repaired: u64,
    pub total_released: u64,
    /// Average cycle time (ms)
    pub avg_cycle_ms: f64,
    /// Longest cycle time (ms)
    pub max_cycle_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_log_drains() {
        let mut stats = CollectorStats::new();
        stats.record_graph(2, 5);
        stats.record_graph(0, 0);
        assert_eq!(stats.take_size_log(), vec![(2, 5), (0, 0)]);
        assert!(stats.take_size_log().is_empty());
    }

    #[test]
    fn test_summary() {
        let mut stats = CollectorStats::new();
        stats.record_cycle(3, 1, Duration::from_millis(4));
        stats.record_cycle(1, 0, Duration::from_millis(2));
        stats.record_released(7);
        stats.record_failure();

        let summary = stats.summary();
        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.failed_cycles, 1);
        assert_eq!(summary.total_unlinked, 4);
        assert_eq!(summary.total_repaired, 1);
        assert_eq!(summary.total_released, 7);
        assert!((summary.avg_cycle_ms - 3.0).abs() < 1e-6);
        assert!((summary.max_cycle_ms - 4.0).abs() < 1e-6);

        stats.reset();
        assert_eq!(stats.cycles(), 0);
    }
}
