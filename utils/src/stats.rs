//! Counters for tree-shaped searches.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A count per search depth. Grows on demand.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthHistogram {
    counts: Vec<u64>,
}

impl DepthHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, depth: usize) {
        self.add(depth, 1);
    }

    pub fn add(&mut self, depth: usize, value: u64) {
        if self.counts.len() <= depth {
            self.counts.resize(depth + 1, 0);
        }
        self.counts[depth] += value;
    }

    pub fn get(&self, depth: usize) -> u64 {
        self.counts.get(depth).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Deepest depth with a non-zero count.
    pub fn max_depth(&self) -> Option<usize> {
        self.counts.iter().rposition(|&c| c > 0)
    }

    /// Non-zero `(depth, count)` pairs in depth order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(d, c)| (d, *c))
    }

    pub fn merge(&mut self, other: &Self) {
        for (depth, count) in other.iter() {
            self.add(depth, count);
        }
    }
}

/// A thread-safe event counter that reports every `interval` events.
#[derive(Clone, Debug)]
pub struct ProgressCounter {
    count: Arc<AtomicU64>,
    interval: u64,
}

impl ProgressCounter {
    /// `interval == 0` never reports.
    pub fn new(interval: u64) -> Self {
        Self {
            count: Arc::new(AtomicU64::new(0)),
            interval,
        }
    }

    /// Count one event. Returns the running total when it lands on a multiple
    /// of the interval.
    pub fn tick(&self) -> Option<u64> {
        let n = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        (self.interval > 0 && n % self.interval == 0).then_some(n)
    }

    pub fn get(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
