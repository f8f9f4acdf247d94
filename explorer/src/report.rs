//! Counters gathered while exploring.

use std::collections::BTreeMap;
use std::fmt;

use fedelect_utils::DepthHistogram;

/// Two participants committed to different outcomes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Collision<O> {
    pub depth: usize,
    pub outcomes: (O, O),
    /// Deliveries leading here, outermost first.
    pub path: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplorationReport<O> {
    /// Dive entries per depth.
    pub visits: DepthHistogram,
    /// Deliveries tried per depth.
    pub attempts: DepthHistogram,
    /// Deliveries that changed nothing, per depth.
    pub cuts: DepthHistogram,
    pub solutions_at: DepthHistogram,
    pub stalls_at: DepthHistogram,
    pub mirrors_at: DepthHistogram,

    pub leaves: u64,
    pub limit_hits: u64,
    pub solutions: u64,
    /// Branches where every remaining delivery was a cut.
    pub stalls: u64,
    /// Nodes pruned because an equivalent state was already searched at
    /// the same or a shallower depth.
    pub mirrors: u64,
    pub collisions: u64,
    pub max_depth: usize,
    pub first_collision: Option<Collision<O>>,
    /// Solutions per committed outcome.
    pub winners: BTreeMap<O, u64>,
}

impl<O> Default for ExplorationReport<O> {
    fn default() -> Self {
        Self {
            visits: DepthHistogram::new(),
            attempts: DepthHistogram::new(),
            cuts: DepthHistogram::new(),
            solutions_at: DepthHistogram::new(),
            stalls_at: DepthHistogram::new(),
            mirrors_at: DepthHistogram::new(),
            leaves: 0,
            limit_hits: 0,
            solutions: 0,
            stalls: 0,
            mirrors: 0,
            collisions: 0,
            max_depth: 0,
            first_collision: None,
            winners: BTreeMap::new(),
        }
    }
}

impl<O: Clone + Ord> ExplorationReport<O> {
    /// True if no two participants ever committed to different outcomes.
    pub fn is_safe(&self) -> bool {
        self.collisions == 0
    }

    /// Fold in a report from an independent subtree.
    pub fn merge(&mut self, other: ExplorationReport<O>) {
        self.visits.merge(&other.visits);
        self.attempts.merge(&other.attempts);
        self.cuts.merge(&other.cuts);
        self.solutions_at.merge(&other.solutions_at);
        self.stalls_at.merge(&other.stalls_at);
        self.mirrors_at.merge(&other.mirrors_at);
        self.leaves += other.leaves;
        self.limit_hits += other.limit_hits;
        self.solutions += other.solutions;
        self.stalls += other.stalls;
        self.mirrors += other.mirrors;
        self.collisions += other.collisions;
        self.max_depth = self.max_depth.max(other.max_depth);
        if self.first_collision.is_none() {
            self.first_collision = other.first_collision;
        }
        for (outcome, count) in other.winners {
            *self.winners.entry(outcome).or_default() += count;
        }
    }
}

fn write_histogram(f: &mut fmt::Formatter<'_>, name: &str, h: &DepthHistogram) -> fmt::Result {
    write!(f, "  {name:<10}")?;
    for (depth, count) in h.iter() {
        write!(f, " {depth}:{count}")?;
    }
    writeln!(f)
}

impl<O: fmt::Debug> fmt::Display for ExplorationReport<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "leaves={} limit_hits={} solutions={} stalls={} mirrors={} collisions={} max_depth={}",
            self.leaves,
            self.limit_hits,
            self.solutions,
            self.stalls,
            self.mirrors,
            self.collisions,
            self.max_depth
        )?;
        write_histogram(f, "visits", &self.visits)?;
        write_histogram(f, "attempts", &self.attempts)?;
        write_histogram(f, "cuts", &self.cuts)?;
        write_histogram(f, "solutions", &self.solutions_at)?;
        write_histogram(f, "stalls", &self.stalls_at)?;
        write_histogram(f, "mirrors", &self.mirrors_at)?;
        if let Some(collision) = &self.first_collision {
            writeln!(
                f,
                "  first collision at depth {}: {:?} vs {:?}",
                collision.depth, collision.outcomes.0, collision.outcomes.1
            )?;
            for step in &collision.path {
                writeln!(f, "    {step}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_adds_counts_and_keeps_first_collision() {
        let mut a: ExplorationReport<u32> = ExplorationReport::default();
        a.solutions = 2;
        a.winners.insert(7, 2);
        a.attempts.add(1, 3);
        a.max_depth = 4;

        let mut b = ExplorationReport::default();
        b.solutions = 1;
        b.collisions = 1;
        b.mirrors = 4;
        b.mirrors_at.add(5, 4);
        b.winners.insert(7, 1);
        b.attempts.add(1, 1);
        b.max_depth = 6;
        b.first_collision = Some(Collision {
            depth: 5,
            outcomes: (1, 2),
            path: vec!["x".into()],
        });

        a.merge(b);
        assert_eq!(a.solutions, 3);
        assert_eq!(a.winners[&7], 3);
        assert_eq!(a.attempts.get(1), 4);
        assert_eq!(a.max_depth, 6);
        assert_eq!(a.mirrors, 4);
        assert_eq!(a.mirrors_at.get(5), 4);
        assert!(!a.is_safe());
        assert_eq!(a.first_collision.unwrap().depth, 5);
    }

    #[test]
    fn summary_lists_histograms() {
        let mut report: ExplorationReport<u32> = ExplorationReport::default();
        report.attempts.add(1, 3);
        let text = report.to_string();
        assert!(text.contains("mirrors=0 collisions=0"));
        assert!(text.contains("attempts   1:3"));
    }
}
