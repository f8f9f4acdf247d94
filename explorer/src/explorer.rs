//! Exhaustive exploration of message delivery orders.
//!
//! [`Explorer::explore`] performs a depth-first search over every order in
//! which the pending messages can be delivered. At each node one message is
//! taken out of the pending set and delivered to its target. Anything the
//! target emits is addressed to every other participant and joins the set.
//! The target is snapshotted before and restored after each delivery, so
//! sibling branches never observe each other's mutations.
//!
//! A node stops descending when:
//! - the depth limit is exceeded (a limit hit),
//! - more than half the participants have committed (a solution),
//! - the same participant states and pending messages were already searched
//!   from the same or a shallower depth (a mirror),
//! - no delivery changed anything (a stall).
//!
//! Deliveries that change nothing are counted as cuts. Two participants
//! committed to different outcomes is a collision, the one safety failure.

use std::collections::HashMap;

use rayon::prelude::*;

use fedelect_crypto::blake2b_256;
use fedelect_utils::ProgressCounter;

use crate::engine::{DirectedMessage, ElectionEngine};
use crate::report::{Collision, ExplorationReport};
use crate::ExplorerError;

/// Mirrors are only looked for below this depth; shallow states rarely repeat.
const MIRROR_MIN_DEPTH: usize = 4;

/// How the search below a node ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Dive {
    limit_hit: bool,
    solved: bool,
}

impl Dive {
    fn absorb(&mut self, below: Dive) {
        self.limit_hit |= below.limit_hit;
        self.solved |= below.solved;
    }
}

enum Entry {
    Descend(usize),
    Leaf(Dive),
}

enum Commits<O> {
    Pending,
    Solved(O),
    Collision(O, O),
}

#[derive(Clone)]
pub struct Explorer<E: ElectionEngine> {
    participants: Vec<E>,
    limit: usize,
    fan_out: bool,
    mirrors: bool,
    progress: ProgressCounter,
    report: ExplorationReport<E::Outcome>,
    path: Vec<DirectedMessage<E::Message>>,
    /// Shallowest depth each searched state was entered at.
    seen: HashMap<[u8; 32], usize>,
}

impl<E: ElectionEngine> Explorer<E> {
    pub fn new(participants: Vec<E>, limit: usize) -> Result<Self, ExplorerError> {
        if participants.is_empty() {
            return Err(ExplorerError::NoParticipants);
        }
        Ok(Self {
            participants,
            limit,
            fan_out: true,
            mirrors: false,
            progress: ProgressCounter::new(0),
            report: ExplorationReport::default(),
            path: Vec::new(),
            seen: HashMap::new(),
        })
    }

    /// Whether emitted messages join the pending set. Without fan-out only
    /// the initial messages are permuted.
    pub fn with_fan_out(mut self, fan_out: bool) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Prune states already searched from the same or a shallower depth.
    /// Needs engines that report a fingerprint; otherwise it has no effect.
    pub fn with_mirrors(mut self, mirrors: bool) -> Self {
        self.mirrors = mirrors;
        self
    }

    /// Log progress every `interval` dives; 0 disables.
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress = ProgressCounter::new(interval);
        self
    }

    pub fn participants(&self) -> &[E] {
        &self.participants
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn reset(&mut self) {
        self.report = ExplorationReport::default();
        self.path.clear();
        self.seen.clear();
    }

    /// Explore every delivery order of `pending`. Participants are left as
    /// they were before the call, also when an engine fails.
    pub fn explore(
        &mut self,
        pending: Vec<DirectedMessage<E::Message>>,
    ) -> Result<ExplorationReport<E::Outcome>, ExplorerError> {
        self.check_targets(&pending)?;
        self.reset();
        self.dive(&pending, 0)?;
        tracing::info!(
            solutions = self.report.solutions,
            collisions = self.report.collisions,
            stalls = self.report.stalls,
            mirrors = self.report.mirrors,
            limit_hits = self.report.limit_hits,
            "exploration finished"
        );
        Ok(std::mem::take(&mut self.report))
    }

    fn check_targets(&self, pending: &[DirectedMessage<E::Message>]) -> Result<(), ExplorerError> {
        let participants = self.participants.len();
        match pending.iter().find(|m| m.target >= participants) {
            Some(m) => Err(ExplorerError::UnknownTarget {
                target: m.target,
                participants,
            }),
            None => Ok(()),
        }
    }

    fn dive(
        &mut self,
        pending: &[DirectedMessage<E::Message>],
        depth: usize,
    ) -> Result<Dive, ExplorerError> {
        let depth = match self.enter(pending, depth)? {
            Entry::Descend(depth) => depth,
            Entry::Leaf(done) => return Ok(done),
        };

        let mut result = Dive::default();
        let mut changed_any = false;
        for i in 0..pending.len() {
            if let Some(below) = self.branch(pending, i, depth)? {
                changed_any = true;
                result.absorb(below);
            }
        }
        if !changed_any {
            self.stall(depth);
        }
        Ok(result)
    }

    /// Bookkeeping on entering a node: the node's depth, or how the node
    /// ended if it does not descend.
    fn enter(
        &mut self,
        pending: &[DirectedMessage<E::Message>],
        depth: usize,
    ) -> Result<Entry, ExplorerError> {
        self.report.visits.increment(depth);
        let depth = depth + 1;

        if let Some(dives) = self.progress.tick() {
            tracing::info!(
                dives,
                depth,
                pending = pending.len(),
                solutions = self.report.solutions,
                collisions = self.report.collisions,
                mirrors = self.report.mirrors,
                "exploring"
            );
        }

        if depth > self.limit {
            self.report.limit_hits += 1;
            self.report.leaves += 1;
            return Ok(Entry::Leaf(Dive {
                limit_hit: true,
                solved: false,
            }));
        }
        self.report.max_depth = self.report.max_depth.max(depth);

        match self.commits() {
            Commits::Solved(outcome) => {
                self.report.solutions += 1;
                self.report.leaves += 1;
                self.report.solutions_at.increment(depth);
                *self.report.winners.entry(outcome).or_default() += 1;
                return Ok(Entry::Leaf(Dive {
                    limit_hit: false,
                    solved: true,
                }));
            }
            Commits::Collision(a, b) => {
                self.report.collisions += 1;
                tracing::warn!(depth, first = ?a, second = ?b, "participants committed to different outcomes");
                if self.report.first_collision.is_none() {
                    self.report.first_collision = Some(Collision {
                        depth,
                        outcomes: (a, b),
                        path: self.path.iter().map(ToString::to_string).collect(),
                    });
                }
            }
            Commits::Pending => {}
        }

        if self.mirrors && depth > MIRROR_MIN_DEPTH {
            if let Some(key) = self.mirror_key(pending)? {
                match self.seen.get(&key) {
                    Some(&first) if first <= depth => {
                        self.report.mirrors += 1;
                        self.report.leaves += 1;
                        self.report.mirrors_at.increment(depth);
                        return Ok(Entry::Leaf(Dive::default()));
                    }
                    _ => {
                        self.seen.insert(key, depth);
                    }
                }
            }
        }
        Ok(Entry::Descend(depth))
    }

    /// Digest of every participant's fingerprint and the pending messages
    /// as a multiset. `None` if some participant has no fingerprint.
    fn mirror_key(
        &self,
        pending: &[DirectedMessage<E::Message>],
    ) -> Result<Option<[u8; 32]>, ExplorerError> {
        let mut states = Vec::with_capacity(self.participants.len());
        for participant in &self.participants {
            match participant.fingerprint()? {
                Some(state) => states.push(state),
                None => return Ok(None),
            }
        }
        let mut messages = pending
            .iter()
            .map(|m| bincode::serialize(&(m.target as u64, &m.msg)))
            .collect::<Result<Vec<_>, _>>()?;
        messages.sort_unstable();
        let encoded = bincode::serialize(&(states, messages))?;
        Ok(Some(blake2b_256(&encoded)))
    }

    /// Deliver `pending[i]` and search below it. Returns `None` if the
    /// delivery changed nothing or was skipped.
    fn branch(
        &mut self,
        pending: &[DirectedMessage<E::Message>],
        i: usize,
        depth: usize,
    ) -> Result<Option<Dive>, ExplorerError> {
        let target = pending[i].target;
        if self.participants[target].committed() {
            return Ok(None);
        }

        let snapshot = self.participants[target].clone();
        let below = self.deliver(pending, i, depth);
        self.participants[target] = snapshot;
        below
    }

    fn deliver(
        &mut self,
        pending: &[DirectedMessage<E::Message>],
        i: usize,
        depth: usize,
    ) -> Result<Option<Dive>, ExplorerError> {
        let next = &pending[i];
        let target = next.target;
        let delivery = self.participants[target].execute(&next.msg)?;
        self.report.attempts.increment(depth);

        if !delivery.changed {
            self.report.cuts.increment(depth);
            return Ok(None);
        }

        let mut rest: Vec<_> = pending[..i]
            .iter()
            .chain(&pending[i + 1..])
            .cloned()
            .collect();
        if self.fan_out {
            for msg in delivery.emitted {
                for other in (0..self.participants.len()).filter(|&p| p != target) {
                    rest.push(DirectedMessage::new(other, msg.clone()));
                }
            }
        }
        self.path.push(next.clone());
        let below = self.dive(&rest, depth);
        self.path.pop();
        below.map(Some)
    }

    fn stall(&mut self, depth: usize) {
        self.report.stalls += 1;
        self.report.leaves += 1;
        self.report.stalls_at.increment(depth);
        tracing::debug!(depth, path = self.path.len(), "no delivery changes anything");
    }

    fn commits(&self) -> Commits<E::Outcome> {
        let mut committed = 0;
        let mut first: Option<E::Outcome> = None;
        for outcome in self.participants.iter().filter_map(|p| p.outcome()) {
            committed += 1;
            match &first {
                None => first = Some(outcome),
                Some(seen) if *seen != outcome => {
                    return Commits::Collision(seen.clone(), outcome);
                }
                Some(_) => {}
            }
        }
        match first {
            Some(outcome) if committed > self.participants.len() / 2 => Commits::Solved(outcome),
            _ => Commits::Pending,
        }
    }
}

impl<E> Explorer<E>
where
    E: ElectionEngine + Send + Sync,
    E::Message: Send + Sync,
    E::Outcome: Send + Sync,
{
    /// Like [`Explorer::explore`], with each root branch searched on its own
    /// rayon worker. Reports are merged in root order. Workers keep separate
    /// mirror tables, so with mirrors on they prune less than a sequential run.
    pub fn explore_parallel(
        &mut self,
        pending: Vec<DirectedMessage<E::Message>>,
    ) -> Result<ExplorationReport<E::Outcome>, ExplorerError> {
        self.check_targets(&pending)?;
        self.reset();
        let depth = match self.enter(&pending, 0)? {
            Entry::Descend(depth) => depth,
            Entry::Leaf(_) => return Ok(std::mem::take(&mut self.report)),
        };

        let root: &Self = self;
        let branches: Vec<(Option<Dive>, ExplorationReport<E::Outcome>)> = (0..pending.len())
            .into_par_iter()
            .map(|i| -> Result<_, ExplorerError> {
                let mut worker = root.clone();
                worker.report = ExplorationReport::default();
                let below = worker.branch(&pending, i, depth)?;
                Ok((below, worker.report))
            })
            .collect::<Result<_, ExplorerError>>()?;

        let mut changed_any = false;
        for (below, report) in branches {
            changed_any |= below.is_some();
            self.report.merge(report);
        }
        if !changed_any {
            self.stall(depth);
        }
        tracing::info!(
            solutions = self.report.solutions,
            collisions = self.report.collisions,
            mirrors = self.report.mirrors,
            workers = rayon::current_num_threads(),
            "parallel exploration finished"
        );
        Ok(std::mem::take(&mut self.report))
    }
}
