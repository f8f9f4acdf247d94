//! Deterministic FIFO delivery.

use std::collections::VecDeque;

use crate::engine::{DirectedMessage, ElectionEngine};
use crate::ExplorerError;

/// Delivers messages one at a time in arrival order, broadcasting everything
/// a participant emits to all other participants.
#[derive(Clone)]
pub struct Router<E: ElectionEngine> {
    participants: Vec<E>,
    queue: VecDeque<DirectedMessage<E::Message>>,
    delivered: usize,
}

impl<E: ElectionEngine> Router<E> {
    pub fn new(participants: Vec<E>) -> Result<Self, ExplorerError> {
        if participants.is_empty() {
            return Err(ExplorerError::NoParticipants);
        }
        Ok(Self {
            participants,
            queue: VecDeque::new(),
            delivered: 0,
        })
    }

    pub fn send(&mut self, msg: DirectedMessage<E::Message>) -> Result<(), ExplorerError> {
        if msg.target >= self.participants.len() {
            return Err(ExplorerError::UnknownTarget {
                target: msg.target,
                participants: self.participants.len(),
            });
        }
        self.queue.push_back(msg);
        Ok(())
    }

    /// Queue `msg` for every participant except `from`.
    pub fn broadcast(&mut self, from: Option<usize>, msg: E::Message) {
        for target in (0..self.participants.len()).filter(|&p| Some(p) != from) {
            self.queue.push_back(DirectedMessage::new(target, msg.clone()));
        }
    }

    /// Deliver the oldest pending message. Returns false once nothing is
    /// pending. A failed delivery is dropped from the queue.
    pub fn step(&mut self) -> Result<bool, ExplorerError> {
        let Some(next) = self.queue.pop_front() else {
            return Ok(false);
        };
        let delivery = self.participants[next.target].execute(&next.msg)?;
        self.delivered += 1;
        tracing::trace!(delivery = %next, changed = delivery.changed, "routed");
        for msg in delivery.emitted {
            self.broadcast(Some(next.target), msg);
        }
        Ok(true)
    }

    /// Deliver until nothing is pending. Returns the number of deliveries.
    pub fn run(&mut self, max_steps: usize) -> Result<usize, ExplorerError> {
        let start = self.delivered;
        while self.delivered - start < max_steps {
            if !self.step()? {
                return Ok(self.delivered - start);
            }
        }
        if self.queue.is_empty() {
            Ok(self.delivered - start)
        } else {
            Err(ExplorerError::StepLimit(max_steps))
        }
    }

    pub fn participants(&self) -> &[E] {
        &self.participants
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn committed(&self) -> usize {
        self.participants.iter().filter(|p| p.committed()).count()
    }

    pub fn outcomes(&self) -> Vec<Option<E::Outcome>> {
        self.participants.iter().map(|p| p.outcome()).collect()
    }
}
