//! Consensus: replacing a stalled federated server by electing an audit server.
//!
//! When a federated server fails to produce its end-of-minute message, the
//! audit servers volunteer to take over its process-list slot and the
//! federated servers agree on exactly one of them:
//! - Each federated server votes for the first valid volunteer it sees.
//! - A majority of votes for one volunteer becomes a majority decision.
//! - A majority of agreeing decisions becomes an insist.
//! - A majority of acknowledgements of an insist becomes a publish, which
//!   authorizes the volunteer.
//!
//! ## Module overview
//!
//! - [`round`]: Per-participant state machine (FedStart → … → Publishing).
//! - [`volunteer_control`]: Bounded ranked-vote aggregation for one volunteer.
//! - [`validation`]: Who may send what, and when an aggregate is well formed.
//! - [`error`]: Consensus error types.

pub mod error;
pub mod round;
pub mod validation;
pub mod volunteer_control;

pub use error::ConsensusError;
pub use round::{Round, RoundState, RoundView, Step};
pub use volunteer_control::VolunteerControl;
