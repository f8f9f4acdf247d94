//! Exhaustive exploration of leader-election message orderings.
//!
//! The election is safe if no delivery order leads two participants to
//! commit to different volunteers. This crate checks that by brute force.
//!
//! ## Module overview
//!
//! - [`engine`]: The participant interface driven by the explorer, implemented for [`fedelect_consensus::Round`].
//! - [`explorer`]: Depth-bounded search over every delivery order.
//! - [`report`]: Counters and the first safety collision found.
//! - [`router`]: Deterministic FIFO delivery until quiescence.
//! - [`scenario`]: Builds the rounds and opening messages for a stalled slot.
//! - [`config`]: Explorer configuration with TOML support.
//! - [`error`]: Explorer error types.

pub mod config;
pub mod engine;
pub mod error;
pub mod explorer;
pub mod report;
pub mod router;
pub mod scenario;

pub use config::ExplorerConfig;
pub use engine::{Delivery, DirectedMessage, ElectionEngine};
pub use error::ExplorerError;
pub use explorer::Explorer;
pub use report::{Collision, ExplorationReport};
pub use router::Router;
pub use scenario::Scenario;
