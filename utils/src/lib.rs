//! Shared utilities for the election workspace.

pub mod logging;
pub mod stats;

pub use logging::{init_logging, LogFormat};
pub use stats::{DepthHistogram, ProgressCounter};
