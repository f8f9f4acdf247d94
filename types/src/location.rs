//! Process-list slot addressing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The exact process-list slot whose leader stalled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessListLocation {
    /// Index of the virtual machine (leader slot) within the minute.
    pub vm: u32,
    pub minute: u32,
    /// Directory block height.
    pub height: u64,
}

impl ProcessListLocation {
    pub fn new(vm: u32, minute: u32, height: u64) -> Self {
        Self { vm, minute, height }
    }
}

impl fmt::Display for ProcessListLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.height, self.minute, self.vm)
    }
}
