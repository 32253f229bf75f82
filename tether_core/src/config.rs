//! Runtime limits for the Tether virtual machine.

use serde::Deserialize;

/// Default operand stack depth.
pub const STACK_MAX: usize = 256;

/// Default number of arena cells available to one VM.
pub const ARENA_CAPACITY: usize = 1024;

/// VM configuration. Limits only; the VM enforces them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Maximum operand stack depth.
    pub stack_max: usize,
    /// Maximum number of arena cells.
    pub arena_capacity: usize,
    /// Emit a trace event for every executed instruction.
    pub trace: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            stack_max: STACK_MAX,
            arena_capacity: ARENA_CAPACITY,
            trace: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let config = VmConfig::default();
        assert_eq!(config.stack_max, 256);
        assert_eq!(config.arena_capacity, 1024);
        assert!(!config.trace);
    }
}
