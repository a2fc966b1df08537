//! Flow-mode break skipping.
//!
//! When a work session completes under the flow technique the engine does
//! not advance on its own. It parks a [`FlowDecision`] and waits, with no
//! timeout, until the host answers whether to keep working.

use serde::{Deserialize, Serialize};

use super::technique::{SessionType, Technique};

/// A pending "skip the break?" question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDecision {
    /// `total_sessions` before the completed work session was counted.
    /// Declining the skip feeds this to the transition policy.
    pub completed_before: u64,
}

/// Whether the gate intercepts the completion of `completed` under `technique`.
pub fn gate_applies(technique: Technique, completed: SessionType) -> bool {
    technique.offers_break_skip() && completed == SessionType::Work
}
