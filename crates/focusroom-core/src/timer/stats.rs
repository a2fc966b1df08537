use serde::{Deserialize, Serialize};

use super::technique::SessionType;

/// Append-only completion counters.
///
/// The streak is a lifetime count of completed work sessions; nothing
/// resets it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_sessions: u64,
    pub streak: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_completion(&mut self, session_type: SessionType) {
        self.total_sessions += 1;
        if session_type == SessionType::Work {
            self.streak += 1;
        }
    }
}
