use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{SessionType, Technique};

/// Payload of the completion event, fired once per countdown reaching zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCompleted {
    pub session_type: SessionType,
    pub technique: Technique,
    /// Counters after this completion was recorded.
    pub total_sessions: u64,
    pub streak: u64,
    pub at: DateTime<Utc>,
}

/// Every state change in the engine produces an Event.
/// Hosts render from them; notifiers subscribe to completions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        session_type: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        session_type: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted(SessionCompleted),
    /// Flow technique finished a work block; waiting for continue/break.
    FlowDecisionRequested {
        at: DateTime<Utc>,
    },
    /// User chose to keep working instead of taking the break.
    FlowContinued {
        flow_skipped_breaks: u64,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// Automatic move to the next session after a completion.
    SessionAdvanced {
        from: SessionType,
        to: SessionType,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// Manual session type selection.
    SessionSwitched {
        session_type: SessionType,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TechniqueSwitched {
        technique: Technique,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn as_completion(&self) -> Option<&SessionCompleted> {
        match self {
            Event::SessionCompleted(completed) => Some(completed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_variant() {
        let event = Event::TimerPaused {
            remaining_secs: 42,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TimerPaused");
        assert_eq!(json["remaining_secs"], 42);
    }

    #[test]
    fn completion_payload_is_flattened_into_tag() {
        let event = Event::SessionCompleted(SessionCompleted {
            session_type: SessionType::Work,
            technique: Technique::NinetyThirty,
            total_sessions: 1,
            streak: 1,
            at: Utc::now(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SessionCompleted");
        assert_eq!(json["technique"], "90_30");
        assert!(event.as_completion().is_some());
    }
}
