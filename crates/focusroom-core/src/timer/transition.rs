//! Session sequencing policy.
//!
//! Work is followed by a break; every break is followed by work. The break
//! after every fourth completion counted by `total_sessions` is a long one.

use super::technique::SessionType;

/// Completions per long-break cycle.
pub const LONG_BREAK_EVERY: u64 = 4;

/// Pick the session that follows `current`.
///
/// `completed_before` is `total_sessions` as it stood *before* the session
/// that just finished was counted.
pub fn next_session_type(current: SessionType, completed_before: u64) -> SessionType {
    match current {
        SessionType::Work if completed_before % LONG_BREAK_EVERY == LONG_BREAK_EVERY - 1 => {
            SessionType::LongBreak
        }
        SessionType::Work => SessionType::ShortBreak,
        SessionType::ShortBreak | SessionType::LongBreak => SessionType::Work,
    }
}
