mod engine;
mod flow;
mod stats;
mod technique;
mod transition;

pub use engine::{TimerEngine, TimerState};
pub use flow::{gate_applies, FlowDecision};
pub use stats::SessionStats;
pub use technique::{Catalog, Durations, SessionType, Technique};
pub use transition::{next_session_type, LONG_BREAK_EVERY};
