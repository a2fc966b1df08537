//! Timer engine implementation.
//!
//! The engine is a pure state machine with no internal thread. The caller
//! drives it with `tick()` once per second (see [`crate::driver`] for the
//! async driver) and issues commands from the UI.
//!
//! ## Session cycle
//!
//! ```text
//! work --(complete)--> [flow gate] --> short_break | long_break --(complete)--> work
//! ```
//!
//! Every completion is paused on arrival: the next session is loaded with
//! its full duration and `running == false` until the user resumes.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(Catalog::builtin());
//! engine.toggle_running()?;
//! // once per second:
//! let events = engine.tick()?; // contains SessionCompleted when time runs out
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::flow::{self, FlowDecision};
use super::stats::SessionStats;
use super::technique::{Catalog, SessionType, Technique};
use super::transition::next_session_type;
use crate::error::TransitionError;
use crate::events::{Event, SessionCompleted};

/// Read-only view of the engine for hosts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    pub remaining_seconds: u64,
    pub running: bool,
    pub session_type: SessionType,
    pub technique: Technique,
    pub total_sessions: u64,
    pub streak: u64,
    pub flow_skipped_breaks: u64,
    pub awaiting_flow_decision: bool,
    pub duration_secs: u64,
    /// 0.0 .. 1.0 progress within the current session.
    pub progress: f64,
}

/// Core timer engine.
#[derive(Debug, Clone)]
pub struct TimerEngine {
    catalog: Catalog,
    remaining_secs: u64,
    running: bool,
    session_type: SessionType,
    technique: Technique,
    stats: SessionStats,
    flow_skipped_breaks: u64,
    pending_flow: Option<FlowDecision>,
}

impl TimerEngine {
    /// Create an engine paused at the start of a classic work session.
    pub fn new(catalog: Catalog) -> Self {
        Self::with_technique(catalog, Technique::Classic)
    }

    pub fn with_technique(catalog: Catalog, technique: Technique) -> Self {
        let remaining_secs = catalog.duration_secs(technique, SessionType::Work);
        Self {
            catalog,
            remaining_secs,
            running: false,
            session_type: SessionType::Work,
            technique,
            stats: SessionStats::new(),
            flow_skipped_breaks: 0,
            pending_flow: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn technique(&self) -> Technique {
        self.technique
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn flow_skipped_breaks(&self) -> u64 {
        self.flow_skipped_breaks
    }

    pub fn awaiting_flow_decision(&self) -> bool {
        self.pending_flow.is_some()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn total_secs(&self) -> u64 {
        self.catalog.duration_secs(self.technique, self.session_type)
    }

    pub fn progress(&self) -> f64 {
        self.catalog
            .progress_fraction(self.technique, self.session_type, self.remaining_secs)
    }

    pub fn snapshot(&self) -> TimerState {
        TimerState {
            remaining_seconds: self.remaining_secs,
            running: self.running,
            session_type: self.session_type,
            technique: self.technique,
            total_sessions: self.stats.total_sessions,
            streak: self.stats.streak,
            flow_skipped_breaks: self.flow_skipped_breaks,
            awaiting_flow_decision: self.awaiting_flow_decision(),
            duration_secs: self.total_secs(),
            progress: self.progress(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or pause the countdown.
    ///
    /// Rejected while a flow decision is pending: the clock stays paused
    /// until the decision arrives.
    pub fn toggle_running(&mut self) -> Result<Event, TransitionError> {
        if self.pending_flow.is_some() {
            return Err(TransitionError::AwaitingFlowDecision);
        }
        if self.running {
            Ok(self.stop_clock())
        } else {
            Ok(self.start_clock())
        }
    }

    /// Start the countdown. Does nothing if it is already running.
    pub fn start(&mut self) -> Result<Option<Event>, TransitionError> {
        if self.pending_flow.is_some() {
            return Err(TransitionError::AwaitingFlowDecision);
        }
        if self.running {
            return Ok(None);
        }
        Ok(Some(self.start_clock()))
    }

    /// Pause the countdown. Does nothing if it is already paused.
    pub fn pause(&mut self) -> Option<Event> {
        if !self.running {
            return None;
        }
        Some(self.stop_clock())
    }

    /// Reload the current session's full duration. Counters are untouched.
    pub fn reset(&mut self) -> Vec<Event> {
        let mut events = self.decline_pending_flow();
        self.reload();
        debug!(session = %self.session_type, "timer reset");
        events.push(Event::TimerReset {
            session_type: self.session_type,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        });
        events
    }

    /// Advance the countdown by one second.
    ///
    /// Returns the events produced; empty unless the session completed.
    /// When the countdown lands on zero the completion is processed in the
    /// same call: counters are updated and the next session is loaded (or
    /// the flow decision is parked) before this returns.
    pub fn tick(&mut self) -> Result<Vec<Event>, TransitionError> {
        if !self.running {
            return Err(TransitionError::NotRunning);
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return Ok(Vec::new());
        }
        Ok(self.complete())
    }

    /// Manually select a session type. Discards the running countdown.
    pub fn switch_session_type(&mut self, session_type: SessionType) -> Vec<Event> {
        let mut events = self.decline_pending_flow();
        self.session_type = session_type;
        self.reload();
        debug!(session = %session_type, "session switched");
        events.push(Event::SessionSwitched {
            session_type,
            duration_secs: self.remaining_secs,
            at: Utc::now(),
        });
        events
    }

    /// Change technique. Discards the running countdown and clears the
    /// flow skip counter when the technique actually changes.
    pub fn switch_technique(&mut self, technique: Technique) -> Vec<Event> {
        let mut events = self.decline_pending_flow();
        if technique != self.technique {
            self.flow_skipped_breaks = 0;
        }
        self.technique = technique;
        self.reload();
        debug!(technique = %technique, "technique switched");
        events.push(Event::TechniqueSwitched {
            technique,
            duration_secs: self.remaining_secs,
            at: Utc::now(),
        });
        events
    }

    /// Answer the pending flow question.
    ///
    /// `true` starts another work block without a break; `false` hands the
    /// completion to the transition policy like any other technique.
    pub fn resolve_flow_choice(
        &mut self,
        continue_in_flow: bool,
    ) -> Result<Event, TransitionError> {
        let decision = self
            .pending_flow
            .take()
            .ok_or(TransitionError::NoFlowDecisionPending)?;

        if continue_in_flow {
            self.flow_skipped_breaks += 1;
            self.running = false;
            self.remaining_secs = self.catalog.duration_secs(Technique::Flow, SessionType::Work);
            info!(skipped = self.flow_skipped_breaks, "staying in flow, break skipped");
            Ok(Event::FlowContinued {
                flow_skipped_breaks: self.flow_skipped_breaks,
                duration_secs: self.remaining_secs,
                at: Utc::now(),
            })
        } else {
            info!("flow declined, taking the break");
            Ok(self.advance(decision.completed_before))
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn start_clock(&mut self) -> Event {
        self.running = true;
        debug!(remaining_secs = self.remaining_secs, session = %self.session_type, "timer started");
        Event::TimerStarted {
            session_type: self.session_type,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        }
    }

    fn stop_clock(&mut self) -> Event {
        self.running = false;
        debug!(remaining_secs = self.remaining_secs, "timer paused");
        Event::TimerPaused {
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        }
    }

    fn complete(&mut self) -> Vec<Event> {
        let completed = self.session_type;
        let completed_before = self.stats.total_sessions;

        self.running = false;
        self.stats.record_completion(completed);
        info!(
            session = %completed,
            technique = %self.technique,
            total_sessions = self.stats.total_sessions,
            streak = self.stats.streak,
            "session completed"
        );

        let mut events = vec![Event::SessionCompleted(SessionCompleted {
            session_type: completed,
            technique: self.technique,
            total_sessions: self.stats.total_sessions,
            streak: self.stats.streak,
            at: Utc::now(),
        })];

        if flow::gate_applies(self.technique, completed) {
            self.pending_flow = Some(FlowDecision { completed_before });
            events.push(Event::FlowDecisionRequested { at: Utc::now() });
        } else {
            events.push(self.advance(completed_before));
        }
        events
    }

    fn advance(&mut self, completed_before: u64) -> Event {
        let from = self.session_type;
        let to = next_session_type(from, completed_before);
        self.session_type = to;
        self.reload();
        debug!(from = %from, to = %to, "session advanced");
        Event::SessionAdvanced {
            from,
            to,
            duration_secs: self.remaining_secs,
            at: Utc::now(),
        }
    }

    /// A switch while the flow question is open counts as "take the break".
    fn decline_pending_flow(&mut self) -> Vec<Event> {
        match self.pending_flow.take() {
            Some(decision) => vec![self.advance(decision.completed_before)],
            None => Vec::new(),
        }
    }

    fn reload(&mut self) {
        self.running = false;
        self.remaining_secs = self.total_secs();
    }

    #[cfg(test)]
    pub(crate) fn set_remaining_secs(&mut self, secs: u64) {
        self.remaining_secs = secs;
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(Catalog::builtin())
    }
}
