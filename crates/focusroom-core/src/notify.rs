//! Completion notifications.
//!
//! Notifiers are collaborators outside the state machine. A failing notifier
//! is logged and skipped; it never blocks or rolls back a completion.

use std::io::Write;
use std::sync::Mutex;

use tracing::warn;

use crate::error::NotifyError;
use crate::events::SessionCompleted;
use crate::storage::NotificationsConfig;
use crate::timer::{next_session_type, SessionType};

/// Receives one call per completed session.
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    fn notify(&self, completed: &SessionCompleted) -> Result<(), NotifyError>;
}

/// Fans a completion out to every registered notifier.
#[derive(Default)]
pub struct NotificationDispatcher {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Deliver to all notifiers. Returns how many succeeded.
    pub fn dispatch(&self, completed: &SessionCompleted) -> usize {
        let mut delivered = 0;
        for notifier in &self.notifiers {
            match notifier.notify(completed) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(notifier = notifier.name(), error = %e, "notification failed"),
            }
        }
        delivered
    }
}

/// Toast text for a completion, e.g. "Focus Time finished. Time for Short Break!".
///
/// The upcoming session is a best guess: under flow the user may still
/// choose to keep working.
pub fn completion_message(completed: &SessionCompleted) -> String {
    let next = upcoming_after(completed);
    format!(
        "{} finished. Time for {}!",
        completed.session_type.label(),
        next.label()
    )
}

fn upcoming_after(completed: &SessionCompleted) -> SessionType {
    // total_sessions already includes this completion.
    next_session_type(
        completed.session_type,
        completed.total_sessions.saturating_sub(1),
    )
}

/// Writes completion messages to a terminal-like sink.
pub struct ConsoleNotifier<W: Write + Send> {
    out: Mutex<W>,
    bell: bool,
}

impl ConsoleNotifier<std::io::Stderr> {
    pub fn stderr(config: &NotificationsConfig) -> Self {
        Self::new(std::io::stderr(), config.sound)
    }
}

impl<W: Write + Send> ConsoleNotifier<W> {
    pub fn new(out: W, bell: bool) -> Self {
        Self {
            out: Mutex::new(out),
            bell,
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> Notifier for ConsoleNotifier<W> {
    fn name(&self) -> &str {
        "console"
    }

    fn notify(&self, completed: &SessionCompleted) -> Result<(), NotifyError> {
        let mut out = self.out.lock().map_err(|_| NotifyError::Failed {
            notifier: self.name().to_string(),
            message: "output lock poisoned".into(),
        })?;
        if self.bell {
            write!(out, "\x07")?;
        }
        writeln!(out, "Session Complete! {}", completion_message(completed))?;
        out.flush()?;
        Ok(())
    }
}

/// Build the dispatcher the configuration asks for.
pub fn dispatcher_from_config(config: &NotificationsConfig) -> NotificationDispatcher {
    let mut dispatcher = NotificationDispatcher::new();
    if config.enabled {
        dispatcher.register(Box::new(ConsoleNotifier::stderr(config)));
    }
    dispatcher
}
