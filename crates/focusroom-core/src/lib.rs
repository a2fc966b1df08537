//! # Focusroom Core Library
//!
//! This library provides the core logic for the Focusroom focus timer: a
//! countdown that moves between work and break sessions according to the
//! selected technique, plus simple productivity counters.
//!
//! ## Architecture
//!
//! - **Technique Catalog**: validated minutes per technique and session type
//! - **Timer Engine**: a synchronous state machine; the caller invokes
//!   `tick()` once per second and issues commands
//! - **Driver**: a tokio task that supplies the ticks and publishes events
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TimerController`]: Async 1 Hz driver with event broadcast
//! - [`Catalog`]: Technique duration table
//! - [`Config`]: Application configuration management
//! - [`Notifier`]: Trait for completion notification collaborators

pub mod driver;
pub mod error;
pub mod events;
pub mod notify;
pub mod storage;
pub mod timer;

pub use driver::{TimerController, TICK_INTERVAL};
pub use error::{ConfigError, CoreError, NotifyError, TransitionError};
pub use events::{Event, SessionCompleted};
pub use notify::{ConsoleNotifier, NotificationDispatcher, Notifier};
pub use storage::Config;
pub use timer::{Catalog, Durations, SessionType, Technique, TimerEngine, TimerState};
