//! Core error types for focusroom-core.
//!
//! Errors are grouped by where they originate: configuration (fatal before a
//! timer exists), rejected timer commands, and notification collaborators.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::{SessionType, Technique};

/// Core error type for focusroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A timer command was rejected
    #[error("Transition rejected: {0}")]
    Transition(#[from] TransitionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// The duration catalog has no entry for a technique/session pair
    #[error("No duration configured for {technique} / {session_type}")]
    MissingDuration {
        technique: Technique,
        session_type: SessionType,
    },

    /// A catalog entry is zero minutes long
    #[error("Duration for {technique} / {session_type} must be positive")]
    NonPositiveDuration {
        technique: Technique,
        session_type: SessionType,
    },
}

/// A timer command that cannot be applied in the current state.
///
/// Returning one of these never leaves the engine partially updated.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("tick received while the countdown is paused")]
    NotRunning,

    #[error("no flow decision is pending")]
    NoFlowDecisionPending,

    #[error("waiting for a flow decision; answer continue or break first")]
    AwaitingFlowDecision,
}

/// Failure reported by a notification collaborator.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notifier '{notifier}' failed: {message}")]
    Failed { notifier: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
