//! Error types for the detection engine.
//!
//! Nothing in the pipeline is fatal: check failures are logged and dropped
//! from aggregation, dispatch failures leave engine state untouched, and
//! late lifecycle tasks are silent no-ops. These variants exist so each
//! failure is reported with its origin attached.

use thiserror::Error;

/// Errors that can occur in the detection engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WardenError {
    /// Configuration could not be read or contained an invalid value.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// A check failed while analyzing an event. The event continues
    /// through the pipeline without this check's result.
    #[error("check '{check}' failed: {message}")]
    Check { check: String, message: String },

    /// An alert broadcast or punishment execution failed.
    #[error("dispatch failed: {message}")]
    Dispatch { message: String },

    /// The analytics queue is full or the connection is broken.
    #[error("analytics transport error: {message}")]
    AnalyticsTransport { message: String },

    /// A scheduled lifecycle task found no context for its player.
    #[error("lifecycle task skipped: {message}")]
    Lifecycle { message: String },
}

impl WardenError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn check(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Check {
            check: check.into(),
            message: message.into(),
        }
    }

    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    pub fn analytics(message: impl Into<String>) -> Self {
        Self::AnalyticsTransport {
            message: message.into(),
        }
    }
}
