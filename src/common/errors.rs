use serde::Serialize;

use crate::common::types::now_ms;

/// Failures surfaced by the controller, the ledger and the command surface.
///
/// None of these is fatal: the event loop logs them and moves on.
#[derive(Debug, thiserror::Error)]
pub enum CaramellaError {
    #[error("score store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("voice action `{action}` failed: {reason}")]
    VoiceActionFailed {
        action: &'static str,
        reason: String,
    },

    #[error("Speed must be between `0.25` and `4.0`")]
    OutOfRange(f64),

    #[error("You are not connected to a voice channel!")]
    NotConnected,

    #[error("You are not allowed to use this command.")]
    Forbidden,

    #[error("{0}")]
    BadCommand(String),
}

impl CaramellaError {
    pub fn voice(action: &'static str, reason: impl Into<String>) -> Self {
        Self::VoiceActionFailed {
            action,
            reason: reason.into(),
        }
    }

    /// Whether the message is meant to be shown to the member who ran a command.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::OutOfRange(_) | Self::NotConnected | Self::Forbidden | Self::BadCommand(_)
        )
    }
}

/// JSON error body returned by the HTTP API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// HTTP status code.
    pub status: u16,
    /// HTTP status reason phrase (e.g. "Bad Request").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    /// The request path that caused the error.
    pub path: String,
}

impl ApiError {
    pub fn internal(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            timestamp: now_ms(),
            status: 500,
            error: "Internal Server Error".into(),
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            timestamp: now_ms(),
            status: 503,
            error: "Service Unavailable".into(),
            message: message.into(),
            path: path.into(),
        }
    }
}
