//! Errors produced while talking to the ingestion/chat backend.
//!
//! Every variant renders to the single human-readable line the session shows
//! as its error state, so callers never need to format these themselves.

use std::path::PathBuf;
use thiserror::Error;

/// Shown when a failure carries no usable message of its own.
pub const UNKNOWN_ERROR: &str = "An unknown error occurred";

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The request never produced a response (connection refused, DNS, ...).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The local file could not be read.
    #[error("Could not open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A success status whose body was not what we expected.
    #[error("{0}")]
    UnexpectedResponse(String),

    /// The background task carrying the request died before reporting.
    #[error("{0}")]
    Task(String),
}

impl ServiceError {
    pub fn unknown() -> Self {
        ServiceError::Task(UNKNOWN_ERROR.to_string())
    }

    /// The message placed in the session's error state.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            message
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ServiceError::Rejected { status, .. } => Some(*status),
            ServiceError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
