//! Backend-to-UI events and error modeling for the terminal front-end.

use std::path::PathBuf;

use client_core::{EngineError, SessionError, SessionEvent};

pub enum UiEvent {
    Info(String),
    Error(UiError),
    Session(SessionEvent),
    ExtractFinished { lines: Vec<String> },
    SwapFinished { summary: String, strength_label: String },
    Exported(Vec<PathBuf>),
    Status(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Validation,
    Engine,
    Transport,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Extract,
    Swap,
    Selection,
    Export,
    General,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_session_error(context: UiErrorContext, err: &SessionError) -> Self {
        let category = match err {
            SessionError::MissingInput { .. } | SessionError::AlreadyPending(_) => {
                UiErrorCategory::Validation
            }
            SessionError::Engine(EngineError::Transport(_)) => UiErrorCategory::Transport,
            SessionError::Engine(_) => UiErrorCategory::Engine,
            SessionError::StaleTicket(_) => UiErrorCategory::Unknown,
        };
        Self {
            category,
            context,
            message: err.to_string(),
        }
    }

    /// Keyword classification for errors that arrive as plain text.
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("unsupported image extension")
            || message_lower.contains("must be absolute")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("unreachable")
            || message_lower.contains("disconnected")
            || message_lower.contains("no face engine configured")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Single line shown to the user. Engine messages are kept verbatim.
    pub fn display_line(&self) -> String {
        let prefix = match self.category {
            UiErrorCategory::Validation => "cannot start",
            UiErrorCategory::Engine => "engine error",
            UiErrorCategory::Transport => "engine unavailable",
            UiErrorCategory::Unknown => "error",
        };
        format!("{prefix}: {}", self.message)
    }
}
