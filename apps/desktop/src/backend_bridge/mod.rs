//! Worker thread that owns the async runtime and the session controller.

pub mod commands;
pub mod runtime;
