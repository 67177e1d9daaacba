//! Backend commands queued from the shell to the backend worker.

use std::path::PathBuf;

use shared::domain::{ColorCorrection, ImageSlot, Mode};

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    SetMode(Mode),
    /// `None` means the picker was cancelled.
    SelectImage {
        slot: ImageSlot,
        path: Option<PathBuf>,
    },
    SetColorCorrection(ColorCorrection),
    NudgeColorCorrection {
        delta: f64,
    },
    /// Runs the active mode.
    Submit,
    /// Clears the given mode, or the active one.
    ClearResults(Option<Mode>),
    Export,
    Status,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::SetMode(_) => "set_mode",
            BackendCommand::SelectImage { .. } => "select_image",
            BackendCommand::SetColorCorrection(_) => "set_color_correction",
            BackendCommand::NudgeColorCorrection { .. } => "nudge_color_correction",
            BackendCommand::Submit => "submit",
            BackendCommand::ClearResults(_) => "clear_results",
            BackendCommand::Export => "export",
            BackendCommand::Status => "status",
        }
    }
}
