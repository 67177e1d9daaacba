use shared::domain::{ImageSlot, Mode};
use thiserror::Error;

/// Failure of a single engine command. Always atomic: no partial result accompanies it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Message reported by the engine itself, kept verbatim.
    #[error("{0}")]
    Engine(String),
    #[error("face engine unreachable: {0}")]
    Transport(String),
    #[error("face engine response violated the command contract: {0}")]
    Contract(String),
}

impl EngineError {
    pub fn contract(message: impl Into<String>) -> Self {
        EngineError::Contract(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a {0} request is already in progress")]
    AlreadyPending(Mode),
    #[error("missing input: select the {} image before running {mode}", describe_slots(.slots))]
    MissingInput { mode: Mode, slots: Vec<ImageSlot> },
    #[error("completion does not belong to the outstanding {0} request")]
    StaleTicket(Mode),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl SessionError {
    pub fn is_validation(&self) -> bool {
        matches!(self, SessionError::MissingInput { .. })
    }
}

fn describe_slots(slots: &[ImageSlot]) -> String {
    match slots {
        [] => "required".to_string(),
        [slot] => slot.to_string(),
        _ => slots
            .iter()
            .map(ImageSlot::to_string)
            .collect::<Vec<_>>()
            .join(" and "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_messages_are_surfaced_verbatim() {
        let err = EngineError::Engine("failed to read image".into());
        assert_eq!(err.to_string(), "failed to read image");
        let wrapped = SessionError::from(err);
        assert_eq!(wrapped.to_string(), "failed to read image");
    }

    #[test]
    fn missing_input_names_empty_slots() {
        let err = SessionError::MissingInput {
            mode: Mode::Swap,
            slots: vec![ImageSlot::Source, ImageSlot::Target],
        };
        assert_eq!(
            err.to_string(),
            "missing input: select the source and target image before running swap"
        );
        assert!(err.is_validation());
    }
}
