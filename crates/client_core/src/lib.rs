use async_trait::async_trait;
use shared::protocol::{FaceCropPayload, FaceSwapArgs, FaceSwapPayload, ProcessFaceArgs};

pub mod error;
pub mod gateway;
mod http_engine;
pub mod payload;
pub mod session;
pub mod types;

pub use error::{EngineError, SessionError};
pub use gateway::CommandGateway;
pub use http_engine::{HttpFaceEngine, DEFAULT_REQUEST_TIMEOUT};
pub use payload::{EncodedImage, PayloadFormat};
pub use session::{
    ExtractRequest, ModeState, RequestPhase, RequestTicket, SessionController, SessionEvent,
    SessionState, StrengthDisplay, SwapRequest,
};
pub use types::{FaceExtractionResult, FaceRegions, FaceSwapResult};

/// Remote vision engine exposing the `process_face` and `face_swap` commands.
#[async_trait]
pub trait FaceEngine: Send + Sync {
    async fn process_face(&self, args: ProcessFaceArgs)
        -> Result<Vec<FaceCropPayload>, EngineError>;
    async fn face_swap(&self, args: FaceSwapArgs) -> Result<FaceSwapPayload, EngineError>;
}

pub struct MissingFaceEngine;

#[async_trait]
impl FaceEngine for MissingFaceEngine {
    async fn process_face(
        &self,
        _args: ProcessFaceArgs,
    ) -> Result<Vec<FaceCropPayload>, EngineError> {
        Err(EngineError::Transport(
            "no face engine configured; set engine_url".to_string(),
        ))
    }

    async fn face_swap(&self, _args: FaceSwapArgs) -> Result<FaceSwapPayload, EngineError> {
        Err(EngineError::Transport(
            "no face engine configured; set engine_url".to_string(),
        ))
    }
}

#[cfg(test)]
#[path = "tests/stub_engine.rs"]
pub(crate) mod stub_engine;
