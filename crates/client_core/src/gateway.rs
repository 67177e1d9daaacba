//! Stateless adapter between typed requests and the two engine commands.

use std::{sync::Arc, time::Instant};

use shared::{
    domain::{ImageRef, Strength},
    protocol::{AnnotatedFaceCrop, FaceCropPayload, FaceSwapArgs, FaceSwapPayload, ProcessFaceArgs},
};
use tracing::{info, warn};

use crate::{
    payload::{EncodedImage, PayloadFormat},
    types::{FaceExtractionResult, FaceRegions, FaceSwapResult},
    EngineError, FaceEngine,
};

/// Issues exactly one engine call per operation. No retries and no caching; a failing or
/// malformed response fails the whole call.
#[derive(Clone)]
pub struct CommandGateway {
    engine: Arc<dyn FaceEngine>,
}

impl CommandGateway {
    pub fn new(engine: Arc<dyn FaceEngine>) -> Self {
        Self { engine }
    }

    pub async fn extract_faces(
        &self,
        image: &ImageRef,
    ) -> Result<Vec<FaceExtractionResult>, EngineError> {
        let started = Instant::now();
        let path = image.wire_path();
        let payloads = self
            .engine
            .process_face(ProcessFaceArgs { path: path.clone() })
            .await
            .map_err(|err| {
                warn!(command = "process_face", %path, error = %err, "face extraction failed");
                err
            })?;

        let results = payloads
            .into_iter()
            .enumerate()
            .map(|(index, payload)| extraction_from_payload(index, payload))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                warn!(command = "process_face", %path, error = %err, "rejected engine response");
                err
            })?;

        info!(
            command = "process_face",
            %path,
            faces = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "face extraction completed"
        );
        Ok(results)
    }

    pub async fn swap_faces(
        &self,
        source: &ImageRef,
        target: &ImageRef,
        strength_override: Option<Strength>,
    ) -> Result<FaceSwapResult, EngineError> {
        let started = Instant::now();
        let args = FaceSwapArgs {
            source_path: source.wire_path(),
            target_path: target.wire_path(),
            color_correction: strength_override.map(Strength::value),
        };
        let payload = self.engine.face_swap(args).await.map_err(|err| {
            warn!(command = "face_swap", source = %source, target = %target, error = %err, "face swap failed");
            err
        })?;

        let result = swap_from_payload(payload).map_err(|err| {
            warn!(command = "face_swap", error = %err, "rejected engine response");
            err
        })?;

        info!(
            command = "face_swap",
            source = %source,
            target = %target,
            requested = ?strength_override.map(Strength::value),
            applied = ?result.color_correction_applied.map(Strength::value),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "face swap completed"
        );
        Ok(result)
    }
}

fn extraction_from_payload(
    index: usize,
    payload: FaceCropPayload,
) -> Result<FaceExtractionResult, EngineError> {
    match payload {
        FaceCropPayload::Bare(base64) => Ok(FaceExtractionResult {
            crop: EncodedImage::decode(PayloadFormat::Png, base64, &format!("face {index} crop"))?,
            debug_overlay: None,
            regions: None,
        }),
        FaceCropPayload::Annotated(AnnotatedFaceCrop {
            base64,
            debug_base64,
            detection_rect,
            search_rect,
        }) => {
            let regions = match (detection_rect, search_rect) {
                (None, None) => None,
                (Some(detection), Some(search)) => {
                    if !search.contains(&detection) {
                        return Err(EngineError::contract(format!(
                            "face {index}: search rectangle {search:?} does not contain detection rectangle {detection:?}"
                        )));
                    }
                    Some(FaceRegions { detection, search })
                }
                _ => {
                    return Err(EngineError::contract(format!(
                        "face {index}: detection and search rectangles must be reported together"
                    )))
                }
            };
            Ok(FaceExtractionResult {
                crop: EncodedImage::decode(
                    PayloadFormat::Png,
                    base64,
                    &format!("face {index} crop"),
                )?,
                debug_overlay: Some(EncodedImage::decode(
                    PayloadFormat::Jpeg,
                    debug_base64,
                    &format!("face {index} debug overlay"),
                )?),
                regions,
            })
        }
    }
}

fn swap_from_payload(payload: FaceSwapPayload) -> Result<FaceSwapResult, EngineError> {
    let color_correction_applied = payload
        .color_correction_strength
        .map(|value| {
            Strength::new(value).map_err(|err| {
                EngineError::contract(format!("reported color correction strength: {err}"))
            })
        })
        .transpose()?;
    Ok(FaceSwapResult {
        composite: EncodedImage::decode(PayloadFormat::Png, payload.base64, "composite")?,
        color_correction_applied,
    })
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
