//! Wire types of the two engine commands.

use serde::{Deserialize, Serialize};

use crate::domain::FaceRect;

pub const PROCESS_FACE_COMMAND: &str = "process_face";
pub const FACE_SWAP_COMMAND: &str = "face_swap";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessFaceArgs {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceSwapArgs {
    pub source_path: String,
    pub target_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_correction: Option<f64>,
}

/// One entry of a `process_face` response.
///
/// The first engine contract returned bare base64 crop strings; later versions return an
/// object carrying the annotated overlay and, optionally, the rectangle geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FaceCropPayload {
    Annotated(AnnotatedFaceCrop),
    Bare(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedFaceCrop {
    pub base64: String,
    pub debug_base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_rect: Option<FaceRect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_rect: Option<FaceRect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceSwapPayload {
    pub base64: String,
    /// Reported only by contract versions that echo the applied strength.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_correction_strength: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineRequest {
    ProcessFace(ProcessFaceArgs),
    FaceSwap(FaceSwapArgs),
}

impl EngineRequest {
    pub fn command(&self) -> &'static str {
        match self {
            EngineRequest::ProcessFace(_) => PROCESS_FACE_COMMAND,
            EngineRequest::FaceSwap(_) => FACE_SWAP_COMMAND,
        }
    }

    pub fn args(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            EngineRequest::ProcessFace(args) => serde_json::to_value(args),
            EngineRequest::FaceSwap(args) => serde_json::to_value(args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn face_swap_args_use_camel_case_names() {
        let args = FaceSwapArgs {
            source_path: "/img/a.png".into(),
            target_path: "/img/b.png".into(),
            color_correction: Some(0.7),
        };
        assert_eq!(
            serde_json::to_value(&args).expect("serialize"),
            json!({ "sourcePath": "/img/a.png", "targetPath": "/img/b.png", "colorCorrection": 0.7 })
        );
    }

    #[test]
    fn auto_face_swap_omits_color_correction() {
        let request = EngineRequest::FaceSwap(FaceSwapArgs {
            source_path: "/img/a.png".into(),
            target_path: "/img/b.png".into(),
            color_correction: None,
        });
        let args = request.args().expect("args");
        assert_eq!(request.command(), "face_swap");
        assert!(args.get("colorCorrection").is_none());
    }

    #[test]
    fn process_face_response_accepts_both_shapes() {
        let current: Vec<FaceCropPayload> = serde_json::from_value(json!([
            { "base64": "Y3JvcA==", "debug_base64": "ZGVidWc=" },
            {
                "base64": "Y3JvcA==",
                "debug_base64": "ZGVidWc=",
                "detection_rect": { "x": 5, "y": 6, "width": 7, "height": 8 },
                "search_rect": { "x": 0, "y": 0, "width": 20, "height": 20 }
            }
        ]))
        .expect("current shape");
        assert!(matches!(&current[0], FaceCropPayload::Annotated(crop) if crop.search_rect.is_none()));
        assert!(matches!(
            &current[1],
            FaceCropPayload::Annotated(crop) if crop.detection_rect == Some(FaceRect::new(5, 6, 7, 8))
        ));

        let legacy: Vec<FaceCropPayload> =
            serde_json::from_value(json!(["Y3JvcA=="])).expect("legacy shape");
        assert_eq!(legacy, vec![FaceCropPayload::Bare("Y3JvcA==".into())]);
    }

    #[test]
    fn face_swap_response_strength_is_optional() {
        let reported: FaceSwapPayload =
            serde_json::from_value(json!({ "base64": "eA==", "color_correction_strength": 0.42 }))
                .expect("reported");
        assert_eq!(reported.color_correction_strength, Some(0.42));

        let unreported: FaceSwapPayload =
            serde_json::from_value(json!({ "base64": "eA==" })).expect("unreported");
        assert_eq!(unreported.color_correction_strength, None);
    }
}
