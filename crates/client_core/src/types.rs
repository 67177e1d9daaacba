use shared::domain::{FaceRect, Strength};

use crate::payload::EncodedImage;

/// Detection rectangle and the search rectangle that bounds every crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegions {
    pub detection: FaceRect,
    pub search: FaceRect,
}

/// One detected face. Entries carry no spatial or confidence ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceExtractionResult {
    pub crop: EncodedImage,
    /// Original image annotated with the detection and search rectangles. Absent when the
    /// engine speaks the legacy crop-only contract.
    pub debug_overlay: Option<EncodedImage>,
    pub regions: Option<FaceRegions>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaceSwapResult {
    pub composite: EncodedImage,
    /// Strength the engine reports having applied; `None` when the contract version does not
    /// report it.
    pub color_correction_applied: Option<Strength>,
}
