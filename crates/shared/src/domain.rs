use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extensions accepted by the picker and by [`ImageRef::new`].
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Extract,
    Swap,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Extract => "extract",
            Mode::Swap => "swap",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSlot {
    Source,
    Target,
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSlot::Source => f.write_str("source"),
            ImageSlot::Target => f.write_str("target"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageRefError {
    #[error("image path must be absolute: {0}")]
    NotAbsolute(PathBuf),
    #[error("unsupported image extension for {0}; expected png, jpg or jpeg")]
    UnsupportedExtension(PathBuf),
}

/// Handle to a user-selected image. Replaced, never mutated, on reselection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    path: PathBuf,
    basename: Option<String>,
}

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ImageRefError> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(ImageRefError::NotAbsolute(path));
        }
        if !has_supported_extension(&path) {
            return Err(ImageRefError::UnsupportedExtension(path));
        }
        let basename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(Self { path, basename })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn basename(&self) -> Option<&str> {
        self.basename.as_deref()
    }

    /// Path as sent over the command boundary.
    pub fn wire_path(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.basename {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_IMAGE_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StrengthError {
    #[error("color correction strength must be a number")]
    NotANumber,
    #[error("color correction strength {0} is outside [0.0, 1.0]")]
    OutOfRange(f64),
}

/// Color-correction intensity, always within `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Strength(f64);

impl Strength {
    pub const MIN: Strength = Strength(0.0);
    pub const MAX: Strength = Strength(1.0);

    pub fn new(value: f64) -> Result<Self, StrengthError> {
        if value.is_nan() {
            return Err(StrengthError::NotANumber);
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(StrengthError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Clamps into range; NaN collapses to `0.0`.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::MIN;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round() as u8
    }
}

impl TryFrom<f64> for Strength {
    type Error = StrengthError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Strength::new(value)
    }
}

impl From<Strength> for f64 {
    fn from(value: Strength) -> Self {
        value.0
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// User choice for color correction. `Auto` is never a numeric default.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ColorCorrection {
    #[default]
    Auto,
    Manual(Strength),
}

impl ColorCorrection {
    pub fn override_value(self) -> Option<Strength> {
        match self {
            ColorCorrection::Auto => None,
            ColorCorrection::Manual(strength) => Some(strength),
        }
    }
}

/// Axis-aligned rectangle in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    pub fn contains(&self, other: &FaceRect) -> bool {
        self.width >= 0
            && self.height >= 0
            && other.width >= 0
            && other.height >= 0
            && other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn absolute(name: &str) -> PathBuf {
        std::env::temp_dir().join(name)
    }

    #[test]
    fn image_ref_derives_basename() {
        let image = ImageRef::new(absolute("portrait.JPG")).expect("image ref");
        assert_eq!(image.basename(), Some("portrait.JPG"));
        assert_eq!(image.to_string(), "portrait.JPG");
    }

    #[test]
    fn image_ref_rejects_relative_paths() {
        let err = ImageRef::new("relative/face.png").expect_err("relative path");
        assert!(matches!(err, ImageRefError::NotAbsolute(_)));
    }

    #[test]
    fn image_ref_rejects_unsupported_extensions() {
        let err = ImageRef::new(absolute("clip.gif")).expect_err("gif rejected");
        assert!(matches!(err, ImageRefError::UnsupportedExtension(_)));
        assert!(ImageRef::new(absolute("noext")).is_err());
    }

    #[test]
    fn strength_rejects_out_of_range_and_nan() {
        assert_eq!(Strength::new(1.2), Err(StrengthError::OutOfRange(1.2)));
        assert_eq!(Strength::new(-0.1), Err(StrengthError::OutOfRange(-0.1)));
        assert_eq!(Strength::new(f64::NAN), Err(StrengthError::NotANumber));
        assert_eq!(Strength::new(0.7).map(Strength::value), Ok(0.7));
    }

    #[test]
    fn strength_clamps_into_range() {
        assert_eq!(Strength::clamped(3.0), Strength::MAX);
        assert_eq!(Strength::clamped(-3.0), Strength::MIN);
        assert_eq!(Strength::clamped(f64::NAN), Strength::MIN);
        assert_eq!(Strength::clamped(0.25).value(), 0.25);
    }

    #[test]
    fn strength_deserialization_is_range_checked() {
        assert!(serde_json::from_str::<Strength>("0.42").is_ok());
        assert!(serde_json::from_str::<Strength>("1.5").is_err());
    }

    #[test]
    fn auto_color_correction_has_no_override() {
        assert_eq!(ColorCorrection::default().override_value(), None);
        let manual = ColorCorrection::Manual(Strength::clamped(0.5));
        assert_eq!(manual.override_value(), Some(Strength::clamped(0.5)));
    }

    #[test]
    fn search_rect_contains_detection_rect() {
        let search = FaceRect::new(10, 0, 200, 260);
        let detection = FaceRect::new(40, 90, 120, 120);
        assert!(search.contains(&detection));
        assert!(search.contains(&search));
        assert!(!detection.contains(&search));
        assert!(!search.contains(&FaceRect::new(150, 90, 120, 120)));
    }
}
