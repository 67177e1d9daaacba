//! Validated base64 image payloads received from the engine.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Png,
    Jpeg,
}

impl PayloadFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            PayloadFormat::Png => "image/png",
            PayloadFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            PayloadFormat::Png => "png",
            PayloadFormat::Jpeg => "jpg",
        }
    }

    fn matches(self, detected: ImageFormat) -> bool {
        matches!(
            (self, detected),
            (PayloadFormat::Png, ImageFormat::Png) | (PayloadFormat::Jpeg, ImageFormat::Jpeg)
        )
    }
}

/// Engine-produced image. The base64 text is kept exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    format: PayloadFormat,
    base64: String,
    bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn decode(
        format: PayloadFormat,
        base64: impl Into<String>,
        field: &str,
    ) -> Result<Self, EngineError> {
        let base64 = base64.into();
        let bytes = STANDARD
            .decode(base64.trim())
            .map_err(|err| EngineError::contract(format!("{field} is not valid base64: {err}")))?;
        if bytes.is_empty() {
            return Err(EngineError::contract(format!("{field} is empty")));
        }
        match image::guess_format(&bytes) {
            Ok(detected) if format.matches(detected) => {}
            Ok(detected) => {
                return Err(EngineError::contract(format!(
                    "{field} should be {} data but looks like {detected:?}",
                    format.mime_type()
                )))
            }
            Err(_) => {
                return Err(EngineError::contract(format!(
                    "{field} should be {} data but has an unrecognised signature",
                    format.mime_type()
                )))
            }
        }
        Ok(Self {
            format,
            base64,
            bytes,
        })
    }

    pub fn format(&self) -> PayloadFormat {
        self.format
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Cursor;

    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

    pub fn png_bytes(seed: u8) -> Vec<u8> {
        let image = RgbaImage::from_pixel(2, 2, Rgba([seed, 0, 255 - seed, 255]));
        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    pub fn jpeg_bytes(seed: u8) -> Vec<u8> {
        let image = RgbImage::from_pixel(8, 8, Rgb([seed, 128, 255 - seed]));
        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, ImageFormat::Jpeg)
            .expect("encode jpeg");
        out.into_inner()
    }

    pub fn png_b64(seed: u8) -> String {
        STANDARD.encode(png_bytes(seed))
    }

    pub fn jpeg_b64(seed: u8) -> String {
        STANDARD.encode(jpeg_bytes(seed))
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{jpeg_b64, png_b64, png_bytes};
    use super::*;

    #[test]
    fn keeps_base64_text_unmodified() {
        let text = png_b64(7);
        let image = EncodedImage::decode(PayloadFormat::Png, text.clone(), "crop").expect("png");
        assert_eq!(image.base64(), text);
        assert_eq!(image.bytes(), png_bytes(7).as_slice());
    }

    #[test]
    fn rejects_mismatched_format() {
        let err = EncodedImage::decode(PayloadFormat::Png, jpeg_b64(1), "crop")
            .expect_err("jpeg is not png");
        assert!(matches!(err, EngineError::Contract(message) if message.contains("crop")));
    }

    #[test]
    fn rejects_invalid_base64_and_empty_payloads() {
        assert!(EncodedImage::decode(PayloadFormat::Jpeg, "not base64!", "overlay").is_err());
        assert!(EncodedImage::decode(PayloadFormat::Jpeg, "", "overlay").is_err());
        assert!(EncodedImage::decode(PayloadFormat::Jpeg, "aGVsbG8=", "overlay").is_err());
    }
}
