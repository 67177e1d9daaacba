//! User-initiated export of engine results to disk.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use client_core::{FaceExtractionResult, FaceSwapResult};

pub fn composite_file_name(now: DateTime<Local>) -> String {
    format!("faceswap_{}.png", now.format("%Y%m%d_%H%M%S"))
}

/// Writes the composite as a timestamped PNG and returns its path.
pub fn export_composite(
    dir: &Path,
    result: &FaceSwapResult,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(composite_file_name(now));
    fs::write(&path, result.composite.bytes())
        .with_context(|| format!("failed to write composite to '{}'", path.display()))?;
    Ok(path)
}

/// Writes each crop as `face_<n>.png` and each overlay as `face_<n>_debug.jpg`.
pub fn export_extraction(dir: &Path, results: &[FaceExtractionResult]) -> Result<Vec<PathBuf>> {
    ensure_dir(dir)?;
    let mut written = Vec::with_capacity(results.len() * 2);
    for (index, result) in results.iter().enumerate() {
        let crop_path = dir.join(format!(
            "face_{index}.{}",
            result.crop.format().extension()
        ));
        fs::write(&crop_path, result.crop.bytes())
            .with_context(|| format!("failed to write '{}'", crop_path.display()))?;
        written.push(crop_path);

        if let Some(overlay) = &result.debug_overlay {
            let overlay_path = dir.join(format!(
                "face_{index}_debug.{}",
                overlay.format().extension()
            ));
            fs::write(&overlay_path, overlay.bytes())
                .with_context(|| format!("failed to write '{}'", overlay_path.display()))?;
            written.push(overlay_path);
        }
    }
    Ok(written)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory '{}'", dir.display()))
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        io::Cursor,
        time::{SystemTime, UNIX_EPOCH},
    };

    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use chrono::TimeZone;
    use client_core::{EncodedImage, PayloadFormat};
    use image::{ImageFormat, Rgba, RgbaImage};

    use super::*;

    fn png_b64() -> String {
        let mut out = Cursor::new(Vec::new());
        RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 255]))
            .write_to(&mut out, ImageFormat::Png)
            .expect("png");
        STANDARD.encode(out.into_inner())
    }

    fn temp_dir(label: &str) -> PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        env::temp_dir().join(format!("faceswap_{label}_{suffix}"))
    }

    #[test]
    fn composite_name_is_timestamped() {
        let now = Local
            .with_ymd_and_hms(2026, 10, 19, 9, 5, 7)
            .single()
            .expect("local time");
        assert_eq!(composite_file_name(now), "faceswap_20261019_090507.png");
    }

    #[test]
    fn exports_composite_bytes_unmodified() {
        let composite =
            EncodedImage::decode(PayloadFormat::Png, png_b64(), "composite").expect("png");
        let result = FaceSwapResult {
            composite: composite.clone(),
            color_correction_applied: None,
        };
        let dir = temp_dir("composite");
        let path = export_composite(&dir, &result, Local::now()).expect("export");

        assert_eq!(fs::read(&path).expect("read back"), composite.bytes());
        fs::remove_dir_all(dir).expect("cleanup");
    }

    #[test]
    fn exports_crops_without_overlay_for_legacy_results() {
        let crop = EncodedImage::decode(PayloadFormat::Png, png_b64(), "crop").expect("png");
        let results = vec![
            FaceExtractionResult {
                crop: crop.clone(),
                debug_overlay: None,
                regions: None,
            },
            FaceExtractionResult {
                crop,
                debug_overlay: None,
                regions: None,
            },
        ];
        let dir = temp_dir("crops");
        let written = export_extraction(&dir, &results).expect("export");

        assert_eq!(written, vec![dir.join("face_0.png"), dir.join("face_1.png")]);
        fs::remove_dir_all(dir).expect("cleanup");
    }
}
