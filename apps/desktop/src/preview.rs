//! Text rendering of session state for the terminal front-end.

use std::io::Cursor;

use client_core::{EncodedImage, FaceExtractionResult, FaceSwapResult, RequestPhase, SessionState};
use shared::domain::{ImageSlot, Mode};

pub fn describe_image(image: &EncodedImage) -> String {
    let size = human_readable_bytes(image.bytes().len() as u64);
    let kind = image.format().extension().to_ascii_uppercase();
    match image::ImageReader::new(Cursor::new(image.bytes()))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok())
    {
        Some((width, height)) => format!("{kind} {width}x{height} ({size})"),
        None => format!("{kind} ({size})"),
    }
}

pub fn describe_face(index: usize, face: &FaceExtractionResult) -> String {
    let mut line = format!("face {index}: crop {}", describe_image(&face.crop));
    match &face.debug_overlay {
        Some(overlay) => line.push_str(&format!(", overlay {}", describe_image(overlay))),
        None => line.push_str(", no overlay"),
    }
    if let Some(regions) = face.regions {
        let d = regions.detection;
        let s = regions.search;
        line.push_str(&format!(
            ", detection {}x{}@({},{}) within search {}x{}@({},{})",
            d.width, d.height, d.x, d.y, s.width, s.height, s.x, s.y
        ));
    }
    line
}

pub fn describe_swap(result: &FaceSwapResult) -> String {
    format!("composite {}", describe_image(&result.composite))
}

pub fn phase_label(phase: RequestPhase) -> &'static str {
    match phase {
        RequestPhase::Idle => "idle",
        RequestPhase::Pending => "processing...",
        RequestPhase::Ready => "ready",
        RequestPhase::Failed => "failed",
    }
}

pub fn status_lines(state: &SessionState) -> Vec<String> {
    let slot_label = |slot: ImageSlot| {
        state
            .image(slot)
            .map(|image| format!("{} ({})", image, image.path().display()))
            .unwrap_or_else(|| "not selected".to_string())
    };

    let mut lines = vec![
        format!("mode: {}", state.mode()),
        format!("source: {}", slot_label(ImageSlot::Source)),
        format!("target: {}", slot_label(ImageSlot::Target)),
        format!("color correction: {}", state.strength_display().label()),
    ];

    for mode in [Mode::Extract, Mode::Swap] {
        let mut line = format!("{mode}: {}", phase_label(state.phase(mode)));
        if let Some(err) = state.last_error(mode) {
            line.push_str(&format!(" (last error: {err})"));
        }
        lines.push(line);
    }

    let faces = state.extract().results();
    if !faces.is_empty() {
        lines.push(format!("{} face(s) extracted", faces.len()));
        lines.extend(
            faces
                .iter()
                .enumerate()
                .map(|(index, face)| format!("  {}", describe_face(index, face))),
        );
    }
    if let Some(result) = state.swap().results() {
        lines.push(format!("  {}", describe_swap(result)));
    }
    lines
}

pub fn human_readable_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        return format!("{bytes} B");
    }
    if bytes < MB {
        return format_scaled_unit(bytes, KB, "KB");
    }
    if bytes < GB {
        return format_scaled_unit(bytes, MB, "MB");
    }
    format_scaled_unit(bytes, GB, "GB")
}

fn format_scaled_unit(bytes: u64, unit_size: u64, unit_label: &str) -> String {
    let value = bytes as f64 / unit_size as f64;
    let value_text = format!("{value:.1}");
    let compact_value = value_text.strip_suffix(".0").unwrap_or(&value_text);
    format!("{compact_value} {unit_label}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_payload_sizes_readably() {
        assert_eq!(human_readable_bytes(0), "0 B");
        assert_eq!(human_readable_bytes(1023), "1023 B");
        assert_eq!(human_readable_bytes(1024), "1 KB");
        assert_eq!(human_readable_bytes(1536), "1.5 KB");
        assert_eq!(human_readable_bytes(2 * 1024 * 1024), "2 MB");
    }

    #[test]
    fn fresh_session_status_shows_auto_label() {
        let lines = status_lines(&SessionState::new());
        assert_eq!(lines[0], "mode: extract");
        assert_eq!(lines[1], "source: not selected");
        assert_eq!(lines[3], "color correction: auto");
        assert_eq!(lines[4], "extract: idle");
        assert_eq!(lines[5], "swap: idle");
    }
}
