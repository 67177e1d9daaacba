//! Image selection: native dialog or paths typed by the user.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use shared::domain::{ImageRef, ImageSlot, SUPPORTED_IMAGE_EXTENSIONS};

/// Opens a single-selection picker limited to png/jpg/jpeg. `None` when the user cancels.
pub fn pick_image(slot: ImageSlot) -> Option<PathBuf> {
    let mut dialog = rfd::FileDialog::new()
        .set_title(format!("Select {slot} image"))
        .add_filter("Image", &SUPPORTED_IMAGE_EXTENSIONS);
    if let Some(dir) = dirs::picture_dir() {
        dialog = dialog.set_directory(dir);
    }
    dialog.pick_file()
}

/// Turns a picked or typed path into an [`ImageRef`]. A missing selection stays `None`.
pub fn resolve_selection(selection: Option<&Path>) -> Result<Option<ImageRef>> {
    let Some(path) = selection else {
        return Ok(None);
    };
    let absolute = std::path::absolute(path)
        .with_context(|| format!("failed to resolve '{}'", path.display()))?;
    let image = ImageRef::new(absolute)?;
    Ok(Some(image))
}
