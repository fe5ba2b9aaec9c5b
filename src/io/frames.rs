//! Frame images for kit color sampling

use anyhow::Context;
use image::RgbImage;
use std::path::Path;

/// Load a frame as 8-bit RGB
///
/// No path yields an empty 0×0 frame; every side classification against it
/// falls back to side A.
pub fn load_frame(path: Option<&Path>) -> anyhow::Result<RgbImage> {
    let Some(path) = path else {
        return Ok(RgbImage::new(0, 0));
    };
    let img = image::open(path)
        .with_context(|| format!("Failed to load frame image: {}", path.display()))?;
    Ok(img.to_rgb8())
}
