use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Encode an annotated image into `format` bytes (for downloads or HTTP responses)
pub fn encode_image(image: &RgbImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), format)
        .with_context(|| format!("Failed to encode image as {:?}", format))?;
    Ok(bytes)
}

/// Save an annotated image, picking the format from the file extension
pub fn save_image(image: &RgbImage, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path)
        .with_context(|| format!("Unsupported output format: {}", path.display()))?;
    image
        .save_with_format(path, format)
        .with_context(|| format!("Failed to save annotated image to {}", path.display()))?;
    Ok(())
}
