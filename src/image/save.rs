//! Image saving utilities.

use std::path::Path;

use image::RgbImage;

use crate::error::{Error, Result};

/// Save an RGB image, picking the encoder from the file extension.
///
/// JPEG output uses the given `quality` (1-100); every other format is
/// written with the encoder defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be created or the image cannot be
/// encoded.
pub fn save_image<P: AsRef<Path>>(img: &RgbImage, path: P, quality: u8) -> Result<()> {
    let path = path.as_ref();

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png")
        .to_lowercase();

    match extension.as_str() {
        "jpg" | "jpeg" => {
            let mut output = std::fs::File::create(path)?;
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
            img.write_with_encoder(encoder).map_err(|source| Error::ImageSave {
                path: path.to_path_buf(),
                source,
            })?;
        }
        _ => {
            img.save(path).map_err(|source| Error::ImageSave {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }

    tracing::debug!("Wrote {}x{} image to {}", img.width(), img.height(), path.display());

    Ok(())
}
