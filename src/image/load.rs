//! Image loading utilities.

use std::path::Path;

use image::{imageops, imageops::FilterType, DynamicImage, GenericImageView};
use ndarray::Array4;

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// Load an image from disk and convert it to a normalized tensor.
///
/// The image is:
/// 1. Loaded from the specified path and converted to RGB
/// 2. Normalized to [0, 1] range
/// 3. Rescaled so its longer side is exactly `max_dimension`
/// 4. Returned as NHWC tensor (1, height, width, 3)
///
/// Images smaller than `max_dimension` are scaled up as well.
///
/// # Errors
///
/// Returns an error if the image cannot be opened or decoded, or if it has a
/// zero-sized dimension.
pub fn load_image<P: AsRef<Path>>(path: P, max_dimension: u32) -> Result<ImageTensor> {
    let path = path.as_ref();

    let img = load_display_image(path)?;
    let tensor = image_to_tensor(&img, max_dimension)?;

    tracing::debug!(
        "Loaded {} ({}x{}) as tensor {:?}",
        path.display(),
        img.width(),
        img.height(),
        tensor.shape()
    );

    Ok(tensor)
}

/// Open an image as-is, without any resizing or normalization.
///
/// # Errors
///
/// Returns [`Error::ImageLoad`] if the file is missing or cannot be decoded.
pub fn load_display_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path = path.as_ref();

    image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })
}

/// Compute the `(width, height)` an image is resized to.
///
/// The longer side becomes `max_dimension`. The shorter side is scaled by the
/// same factor and truncated, never dropping below one pixel.
///
/// # Errors
///
/// Returns an error if either input dimension or `max_dimension` is zero.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> Result<(u32, u32)> {
    if width == 0 || height == 0 {
        return Err(Error::UnsupportedDimensions {
            width,
            height,
            reason: "image has no pixels".to_string(),
        });
    }

    if max_dimension == 0 {
        return Err(Error::InvalidParameter {
            name: "max_dimension".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    let long = u64::from(width.max(height));
    let scale = |side: u32| {
        // Exact integer form of floor(side * max / long); the result never
        // exceeds max_dimension so it fits back into u32.
        let scaled = u64::from(side) * u64::from(max_dimension) / long;
        u32::try_from(scaled).unwrap_or(max_dimension).max(1)
    };

    Ok((scale(width), scale(height)))
}

/// Convert a decoded image to a normalized, rescaled NHWC tensor.
///
/// This is the preprocessing half of [`load_image`], for callers that already
/// hold the decoded image.
///
/// # Errors
///
/// Returns an error if the image has a zero-sized dimension or
/// `max_dimension` is zero.
pub fn image_to_tensor(img: &DynamicImage, max_dimension: u32) -> Result<ImageTensor> {
    let (width, height) = img.dimensions();
    let (new_width, new_height) = scaled_dimensions(width, height, max_dimension)?;

    tracing::debug!(
        "Rescaling {width}x{height} -> {new_width}x{new_height} (max dimension {max_dimension})"
    );

    // Normalize first and resample the float data, bilinear
    let rgb = img.to_rgb32f();
    let resized = imageops::resize(&rgb, new_width, new_height, FilterType::Triangle);

    let data: Vec<f32> = resized.into_raw().into_iter().map(|v| v.clamp(0.0, 1.0)).collect();

    let array = Array4::from_shape_vec(
        (1, new_height as usize, new_width as usize, RGB_CHANNELS),
        data,
    )
    .map_err(|e| Error::ShapeMismatch {
        expected: format!("[1, {new_height}, {new_width}, {RGB_CHANNELS}]"),
        actual: e.to_string(),
    })?;

    ImageTensor::new(array)
}
