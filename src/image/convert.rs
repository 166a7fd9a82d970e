//! Conversion from model output tensors to displayable images.

use image::RgbImage;
use ndarray::ArrayD;

use crate::error::{Error, Result};

use super::ImageTensor;

/// Convert a normalized NHWC tensor to an 8-bit RGB image.
///
/// Values are scaled from [0, 1] to [0, 255], rounded and clamped.
///
/// # Errors
///
/// Returns an error if the tensor dimensions do not fit an image buffer.
pub fn tensor_to_image(tensor: &ImageTensor) -> Result<RgbImage> {
    let (height, width) = (tensor.height(), tensor.width());

    // Logical iteration order is row-major HWC, which is exactly the
    // interleaved layout an RgbImage stores.
    let raw: Vec<u8> = tensor.pixels().iter().copied().map(denormalize).collect();

    let (w, h) = (
        u32::try_from(width).map_err(|_| too_large(width, height))?,
        u32::try_from(height).map_err(|_| too_large(width, height))?,
    );

    RgbImage::from_raw(w, h, raw).ok_or_else(|| Error::ShapeMismatch {
        expected: format!("{width}x{height} RGB buffer"),
        actual: "buffer length mismatch".to_string(),
    })
}

/// Convert a model output of rank 3 or 4 to an 8-bit RGB image.
///
/// A leading batch dimension, when present, must be exactly 1.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the array is not `[h, w, 3]` or
/// `[1, h, w, 3]`.
pub fn array_to_image(array: ArrayD<f32>) -> Result<RgbImage> {
    let tensor = ImageTensor::from_dyn(array)?;
    tensor_to_image(&tensor)
}

/// Scale a value from [0, 1] to [0, 255] with rounding and clamping.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn denormalize(value: f32) -> u8 {
    // Safe: clamped to [0, 255] before casting; NaN saturates to 0
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

fn too_large(width: usize, height: usize) -> Error {
    Error::ShapeMismatch {
        expected: "image dimensions within u32".to_string(),
        actual: format!("{width}x{height}"),
    }
}
