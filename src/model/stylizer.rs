//! Style transfer model invocation.

use ndarray::{ArrayD, IxDyn};
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{Error, Result};
use crate::image::ImageTensor;

use super::loader::{ModelCache, ModelSource};

/// Anything that can blend a content image with the style of another.
///
/// Implementations return every output the model produced; callers use the
/// first one as the stylized image.
pub trait Stylizer {
    /// Run style transfer on a content/style pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the model fails to run.
    fn stylize(
        &mut self,
        content: &ImageTensor,
        style: &ImageTensor,
    ) -> Result<Vec<ArrayD<f32>>>;
}

/// Stylizer backed by an ONNX Runtime session.
///
/// The session takes the content tensor and the style tensor as its first
/// and second inputs, both NHWC with values in [0, 1].
pub struct OnnxStylizer {
    session: Session,
}

impl OnnxStylizer {
    /// Wrap an already loaded session.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Resolve, download if needed, and load the model.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be obtained or loaded.
    pub fn load(
        cache: &ModelCache,
        source: &ModelSource,
        intra_threads: Option<usize>,
    ) -> Result<Self> {
        let session = cache.load_session(source, intra_threads)?;

        for input in &session.inputs {
            tracing::debug!("Model input: '{}'", input.name);
        }

        Ok(Self::new(session))
    }
}

impl Stylizer for OnnxStylizer {
    fn stylize(
        &mut self,
        content: &ImageTensor,
        style: &ImageTensor,
    ) -> Result<Vec<ArrayD<f32>>> {
        let content_value = Tensor::from_array(content.as_array().clone())
            .map_err(|source| Error::Inference { source })?;
        let style_value = Tensor::from_array(style.as_array().clone())
            .map_err(|source| Error::Inference { source })?;

        let outputs = self
            .session
            .run(ort::inputs![content_value, style_value])
            .map_err(|source| Error::Inference { source })?;

        outputs.values().map(|value| extract_array(&value)).collect()
    }
}

/// Extract a dynamic-rank array from an ONNX value.
fn extract_array(value: &ort::value::ValueRef<'_>) -> Result<ArrayD<f32>> {
    let (shape_info, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|source| Error::Inference { source })?;

    let shape: Vec<i64> = shape_info.iter().copied().collect();
    array_from_parts(&shape, data)
}

/// Rebuild an owned array from an ONNX shape and its flat data.
fn array_from_parts(shape: &[i64], data: &[f32]) -> Result<ArrayD<f32>> {
    let dims = shape
        .iter()
        .map(|&x| usize::try_from(x))
        .collect::<std::result::Result<Vec<usize>, _>>()
        .map_err(|_| Error::ShapeMismatch {
            expected: "non-negative dimensions".to_string(),
            actual: format!("{shape:?}"),
        })?;

    ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec()).map_err(|_| Error::ShapeMismatch {
        expected: format!("{} elements for {dims:?}", dims.iter().product::<usize>()),
        actual: format!("{} elements", data.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_from_parts() {
        let data: Vec<f32> = (0..12u8).map(f32::from).collect();

        let array = array_from_parts(&[1, 2, 2, 3], &data).unwrap();

        assert_eq!(array.shape(), &[1, 2, 2, 3]);
        assert_eq!(array[[0, 1, 0, 2]], 8.0);
    }

    #[test]
    fn test_array_from_parts_length_mismatch() {
        let err = array_from_parts(&[1, 2, 2, 3], &[0.0; 10]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_array_from_parts_dynamic_dimension() {
        // ONNX reports unresolved dimensions as -1
        let err = array_from_parts(&[-1, 2, 2, 3], &[0.0; 12]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_output_feeds_converter() {
        let array = array_from_parts(&[1, 1, 2, 3], &[0.0, 0.5, 1.0, 1.0, 0.5, 0.0]).unwrap();

        let img = crate::image::array_to_image(array).unwrap();

        assert_eq!(img.get_pixel(0, 0).0, [0, 128, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [255, 128, 0]);
    }
}
