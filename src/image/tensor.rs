//! Validated NHWC image tensor.

use ndarray::{Array4, ArrayD, ArrayView3, Axis, Ix3, Ix4};

use crate::error::{Error, Result};

use super::RGB_CHANNELS;

/// Image tensor in NHWC format (batch, height, width, channels).
///
/// The batch dimension is always 1 and the channel dimension is always 3.
/// Both are checked when the tensor is built, so code holding an
/// `ImageTensor` never has to re-assert its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Array4<f32>,
}

impl ImageTensor {
    /// Wrap a 4D array, checking batch and channel sizes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] unless the shape is `[1, h, w, 3]`.
    pub fn new(data: Array4<f32>) -> Result<Self> {
        let (batch, _, _, channels) = data.dim();

        if batch != 1 {
            return Err(Error::ShapeMismatch {
                expected: "batch size 1".to_string(),
                actual: format!("batch size {batch}"),
            });
        }

        if channels != RGB_CHANNELS {
            return Err(Error::ShapeMismatch {
                expected: format!("{RGB_CHANNELS} channels"),
                actual: format!("{channels} channels"),
            });
        }

        Ok(Self { data })
    }

    /// Build a tensor from an array of unknown rank.
    ///
    /// Rank 3 arrays (`[h, w, c]`) get a batch dimension inserted; rank 4
    /// arrays must already carry a batch of exactly one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] for any other rank, batch size or
    /// channel count.
    pub fn from_dyn(data: ArrayD<f32>) -> Result<Self> {
        match data.ndim() {
            3 => {
                let hwc = data
                    .into_dimensionality::<Ix3>()
                    .map_err(|e| shape_error("3D tensor", &e))?;
                Self::new(hwc.insert_axis(Axis(0)))
            }
            4 => {
                let nhwc = data
                    .into_dimensionality::<Ix4>()
                    .map_err(|e| shape_error("4D tensor", &e))?;
                Self::new(nhwc)
            }
            rank => Err(Error::ShapeMismatch {
                expected: "3D or 4D tensor".to_string(),
                actual: format!("{rank}D tensor"),
            }),
        }
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.data.dim().1
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.data.dim().2
    }

    /// Full shape as `[batch, height, width, channels]`.
    #[must_use]
    pub fn shape(&self) -> [usize; 4] {
        let (n, h, w, c) = self.data.dim();
        [n, h, w, c]
    }

    /// The single image without its batch dimension.
    #[must_use]
    pub fn pixels(&self) -> ArrayView3<'_, f32> {
        self.data.index_axis(Axis(0), 0)
    }

    /// The full NHWC array, batch dimension included.
    #[must_use]
    pub fn as_array(&self) -> &Array4<f32> {
        &self.data
    }
}

fn shape_error(expected: &str, err: &ndarray::ShapeError) -> Error {
    Error::ShapeMismatch {
        expected: expected.to_string(),
        actual: err.to_string(),
    }
}
