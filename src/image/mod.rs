//! Image loading, conversion, and saving utilities.

mod convert;
mod load;
mod save;
mod tensor;

pub use convert::{array_to_image, tensor_to_image};
pub use load::{image_to_tensor, load_display_image, load_image, scaled_dimensions};
pub use save::save_image;
pub use tensor::ImageTensor;

/// Default bound on the longer side of a loaded image.
pub const DEFAULT_MAX_DIMENSION: u32 = 650;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;
