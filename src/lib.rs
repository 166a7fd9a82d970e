//! # neuralstyle
//!
//! Blend the content of one image with the style of another using a
//! pretrained arbitrary-style-transfer network, then write a side-by-side
//! comparison page and the stylized image.
//!
//! The network itself runs through ONNX Runtime. This crate handles the
//! surrounding work: loading and rescaling images into normalized tensors,
//! turning the model output back into an 8-bit image, and the outputs.
//!
//! ## Example
//!
//! ```no_run
//! use neuralstyle::{Config, Pipeline};
//!
//! # fn main() -> neuralstyle::Result<()> {
//! let config = Config {
//!     content_path: "photo.jpg".into(),
//!     style_path: "painting.png".into(),
//!     ..Config::default()
//! };
//! let mut pipeline = Pipeline::new(config)?;
//!
//! pipeline.run()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod image;
pub mod model;
pub mod pipeline;
pub mod render;

pub use error::{Error, Result};
pub use pipeline::{Config, Outputs, Pipeline};
