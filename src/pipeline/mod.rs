//! Style transfer pipeline.

mod transfer;

pub use transfer::{Config, Outputs, Pipeline};
