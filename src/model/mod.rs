//! Stylization model management and invocation.

mod loader;
mod stylizer;

pub use loader::{cache_filename, ModelCache, ModelSource, DEFAULT_MODEL_PATH};
pub use stylizer::{OnnxStylizer, Stylizer};
