//! Main style transfer pipeline.

use std::path::PathBuf;

use ::image::{DynamicImage, RgbImage};

use crate::error::{Error, Result};
use crate::image::{self, DEFAULT_MAX_DIMENSION};
use crate::model::{ModelCache, ModelSource, OnnxStylizer, Stylizer};
use crate::render::{self, Figure, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};

/// Configuration for a style transfer run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Image whose content is kept.
    pub content_path: PathBuf,

    /// Image whose style is applied.
    pub style_path: PathBuf,

    /// Where the side-by-side comparison page is written.
    pub output_html_path: PathBuf,

    /// Where the stylized image is written.
    pub output_image_path: PathBuf,

    /// Longer side of both images after rescaling, before inference.
    pub max_dimension: u32,

    /// Comparison page width in pixels.
    pub canvas_width: u32,

    /// Comparison page height in pixels.
    pub canvas_height: u32,

    /// Output JPEG quality (1-100).
    pub output_quality: u8,

    /// Where to get the stylization model.
    pub model: ModelSource,

    /// ONNX Runtime intra-op threads. None for the runtime default.
    pub intra_threads: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_path: PathBuf::from("izza.jpg"),
            style_path: PathBuf::from("starry_night.png"),
            output_html_path: PathBuf::from("output.html"),
            output_image_path: PathBuf::from("final-output.jpg"),
            max_dimension: DEFAULT_MAX_DIMENSION,
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            output_quality: 75,
            model: ModelSource::default(),
            intra_threads: None,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.max_dimension == 0 {
            return Err(invalid("max_dimension", "must be greater than 0"));
        }

        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(invalid("canvas", "width and height must be greater than 0"));
        }

        if !(1..=100).contains(&self.output_quality) {
            return Err(invalid("output_quality", "must be between 1 and 100"));
        }

        if self.intra_threads == Some(0) {
            return Err(invalid("intra_threads", "must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(name: &str, reason: &str) -> Error {
    Error::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Files produced by [`Pipeline::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outputs {
    pub html_path: PathBuf,
    pub image_path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Loads both images, stylizes them, and writes the results.
pub struct Pipeline<S = OnnxStylizer> {
    config: Config,
    stylizer: S,
}

impl Pipeline<OnnxStylizer> {
    /// Create a new pipeline with the given configuration.
    ///
    /// This will download the model if it is not already cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the model cannot
    /// be loaded.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tracing::info!("Initializing pipeline with config: {config:?}");

        let cache = ModelCache::new()?;
        let stylizer = OnnxStylizer::load(&cache, &config.model, config.intra_threads)?;

        tracing::info!("Pipeline initialized successfully");

        Ok(Self { config, stylizer })
    }
}

impl<S: Stylizer> Pipeline<S> {
    /// Create a pipeline around any stylizer.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_stylizer(config: Config, stylizer: S) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, stylizer })
    }

    /// Load the configured images and return the stylized result.
    ///
    /// # Errors
    ///
    /// Returns an error if either image fails to load, inference fails, or
    /// the model output is not a single RGB image.
    pub fn stylize(&mut self) -> Result<RgbImage> {
        let (content, style) = self.load_inputs()?;
        self.stylize_images(&content, &style)
    }

    /// Run the full pipeline: stylize, write the comparison page, save the
    /// stylized image.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. Nothing is retried.
    pub fn run(&mut self) -> Result<Outputs> {
        // Decoded once: rescaled for the model, shown as-is on the page
        let (content, style) = self.load_inputs()?;
        let stylized = self.stylize_images(&content, &style)?;
        let result = DynamicImage::ImageRgb8(stylized.clone());

        tracing::info!("Writing comparison to: {}", self.config.output_html_path.display());
        let figure = Figure::comparison(
            &content,
            &style,
            &result,
            self.config.canvas_width,
            self.config.canvas_height,
        )?;
        render::write_html(&figure, &self.config.output_html_path)?;

        tracing::info!("Saving output to: {}", self.config.output_image_path.display());
        image::save_image(&stylized, &self.config.output_image_path, self.config.output_quality)?;

        tracing::info!("Processing complete");

        Ok(Outputs {
            html_path: self.config.output_html_path.clone(),
            image_path: self.config.output_image_path.clone(),
            width: stylized.width(),
            height: stylized.height(),
        })
    }

    fn load_inputs(&self) -> Result<(DynamicImage, DynamicImage)> {
        tracing::info!("Loading content image: {}", self.config.content_path.display());
        let content = image::load_display_image(&self.config.content_path)?;

        tracing::info!("Loading style image: {}", self.config.style_path.display());
        let style = image::load_display_image(&self.config.style_path)?;

        Ok((content, style))
    }

    fn stylize_images(&mut self, content: &DynamicImage, style: &DynamicImage) -> Result<RgbImage> {
        let max_dimension = self.config.max_dimension;
        let content = image::image_to_tensor(content, max_dimension)?;
        let style = image::image_to_tensor(style, max_dimension)?;

        tracing::info!("Running style transfer...");
        let output = self
            .stylizer
            .stylize(&content, &style)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::ShapeMismatch {
                expected: "stylized image output".to_string(),
                actual: "no output".to_string(),
            })?;

        tracing::debug!("Model output shape: {:?}", output.shape());

        image::array_to_image(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{Rgb, RgbImage};
    use base64::Engine;
    use ndarray::{ArrayD, IxDyn};
    use tempfile::{tempdir, TempDir};

    use crate::image::ImageTensor;

    /// Returns the content image unchanged.
    struct Echo;

    impl Stylizer for Echo {
        fn stylize(
            &mut self,
            content: &ImageTensor,
            _style: &ImageTensor,
        ) -> Result<Vec<ArrayD<f32>>> {
            Ok(vec![content.as_array().clone().into_dyn()])
        }
    }

    /// Returns a fixed set of outputs regardless of input.
    struct Fixed(Vec<ArrayD<f32>>);

    impl Stylizer for Fixed {
        fn stylize(
            &mut self,
            _content: &ImageTensor,
            _style: &ImageTensor,
        ) -> Result<Vec<ArrayD<f32>>> {
            Ok(self.0.clone())
        }
    }

    /// Records the input shapes it was called with, then echoes the content.
    #[derive(Default)]
    struct Recording {
        shapes: Vec<([usize; 4], [usize; 4])>,
    }

    impl Stylizer for Recording {
        fn stylize(
            &mut self,
            content: &ImageTensor,
            style: &ImageTensor,
        ) -> Result<Vec<ArrayD<f32>>> {
            self.shapes.push((content.shape(), style.shape()));
            Ok(vec![content.as_array().clone().into_dyn()])
        }
    }

    fn config_in(dir: &TempDir) -> Config {
        let content_path = dir.path().join("content.jpg");
        let style_path = dir.path().join("style.png");
        RgbImage::from_pixel(120, 80, Rgb([200, 40, 40])).save(&content_path).unwrap();
        RgbImage::from_pixel(30, 60, Rgb([20, 20, 220])).save(&style_path).unwrap();

        Config {
            content_path,
            style_path,
            output_html_path: dir.path().join("output.html"),
            output_image_path: dir.path().join("final-output.jpg"),
            max_dimension: 65,
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.content_path, PathBuf::from("izza.jpg"));
        assert_eq!(config.style_path, PathBuf::from("starry_night.png"));
        assert_eq!(config.output_html_path, PathBuf::from("output.html"));
        assert_eq!(config.output_image_path, PathBuf::from("final-output.jpg"));
        assert_eq!(config.max_dimension, 650);
        assert_eq!((config.canvas_width, config.canvas_height), (1720, 1000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let cases = [
            Config {
                max_dimension: 0,
                ..Config::default()
            },
            Config {
                canvas_width: 0,
                ..Config::default()
            },
            Config {
                canvas_height: 0,
                ..Config::default()
            },
            Config {
                output_quality: 0,
                ..Config::default()
            },
            Config {
                output_quality: 101,
                ..Config::default()
            },
            Config {
                intra_threads: Some(0),
                ..Config::default()
            },
        ];

        for config in cases {
            assert!(
                matches!(config.validate(), Err(Error::InvalidParameter { .. })),
                "{config:?}"
            );
            assert!(Pipeline::with_stylizer(config, Echo).is_err());
        }
    }

    #[test]
    fn test_stylize_uses_first_output() {
        let dir = tempdir().unwrap();
        let outputs = vec![
            ArrayD::from_elem(IxDyn(&[1, 4, 6, 3]), 0.5),
            ArrayD::from_elem(IxDyn(&[1, 4, 6, 3]), 1.0),
        ];
        let mut pipeline = Pipeline::with_stylizer(config_in(&dir), Fixed(outputs)).unwrap();

        let img = pipeline.stylize().unwrap();

        assert_eq!(img.dimensions(), (6, 4));
        assert!(img.as_raw().iter().all(|&v| v == 128));
    }

    #[test]
    fn test_stylize_without_output_fails() {
        let dir = tempdir().unwrap();
        let mut pipeline = Pipeline::with_stylizer(config_in(&dir), Fixed(Vec::new())).unwrap();

        assert!(matches!(pipeline.stylize(), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_stylize_rejects_batched_output() {
        let dir = tempdir().unwrap();
        let outputs = vec![ArrayD::zeros(IxDyn(&[2, 4, 6, 3]))];
        let mut pipeline = Pipeline::with_stylizer(config_in(&dir), Fixed(outputs)).unwrap();

        assert!(matches!(pipeline.stylize(), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_missing_content_image_fails() {
        let dir = tempdir().unwrap();
        let config = Config {
            content_path: dir.path().join("missing.jpg"),
            ..config_in(&dir)
        };
        let mut pipeline = Pipeline::with_stylizer(config, Echo).unwrap();

        assert!(matches!(pipeline.run(), Err(Error::ImageLoad { .. })));
        assert!(!dir.path().join("output.html").exists());
        assert!(!dir.path().join("final-output.jpg").exists());
    }

    #[test]
    fn test_run_rescales_for_model_and_embeds_originals() {
        let dir = tempdir().unwrap();
        let mut pipeline = Pipeline::with_stylizer(config_in(&dir), Recording::default()).unwrap();

        pipeline.run().unwrap();

        assert_eq!(pipeline.stylizer.shapes, vec![([1, 43, 65, 3], [1, 65, 32, 3])]);

        let html = std::fs::read_to_string(dir.path().join("output.html")).unwrap();
        let sizes: Vec<(u32, u32)> = html
            .split("data:image/png;base64,")
            .skip(1)
            .map(|rest| {
                let payload = &rest[..rest.find('"').unwrap()];
                let bytes = base64::engine::general_purpose::STANDARD.decode(payload).unwrap();
                let img = ::image::load_from_memory(&bytes).unwrap();
                (img.width(), img.height())
            })
            .collect();

        assert_eq!(sizes, vec![(120, 80), (30, 60), (65, 43)]);
    }

    #[test]
    fn test_run_writes_both_outputs() {
        let dir = tempdir().unwrap();
        let mut pipeline = Pipeline::with_stylizer(config_in(&dir), Echo).unwrap();

        let outputs = pipeline.run().unwrap();

        // 120x80 content scaled so its longer side is 65
        assert_eq!((outputs.width, outputs.height), (65, 43));
        assert_eq!(outputs.html_path, dir.path().join("output.html"));

        let saved = ::image::open(&outputs.image_path).unwrap();
        assert_eq!((saved.width(), saved.height()), (65, 43));

        let html = std::fs::read_to_string(&outputs.html_path).unwrap();
        assert_eq!(html.matches("data:image/png;base64,").count(), 3);
        assert!(html.contains("\"width\":1720"));
    }
}
