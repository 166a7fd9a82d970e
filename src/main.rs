//! neuralstyle CLI - apply the style of one image to another.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use neuralstyle::image::DEFAULT_MAX_DIMENSION;
use neuralstyle::model::{ModelSource, DEFAULT_MODEL_PATH};
use neuralstyle::render::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};
use neuralstyle::{Config, Pipeline};

/// Apply the style of one image to the content of another.
#[derive(Parser, Debug)]
#[command(name = "neuralstyle")]
#[command(version, about, long_about = None)]
struct Args {
    /// Content image path.
    #[arg(long, default_value = "izza.jpg", value_name = "PATH")]
    content: PathBuf,

    /// Style image path.
    #[arg(long, default_value = "starry_night.png", value_name = "PATH")]
    style: PathBuf,

    /// Comparison page output path.
    #[arg(long, default_value = "output.html", value_name = "PATH")]
    html: PathBuf,

    /// Stylized image output path.
    #[arg(short, long, default_value = "final-output.jpg", value_name = "PATH")]
    output: PathBuf,

    /// Longer side of both images before stylization. Smaller images are scaled up.
    #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION, value_name = "INT")]
    max_dimension: u32,

    /// Comparison page width in pixels.
    #[arg(long, default_value_t = DEFAULT_CANVAS_WIDTH, value_name = "INT")]
    canvas_width: u32,

    /// Comparison page height in pixels.
    #[arg(long, default_value_t = DEFAULT_CANVAS_HEIGHT, value_name = "INT")]
    canvas_height: u32,

    /// Output JPEG quality (1-100).
    #[arg(short, long, default_value = "75", value_name = "INT")]
    quality: u8,

    /// Local ONNX model file.
    #[arg(long, default_value = DEFAULT_MODEL_PATH, value_name = "PATH")]
    model: PathBuf,

    /// Download the ONNX model from this URL instead of using a local file.
    /// Downloads are cached and reused.
    #[arg(long, value_name = "URL", conflicts_with = "model")]
    model_url: Option<String>,

    /// ONNX Runtime intra-op thread count.
    #[arg(long, value_name = "INT")]
    threads: Option<usize>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("neuralstyle={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: Args) -> Result<()> {
    for input in [&args.content, &args.style] {
        if !input.exists() {
            anyhow::bail!("Input file does not exist: {}", input.display());
        }
    }

    let model = match args.model_url {
        Some(url) => ModelSource::Remote { url },
        None => ModelSource::Local(args.model),
    };

    let config = Config {
        content_path: args.content,
        style_path: args.style,
        output_html_path: args.html,
        output_image_path: args.output,
        max_dimension: args.max_dimension,
        canvas_width: args.canvas_width,
        canvas_height: args.canvas_height,
        output_quality: args.quality,
        model,
        intra_threads: args.threads,
    };

    let mut pipeline = Pipeline::new(config).context("Failed to initialize pipeline")?;

    let outputs = pipeline.run().context("Failed to stylize images")?;

    println!(
        "Stylized {}x{} image -> {}, comparison -> {}",
        outputs.width,
        outputs.height,
        outputs.image_path.display(),
        outputs.html_path.display()
    );

    Ok(())
}
