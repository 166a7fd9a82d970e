//! Plotly figure model for the side-by-side comparison.

use std::borrow::Cow;
use std::io::Cursor;

use base64::Engine;
use image::{DynamicImage, ImageFormat};
use serde::Serialize;

use crate::error::{Error, Result};

/// Canvas width of the comparison page, in pixels.
pub const DEFAULT_CANVAS_WIDTH: u32 = 1720;

/// Canvas height of the comparison page, in pixels.
pub const DEFAULT_CANVAS_HEIGHT: u32 = 1000;

/// Placement of one image on the figure, in axis coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Panel {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

pub const CONTENT_PANEL: Panel = Panel {
    x: -0.1,
    y: 0.0,
    size: 0.35,
};

pub const STYLE_PANEL: Panel = Panel {
    x: 0.25,
    y: 0.0,
    size: 0.4,
};

pub const RESULT_PANEL: Panel = Panel {
    x: 0.7,
    y: 0.0,
    size: 0.4,
};

const X_RANGE: [f64; 2] = [-0.1, 1.0];
const Y_RANGE: [f64; 2] = [-0.5, 0.1];

/// The subset of the Plotly figure schema this crate emits.
#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub mode: &'static str,
    pub marker: Marker,
}

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub opacity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub images: Vec<LayoutImage>,
    pub xaxis: Axis,
    pub yaxis: Axis,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Axis {
    pub showgrid: bool,
    pub zeroline: bool,
    pub range: [f64; 2],
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutImage {
    pub source: String,
    pub xref: &'static str,
    pub yref: &'static str,
    pub x: f64,
    pub y: f64,
    pub sizex: f64,
    pub sizey: f64,
    pub xanchor: &'static str,
    pub yanchor: &'static str,
}

impl LayoutImage {
    /// Embed an image as a PNG data URI at the given panel.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be PNG-encoded.
    pub fn new(image: &DynamicImage, panel: Panel) -> Result<Self> {
        Ok(Self {
            source: png_data_uri(image)?,
            xref: "x",
            yref: "y",
            x: panel.x,
            y: panel.y,
            sizex: panel.size,
            sizey: panel.size,
            xanchor: "left",
            yanchor: "top",
        })
    }
}

impl Figure {
    /// Lay out content, style and result images left to right.
    ///
    /// # Errors
    ///
    /// Returns an error if any image cannot be encoded.
    pub fn comparison(
        content: &DynamicImage,
        style: &DynamicImage,
        result: &DynamicImage,
        canvas_width: u32,
        canvas_height: u32,
    ) -> Result<Self> {
        let images = vec![
            LayoutImage::new(content, CONTENT_PANEL)?,
            LayoutImage::new(style, STYLE_PANEL)?,
            LayoutImage::new(result, RESULT_PANEL)?,
        ];

        // Invisible trace so the axes exist for the images to anchor to
        let anchor = Trace {
            kind: "scatter",
            x: vec![0.0],
            y: vec![0.0],
            mode: "markers",
            marker: Marker { opacity: 0.0 },
        };

        Ok(Self {
            data: vec![anchor],
            layout: Layout {
                images,
                xaxis: Axis {
                    showgrid: false,
                    zeroline: false,
                    range: X_RANGE,
                },
                yaxis: Axis {
                    showgrid: false,
                    zeroline: false,
                    range: Y_RANGE,
                },
                width: canvas_width,
                height: canvas_height,
            },
        })
    }

    /// Serialize to Plotly JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Encode an image as a `data:image/png;base64,...` URI.
///
/// PNG has no float pixel types, so float images are clamped to 8 bits first.
fn png_data_uri(image: &DynamicImage) -> Result<String> {
    let image = match image {
        DynamicImage::ImageRgb32F(_) => Cow::Owned(DynamicImage::ImageRgb8(image.to_rgb8())),
        DynamicImage::ImageRgba32F(_) => Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8())),
        _ => Cow::Borrowed(image),
    };

    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .map_err(|source| Error::ImageSave {
            path: "<data uri>".into(),
            source,
        })?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes.into_inner());
    Ok(format!("data:image/png;base64,{encoded}"))
}
