//! Side-by-side comparison page output.

mod figure;

use std::fs;
use std::path::Path;

pub use figure::{
    Figure, LayoutImage, Panel, CONTENT_PANEL, DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH,
    RESULT_PANEL, STYLE_PANEL,
};

use crate::error::Result;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Render a figure as a standalone HTML page that loads plotly.js from its CDN.
///
/// # Errors
///
/// Returns an error if the figure cannot be serialized.
pub fn to_html(figure: &Figure) -> Result<String> {
    let json = figure.to_json()?;
    let (width, height) = (figure.layout.width, figure.layout.height);

    Ok(format!(
        r#"<html>
<head><meta charset="utf-8" /></head>
<body>
<div>
<script type="text/javascript" src="{PLOTLY_CDN}" charset="utf-8"></script>
<div id="figure" class="plotly-graph-div" style="height:{height}px; width:{width}px;"></div>
<script type="text/javascript">
const figure = {json};
Plotly.newPlot("figure", figure.data, figure.layout, {{"responsive": true}});
</script>
</div>
</body>
</html>
"#
    ))
}

/// Write a figure to an HTML file.
///
/// # Errors
///
/// Returns an error if serialization or the file write fails.
pub fn write_html<P: AsRef<Path>>(figure: &Figure, path: P) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, to_html(figure)?)?;

    tracing::debug!("Wrote comparison page to {}", path.display());
    Ok(())
}
