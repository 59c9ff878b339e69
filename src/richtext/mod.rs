//! Rich-text rendering: HTML fragment → DOM → styled tree → layout → bitmap.

pub mod dom;
pub mod glyphs;
pub mod layout;
pub mod style;

use std::collections::HashMap;

use image::{DynamicImage, RgbaImage};

use crate::assets::{load_image_pixels, AssetLoader};
use crate::error::Result;
use crate::raster::RasterSurface;

use layout::Metrics;

/// Rasterise `html` at `css_width` CSS pixels and `scale` device pixels per
/// CSS pixel. Returns `None` when the fragment has nothing to show.
///
/// Every `<img>` is fetched before layout; images that fail to load are
/// left out of the flow.
pub fn rasterize_html(
    html: &str,
    css_width: f32,
    scale: f32,
    loader: &dyn AssetLoader,
) -> Result<Option<RgbaImage>> {
    let nodes = dom::parse_html(html);
    if dom::is_blank(&nodes) {
        return Ok(None);
    }

    let mut images: HashMap<String, DynamicImage> = HashMap::new();
    for src in dom::image_sources(&nodes) {
        if let Some((_, pixels)) = load_image_pixels(loader, &src) {
            images.insert(src, pixels);
        }
    }

    let styled = style::build_styled_tree(&nodes, None);
    let content = layout::compute_layout(&styled, css_width, Metrics { scale }, &images)?;
    if content.height <= 0.0 {
        return Ok(None);
    }
    log::debug!(
        "Rich text laid out at {:.0}x{:.0} css px ({} paint items)",
        content.width,
        content.height,
        content.items.len()
    );

    let mut surface = RasterSurface::for_layout(&content, scale);
    surface.paint(&content, &images);
    Ok(Some(surface.into_image()))
}
