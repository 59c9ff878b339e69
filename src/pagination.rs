//! Pagination of rich-text content.
//!
//! Free-form HTML (scope of work, warranty terms, notes) is rasterised once
//! into a bitmap as wide as the content area. The bitmap is then cut into
//! horizontal bands that fill the rest of the current page and as many
//! following pages as needed.

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, Rgba, RgbaImage};

use crate::compose::context::{PageGeometry, RenderContext};
use crate::config::PX_PER_MM;
use crate::draw::{EmbeddedImage, ImageEncoding};
use crate::error::{DocError, Result};
use crate::richtext::rasterize_html;

/// Below this much free space (mm) a page is not worth starting a slice on.
pub const MIN_SLICE_SPACE: f32 = 20.0;
/// Content shorter than this (mm) may still go into a cramped gap.
pub const NEGLIGIBLE_REMAINDER: f32 = 15.0;

const EPSILON: f32 = 1e-3;

/// One band of the bitmap and where it lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlicePlan {
    /// Start a new page before placing this slice.
    pub new_page_before: bool,
    /// Top of the slice on its page (mm).
    pub y: f32,
    /// Displayed height (mm).
    pub height: f32,
    /// First bitmap row.
    pub src_y: u32,
    /// Number of bitmap rows; consecutive slices are contiguous.
    pub src_height: u32,
}

/// Plan the slices for `content_height` mm of content backed by
/// `bitmap_height` rows, starting at `start_y`. Returns the slices and the
/// final cursor.
pub fn plan_slices(
    content_height: f32,
    bitmap_height: u32,
    start_y: f32,
    geometry: &PageGeometry,
) -> Result<(Vec<SlicePlan>, f32)> {
    let mut slices = Vec::new();
    if content_height <= EPSILON || bitmap_height == 0 {
        return Ok((slices, start_y));
    }
    if geometry.bottom_limit() - geometry.margin_top <= 0.0 {
        return Err(DocError::Render(
            "page margins leave no room for content".to_string(),
        ));
    }

    let rows_per_mm = bitmap_height as f32 / content_height;
    let mut y = start_y;
    let mut offset = 0.0f32;
    let mut src_y = 0u32;
    let mut new_page = false;

    while content_height - offset > EPSILON {
        let remaining_content = content_height - offset;
        let space = geometry.bottom_limit() - y;
        if space <= 0.0 || (space < MIN_SLICE_SPACE && remaining_content > NEGLIGIBLE_REMAINDER) {
            new_page = true;
            y = geometry.margin_top;
            continue;
        }

        let height = remaining_content.min(space);
        offset += height;
        let last = content_height - offset <= EPSILON;
        let src_end = if last {
            bitmap_height
        } else {
            ((offset * rows_per_mm).round() as u32).clamp(src_y, bitmap_height)
        };
        slices.push(SlicePlan {
            new_page_before: new_page,
            y,
            height,
            src_y,
            src_height: src_end - src_y,
        });
        src_y = src_end;
        y += height;
        new_page = false;

        if !last {
            new_page = true;
            y = geometry.margin_top;
        }
    }
    Ok((slices, y))
}

/// Rasterise `html` and flow it down from `y`. `on_page_start` is called for
/// every page the content spills onto and returns the cursor to continue at
/// (normally the top margin after the page decoration is drawn).
pub fn paginate_html<'a, F>(
    ctx: &mut RenderContext<'a>,
    y: f32,
    html: &str,
    mut on_page_start: F,
) -> Result<f32>
where
    F: FnMut(&mut RenderContext<'a>) -> f32,
{
    let g = ctx.geometry;
    let scale = if ctx.config.raster_scale > 0.0 {
        ctx.config.raster_scale
    } else {
        1.0
    };
    let css_width = g.content_width() * PX_PER_MM;
    let Some(bitmap) = rasterize_html(html, css_width, scale, ctx.loader())? else {
        return Ok(y);
    };

    let (bw, bh) = bitmap.dimensions();
    let content_height = bh as f32 * g.content_width() / bw as f32;
    let (plan, _) = plan_slices(content_height, bh, y, &g)?;
    log::debug!(
        "Paginating {bw}x{bh} px of rich text ({content_height:.1} mm) into {} slice(s)",
        plan.len()
    );

    let rows_per_mm = bw as f32 / g.content_width();
    let quality = ctx.config.jpeg_quality.clamp(1, 100);
    let mut cursor = y;
    for slice in plan {
        if slice.new_page_before {
            cursor = on_page_start(ctx);
        } else {
            cursor = slice.y;
        }

        let canvas_h = ((slice.height * rows_per_mm).round() as u32)
            .max(slice.src_height)
            .max(1);
        let band = imageops::crop_imm(&bitmap, 0, slice.src_y, bw, slice.src_height).to_image();
        let mut canvas = RgbaImage::from_pixel(bw, canvas_h, Rgba([255, 255, 255, 255]));
        imageops::replace(&mut canvas, &band, 0, 0);

        let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
        let mut data = Vec::new();
        JpegEncoder::new_with_quality(&mut data, quality).encode_image(&rgb)?;

        let key = format!("slice-{}", ctx.image_count());
        ctx.embedded(
            key,
            EmbeddedImage {
                encoding: ImageEncoding::Jpeg,
                width_px: bw,
                height_px: canvas_h,
                data,
            },
            g.left(),
            cursor,
            g.content_width(),
            slice.height,
        );
        cursor += slice.height;
    }
    Ok(cursor)
}

/// [`paginate_html`] with the default page hook.
pub fn compose_html(ctx: &mut RenderContext<'_>, y: f32, html: &str) -> Result<f32> {
    paginate_html(ctx, y, html, RenderContext::new_page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::DefaultAssetLoader;
    use crate::config::RenderConfig;
    use crate::draw::DrawCommand;
    use crate::templates::resolve_style;

    fn a4() -> PageGeometry {
        PageGeometry::from_config(&RenderConfig::default())
    }

    fn assert_contiguous(plan: &[SlicePlan], bitmap_height: u32) {
        let mut next = 0;
        for s in plan {
            assert_eq!(s.src_y, next, "gap or overlap in {plan:?}");
            next = s.src_y + s.src_height;
        }
        assert_eq!(next, bitmap_height);
    }

    #[test]
    fn empty_content_keeps_cursor() {
        let (plan, y) = plan_slices(0.0, 0, 42.0, &a4()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(y, 42.0);
    }

    #[test]
    fn content_that_fits_is_one_slice() {
        let (plan, y) = plan_slices(50.0, 400, 100.0, &a4()).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(!plan[0].new_page_before);
        assert_eq!(plan[0].y, 100.0);
        assert_eq!(y, 150.0);
    }

    #[test]
    fn exactly_filling_the_page_adds_no_page() {
        let g = a4();
        let space = g.bottom_limit() - 100.0;
        let (plan, y) = plan_slices(space, 1000, 100.0, &g).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan.iter().all(|s| !s.new_page_before));
        assert_eq!(y, g.bottom_limit());
    }

    #[test]
    fn long_content_spans_pages_contiguously() {
        let g = a4();
        let (plan, y) = plan_slices(700.0, 5291, 80.0, &g).unwrap();
        // 197 mm on the first page, then 257 + 246.
        assert_eq!(plan.len(), 3);
        assert_contiguous(&plan, 5291);
        assert!(!plan[0].new_page_before);
        assert!(plan[1..].iter().all(|s| s.new_page_before && s.y == g.margin_top));
        let placed: f32 = plan.iter().map(|s| s.height).sum();
        assert!((placed - 700.0).abs() < 1e-2);
        assert!((y - (g.margin_top + 246.0)).abs() < 1e-3);
    }

    /// Pages touched by a plan, counting the starting page when the first
    /// slice moves off it.
    fn pages_used(plan: &[SlicePlan]) -> usize {
        plan.len() + plan.first().map_or(0, |s| usize::from(s.new_page_before))
    }

    #[test]
    fn page_count_is_content_over_page_height_rounded_up() {
        let g = a4();
        let per_page = g.bottom_limit() - g.margin_top;
        for k in 1..=4usize {
            let full = per_page * k as f32;
            let (plan, y) = plan_slices(full, 1000 * k as u32, g.margin_top, &g).unwrap();
            assert_eq!(pages_used(&plan), k, "k = {k}");
            assert!((y - g.bottom_limit()).abs() < 1e-3);

            let (plan, y) = plan_slices(full + 5.0, 1000 * k as u32 + 20, g.margin_top, &g).unwrap();
            assert_eq!(pages_used(&plan), k + 1, "k = {k} plus a little");
            assert!((y - (g.margin_top + 5.0)).abs() < 1e-2);
        }
    }

    #[test]
    fn cramped_start_costs_one_extra_page() {
        let g = a4();
        let per_page = g.bottom_limit() - g.margin_top;
        let start = g.bottom_limit() - (MIN_SLICE_SPACE - 5.0);
        for k in 1..=3usize {
            let content = per_page * k as f32;
            let (plan, _) = plan_slices(content, 1000 * k as u32, start, &g).unwrap();
            assert!(plan[0].new_page_before);
            assert_eq!(pages_used(&plan), k + 1, "k = {k}");
            assert_eq!(plan.len(), k);
        }
    }

    #[test]
    fn cramped_gap_defers_large_content() {
        let g = a4();
        let start = g.bottom_limit() - (MIN_SLICE_SPACE - 1.0);
        let (plan, _) = plan_slices(100.0, 800, start, &g).unwrap();
        assert!(plan[0].new_page_before);
        assert_eq!(plan[0].y, g.margin_top);
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn cramped_gap_takes_negligible_content() {
        let g = a4();
        let start = g.bottom_limit() - (MIN_SLICE_SPACE - 1.0);
        let (plan, y) = plan_slices(NEGLIGIBLE_REMAINDER, 120, start, &g).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(!plan[0].new_page_before);
        assert_eq!(y, start + NEGLIGIBLE_REMAINDER);
    }

    #[test]
    fn no_space_forces_a_break() {
        let g = a4();
        let (plan, _) = plan_slices(5.0, 40, g.bottom_limit() + 3.0, &g).unwrap();
        assert!(plan[0].new_page_before);
        let (plan, _) = plan_slices(5.0, 40, g.bottom_limit(), &g).unwrap();
        assert!(plan[0].new_page_before);
    }

    #[test]
    fn degenerate_margins_are_an_error() {
        let g = PageGeometry {
            margin_top: 150.0,
            margin_bottom: 150.0,
            ..a4()
        };
        assert!(plan_slices(10.0, 10, 150.0, &g).is_err());
    }

    #[test]
    fn html_is_placed_as_jpeg_slices() {
        let style = resolve_style("standard", None);
        let config = RenderConfig {
            raster_scale: 1.0,
            ..RenderConfig::default()
        };
        let loader = DefaultAssetLoader::default();
        let mut ctx = RenderContext::new("t", &style, &config, &loader);
        let html = "<p>Tear off existing shingles.</p>".repeat(120);
        let mut hook_calls = 0;
        let end = paginate_html(&mut ctx, 60.0, &html, |c| {
            hook_calls += 1;
            c.new_page()
        })
        .unwrap();
        let pages = ctx.page_count();
        assert!(pages >= 2);
        assert_eq!(hook_calls, pages - 1);
        let layout = ctx.finish();
        assert!(layout.images.values().all(|i| i.encoding == ImageEncoding::Jpeg));
        let last = layout.pages.last().unwrap();
        let slice = last
            .commands
            .iter()
            .rev()
            .find_map(|c| match c {
                DrawCommand::Image(i) => Some(i.clone()),
                _ => None,
            })
            .unwrap();
        assert!((slice.y + slice.height - end).abs() < 1e-3);
    }

    #[test]
    fn blank_html_leaves_cursor_alone() {
        let style = resolve_style("standard", None);
        let config = RenderConfig::default();
        let loader = DefaultAssetLoader::default();
        let mut ctx = RenderContext::new("t", &style, &config, &loader);
        assert_eq!(compose_html(&mut ctx, 77.0, "<p></p>").unwrap(), 77.0);
        assert_eq!(ctx.page_count(), 1);
    }
}
