//! Title block: logo, document title and the date/number metadata line.

use crate::assets::LoadedImage;
use crate::draw::Align;
use crate::fonts::{line_height_mm, wrap_text};
use crate::templates::LayoutFamily;

use super::context::RenderContext;

const LOGO_MODERN: (f32, f32) = (45.0, 24.0);
const LOGO_CERTIFICATE: (f32, f32) = (40.0, 20.0);
const BANNER_MIN: f32 = 36.0;
const BANNER_PAD: f32 = 8.0;
const TITLE_MODERN_PT: f32 = 22.0;
const TITLE_CERTIFICATE_PT: f32 = 20.0;
const META_PT: f32 = 9.0;

/// Join `label: value` pairs, skipping empty values.
pub fn meta_line(meta: &[(&str, String)]) -> String {
    meta.iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| format!("{k}: {}", v.trim()))
        .collect::<Vec<_>>()
        .join("   |   ")
}

/// Draw the header for the active template family and return the cursor
/// where the body starts. `logo` is `None` both when no logo was configured
/// and when it failed to load; the layout is the same either way.
pub fn compose_header(
    ctx: &mut RenderContext<'_>,
    y: f32,
    title: &str,
    meta: &[(&str, String)],
    logo: Option<&LoadedImage>,
) -> f32 {
    match ctx.style.family {
        LayoutFamily::Modern => modern_header(ctx, y, title, meta, logo),
        LayoutFamily::Certificate => certificate_header(ctx, y, title, meta, logo),
    }
}

fn modern_header(
    ctx: &mut RenderContext<'_>,
    y: f32,
    title: &str,
    meta: &[(&str, String)],
    logo: Option<&LoadedImage>,
) -> f32 {
    let g = ctx.geometry;
    let header_text = ctx.style.header_text;
    let title_style = ctx.heading(TITLE_MODERN_PT).colored(header_text);
    let meta_style = ctx.body(META_PT).colored(header_text);

    // Size the banner before drawing it so the fill sits under the text.
    let logo_size = logo.map(|l| l.fit_within(LOGO_MODERN.0, LOGO_MODERN.1));
    let logo_bottom = logo_size.map_or(BANNER_PAD, |(_, h)| BANNER_PAD + h);
    let title_w = g.content_width() * 0.6;
    let meta_lines: Vec<String> = {
        let line = meta_line(meta);
        if line.is_empty() {
            Vec::new()
        } else {
            wrap_text(&line, META_PT, false, meta_style.family, title_w)
        }
    };
    let text_bottom = BANNER_PAD
        + 2.0
        + line_height_mm(TITLE_MODERN_PT)
        + 1.5
        + meta_lines.len() as f32 * line_height_mm(META_PT);
    let banner_h = (logo_bottom.max(text_bottom) + BANNER_PAD).max(BANNER_MIN);

    ctx.rect(0.0, 0.0, g.page_width, banner_h, ctx.style.header_bg);

    if let (Some(img), Some((w, h))) = (logo, logo_size) {
        ctx.image(img, g.left(), BANNER_PAD, w, h);
    }

    let mut ty = ctx.text(g.right(), BANNER_PAD + 2.0, title, title_style, Align::Right) + 1.5;
    for line in &meta_lines {
        ty = ctx.text(g.right(), ty, line, meta_style, Align::Right);
    }

    (banner_h + 8.0).max(y)
}

fn certificate_header(
    ctx: &mut RenderContext<'_>,
    y: f32,
    title: &str,
    meta: &[(&str, String)],
    logo: Option<&LoadedImage>,
) -> f32 {
    let g = ctx.geometry;
    let mut cursor = y;

    if let Some(img) = logo {
        let (w, h) = img.fit_within(LOGO_CERTIFICATE.0, LOGO_CERTIFICATE.1);
        ctx.image(img, g.center_x() - w / 2.0, cursor, w, h);
        cursor += h + 4.0;
    }

    let title_style = ctx.heading(TITLE_CERTIFICATE_PT);
    cursor = ctx.text(g.center_x(), cursor, title, title_style, Align::Center) + 1.0;

    let line = meta_line(meta);
    if !line.is_empty() {
        let meta_style = ctx.body(META_PT);
        cursor = ctx.paragraph(g.left(), cursor, &line, meta_style, g.content_width(), Align::Center);
    }

    cursor += 2.0;
    let half = 30.0;
    ctx.line(g.center_x() - half, cursor, g.center_x() + half, cursor, ctx.style.secondary, 0.75);
    cursor + 8.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::tests::png_data_uri;
    use crate::assets::DefaultAssetLoader;
    use crate::config::RenderConfig;
    use crate::draw::{DocumentLayout, DrawCommand};
    use crate::templates::resolve_style;

    fn compose(template: &str, logo_src: &str) -> (f32, DocumentLayout) {
        let style = resolve_style(template, None);
        let config = RenderConfig::default();
        let loader = DefaultAssetLoader::default();
        let mut ctx = RenderContext::new("Invoice", &style, &config, &loader);
        let logo = ctx.load_image(logo_src);
        let y = config.margin_top;
        let meta = [("Invoice #", "INV-7".to_string()), ("Date", "2026-03-01".to_string())];
        let end = compose_header(&mut ctx, y, "INVOICE", &meta, logo.as_ref());
        (end, ctx.finish())
    }

    fn text_positions(layout: &DocumentLayout) -> Vec<(String, f32, f32)> {
        layout.pages[0]
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text(t) => Some((t.text.clone(), t.x, t.y)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn meta_line_skips_empty_values() {
        let meta = [("A", "1".to_string()), ("B", " ".to_string()), ("C", "3".to_string())];
        assert_eq!(meta_line(&meta), "A: 1   |   C: 3");
    }

    #[test]
    fn missing_and_broken_logo_lay_out_identically() {
        for template in ["standard", "classic"] {
            let (end_missing, missing) = compose(template, "");
            let (end_broken, broken) = compose(template, "data:image/png;base64,bm90IGFuIGltYWdl");
            assert_eq!(end_missing, end_broken, "{template}");
            assert_eq!(missing.pages[0].commands, broken.pages[0].commands, "{template}");
            assert!(broken.images.is_empty());
        }
    }

    #[test]
    fn logo_is_placed_when_it_loads() {
        let uri = png_data_uri(200, 100, [10, 20, 30, 255]);
        let (_, layout) = compose("standard", &uri);
        assert_eq!(layout.images.len(), 1);
        let placed = layout.pages[0].commands.iter().any(|c| matches!(c, DrawCommand::Image(_)));
        assert!(placed);
    }

    #[test]
    fn modern_title_is_right_aligned_in_banner() {
        let (end, layout) = compose("standard", "");
        let DrawCommand::FilledRect(banner) = &layout.pages[0].commands[0] else {
            panic!("banner should be drawn first");
        };
        assert_eq!(banner.x, 0.0);
        assert!(end > banner.height);
        let texts = text_positions(&layout);
        let (_, x, y) = texts.iter().find(|(t, _, _)| t == "INVOICE").unwrap();
        assert!(*x > 100.0);
        assert!(*y < banner.height);
    }

    #[test]
    fn certificate_title_is_centred() {
        let (end, layout) = compose("classic", "");
        assert!(end > RenderConfig::default().margin_top);
        let style = resolve_style("classic", None);
        let texts = text_positions(&layout);
        let (_, x, _) = texts.iter().find(|(t, _, _)| t == "INVOICE").unwrap();
        let w = crate::fonts::text_width_mm("INVOICE", TITLE_CERTIFICATE_PT, true, style.heading_font);
        assert!((x + w / 2.0 - 105.0).abs() < 0.01);
    }
}
