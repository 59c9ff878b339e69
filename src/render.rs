//! PDF renderer – executes a [`DocumentLayout`] with `printpdf` (v0.8
//! ops-based API).
//!
//! Layout coordinates are millimetres from the top-left corner; PDF user
//! space is points from the bottom-left. Every conversion happens here.

use std::collections::HashMap;

use printpdf::*;

use crate::draw::{
    Align, DocumentLayout, DrawCommand, ImageCommand, LineCommand, RectCommand, StrokeCommand,
    TableCommand, TableRow, TextCommand, TextStyle,
};
use crate::error::Result;
use crate::fonts::{ascent_mm, line_height_mm, text_width_mm, FontFamily, MM_PER_PT};
use crate::templates::Rgb8;

/// Table grid line width in points.
const GRID_PT: f32 = 0.4;

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Page-local coordinate conversion.
#[derive(Clone, Copy)]
struct Frame {
    page_height_mm: f32,
}

impl Frame {
    fn x(self, mm: f32) -> Pt {
        Pt(mm / MM_PER_PT)
    }

    fn y(self, mm: f32) -> Pt {
        Pt((self.page_height_mm - mm) / MM_PER_PT)
    }

    fn point(self, x: f32, y: f32) -> LinePoint {
        LinePoint {
            p: Point {
                x: self.x(x),
                y: self.y(y),
            },
            bezier: false,
        }
    }
}

/// Render a layout into PDF bytes.
///
/// Images that printpdf cannot decode are skipped with a warning; the rest
/// of the page is still drawn.
pub fn render_pdf(layout: &DocumentLayout) -> Result<Vec<u8>> {
    let page_w = Mm(layout.page_width_mm);
    let page_h = Mm(layout.page_height_mm);
    let frame = Frame {
        page_height_mm: layout.page_height_mm,
    };

    let mut doc = PdfDocument::new(&layout.title);

    // ── Register every image once ─────────────────────────────────────────
    let mut img_warnings: Vec<PdfWarnMsg> = Vec::new();
    let mut images: HashMap<&str, ImageResource> = HashMap::new();
    for (key, img) in &layout.images {
        let raw = match RawImage::decode_from_bytes(&img.data, &mut img_warnings) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Skipping image {key} – PDF decode error: {e}");
                continue;
            }
        };
        let xobj_id = doc.add_image(&raw);
        images.insert(
            key.as_str(),
            ImageResource {
                xobj_id,
                px_width: img.width_px,
                px_height: img.height_px,
            },
        );
    }

    // ── Render pages ──────────────────────────────────────────────────────
    let mut pages = Vec::with_capacity(layout.pages.len());
    for page_layout in &layout.pages {
        let mut ops = Vec::new();
        for cmd in &page_layout.commands {
            match cmd {
                DrawCommand::Text(t) => text_ops(&mut ops, frame, t),
                DrawCommand::Image(i) => image_ops(&mut ops, frame, i, &images),
                DrawCommand::FilledRect(r) => fill_ops(&mut ops, frame, r),
                DrawCommand::StrokeRect(s) => stroke_ops(&mut ops, frame, s),
                DrawCommand::Line(l) => line_ops(&mut ops, frame, l),
                DrawCommand::Table(t) => table_ops(&mut ops, frame, t),
            }
        }
        pages.push(PdfPage::new(page_w, page_h, ops));
    }

    // Ensure at least one page.
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    let page_count = pages.len();
    doc.with_pages(pages);
    let bytes = doc.save(&PdfSaveOptions::default(), &mut Vec::new());
    log::debug!(
        "Rendered {page_count} page(s), {} image(s), {} bytes",
        images.len(),
        bytes.len()
    );
    Ok(bytes)
}

fn color(c: Rgb8) -> Color {
    let [r, g, b] = c.to_unit();
    Color::Rgb(Rgb {
        r,
        g,
        b,
        icc_profile: None,
    })
}

/// Map a family and weight/slant to one of the 12 standard PDF fonts.
pub fn builtin_font(family: FontFamily, bold: bool, italic: bool) -> BuiltinFont {
    match (family, bold, italic) {
        (FontFamily::Helvetica, false, false) => BuiltinFont::Helvetica,
        (FontFamily::Helvetica, true, false) => BuiltinFont::HelveticaBold,
        (FontFamily::Helvetica, false, true) => BuiltinFont::HelveticaOblique,
        (FontFamily::Helvetica, true, true) => BuiltinFont::HelveticaBoldOblique,
        (FontFamily::Times, false, false) => BuiltinFont::TimesRoman,
        (FontFamily::Times, true, false) => BuiltinFont::TimesBold,
        (FontFamily::Times, false, true) => BuiltinFont::TimesItalic,
        (FontFamily::Times, true, true) => BuiltinFont::TimesBoldItalic,
        (FontFamily::Courier, false, false) => BuiltinFont::Courier,
        (FontFamily::Courier, true, false) => BuiltinFont::CourierBold,
        (FontFamily::Courier, false, true) => BuiltinFont::CourierOblique,
        (FontFamily::Courier, true, true) => BuiltinFont::CourierBoldOblique,
    }
}

fn write_text(ops: &mut Vec<Op>, frame: Frame, x: f32, baseline: f32, text: &str, style: &TextStyle) {
    if text.is_empty() {
        return;
    }
    let font = builtin_font(style.family, style.bold, style.italic);
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: frame.x(x),
            y: frame.y(baseline),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(style.size),
        font,
    });
    ops.push(Op::SetFillColor {
        col: color(style.color),
    });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(to_winlatin(text))],
        font,
    });
    ops.push(Op::EndTextSection);
}

fn text_ops(ops: &mut Vec<Op>, frame: Frame, t: &TextCommand) {
    write_text(ops, frame, t.x, t.y, &t.text, &t.style);
}

fn rect_points(frame: Frame, x: f32, y: f32, w: f32, h: f32) -> Vec<LinePoint> {
    vec![
        frame.point(x, y),
        frame.point(x + w, y),
        frame.point(x + w, y + h),
        frame.point(x, y + h),
    ]
}

fn fill_rect(ops: &mut Vec<Op>, frame: Frame, x: f32, y: f32, w: f32, h: f32, fill: Rgb8) {
    ops.push(Op::SetFillColor { col: color(fill) });
    ops.push(Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: rect_points(frame, x, y, w, h),
            }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    });
}

fn draw_line(ops: &mut Vec<Op>, points: Vec<LinePoint>, is_closed: bool, stroke: Rgb8, thickness: f32) {
    ops.push(Op::SetOutlineColor { col: color(stroke) });
    ops.push(Op::SetOutlineThickness { pt: Pt(thickness) });
    ops.push(Op::DrawLine {
        line: Line { points, is_closed },
    });
}

fn fill_ops(ops: &mut Vec<Op>, frame: Frame, r: &RectCommand) {
    fill_rect(ops, frame, r.x, r.y, r.width, r.height, r.color);
}

fn stroke_ops(ops: &mut Vec<Op>, frame: Frame, s: &StrokeCommand) {
    let points = rect_points(frame, s.x, s.y, s.width, s.height);
    draw_line(ops, points, true, s.color, s.thickness);
}

fn line_ops(ops: &mut Vec<Op>, frame: Frame, l: &LineCommand) {
    let points = vec![frame.point(l.x1, l.y1), frame.point(l.x2, l.y2)];
    draw_line(ops, points, false, l.color, l.thickness);
}

fn image_ops(ops: &mut Vec<Op>, frame: Frame, cmd: &ImageCommand, images: &HashMap<&str, ImageResource>) {
    let Some(res) = images.get(cmd.key.as_str()) else {
        log::warn!("Image {} is not registered; skipping", cmd.key);
        return;
    };
    // At dpi=72 printpdf renders 1 px = 1 pt, so scale = desired_pt / px_dim.
    let scale = |target_mm: f32, px: u32| {
        if px > 0 {
            target_mm / MM_PER_PT / px as f32
        } else {
            1.0
        }
    };
    ops.push(Op::UseXobject {
        id: res.xobj_id.clone(),
        transform: XObjectTransform {
            translate_x: Some(frame.x(cmd.x)),
            // Bottom edge of the image in PDF space.
            translate_y: Some(frame.y(cmd.y + cmd.height)),
            dpi: Some(72.0),
            scale_x: Some(scale(cmd.width, res.px_width)),
            scale_y: Some(scale(cmd.height, res.px_height)),
            rotate: None,
        },
    });
}

fn table_ops(ops: &mut Vec<Op>, frame: Frame, t: &TableCommand) {
    let width: f32 = t.column_widths.iter().sum();
    let height = t.height();

    // Fills first so grid lines and text sit on top.
    fill_rect(ops, frame, t.x, t.y, width, t.header.height, t.header_fill);
    let mut row_top = t.y + t.header.height;
    for row in &t.rows {
        if let Some(fill) = row.fill {
            fill_rect(ops, frame, t.x, row_top, width, row.height, fill);
        }
        row_top += row.height;
    }

    // Grid: outer frame, row separators, column separators.
    draw_line(ops, rect_points(frame, t.x, t.y, width, height), true, t.border_color, GRID_PT);
    let mut sep = t.y + t.header.height;
    for row in &t.rows {
        draw_line(
            ops,
            vec![frame.point(t.x, sep), frame.point(t.x + width, sep)],
            false,
            t.border_color,
            GRID_PT,
        );
        sep += row.height;
    }
    let mut col_x = t.x;
    for w in t.column_widths.iter().take(t.column_widths.len().saturating_sub(1)) {
        col_x += w;
        draw_line(
            ops,
            vec![frame.point(col_x, t.y), frame.point(col_x, t.y + height)],
            false,
            t.border_color,
            GRID_PT,
        );
    }

    row_cells(ops, frame, t, &t.header, t.y, &t.header_style);
    let mut row_top = t.y + t.header.height;
    for row in &t.rows {
        row_cells(ops, frame, t, row, row_top, &t.body_style);
        row_top += row.height;
    }
}

fn row_cells(ops: &mut Vec<Op>, frame: Frame, t: &TableCommand, row: &TableRow, top: f32, style: &TextStyle) {
    let line_h = line_height_mm(style.size);
    let mut cell_x = t.x;
    for (cell, w) in row.cells.iter().zip(&t.column_widths) {
        for (i, line) in cell.lines.iter().enumerate() {
            let text_w = text_width_mm(line, style.size, style.bold, style.family);
            let x = match cell.align {
                Align::Left => cell_x + t.padding,
                Align::Center => cell_x + (w - text_w) / 2.0,
                Align::Right => cell_x + w - t.padding - text_w,
            };
            let baseline = top + t.padding + i as f32 * line_h + ascent_mm(style.size);
            write_text(ops, frame, x, baseline, line, style);
        }
        cell_x += w;
    }
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{00A0}' => 0x20,
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for the 0x80-0xFF range; printpdf
    // passes these bytes straight to the content stream, where the builtin
    // fonts decode them with WinAnsiEncoding. The string is never inspected
    // as UTF-8 afterwards.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::tests::png_data_uri;
    use crate::assets::{parse_data_uri, DefaultAssetLoader};
    use crate::compose::compose_document;
    use crate::config::RenderConfig;
    use crate::document::{DocumentRecord, Invoice, LineItem, Profile};
    use crate::draw::{EmbeddedImage, ImageEncoding, PageLayout};

    #[test]
    fn render_empty_layout() {
        let bytes = render_pdf(&DocumentLayout::a4("empty")).unwrap();
        assert!(bytes.len() > 100, "PDF should have content");
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn font_mapping_covers_every_face() {
        assert!(matches!(builtin_font(FontFamily::Times, true, true), BuiltinFont::TimesBoldItalic));
        assert!(matches!(builtin_font(FontFamily::Courier, false, true), BuiltinFont::CourierOblique));
        assert!(matches!(builtin_font(FontFamily::Helvetica, true, false), BuiltinFont::HelveticaBold));
    }

    #[test]
    fn frame_flips_y() {
        let frame = Frame { page_height_mm: 297.0 };
        assert!((frame.y(297.0).0).abs() < 1e-3);
        assert!((frame.y(0.0).0 - 297.0 / MM_PER_PT).abs() < 1e-2);
    }

    #[test]
    fn winlatin_maps_typographic_quotes() {
        let s = to_winlatin("\u{201C}ok\u{201D}");
        assert_eq!(s.as_bytes(), &[0x93, b'o', b'k', 0x94]);
        assert_eq!(to_winlatin("\u{4E2D}").as_bytes(), b"?");
    }

    #[test]
    fn unknown_image_keys_are_skipped() {
        let mut layout = DocumentLayout::a4("t");
        layout.pages.push(PageLayout {
            page_index: 0,
            commands: vec![DrawCommand::Image(ImageCommand {
                key: "missing".into(),
                x: 10.0,
                y: 10.0,
                width: 20.0,
                height: 20.0,
            })],
        });
        layout.images.insert(
            "corrupt".into(),
            EmbeddedImage {
                encoding: ImageEncoding::Png,
                width_px: 1,
                height_px: 1,
                data: b"not a png".to_vec(),
            },
        );
        let bytes = render_pdf(&layout).unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn composed_invoice_renders() {
        let mut layout = compose_document(
            &DocumentRecord::Invoice(Invoice {
                invoice_number: "INV-1".into(),
                items: vec![LineItem::new("Framing", 2.0, 50.0)],
                ..Invoice::default()
            }),
            &Profile::default(),
            &RenderConfig::default(),
            &DefaultAssetLoader::default(),
        )
        .unwrap();
        let png = parse_data_uri(&png_data_uri(8, 8, [200, 10, 10, 255])).unwrap();
        layout.images.insert(
            "dot".into(),
            EmbeddedImage {
                encoding: ImageEncoding::Png,
                width_px: 8,
                height_px: 8,
                data: png,
            },
        );
        layout.pages[0].commands.push(DrawCommand::Image(ImageCommand {
            key: "dot".into(),
            x: 20.0,
            y: 200.0,
            width: 10.0,
            height: 10.0,
        }));
        let bytes = render_pdf(&layout).unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
        assert!(bytes.len() > 1000);
    }
}
