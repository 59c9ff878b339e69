//! Per-generation drawing state.
//!
//! A [`RenderContext`] is created for one document, collects draw commands
//! page by page and is consumed by [`RenderContext::finish`]. The vertical
//! cursor is never stored here: composers take it as an argument and return
//! the new value.

use std::collections::BTreeMap;

use crate::assets::{load_image, AssetLoader, EmbedFormat, LoadedImage};
use crate::config::RenderConfig;
use crate::draw::{
    Align, DocumentLayout, DrawCommand, EmbeddedImage, ImageCommand, ImageEncoding, LineCommand,
    PageLayout, RectCommand, StrokeCommand, TextCommand, TextStyle,
};
use crate::fonts::{ascent_mm, line_height_mm, text_width_mm, wrap_text, FontFamily};
use crate::templates::{LayoutFamily, ResolvedStyle, Rgb8};

/// Page size and margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_x: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
}

impl PageGeometry {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            page_width: config.effective_width(),
            page_height: config.effective_height(),
            margin_x: config.margin_x,
            margin_top: config.margin_top,
            margin_bottom: config.margin_bottom,
        }
    }

    pub fn left(&self) -> f32 {
        self.margin_x
    }

    pub fn right(&self) -> f32 {
        self.page_width - self.margin_x
    }

    pub fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin_x
    }

    pub fn center_x(&self) -> f32 {
        self.page_width / 2.0
    }

    /// Lowest y content may reach.
    pub fn bottom_limit(&self) -> f32 {
        self.page_height - self.margin_bottom
    }
}

pub struct RenderContext<'a> {
    pub geometry: PageGeometry,
    pub style: &'a ResolvedStyle,
    pub config: &'a RenderConfig,
    loader: &'a dyn AssetLoader,
    title: String,
    pages: Vec<PageLayout>,
    images: BTreeMap<String, EmbeddedImage>,
}

impl<'a> RenderContext<'a> {
    /// Start a document with its first page already decorated.
    pub fn new(
        title: &str,
        style: &'a ResolvedStyle,
        config: &'a RenderConfig,
        loader: &'a dyn AssetLoader,
    ) -> Self {
        let mut ctx = Self {
            geometry: PageGeometry::from_config(config),
            style,
            config,
            loader,
            title: title.to_string(),
            pages: Vec::new(),
            images: BTreeMap::new(),
        };
        ctx.new_page();
        ctx
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of distinct images registered so far.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn loader(&self) -> &'a dyn AssetLoader {
        self.loader
    }

    /// Load an image through the context's loader; failures give `None`.
    pub fn load_image(&self, src: &str) -> Option<LoadedImage> {
        load_image(self.loader, src)
    }

    /// Append a page, draw its decoration and return the top-margin cursor.
    pub fn new_page(&mut self) -> f32 {
        let index = self.pages.len();
        self.pages.push(PageLayout {
            page_index: index,
            commands: Vec::new(),
        });
        self.decorate_page();
        self.geometry.margin_top
    }

    /// Move to a new page when `needed` millimetres do not fit below `y`.
    pub fn ensure_space(&mut self, y: f32, needed: f32) -> f32 {
        if y + needed > self.geometry.bottom_limit() {
            self.new_page()
        } else {
            y
        }
    }

    fn decorate_page(&mut self) {
        if self.style.family != LayoutFamily::Certificate {
            return;
        }
        let g = self.geometry;
        let (outer, inner) = (8.0, 10.5);
        self.stroke(
            outer,
            outer,
            g.page_width - 2.0 * outer,
            g.page_height - 2.0 * outer,
            self.style.border,
            1.5,
        );
        self.stroke(
            inner,
            inner,
            g.page_width - 2.0 * inner,
            g.page_height - 2.0 * inner,
            self.style.secondary,
            0.4,
        );
    }

    pub fn push(&mut self, cmd: DrawCommand) {
        if let Some(page) = self.pages.last_mut() {
            page.commands.push(cmd);
        }
    }

    /// Body text style in the template's body font.
    pub fn body(&self, size: f32) -> TextStyle {
        TextStyle::new(self.style.body_font, size, self.style.text)
    }

    /// Heading text style in the template's heading font.
    pub fn heading(&self, size: f32) -> TextStyle {
        TextStyle::new(self.style.heading_font, size, self.style.primary).bold()
    }

    /// Draw one line whose top is at `top`; `x` is the anchor for `align`.
    /// Returns the top of the next line.
    pub fn text(&mut self, x: f32, top: f32, text: &str, style: TextStyle, align: Align) -> f32 {
        if !text.is_empty() {
            let width = text_width_mm(text, style.size, style.bold, style.family);
            let left = match align {
                Align::Left => x,
                Align::Center => x - width / 2.0,
                Align::Right => x - width,
            };
            self.push(DrawCommand::Text(TextCommand {
                x: left,
                y: top + ascent_mm(style.size),
                text: text.to_string(),
                style,
            }));
        }
        top + line_height_mm(style.size)
    }

    /// Word-wrap `text` into `width` and draw it line by line, breaking to a
    /// new page when a line would cross the bottom margin.
    pub fn paragraph(
        &mut self,
        x: f32,
        top: f32,
        text: &str,
        style: TextStyle,
        width: f32,
        align: Align,
    ) -> f32 {
        let anchor = match align {
            Align::Left => x,
            Align::Center => x + width / 2.0,
            Align::Right => x + width,
        };
        let line_h = line_height_mm(style.size);
        let mut y = top;
        for line in wrap_text(text, style.size, style.bold, style.family, width) {
            y = self.ensure_space(y, line_h);
            y = self.text(anchor, y, &line, style, align);
        }
        y
    }

    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb8) {
        self.push(DrawCommand::FilledRect(RectCommand {
            x,
            y,
            width,
            height,
            color,
        }));
    }

    pub fn stroke(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb8, thickness: f32) {
        self.push(DrawCommand::StrokeRect(StrokeCommand {
            x,
            y,
            width,
            height,
            color,
            thickness,
        }));
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: Rgb8, thickness: f32) {
        self.push(DrawCommand::Line(LineCommand {
            x1,
            y1,
            x2,
            y2,
            color,
            thickness,
        }));
    }

    /// Full-width horizontal rule in the border colour.
    pub fn rule(&mut self, y: f32) {
        let (l, r) = (self.geometry.left(), self.geometry.right());
        self.line(l, y, r, y, self.style.border, 0.5);
    }

    /// Register `image` once and place it.
    pub fn image(&mut self, image: &LoadedImage, x: f32, y: f32, width: f32, height: f32) {
        if !self.images.contains_key(&image.key) {
            let encoding = match image.format {
                EmbedFormat::Png => ImageEncoding::Png,
                EmbedFormat::Jpeg => ImageEncoding::Jpeg,
            };
            self.images.insert(
                image.key.clone(),
                EmbeddedImage {
                    encoding,
                    width_px: image.width_px,
                    height_px: image.height_px,
                    data: image.bytes.clone(),
                },
            );
        }
        self.push(DrawCommand::Image(ImageCommand {
            key: image.key.clone(),
            x,
            y,
            width,
            height,
        }));
    }

    /// Register pre-encoded bytes under `key` and place them.
    pub fn embedded(&mut self, key: String, image: EmbeddedImage, x: f32, y: f32, width: f32, height: f32) {
        self.images.insert(key.clone(), image);
        self.push(DrawCommand::Image(ImageCommand {
            key,
            x,
            y,
            width,
            height,
        }));
    }

    /// Stamp `Page i of N` footers and hand back the finished layout.
    pub fn finish(mut self) -> DocumentLayout {
        let total = self.pages.len();
        let g = self.geometry;
        let style = TextStyle::new(FontFamily::Helvetica, 8.0, self.style.text.tint(0.45));
        let footer_top = g.page_height - g.margin_bottom / 2.0 - line_height_mm(8.0) / 2.0;
        for page in &mut self.pages {
            let label = format!("Page {} of {}", page.page_index + 1, total);
            let width = text_width_mm(&label, style.size, false, style.family);
            page.commands.push(DrawCommand::Text(TextCommand {
                x: g.center_x() - width / 2.0,
                y: footer_top + ascent_mm(style.size),
                text: label,
                style,
            }));
        }
        log::debug!("Composed {} page(s) for {:?}", total, self.title);
        DocumentLayout {
            title: self.title,
            page_width_mm: g.page_width,
            page_height_mm: g.page_height,
            pages: self.pages,
            images: self.images,
        }
    }
}
