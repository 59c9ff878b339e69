//! Off-screen raster surface for rich text.
//!
//! A surface is created for one piece of content, painted once and turned
//! into an RGBA bitmap. It implements the embedded-graphics `DrawTarget`
//! so text and rectangles go through the same primitives as on a display.

use std::collections::HashMap;
use std::convert::Infallible;

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, PrimitiveStyleBuilder, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

use crate::richtext::layout::{ContentLayout, Metrics, PaintItem, RunStyle};
use crate::templates::Rgb8;

/// An RGBA bitmap that embedded-graphics can draw on.
pub struct PixelCanvas {
    img: RgbaImage,
}

impl PixelCanvas {
    fn new(width: u32, height: u32, background: Rgba<u8>) -> Self {
        Self {
            img: RgbaImage::from_pixel(width.max(1), height.max(1), background),
        }
    }
}

impl OriginDimensions for PixelCanvas {
    fn size(&self) -> Size {
        Size::new(self.img.width(), self.img.height())
    }
}

impl DrawTarget for PixelCanvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (w, h) = self.img.dimensions();
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 || point.x as u32 >= w || point.y as u32 >= h {
                continue;
            }
            self.img.put_pixel(
                point.x as u32,
                point.y as u32,
                Rgba([color.r(), color.g(), color.b(), 255]),
            );
        }
        Ok(())
    }
}

fn infallible<T>(r: Result<T, Infallible>) -> T {
    match r {
        Ok(v) => v,
        Err(e) => match e {},
    }
}

fn rgb(c: Rgb8) -> Rgb888 {
    Rgb888::new(c.0, c.1, c.2)
}

/// Paints a [`ContentLayout`] at a fixed device scale.
pub struct RasterSurface {
    canvas: PixelCanvas,
    metrics: Metrics,
}

impl RasterSurface {
    /// A white surface sized for `layout` at `scale` device pixels per CSS pixel.
    pub fn for_layout(layout: &ContentLayout, scale: f32) -> Self {
        let width = (layout.width * scale).round() as u32;
        let height = (layout.height * scale).ceil() as u32;
        Self {
            canvas: PixelCanvas::new(width, height, Rgba([255, 255, 255, 255])),
            metrics: Metrics { scale },
        }
    }

    pub fn width(&self) -> u32 {
        self.canvas.img.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.img.height()
    }

    fn px(&self, v: f32) -> i32 {
        (v * self.metrics.scale).round() as i32
    }

    /// Paint every item in order; later items draw over earlier ones.
    pub fn paint(&mut self, layout: &ContentLayout, images: &HashMap<String, DynamicImage>) {
        for item in &layout.items {
            match item {
                PaintItem::Fill {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => self.fill(*x, *y, *width, *height, PrimitiveStyle::with_fill(rgb(*color))),
                PaintItem::Border {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => {
                    let style = PrimitiveStyleBuilder::new()
                        .stroke_color(rgb(*color))
                        .stroke_width(self.metrics.scale.round().max(1.0) as u32)
                        .stroke_alignment(embedded_graphics::primitives::StrokeAlignment::Inside)
                        .build();
                    self.fill(*x, *y, *width, *height, style);
                }
                PaintItem::Text { x, y, text, style } => self.text(*x, *y, text, style),
                PaintItem::Image {
                    x,
                    y,
                    width,
                    height,
                    src,
                } => {
                    if let Some(img) = images.get(src) {
                        self.image(*x, *y, *width, *height, img);
                    }
                }
            }
        }
    }

    fn fill(&mut self, x: f32, y: f32, width: f32, height: f32, style: PrimitiveStyle<Rgb888>) {
        let (x0, y0) = (self.px(x), self.px(y));
        let (x1, y1) = (self.px(x + width), self.px(y + height));
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        let rect = Rectangle::new(Point::new(x0, y0), Size::new((x1 - x0) as u32, (y1 - y0) as u32));
        infallible(rect.into_styled(style).draw(&mut self.canvas));
    }

    fn text(&mut self, x: f32, y: f32, text: &str, style: &RunStyle) {
        let face = self.metrics.face(style);
        let origin = Point::new(self.px(x), self.px(y));
        let color = rgb(style.color);

        if face.scale == 1 {
            let mono = MonoTextStyle::new(face.font, color);
            infallible(Text::with_baseline(text, origin, mono, Baseline::Top).draw(&mut self.canvas));
        } else {
            // Draw at native size on a scratch canvas, then magnify each lit
            // pixel into a scale × scale block.
            let native_w = face.text_width(text) / face.scale;
            let native_h = face.font.character_size.height;
            let mut scratch = PixelCanvas::new(native_w, native_h, Rgba([0, 0, 0, 0]));
            let mono = MonoTextStyle::new(face.font, color);
            infallible(Text::with_baseline(text, Point::zero(), mono, Baseline::Top).draw(&mut scratch));
            let k = face.scale as i32;
            for (sx, sy, px) in scratch.img.enumerate_pixels() {
                if px.0[3] == 0 {
                    continue;
                }
                let block = Rectangle::new(
                    Point::new(origin.x + sx as i32 * k, origin.y + sy as i32 * k),
                    Size::new(face.scale, face.scale),
                );
                infallible(block.into_styled(PrimitiveStyle::with_fill(color)).draw(&mut self.canvas));
            }
        }

        if style.underline {
            let width = face.text_width(text);
            let thickness = face.scale.max(1);
            let underline_y = origin.y + face.height() as i32 - thickness as i32;
            let rect = Rectangle::new(Point::new(origin.x, underline_y), Size::new(width, thickness));
            infallible(rect.into_styled(PrimitiveStyle::with_fill(color)).draw(&mut self.canvas));
        }
    }

    fn image(&mut self, x: f32, y: f32, width: f32, height: f32, img: &DynamicImage) {
        let w = (width * self.metrics.scale).round().max(1.0) as u32;
        let h = (height * self.metrics.scale).round().max(1.0) as u32;
        let resized = img.resize_exact(w, h, FilterType::Triangle).to_rgba8();
        let (ox, oy) = (self.px(x) as i64, self.px(y) as i64);
        imageops::overlay(&mut self.canvas.img, &resized, ox, oy);
    }

    pub fn into_image(self) -> RgbaImage {
        self.canvas.img
    }
}
