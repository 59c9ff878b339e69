//! Bitmap font selection for rasterised rich text.
//!
//! Text is drawn with the embedded-graphics ASCII mono fonts. A requested
//! pixel height picks the closest cell height among the available faces,
//! multiplied by an integer scale for large headings.

use std::borrow::Cow;

use embedded_graphics::mono_font::ascii::{
    FONT_10X20, FONT_6X13_BOLD, FONT_6X13_ITALIC, FONT_6X9, FONT_7X13_BOLD, FONT_7X13_ITALIC,
    FONT_7X14, FONT_7X14_BOLD, FONT_8X13, FONT_8X13_BOLD, FONT_8X13_ITALIC, FONT_9X15_BOLD,
    FONT_9X18, FONT_9X18_BOLD,
};
use embedded_graphics::mono_font::MonoFont;

const REGULAR: &[&MonoFont<'static>] = &[&FONT_6X9, &FONT_7X14, &FONT_8X13, &FONT_9X18, &FONT_10X20];
const BOLD: &[&MonoFont<'static>] = &[
    &FONT_6X13_BOLD,
    &FONT_7X13_BOLD,
    &FONT_7X14_BOLD,
    &FONT_8X13_BOLD,
    &FONT_9X15_BOLD,
    &FONT_9X18_BOLD,
];
const ITALIC: &[&MonoFont<'static>] = &[&FONT_6X13_ITALIC, &FONT_7X13_ITALIC, &FONT_8X13_ITALIC];

const MAX_SCALE: u32 = 8;

/// A mono font plus an integer magnification.
#[derive(Clone, Copy)]
pub struct Face {
    pub font: &'static MonoFont<'static>,
    pub scale: u32,
}

impl std::fmt::Debug for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Face")
            .field("cell", &(self.font.character_size.width, self.font.character_size.height))
            .field("scale", &self.scale)
            .finish()
    }
}

impl Face {
    /// Closest face for a glyph cell of `px_height` device pixels.
    pub fn select(px_height: f32, bold: bool, italic: bool) -> Face {
        let candidates = match (bold, italic) {
            (true, _) => BOLD,
            (false, true) => ITALIC,
            (false, false) => REGULAR,
        };
        let target = px_height.max(1.0);
        let mut best = Face {
            font: candidates[0],
            scale: 1,
        };
        let mut best_err = f32::MAX;
        for scale in 1..=MAX_SCALE {
            for font in candidates {
                let err = (font.character_size.height as f32 * scale as f32 - target).abs();
                if err < best_err {
                    best_err = err;
                    best = Face { font, scale };
                }
            }
        }
        best
    }

    /// Horizontal advance per character in device pixels.
    pub fn advance(&self) -> u32 {
        (self.font.character_size.width + self.font.character_spacing) * self.scale
    }

    /// Glyph cell height in device pixels.
    pub fn height(&self) -> u32 {
        self.font.character_size.height * self.scale
    }

    /// Width of `text` in device pixels. `text` must already be normalised.
    pub fn text_width(&self, text: &str) -> u32 {
        text.chars().count() as u32 * self.advance()
    }
}

/// Replace typographic characters the ASCII fonts lack with close
/// equivalents.
pub fn normalize_text_for_mono(text: &str) -> Cow<'_, str> {
    if text.is_ascii() {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{00A0}' => out.push(' '),
            '\u{2010}'..='\u{2015}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2022}' => out.push('*'),
            '\u{2026}' => out.push_str("..."),
            c if c.is_ascii() => out.push(c),
            _ => out.push('?'),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_sizes_use_native_cells() {
        let face = Face::select(14.0, false, false);
        assert_eq!(face.scale, 1);
        assert_eq!(face.height(), 14);
    }

    #[test]
    fn large_sizes_are_magnified() {
        let face = Face::select(56.0, true, false);
        assert!(face.scale >= 3, "{face:?}");
        assert!((face.height() as i32 - 56).abs() <= 3);
    }

    #[test]
    fn width_is_monospaced() {
        let face = Face::select(26.0, false, false);
        assert_eq!(face.text_width("iiii"), face.text_width("WWWW"));
        assert_eq!(face.text_width("ab"), 2 * face.advance());
    }

    #[test]
    fn typographic_characters_are_replaced() {
        assert_eq!(normalize_text_for_mono("a\u{2014}b\u{2026}"), "a-b...");
        assert_eq!(normalize_text_for_mono("caf\u{e9}"), "caf?");
        assert!(matches!(normalize_text_for_mono("plain"), Cow::Borrowed(_)));
    }
}
