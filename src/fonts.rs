//! Text measurement for the builtin PDF fonts.
//!
//! Composers position text before anything is rendered, so they need glyph
//! advances up front. We carry the Helvetica AFM widths for printable ASCII
//! and derive the other families from them; that keeps right-alignment and
//! word-wrapping within a fraction of a millimetre of the real output.

use serde::{Deserialize, Serialize};

/// Millimetres per PDF point.
pub const MM_PER_PT: f32 = 0.352_778;

/// Builtin PDF font families (no embedding required).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Helvetica,
    Times,
    Courier,
}

/// Helvetica advance widths in 1/1000 em for ASCII 0x20..=0x7E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

fn helvetica_advance(ch: char) -> u16 {
    match ch as u32 {
        c @ 0x20..=0x7E => HELVETICA_WIDTHS[(c - 0x20) as usize],
        0xA0 => 278,
        _ => 556,
    }
}

/// Width of `text` in points.
pub fn measure_text_width(text: &str, font_size: f32, bold: bool, family: FontFamily) -> f32 {
    let units: u32 = match family {
        FontFamily::Courier => text.chars().count() as u32 * 600,
        FontFamily::Helvetica | FontFamily::Times => {
            text.chars().map(|c| helvetica_advance(c) as u32).sum()
        }
    };
    let factor = match (family, bold) {
        (FontFamily::Courier, _) => 1.0,
        (FontFamily::Helvetica, false) => 1.0,
        (FontFamily::Helvetica, true) => 1.07,
        (FontFamily::Times, false) => 0.9,
        (FontFamily::Times, true) => 0.96,
    };
    units as f32 / 1000.0 * font_size * factor
}

/// Width of `text` in millimetres.
pub fn text_width_mm(text: &str, font_size: f32, bold: bool, family: FontFamily) -> f32 {
    measure_text_width(text, font_size, bold, family) * MM_PER_PT
}

/// Baseline-to-baseline distance in millimetres for a font size in points.
pub fn line_height_mm(font_size: f32) -> f32 {
    font_size * 1.25 * MM_PER_PT
}

/// Distance from the top of a text line to its baseline, in millimetres.
pub fn ascent_mm(font_size: f32) -> f32 {
    font_size * 0.8 * MM_PER_PT
}

/// Word-wrap text to fit within `max_width_mm`. Explicit newlines start a new
/// line; a single word wider than the column is broken by characters.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    bold: bool,
    family: FontFamily,
    max_width_mm: f32,
) -> Vec<String> {
    if max_width_mm <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }
    let fits = |s: &str| text_width_mm(s, font_size, bold, family) <= max_width_mm;

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        for word in words {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{current_line} {word}")
            };
            if fits(&candidate) {
                current_line = candidate;
                continue;
            }
            if !current_line.is_empty() {
                lines.push(std::mem::take(&mut current_line));
            }
            if fits(word) {
                current_line = word.to_string();
            } else {
                // Hard-break an over-long token (URLs, part numbers).
                for ch in word.chars() {
                    let mut next = current_line.clone();
                    next.push(ch);
                    if !fits(&next) && !current_line.is_empty() {
                        lines.push(std::mem::take(&mut current_line));
                        next = ch.to_string();
                    }
                    current_line = next;
                }
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_afm_widths() {
        // "Hello" = 722 + 556 + 222 + 222 + 556 = 2278 units
        let w = measure_text_width("Hello", 10.0, false, FontFamily::Helvetica);
        assert!((w - 22.78).abs() < 0.01);
    }

    #[test]
    fn courier_is_monospaced() {
        let a = measure_text_width("iiii", 12.0, false, FontFamily::Courier);
        let b = measure_text_width("WWWW", 12.0, true, FontFamily::Courier);
        assert_eq!(a, b);
    }

    #[test]
    fn bold_is_wider() {
        let regular = measure_text_width("Invoice", 12.0, false, FontFamily::Helvetica);
        let bold = measure_text_width("Invoice", 12.0, true, FontFamily::Helvetica);
        assert!(bold > regular);
    }

    #[test]
    fn word_wrap_basic() {
        let lines = wrap_text("Hello world foo bar", 10.0, false, FontFamily::Helvetica, 12.0);
        assert!(lines.len() >= 2, "Expected wrapping, got {lines:?}");
        for line in &lines {
            assert!(text_width_mm(line, 10.0, false, FontFamily::Helvetica) <= 12.0);
        }
    }

    #[test]
    fn newlines_are_preserved() {
        let lines = wrap_text("12 Elm St\nSpringfield", 10.0, false, FontFamily::Helvetica, 200.0);
        assert_eq!(lines, vec!["12 Elm St", "Springfield"]);
    }

    #[test]
    fn long_token_is_broken() {
        let token = "X".repeat(60);
        let lines = wrap_text(&token, 10.0, false, FontFamily::Helvetica, 30.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), token);
    }
}
