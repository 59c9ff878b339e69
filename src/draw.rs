//! Draw commands – the frozen output of the composers and the only input of
//! the PDF renderer.
//!
//! Coordinates are millimetres from the top-left corner of the page. Text
//! positions are baselines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fonts::FontFamily;
use crate::templates::Rgb8;

/// A complete document layout ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentLayout {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub pages: Vec<PageLayout>,
    /// Images referenced by [`DrawCommand::Image`], keyed by `ImageCommand::key`.
    pub images: BTreeMap<String, EmbeddedImage>,
}

/// One page of content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub commands: Vec<DrawCommand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    Png,
    Jpeg,
}

/// Encoded image bytes registered once per document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedImage {
    pub encoding: ImageEncoding,
    pub width_px: u32,
    pub height_px: u32,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// Image bytes travel as base64 strings in layout JSON.
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD.decode(encoded.trim()).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Font selection for a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub family: FontFamily,
    /// Points.
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: Rgb8,
}

impl TextStyle {
    pub fn new(family: FontFamily, size: f32, color: Rgb8) -> Self {
        Self {
            family,
            size,
            bold: false,
            italic: false,
            color,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn sized(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn colored(mut self, color: Rgb8) -> Self {
        self.color = color;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCommand {
    /// Left edge of the run (alignment is resolved by the composer).
    pub x: f32,
    /// Baseline.
    pub y: f32,
    pub text: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageCommand {
    pub key: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectCommand {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Rgb8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeCommand {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Rgb8,
    /// Line width in points.
    pub thickness: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineCommand {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub color: Rgb8,
    /// Line width in points.
    pub thickness: f32,
}

/// One table cell: pre-wrapped lines plus alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub lines: Vec<String>,
    pub align: Align,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    /// Row height in millimetres (already accounts for wrapped lines).
    pub height: f32,
    /// Alternate-row shading.
    pub fill: Option<Rgb8>,
}

/// A table fragment that fits on one page. Long tables become one command
/// per page, each repeating the header row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCommand {
    pub x: f32,
    pub y: f32,
    pub column_widths: Vec<f32>,
    pub header: TableRow,
    pub rows: Vec<TableRow>,
    pub header_fill: Rgb8,
    pub header_style: TextStyle,
    pub body_style: TextStyle,
    pub border_color: Rgb8,
    /// Inner cell padding in millimetres.
    pub padding: f32,
}

impl TableCommand {
    pub fn height(&self) -> f32 {
        self.header.height + self.rows.iter().map(|r| r.height).sum::<f32>()
    }
}

/// Positioned drawing primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Text(TextCommand),
    Image(ImageCommand),
    FilledRect(RectCommand),
    StrokeRect(StrokeCommand),
    Line(LineCommand),
    Table(TableCommand),
}

impl DocumentLayout {
    /// Create an empty A4 layout.
    pub fn a4(title: &str) -> Self {
        Self {
            title: title.to_string(),
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            pages: Vec::new(),
            images: BTreeMap::new(),
        }
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Every text run on `page`, in draw order. Table cells are included.
    pub fn page_text(&self, page: usize) -> Vec<&str> {
        let mut out = Vec::new();
        let Some(page) = self.pages.get(page) else {
            return out;
        };
        for cmd in &page.commands {
            match cmd {
                DrawCommand::Text(t) => out.push(t.text.as_str()),
                DrawCommand::Table(t) => {
                    for row in std::iter::once(&t.header).chain(t.rows.iter()) {
                        for cell in &row.cells {
                            out.extend(cell.lines.iter().map(String::as_str));
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_tagged_in_json() {
        let mut layout = DocumentLayout::a4("t");
        layout.pages.push(PageLayout {
            page_index: 0,
            commands: vec![DrawCommand::FilledRect(RectCommand {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 5.0,
                color: Rgb8(1, 2, 3),
            })],
        });
        let json = layout.to_json();
        assert!(json.contains("\"op\": \"filled_rect\""));
        let parsed = DocumentLayout::from_json(&json).unwrap();
        assert_eq!(parsed.pages[0].commands, layout.pages[0].commands);
    }

    #[test]
    fn image_bytes_are_base64_in_json() {
        let mut layout = DocumentLayout::a4("t");
        layout.images.insert(
            "logo".into(),
            EmbeddedImage {
                encoding: ImageEncoding::Png,
                width_px: 1,
                height_px: 1,
                data: b"hello".to_vec(),
            },
        );
        let json = layout.to_json();
        assert!(json.contains("\"aGVsbG8=\""));
        let parsed = DocumentLayout::from_json(&json).unwrap();
        assert_eq!(parsed.images["logo"].data, b"hello");
    }

    #[test]
    fn page_text_includes_table_cells() {
        let style = TextStyle::new(FontFamily::Helvetica, 10.0, Rgb8::BLACK);
        let cell = |s: &str| TableCell {
            lines: vec![s.to_string()],
            align: Align::Left,
        };
        let mut layout = DocumentLayout::a4("t");
        layout.pages.push(PageLayout {
            page_index: 0,
            commands: vec![DrawCommand::Table(TableCommand {
                x: 0.0,
                y: 0.0,
                column_widths: vec![10.0],
                header: TableRow {
                    cells: vec![cell("Item")],
                    height: 7.0,
                    fill: None,
                },
                rows: vec![TableRow {
                    cells: vec![cell("Nails")],
                    height: 7.0,
                    fill: None,
                }],
                header_fill: Rgb8::BLACK,
                header_style: style,
                body_style: style,
                border_color: Rgb8::BLACK,
                padding: 2.0,
            })],
        });
        assert_eq!(layout.page_text(0), vec!["Item", "Nails"]);
        assert!(layout.page_text(3).is_empty());
    }
}
