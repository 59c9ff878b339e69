//! Template registry – the named visual styles a document can pick from,
//! plus colour parsing and theme resolution.
//!
//! Each template is a static, immutable record. Resolution never fails:
//! unknown identifiers fall back to [`DEFAULT_TEMPLATE`] and malformed colours
//! fall back to black.

use serde::{Deserialize, Serialize};

use crate::document::Theme;
use crate::fonts::FontFamily;

pub const DEFAULT_TEMPLATE: &str = "standard";

/// Structural page treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutFamily {
    /// Centred content inside a bordered page frame.
    Certificate,
    /// Full-width coloured banner across the top of the first page.
    Modern,
}

/// Colour roles as hex strings, exactly as authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub text: &'static str,
    pub header_bg: &'static str,
    pub header_text: &'static str,
    pub border: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateStyle {
    pub id: &'static str,
    pub name: &'static str,
    pub palette: Palette,
    pub heading_font: FontFamily,
    pub body_font: FontFamily,
    pub family: LayoutFamily,
}

/// 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb8(pub u8, pub u8, pub u8);

impl Rgb8 {
    pub const BLACK: Rgb8 = Rgb8(0, 0, 0);
    pub const WHITE: Rgb8 = Rgb8(255, 255, 255);

    /// Channels scaled to 0.0–1.0 for PDF colour operators.
    pub fn to_unit(self) -> [f32; 3] {
        [
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        ]
    }

    /// Blend towards white; `amount` 0.0 keeps the colour, 1.0 gives white.
    pub fn tint(self, amount: f32) -> Rgb8 {
        let amount = amount.clamp(0.0, 1.0);
        let mix = |c: u8| (c as f32 + (255.0 - c as f32) * amount).round() as u8;
        Rgb8(mix(self.0), mix(self.1), mix(self.2))
    }
}

/// Parse `#rrggbb`, `#rgb` (the `#` is optional). Anything else is black.
pub fn parse_hex(hex: &str) -> Rgb8 {
    try_parse_hex(hex).unwrap_or(Rgb8::BLACK)
}

fn try_parse_hex(hex: &str) -> Option<Rgb8> {
    let hex = hex.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        6 => Some(Rgb8(
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        )),
        3 => Some(Rgb8(
            u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?,
            u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?,
            u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?,
        )),
        _ => None,
    }
}

static TEMPLATES: [TemplateStyle; 9] = [
    TemplateStyle {
        id: "standard",
        name: "Standard",
        palette: Palette {
            primary: "#1e3a5f",
            secondary: "#3b82f6",
            text: "#1f2937",
            header_bg: "#1e3a5f",
            header_text: "#ffffff",
            border: "#d1d5db",
        },
        heading_font: FontFamily::Helvetica,
        body_font: FontFamily::Helvetica,
        family: LayoutFamily::Modern,
    },
    TemplateStyle {
        id: "modern",
        name: "Modern",
        palette: Palette {
            primary: "#0f766e",
            secondary: "#14b8a6",
            text: "#111827",
            header_bg: "#0f766e",
            header_text: "#ffffff",
            border: "#cbd5e1",
        },
        heading_font: FontFamily::Helvetica,
        body_font: FontFamily::Helvetica,
        family: LayoutFamily::Modern,
    },
    TemplateStyle {
        id: "corporate",
        name: "Corporate",
        palette: Palette {
            primary: "#1f2937",
            secondary: "#6b7280",
            text: "#111827",
            header_bg: "#111827",
            header_text: "#f9fafb",
            border: "#9ca3af",
        },
        heading_font: FontFamily::Helvetica,
        body_font: FontFamily::Helvetica,
        family: LayoutFamily::Modern,
    },
    TemplateStyle {
        id: "bold",
        name: "Bold",
        palette: Palette {
            primary: "#b91c1c",
            secondary: "#f59e0b",
            text: "#1c1917",
            header_bg: "#b91c1c",
            header_text: "#ffffff",
            border: "#e7e5e4",
        },
        heading_font: FontFamily::Helvetica,
        body_font: FontFamily::Helvetica,
        family: LayoutFamily::Modern,
    },
    TemplateStyle {
        id: "minimal",
        name: "Minimal",
        palette: Palette {
            primary: "#374151",
            secondary: "#9ca3af",
            text: "#374151",
            header_bg: "#f3f4f6",
            header_text: "#111827",
            border: "#e5e7eb",
        },
        heading_font: FontFamily::Helvetica,
        body_font: FontFamily::Helvetica,
        family: LayoutFamily::Modern,
    },
    TemplateStyle {
        id: "classic",
        name: "Classic",
        palette: Palette {
            primary: "#1e293b",
            secondary: "#94a3b8",
            text: "#1e293b",
            header_bg: "#e2e8f0",
            header_text: "#1e293b",
            border: "#1e293b",
        },
        heading_font: FontFamily::Times,
        body_font: FontFamily::Times,
        family: LayoutFamily::Certificate,
    },
    TemplateStyle {
        id: "certificate",
        name: "Certificate",
        palette: Palette {
            primary: "#7c2d12",
            secondary: "#d97706",
            text: "#292524",
            header_bg: "#fef3c7",
            header_text: "#7c2d12",
            border: "#b45309",
        },
        heading_font: FontFamily::Times,
        body_font: FontFamily::Helvetica,
        family: LayoutFamily::Certificate,
    },
    TemplateStyle {
        id: "elegant",
        name: "Elegant",
        palette: Palette {
            primary: "#4c1d95",
            secondary: "#a78bfa",
            text: "#1f2937",
            header_bg: "#ede9fe",
            header_text: "#4c1d95",
            border: "#7c3aed",
        },
        heading_font: FontFamily::Times,
        body_font: FontFamily::Times,
        family: LayoutFamily::Certificate,
    },
    TemplateStyle {
        id: "heritage",
        name: "Heritage",
        palette: Palette {
            primary: "#14532d",
            secondary: "#ca8a04",
            text: "#1c1917",
            header_bg: "#dcfce7",
            header_text: "#14532d",
            border: "#166534",
        },
        heading_font: FontFamily::Times,
        body_font: FontFamily::Courier,
        family: LayoutFamily::Certificate,
    },
];

/// All registered templates, in picker order.
pub fn all_templates() -> &'static [TemplateStyle] {
    &TEMPLATES
}

/// Look up a template by id; unknown or empty ids give the default style.
pub fn template(id: &str) -> &'static TemplateStyle {
    let id = id.trim();
    TEMPLATES
        .iter()
        .find(|t| t.id.eq_ignore_ascii_case(id))
        .unwrap_or_else(|| {
            if !id.is_empty() {
                log::debug!("Unknown template '{id}', using '{DEFAULT_TEMPLATE}'");
            }
            &TEMPLATES[0]
        })
}

/// A template with parsed colours and the document theme applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedStyle {
    pub id: &'static str,
    pub family: LayoutFamily,
    pub primary: Rgb8,
    pub secondary: Rgb8,
    pub text: Rgb8,
    pub header_bg: Rgb8,
    pub header_text: Rgb8,
    pub border: Rgb8,
    pub heading_font: FontFamily,
    pub body_font: FontFamily,
}

/// Resolve the effective style. Theme colours win over the template's own
/// primary/secondary when present and non-empty.
pub fn resolve_style(template_id: &str, theme: Option<&Theme>) -> ResolvedStyle {
    let tpl = template(template_id);
    let pick = |over: Option<&str>, fallback: &str| match over {
        Some(c) if !c.trim().is_empty() => parse_hex(c),
        _ => parse_hex(fallback),
    };
    let primary = pick(theme.map(|t| t.primary.as_str()), tpl.palette.primary);
    let secondary = pick(theme.map(|t| t.secondary.as_str()), tpl.palette.secondary);

    // Themed modern banners take the primary colour. Certificate fills
    // keep the template tint.
    let header_bg = match (tpl.family, theme) {
        (LayoutFamily::Modern, Some(t)) if !t.primary.trim().is_empty() => primary,
        _ => parse_hex(tpl.palette.header_bg),
    };

    ResolvedStyle {
        id: tpl.id,
        family: tpl.family,
        primary,
        secondary,
        text: parse_hex(tpl.palette.text),
        header_bg,
        header_text: parse_hex(tpl.palette.header_text),
        border: parse_hex(tpl.palette.border),
        heading_font: tpl.heading_font,
        body_font: tpl.body_font,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_six_and_three_digits() {
        assert_eq!(parse_hex("#ff8800"), Rgb8(255, 136, 0));
        assert_eq!(parse_hex("1e3a5f"), Rgb8(0x1e, 0x3a, 0x5f));
        assert_eq!(parse_hex("#abc"), Rgb8(0xaa, 0xbb, 0xcc));
    }

    #[test]
    fn malformed_hex_is_black() {
        for bad in ["", "#", "#12", "#12345", "#gggggg", "blue", "#ff88001", "#ééé"] {
            assert_eq!(parse_hex(bad), Rgb8::BLACK, "input {bad:?}");
        }
    }

    #[test]
    fn unknown_template_falls_back_to_standard() {
        assert_eq!(template("does-not-exist").id, DEFAULT_TEMPLATE);
        assert_eq!(template("").id, DEFAULT_TEMPLATE);
        assert_eq!(resolve_style("nope", None), resolve_style("standard", None));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(template("Classic").id, "classic");
    }

    #[test]
    fn resolution_is_idempotent() {
        for t in all_templates() {
            assert_eq!(resolve_style(t.id, None), resolve_style(t.id, None));
        }
    }

    #[test]
    fn theme_overrides_primary_and_secondary() {
        let theme = Theme {
            primary: "#102030".into(),
            secondary: "#405060".into(),
        };
        let s = resolve_style("classic", Some(&theme));
        assert_eq!(s.primary, Rgb8(0x10, 0x20, 0x30));
        assert_eq!(s.secondary, Rgb8(0x40, 0x50, 0x60));
        // Roles outside the theme keep the template palette.
        assert_eq!(s.border, parse_hex(template("classic").palette.border));
    }

    #[test]
    fn empty_theme_fields_fall_back_to_template() {
        let theme = Theme {
            primary: String::new(),
            secondary: "#405060".into(),
        };
        let s = resolve_style("modern", Some(&theme));
        assert_eq!(s.primary, parse_hex("#0f766e"));
        assert_eq!(s.secondary, Rgb8(0x40, 0x50, 0x60));
        assert_eq!(s.header_bg, parse_hex("#0f766e"));
    }

    #[test]
    fn registry_ids_are_unique() {
        let mut ids: Vec<_> = all_templates().iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), all_templates().len());
    }

    #[test]
    fn tint_moves_towards_white() {
        assert_eq!(Rgb8(0, 0, 0).tint(1.0), Rgb8::WHITE);
        assert_eq!(Rgb8(100, 100, 100).tint(0.0), Rgb8(100, 100, 100));
    }
}
