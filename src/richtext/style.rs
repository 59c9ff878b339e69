//! Style resolution – computes the visual properties of every DOM node from
//! tag defaults, inheritance and inline `style` attributes.
//!
//! Units are CSS pixels throughout (96 per inch).

use crate::draw::Align;
use crate::templates::Rgb8;

use super::dom::{DomNode, ElementNode, Tag};

/// Text colour used when nothing else is specified.
pub const DEFAULT_TEXT: Rgb8 = Rgb8(31, 41, 55);
pub const BASE_FONT_PX: f32 = 14.0;
const LINE_HEIGHT: f32 = 1.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Inline,
    ListItem,
    Table,
    TableRow,
    TableCell,
    None,
}

/// Computed style for a single node.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,

    // Text (inherited)
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Rgb8,
    pub text_align: Align,
    /// Multiplier of `font_size`.
    pub line_height: f32,

    // Box model (not inherited)
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub padding_top: f32,
    pub padding_right: f32,
    pub padding_bottom: f32,
    pub padding_left: f32,
    pub background: Option<Rgb8>,
    pub border_width: f32,
    pub border_color: Rgb8,
    /// Left accent bar (blockquote).
    pub rule_left: Option<Rgb8>,
    /// Explicit `width`/`height` (images only).
    pub width: Option<f32>,
    pub height: Option<f32>,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            font_size: BASE_FONT_PX,
            bold: false,
            italic: false,
            underline: false,
            color: DEFAULT_TEXT,
            text_align: Align::Left,
            line_height: LINE_HEIGHT,
            margin_top: 0.0,
            margin_bottom: 0.0,
            padding_top: 0.0,
            padding_right: 0.0,
            padding_bottom: 0.0,
            padding_left: 0.0,
            background: None,
            border_width: 0.0,
            border_color: Rgb8(209, 213, 219),
            rule_left: None,
            width: None,
            height: None,
        }
    }
}

impl ComputedStyle {
    /// Line box height in CSS pixels.
    pub fn line_height_px(&self) -> f32 {
        self.font_size * self.line_height
    }

    /// Copy of the inheritable text properties only.
    fn inherited(&self) -> Self {
        Self {
            font_size: self.font_size,
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            color: self.color,
            text_align: self.text_align,
            line_height: self.line_height,
            ..Self::default()
        }
    }
}

/// Resolve the style for an element, inheriting text properties from its parent.
pub fn resolve_style(element: &ElementNode, parent: Option<&ComputedStyle>) -> ComputedStyle {
    let mut style = parent.map(ComputedStyle::inherited).unwrap_or_default();
    apply_tag_defaults(&mut style, &element.tag);
    if let Some(inline) = element.inline_style() {
        apply_inline_style(&mut style, inline);
    }
    if element.tag == Tag::Img {
        if let Some(w) = element.attr("width").and_then(parse_px) {
            style.width = Some(w);
        }
        if let Some(h) = element.attr("height").and_then(parse_px) {
            style.height = Some(h);
        }
    }
    if let Some(align) = element.attr("align") {
        if let Some(a) = parse_align(align) {
            style.text_align = a;
        }
    }
    style
}

fn apply_tag_defaults(s: &mut ComputedStyle, tag: &Tag) {
    match tag {
        Tag::H1 => heading(s, 2.0, 0.67),
        Tag::H2 => heading(s, 1.5, 0.83),
        Tag::H3 => heading(s, 1.17, 1.0),
        Tag::H4 => heading(s, 1.0, 1.33),
        Tag::P => {
            s.margin_bottom = 10.0;
        }
        Tag::Ul | Tag::Ol => {
            s.margin_bottom = 10.0;
            s.padding_left = 24.0;
        }
        Tag::Li => {
            s.display = Display::ListItem;
            s.margin_bottom = 4.0;
        }
        Tag::Blockquote => {
            s.margin_bottom = 10.0;
            s.padding_left = 12.0;
            s.italic = true;
            s.color = Rgb8(75, 85, 99);
            s.rule_left = Some(Rgb8(209, 213, 219));
        }
        Tag::Hr => {
            s.margin_top = 8.0;
            s.margin_bottom = 8.0;
            s.height = Some(1.0);
            s.background = Some(Rgb8(209, 213, 219));
        }
        Tag::Table => {
            s.display = Display::Table;
            s.margin_bottom = 10.0;
        }
        Tag::Tr => {
            s.display = Display::TableRow;
        }
        Tag::Td | Tag::Th => {
            s.display = Display::TableCell;
            s.padding_top = 4.0;
            s.padding_right = 6.0;
            s.padding_bottom = 4.0;
            s.padding_left = 6.0;
            s.border_width = 1.0;
            if *tag == Tag::Th {
                s.bold = true;
                s.background = Some(Rgb8(243, 244, 246));
            }
        }
        Tag::Strong => {
            s.display = Display::Inline;
            s.bold = true;
        }
        Tag::Em => {
            s.display = Display::Inline;
            s.italic = true;
        }
        Tag::U => {
            s.display = Display::Inline;
            s.underline = true;
        }
        Tag::A => {
            s.display = Display::Inline;
            s.underline = true;
            s.color = Rgb8(37, 99, 235);
        }
        Tag::Span | Tag::Br | Tag::Img => {
            s.display = Display::Inline;
        }
        Tag::Hidden => {
            s.display = Display::None;
        }
        Tag::Div | Tag::Body | Tag::Html | Tag::Head | Tag::Unknown(_) => {}
    }
}

fn heading(s: &mut ComputedStyle, em: f32, margin_em: f32) {
    s.font_size = BASE_FONT_PX * em;
    s.bold = true;
    s.margin_top = (s.font_size * margin_em * 0.5).round();
    s.margin_bottom = (s.font_size * margin_em * 0.5).round();
}

fn apply_inline_style(s: &mut ComputedStyle, style_str: &str) {
    for decl in style_str.split(';') {
        let Some((prop, val)) = decl.split_once(':') else {
            continue;
        };
        let prop = prop.trim().to_ascii_lowercase();
        let val = val.trim().trim_end_matches("!important").trim();
        apply_css_property(s, &prop, val);
    }
}

fn apply_css_property(s: &mut ComputedStyle, prop: &str, val: &str) {
    match prop {
        "font-size" => {
            if let Some(px) = parse_font_size(val, s.font_size) {
                s.font_size = px;
            }
        }
        "font-weight" => {
            s.bold = match val {
                "bold" | "bolder" => true,
                "normal" | "lighter" => false,
                n => n.parse::<u16>().map(|w| w >= 600).unwrap_or(s.bold),
            }
        }
        "font-style" => {
            s.italic = matches!(val, "italic" | "oblique");
        }
        "text-decoration" | "text-decoration-line" => {
            s.underline = val.contains("underline");
        }
        "color" => {
            if let Some(c) = parse_color(val) {
                s.color = c;
            }
        }
        "background-color" | "background" => {
            s.background = parse_color(val);
        }
        "text-align" => {
            if let Some(a) = parse_align(val) {
                s.text_align = a;
            }
        }
        "width" => s.width = parse_px(val),
        "height" => s.height = parse_px(val),
        "margin-top" => {
            if let Some(px) = parse_px(val) {
                s.margin_top = px;
            }
        }
        "margin-bottom" => {
            if let Some(px) = parse_px(val) {
                s.margin_bottom = px;
            }
        }
        "padding" => {
            let parts: Vec<f32> = val.split_whitespace().filter_map(parse_px).collect();
            let (t, r, b, l) = match parts.as_slice() {
                [a] => (*a, *a, *a, *a),
                [v, h] => (*v, *h, *v, *h),
                [t, h, b] => (*t, *h, *b, *h),
                [t, r, b, l] => (*t, *r, *b, *l),
                _ => return,
            };
            s.padding_top = t;
            s.padding_right = r;
            s.padding_bottom = b;
            s.padding_left = l;
        }
        "padding-left" => {
            if let Some(px) = parse_px(val) {
                s.padding_left = px;
            }
        }
        _ => {}
    }
}

fn parse_align(val: &str) -> Option<Align> {
    match val.trim().to_ascii_lowercase().as_str() {
        "left" | "start" | "justify" => Some(Align::Left),
        "center" => Some(Align::Center),
        "right" | "end" => Some(Align::Right),
        _ => None,
    }
}

/// Parse a length in `px`, `pt` or a bare number.
pub fn parse_px(s: &str) -> Option<f32> {
    let s = s.trim();
    let (num, factor) = if let Some(n) = s.strip_suffix("px") {
        (n, 1.0)
    } else if let Some(n) = s.strip_suffix("pt") {
        (n, 96.0 / 72.0)
    } else {
        (s, 1.0)
    };
    num.trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v * factor)
}

fn parse_font_size(val: &str, current: f32) -> Option<f32> {
    let val = val.trim();
    let px = match val {
        "x-small" => 10.0,
        "small" => 13.0,
        "medium" => 16.0,
        "large" => 18.0,
        "x-large" => 24.0,
        "xx-large" => 32.0,
        _ => {
            if let Some(em) = val.strip_suffix("em").filter(|v| !v.ends_with('r')) {
                em.trim().parse::<f32>().ok()? * current
            } else if let Some(rem) = val.strip_suffix("rem") {
                rem.trim().parse::<f32>().ok()? * BASE_FONT_PX
            } else if let Some(pct) = val.strip_suffix('%') {
                pct.trim().parse::<f32>().ok()? / 100.0 * current
            } else {
                parse_px(val)?
            }
        }
    };
    (px > 0.0 && px.is_finite()).then_some(px.min(96.0))
}

/// Parse `#hex`, `rgb(...)`/`rgba(...)` or a handful of named colours.
/// `transparent` and unknown values give `None`.
pub fn parse_color(val: &str) -> Option<Rgb8> {
    let val = val.trim().to_ascii_lowercase();
    if val.starts_with('#') {
        let hex = &val[1..];
        let valid = matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
        return valid.then(|| crate::templates::parse_hex(hex));
    }
    if let Some(args) = val
        .strip_prefix("rgba(")
        .or_else(|| val.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = args.split([',', ' ', '/']).filter(|p| !p.is_empty()).collect();
        if parts.len() < 3 {
            return None;
        }
        if let Some(alpha) = parts.get(3).and_then(|a| a.parse::<f32>().ok()) {
            if alpha == 0.0 {
                return None;
            }
        }
        let channel = |p: &str| -> Option<u8> {
            match p.strip_suffix('%') {
                Some(pct) => pct.parse::<f32>().ok().map(|v| (v.clamp(0.0, 100.0) * 2.55).round() as u8),
                None => p.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8),
            }
        };
        return Some(Rgb8(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?));
    }
    let named = match val.as_str() {
        "black" => Rgb8(0, 0, 0),
        "white" => Rgb8(255, 255, 255),
        "red" => Rgb8(255, 0, 0),
        "green" => Rgb8(0, 128, 0),
        "blue" => Rgb8(0, 0, 255),
        "yellow" => Rgb8(255, 255, 0),
        "orange" => Rgb8(255, 165, 0),
        "purple" => Rgb8(128, 0, 128),
        "gray" | "grey" => Rgb8(128, 128, 128),
        "silver" => Rgb8(192, 192, 192),
        "navy" => Rgb8(0, 0, 128),
        "teal" => Rgb8(0, 128, 128),
        "maroon" => Rgb8(128, 0, 0),
        _ => return None,
    };
    Some(named)
}

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        src: Option<String>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

impl StyledNode {
    pub fn style(&self) -> &ComputedStyle {
        match self {
            StyledNode::Element { style, .. } | StyledNode::Text { style, .. } => style,
        }
    }

    /// Inline content flows in line boxes; everything else stacks.
    pub fn is_inline(&self) -> bool {
        self.style().display == Display::Inline
    }
}

/// Build a styled tree from a DOM tree, resolving styles top-down.
/// Hidden elements are dropped.
pub fn build_styled_tree(nodes: &[DomNode], parent_style: Option<&ComputedStyle>) -> Vec<StyledNode> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) => {
                let style = resolve_style(e, parent_style);
                if style.display == Display::None {
                    continue;
                }
                let children = build_styled_tree(&e.children, Some(&style));
                result.push(StyledNode::Element {
                    tag: e.tag.clone(),
                    src: (e.tag == Tag::Img)
                        .then(|| e.attr("src").map(|s| s.trim().to_string()))
                        .flatten(),
                    style,
                    children,
                });
            }
            DomNode::Text(text) => {
                if !text.is_empty() {
                    let mut style = parent_style.map(ComputedStyle::inherited).unwrap_or_default();
                    style.display = Display::Inline;
                    result.push(StyledNode::Text {
                        text: text.clone(),
                        style,
                    });
                }
            }
        }
    }
    result
}
