//! Layout engine – uses Taffy to stack the styled tree into blocks, with a
//! small inline formatter for line boxes, then flattens the result into a
//! list of paint items in CSS pixels.

use std::collections::HashMap;

use image::{DynamicImage, GenericImageView};
use taffy::prelude::*;

use crate::draw::Align;
use crate::error::{DocError, Result};
use crate::templates::Rgb8;

use super::dom::Tag;
use super::glyphs::{normalize_text_for_mono, Face};
use super::style::{ComputedStyle, Display, StyledNode};

/// Text properties of a single run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStyle {
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Rgb8,
    pub background: Option<Rgb8>,
    line_height: f32,
}

impl RunStyle {
    fn from_computed(s: &ComputedStyle) -> Self {
        Self {
            font_size: s.font_size,
            bold: s.bold,
            italic: s.italic,
            underline: s.underline,
            color: s.color,
            background: None,
            line_height: s.line_height_px(),
        }
    }
}

/// A positioned primitive in CSS pixels relative to the content origin.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintItem {
    Fill {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb8,
    },
    /// One-pixel rectangle outline.
    Border {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb8,
    },
    /// `y` is the top of the glyph cell.
    Text {
        x: f32,
        y: f32,
        text: String,
        style: RunStyle,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        src: String,
    },
}

/// The laid-out content.
#[derive(Debug, Clone, Default)]
pub struct ContentLayout {
    pub width: f32,
    pub height: f32,
    pub items: Vec<PaintItem>,
}

/// Converts CSS sizes to device glyph faces at a given raster scale.
#[derive(Debug, Clone, Copy)]
pub struct Metrics {
    pub scale: f32,
}

impl Metrics {
    pub fn face(&self, style: &RunStyle) -> Face {
        Face::select(style.font_size * self.scale, style.bold, style.italic)
    }

    /// Width of normalised text in CSS pixels.
    pub fn text_width(&self, text: &str, style: &RunStyle) -> f32 {
        self.face(style).text_width(text) as f32 / self.scale
    }

    fn glyph_height(&self, style: &RunStyle) -> f32 {
        self.face(style).height() as f32 / self.scale
    }
}

// ---------------------------------------------------------------------------
// Inline formatting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Atom {
    Word(String, RunStyle),
    Space(RunStyle),
    Break(RunStyle),
    Image { src: String, width: f32, height: f32 },
}

#[derive(Debug, Clone)]
enum Fragment {
    Text {
        x: f32,
        width: f32,
        text: String,
        style: RunStyle,
    },
    Image {
        x: f32,
        width: f32,
        height: f32,
        src: String,
    },
}

#[derive(Debug, Clone, Default)]
struct LineBox {
    width: f32,
    height: f32,
    fragments: Vec<Fragment>,
}

impl LineBox {
    fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

#[derive(Debug, Clone)]
enum NodeContent {
    Lines { lines: Vec<LineBox>, align: Align },
    Marker { text: String, style: RunStyle },
}

#[derive(Debug, Clone, Default)]
struct Decor {
    background: Option<Rgb8>,
    border: Option<Rgb8>,
    rule_left: Option<Rgb8>,
}

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    metrics: Metrics,
    images: &'a HashMap<String, DynamicImage>,
    node_content: HashMap<NodeId, NodeContent>,
    node_decor: HashMap<NodeId, Decor>,
}

fn taffy_err(e: taffy::TaffyError) -> DocError {
    DocError::Render(format!("rich text layout failed: {e}"))
}

impl<'a> LayoutBuilder<'a> {
    fn new(metrics: Metrics, images: &'a HashMap<String, DynamicImage>) -> Self {
        Self {
            taffy: TaffyTree::new(),
            metrics,
            images,
            node_content: HashMap::new(),
            node_decor: HashMap::new(),
        }
    }

    /// Flatten an inline subtree into atoms. Whitespace collapses to single
    /// spaces as in normal CSS flow.
    fn collect_atoms(&self, node: &StyledNode, max_width: f32, out: &mut Vec<Atom>) {
        match node {
            StyledNode::Text { text, style } => {
                let mut run = RunStyle::from_computed(style);
                run.background = style.background;
                let text = normalize_text_for_mono(text);
                for (i, word) in text.split(|c: char| c.is_whitespace()).enumerate() {
                    if i > 0 && !matches!(out.last(), Some(Atom::Space(_) | Atom::Break(_)) | None) {
                        out.push(Atom::Space(run));
                    }
                    if !word.is_empty() {
                        out.push(Atom::Word(word.to_string(), run));
                    }
                }
            }
            StyledNode::Element {
                tag,
                style,
                children,
                src,
            } => match tag {
                Tag::Br => out.push(Atom::Break(RunStyle::from_computed(style))),
                Tag::Img => {
                    if let Some((src, w, h)) = src.as_deref().and_then(|s| self.image_size(s, style, max_width)) {
                        out.push(Atom::Image {
                            src,
                            width: w,
                            height: h,
                        });
                    }
                }
                _ => {
                    for child in children {
                        // Inline elements hand their background down to text runs.
                        let child = match (child, style.background) {
                            (StyledNode::Text { text, style: cs }, Some(bg)) => {
                                let mut cs = cs.clone();
                                cs.background = Some(bg);
                                StyledNode::Text {
                                    text: text.clone(),
                                    style: cs,
                                }
                            }
                            _ => child.clone(),
                        };
                        self.collect_atoms(&child, max_width, out);
                    }
                }
            },
        }
    }

    /// Resolve the displayed size of an image; `None` when it failed to load.
    fn image_size(&self, src: &str, style: &ComputedStyle, max_width: f32) -> Option<(String, f32, f32)> {
        let img = self.images.get(src)?;
        let (px_w, px_h) = img.dimensions();
        if px_w == 0 || px_h == 0 {
            return None;
        }
        let aspect = px_w as f32 / px_h as f32;
        let (mut w, mut h) = match (style.width, style.height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => (w, w / aspect),
            (None, Some(h)) => (h * aspect, h),
            (None, None) => (px_w as f32, px_h as f32),
        };
        if w > max_width && max_width > 0.0 {
            h *= max_width / w;
            w = max_width;
        }
        Some((src.to_string(), w.max(1.0), h.max(1.0)))
    }

    /// Break atoms into line boxes no wider than `max_width`.
    fn break_lines(&self, atoms: Vec<Atom>, block_style: &RunStyle, max_width: f32) -> Vec<LineBox> {
        let mut lines = Vec::new();
        let mut line = LineBox::default();
        let mut pending_space: Option<RunStyle> = None;

        let finish = |line: &mut LineBox, fallback: f32, lines: &mut Vec<LineBox>| {
            if line.height <= 0.0 {
                line.height = fallback;
            }
            lines.push(std::mem::take(line));
        };

        for atom in atoms {
            match atom {
                Atom::Space(style) => {
                    if !line.is_empty() {
                        pending_space = Some(style);
                    }
                }
                Atom::Break(style) => {
                    pending_space = None;
                    finish(&mut line, style.line_height, &mut lines);
                }
                Atom::Word(word, style) => {
                    let space_w = pending_space
                        .map(|s| self.metrics.text_width(" ", &s))
                        .unwrap_or(0.0);
                    let word_w = self.metrics.text_width(&word, &style);
                    if !line.is_empty() && line.width + space_w + word_w > max_width {
                        finish(&mut line, block_style.line_height, &mut lines);
                        pending_space = None;
                    }
                    if let Some(space_style) = pending_space.take() {
                        self.push_text(&mut line, " ", space_style);
                    }
                    if word_w <= max_width || !line.is_empty() {
                        self.push_text(&mut line, &word, style);
                        continue;
                    }
                    // Hard-break a token wider than the whole line.
                    let mut chunk = String::new();
                    for ch in word.chars() {
                        chunk.push(ch);
                        if self.metrics.text_width(&chunk, &style) > max_width && chunk.chars().count() > 1 {
                            chunk.pop();
                            self.push_text(&mut line, &chunk, style);
                            finish(&mut line, block_style.line_height, &mut lines);
                            chunk = ch.to_string();
                        }
                    }
                    self.push_text(&mut line, &chunk, style);
                }
                Atom::Image { src, width, height } => {
                    let space_w = pending_space
                        .map(|s| self.metrics.text_width(" ", &s))
                        .unwrap_or(0.0);
                    if !line.is_empty() && line.width + space_w + width > max_width {
                        finish(&mut line, block_style.line_height, &mut lines);
                        pending_space = None;
                    }
                    if let Some(space_style) = pending_space.take() {
                        self.push_text(&mut line, " ", space_style);
                    }
                    line.fragments.push(Fragment::Image {
                        x: line.width,
                        width,
                        height,
                        src,
                    });
                    line.width += width;
                    line.height = line.height.max(height);
                }
            }
        }
        if !line.is_empty() {
            finish(&mut line, block_style.line_height, &mut lines);
        }
        // Trailing spaces never count towards alignment.
        for line in &mut lines {
            if let Some(Fragment::Text { text, width, style, .. }) = line.fragments.last_mut() {
                let trimmed = text.trim_end().len();
                if trimmed < text.len() {
                    text.truncate(trimmed);
                    let new_w = self.metrics.text_width(text, style);
                    line.width -= *width - new_w;
                    *width = new_w;
                }
            }
        }
        lines
    }

    fn push_text(&self, line: &mut LineBox, text: &str, style: RunStyle) {
        let w = self.metrics.text_width(text, &style);
        line.height = line.height.max(style.line_height);
        if let Some(Fragment::Text {
            text: last,
            width,
            style: last_style,
            ..
        }) = line.fragments.last_mut()
        {
            if *last_style == style {
                last.push_str(text);
                *width += w;
                line.width += w;
                return;
            }
        }
        line.fragments.push(Fragment::Text {
            x: line.width,
            width: w,
            text: text.to_string(),
            style,
        });
        line.width += w;
    }

    /// Lay out a sequence of inline nodes as an anonymous paragraph.
    fn build_paragraph(&mut self, run: &[&StyledNode], block: &ComputedStyle, width: f32) -> Result<Option<NodeId>> {
        let mut atoms = Vec::new();
        for node in run {
            self.collect_atoms(node, width, &mut atoms);
        }
        if !atoms.iter().any(|a| matches!(a, Atom::Word(..) | Atom::Image { .. } | Atom::Break(_))) {
            return Ok(None);
        }
        let block_run = RunStyle::from_computed(block);
        let lines = self.break_lines(atoms, &block_run, width);
        let height: f32 = lines.iter().map(|l| l.height).sum();
        let node = self
            .taffy
            .new_leaf(Style {
                size: Size {
                    width: Dimension::Length(width),
                    height: Dimension::Length(height),
                },
                flex_shrink: 0.0,
                ..Default::default()
            })
            .map_err(taffy_err)?;
        self.node_content.insert(
            node,
            NodeContent::Lines {
                lines,
                align: block.text_align,
            },
        );
        Ok(Some(node))
    }

    /// Build block-level children, wrapping runs of inline content into
    /// anonymous paragraphs.
    fn build_children(&mut self, children: &[StyledNode], parent: &ComputedStyle, width: f32) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut run: Vec<&StyledNode> = Vec::new();
        let mut list_counter = 0u32;
        for child in children {
            if child.is_inline() {
                run.push(child);
                continue;
            }
            if !run.is_empty() {
                out.extend(self.build_paragraph(&run, parent, width)?);
                run.clear();
            }
            let marker = if child.style().display == Display::ListItem {
                list_counter += 1;
                Some(list_counter)
            } else {
                None
            };
            // Stray list items outside a list get bullets.
            if let Some(id) = self.build_block(child, width, marker.map(|n| (n, false)))? {
                out.push(id);
            }
        }
        if !run.is_empty() {
            out.extend(self.build_paragraph(&run, parent, width)?);
        }
        Ok(out)
    }

    fn build_block(&mut self, node: &StyledNode, width: f32, list_index: Option<(u32, bool)>) -> Result<Option<NodeId>> {
        let StyledNode::Element {
            tag, style, children, ..
        } = node
        else {
            return Ok(None);
        };

        if *tag == Tag::Hr {
            let id = self
                .taffy
                .new_leaf(Style {
                    size: Size {
                        width: Dimension::Length(width),
                        height: Dimension::Length(style.height.unwrap_or(1.0)),
                    },
                    margin: margin_rect(style),
                    flex_shrink: 0.0,
                    ..Default::default()
                })
                .map_err(taffy_err)?;
            self.node_decor.insert(
                id,
                Decor {
                    background: style.background,
                    ..Decor::default()
                },
            );
            return Ok(Some(id));
        }

        if style.display == Display::Table {
            return self.build_table(style, children, width).map(Some);
        }

        let border = style.border_width;
        let inner = (width - style.padding_left - style.padding_right - 2.0 * border).max(1.0);
        let child_nodes = if matches!(tag, Tag::Ul | Tag::Ol) {
            self.build_list(children, style, inner, *tag == Tag::Ol)?
        } else {
            self.build_children(children, style, inner)?
        };

        let ts = Style {
            display: taffy::Display::Flex,
            flex_direction: FlexDirection::Column,
            size: Size {
                width: Dimension::Length(width),
                height: Dimension::Auto,
            },
            margin: margin_rect(style),
            padding: padding_rect(style),
            border: uniform(border),
            flex_shrink: 0.0,
            ..Default::default()
        };
        let id = self.taffy.new_with_children(ts, &child_nodes).map_err(taffy_err)?;
        self.node_decor.insert(
            id,
            Decor {
                background: style.background,
                border: (border > 0.0).then_some(style.border_color),
                rule_left: style.rule_left,
            },
        );
        if let Some((n, ordered)) = list_index {
            let text = if ordered { format!("{n}.") } else { "*".to_string() };
            self.node_content.insert(
                id,
                NodeContent::Marker {
                    text,
                    style: RunStyle::from_computed(style),
                },
            );
        }
        Ok(Some(id))
    }

    fn build_list(&mut self, children: &[StyledNode], style: &ComputedStyle, width: f32, ordered: bool) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut run: Vec<&StyledNode> = Vec::new();
        let mut counter = 0u32;
        for child in children {
            if child.style().display == Display::ListItem {
                if !run.is_empty() {
                    out.extend(self.build_paragraph(&run, style, width)?);
                    run.clear();
                }
                counter += 1;
                out.extend(self.build_block(child, width, Some((counter, ordered)))?);
            } else if child.is_inline() {
                run.push(child);
            } else {
                out.extend(self.build_block(child, width, None)?);
            }
        }
        if !run.is_empty() {
            out.extend(self.build_paragraph(&run, style, width)?);
        }
        Ok(out)
    }

    fn build_table(&mut self, style: &ComputedStyle, children: &[StyledNode], width: f32) -> Result<NodeId> {
        let mut rows: Vec<&StyledNode> = Vec::new();
        collect_rows(children, &mut rows);
        let columns = rows
            .iter()
            .map(|r| row_cells(r).len())
            .max()
            .unwrap_or(0)
            .max(1);
        let cell_width = width / columns as f32;

        let mut row_nodes = Vec::new();
        for row in rows {
            let mut cell_nodes = Vec::new();
            for cell in row_cells(row) {
                let StyledNode::Element {
                    style: cs, children, ..
                } = cell
                else {
                    continue;
                };
                let inner = (cell_width - cs.padding_left - cs.padding_right - 2.0 * cs.border_width).max(1.0);
                let content = self.build_children(children, cs, inner)?;
                let id = self
                    .taffy
                    .new_with_children(
                        Style {
                            display: taffy::Display::Flex,
                            flex_direction: FlexDirection::Column,
                            flex_grow: 0.0,
                            flex_shrink: 0.0,
                            size: Size {
                                width: Dimension::Length(cell_width),
                                height: Dimension::Auto,
                            },
                            padding: padding_rect(cs),
                            border: uniform(cs.border_width),
                            ..Default::default()
                        },
                        &content,
                    )
                    .map_err(taffy_err)?;
                self.node_decor.insert(
                    id,
                    Decor {
                        background: cs.background,
                        border: (cs.border_width > 0.0).then_some(cs.border_color),
                        rule_left: None,
                    },
                );
                cell_nodes.push(id);
            }
            let row_id = self
                .taffy
                .new_with_children(
                    Style {
                        display: taffy::Display::Flex,
                        flex_direction: FlexDirection::Row,
                        align_items: Some(AlignItems::Stretch),
                        size: Size {
                            width: Dimension::Length(width),
                            height: Dimension::Auto,
                        },
                        flex_shrink: 0.0,
                        ..Default::default()
                    },
                    &cell_nodes,
                )
                .map_err(taffy_err)?;
            row_nodes.push(row_id);
        }

        let id = self
            .taffy
            .new_with_children(
                Style {
                    display: taffy::Display::Flex,
                    flex_direction: FlexDirection::Column,
                    size: Size {
                        width: Dimension::Length(width),
                        height: Dimension::Auto,
                    },
                    margin: margin_rect(style),
                    flex_shrink: 0.0,
                    ..Default::default()
                },
                &row_nodes,
            )
            .map_err(taffy_err)?;
        self.node_decor.insert(
            id,
            Decor {
                background: style.background,
                ..Decor::default()
            },
        );
        Ok(id)
    }

    /// Walk the computed tree and emit paint items in absolute coordinates.
    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32, out: &mut Vec<PaintItem>) -> Result<()> {
        let layout = self.taffy.layout(node).map_err(taffy_err)?;
        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;
        let (w, h) = (layout.size.width, layout.size.height);
        let decor = self.node_decor.get(&node).cloned().unwrap_or_default();

        if let Some(color) = decor.background {
            out.push(PaintItem::Fill {
                x,
                y,
                width: w,
                height: h,
                color,
            });
        }
        if let Some(color) = decor.rule_left {
            out.push(PaintItem::Fill {
                x,
                y,
                width: 3.0,
                height: h,
                color,
            });
        }

        match self.node_content.get(&node) {
            Some(NodeContent::Lines { lines, align }) => self.emit_lines(lines, *align, x, y, w, out),
            Some(NodeContent::Marker { text, style }) => {
                let marker_w = self.metrics.text_width(text, style);
                let glyph_h = self.metrics.glyph_height(style);
                out.push(PaintItem::Text {
                    x: x - marker_w - 6.0,
                    y: y + layout.padding.top + (style.line_height - glyph_h) / 2.0,
                    text: text.clone(),
                    style: *style,
                });
            }
            None => {}
        }

        for child in self.taffy.children(node).map_err(taffy_err)? {
            self.extract(child, x, y, out)?;
        }

        if let Some(color) = decor.border {
            out.push(PaintItem::Border {
                x,
                y,
                width: w,
                height: h,
                color,
            });
        }
        Ok(())
    }

    fn emit_lines(&self, lines: &[LineBox], align: Align, x: f32, y: f32, width: f32, out: &mut Vec<PaintItem>) {
        let mut top = y;
        for line in lines {
            let offset = match align {
                Align::Left => 0.0,
                Align::Center => ((width - line.width) / 2.0).max(0.0),
                Align::Right => (width - line.width).max(0.0),
            };
            let bottom = top + line.height;
            for frag in &line.fragments {
                match frag {
                    Fragment::Text {
                        x: fx,
                        width: fw,
                        text,
                        style,
                    } => {
                        let box_top = bottom - style.line_height;
                        if let Some(bg) = style.background {
                            out.push(PaintItem::Fill {
                                x: x + offset + fx,
                                y: box_top,
                                width: *fw,
                                height: style.line_height,
                                color: bg,
                            });
                        }
                        let glyph_h = self.metrics.glyph_height(style);
                        out.push(PaintItem::Text {
                            x: x + offset + fx,
                            y: box_top + (style.line_height - glyph_h) / 2.0,
                            text: text.clone(),
                            style: *style,
                        });
                    }
                    Fragment::Image {
                        x: fx,
                        width: fw,
                        height: fh,
                        src,
                    } => out.push(PaintItem::Image {
                        x: x + offset + fx,
                        y: bottom - fh,
                        width: *fw,
                        height: *fh,
                        src: src.clone(),
                    }),
                }
            }
            top = bottom;
        }
    }
}

fn collect_rows<'n>(nodes: &'n [StyledNode], out: &mut Vec<&'n StyledNode>) {
    for node in nodes {
        if let StyledNode::Element { tag, children, .. } = node {
            match tag {
                Tag::Tr => out.push(node),
                Tag::Td | Tag::Th => {}
                _ => collect_rows(children, out),
            }
        }
    }
}

fn row_cells(row: &StyledNode) -> Vec<&StyledNode> {
    match row {
        StyledNode::Element { children, .. } => children
            .iter()
            .filter(|c| c.style().display == Display::TableCell)
            .collect(),
        StyledNode::Text { .. } => Vec::new(),
    }
}

fn margin_rect(s: &ComputedStyle) -> Rect<LengthPercentageAuto> {
    Rect {
        top: LengthPercentageAuto::Length(s.margin_top),
        right: LengthPercentageAuto::Length(0.0),
        bottom: LengthPercentageAuto::Length(s.margin_bottom),
        left: LengthPercentageAuto::Length(0.0),
    }
}

fn padding_rect(s: &ComputedStyle) -> Rect<LengthPercentage> {
    Rect {
        top: LengthPercentage::Length(s.padding_top),
        right: LengthPercentage::Length(s.padding_right),
        bottom: LengthPercentage::Length(s.padding_bottom),
        left: LengthPercentage::Length(s.padding_left),
    }
}

fn uniform(v: f32) -> Rect<LengthPercentage> {
    Rect {
        top: LengthPercentage::Length(v),
        right: LengthPercentage::Length(v),
        bottom: LengthPercentage::Length(v),
        left: LengthPercentage::Length(v),
    }
}

/// Lay out a styled tree at `width` CSS pixels. `images` holds the decoded
/// pixels of every image that loaded; missing sources are skipped.
pub fn compute_layout(
    styled_nodes: &[StyledNode],
    width: f32,
    metrics: Metrics,
    images: &HashMap<String, DynamicImage>,
) -> Result<ContentLayout> {
    let mut builder = LayoutBuilder::new(metrics, images);
    let root_style = ComputedStyle::default();
    let child_ids = builder.build_children(styled_nodes, &root_style, width)?;

    let root = builder
        .taffy
        .new_with_children(
            Style {
                display: taffy::Display::Flex,
                flex_direction: FlexDirection::Column,
                size: Size {
                    width: Dimension::Length(width),
                    height: Dimension::Auto,
                },
                ..Default::default()
            },
            &child_ids,
        )
        .map_err(taffy_err)?;

    builder
        .taffy
        .compute_layout(
            root,
            Size {
                width: AvailableSpace::Definite(width),
                height: AvailableSpace::MaxContent,
            },
        )
        .map_err(taffy_err)?;

    let height = builder.taffy.layout(root).map_err(taffy_err)?.size.height;
    let mut items = Vec::new();
    builder.extract(root, 0.0, 0.0, &mut items)?;
    Ok(ContentLayout { width, height, items })
}
