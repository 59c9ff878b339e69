//! Tabular sections and the totals block.
//!
//! Tables are split into one [`TableCommand`] per page. A row that does not
//! fit below the cursor moves to the next page together with a repeated
//! header row.

use crate::draw::{Align, DrawCommand, TableCell, TableCommand, TableRow, TextStyle};
use crate::fonts::{line_height_mm, wrap_text};
use crate::totals::{format_currency, format_quantity, Totals};

use super::context::RenderContext;

const HEADER_PT: f32 = 9.0;
const BODY_PT: f32 = 9.0;
const PADDING: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub title: String,
    /// Relative width; columns share the content width in proportion.
    pub width_ratio: f32,
    pub align: Align,
}

impl Column {
    pub fn new(title: &str, width_ratio: f32, align: Align) -> Self {
        Self {
            title: title.to_string(),
            width_ratio,
            align,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSpec {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
    /// Shown in the first column when `rows` is empty.
    pub empty_message: Option<String>,
}

fn build_row(cells: &[String], columns: &[Column], widths: &[f32], style: &TextStyle) -> TableRow {
    let line_h = line_height_mm(style.size);
    let cells: Vec<TableCell> = columns
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (col, w))| {
            let text = cells.get(i).map(String::as_str).unwrap_or("");
            TableCell {
                lines: wrap_text(text, style.size, style.bold, style.family, w - 2.0 * PADDING),
                align: col.align,
            }
        })
        .collect();
    let max_lines = cells.iter().map(|c| c.lines.len()).max().unwrap_or(1).max(1);
    TableRow {
        cells,
        height: max_lines as f32 * line_h + 2.0 * PADDING,
        fill: None,
    }
}

/// Cut a row that cannot fit on an empty page down to the lines that do,
/// marking the cut with `...`.
fn clamp_row(row: &mut TableRow, max_height: f32, line_h: f32) {
    if row.height <= max_height {
        return;
    }
    let max_lines = (((max_height - 2.0 * PADDING) / line_h).floor() as usize).max(1);
    log::warn!(
        "Table row of {:.0} mm is taller than a page; keeping {max_lines} line(s)",
        row.height
    );
    for cell in &mut row.cells {
        if cell.lines.len() > max_lines {
            cell.lines.truncate(max_lines);
            if let Some(last) = cell.lines.last_mut() {
                last.push_str("...");
            }
        }
    }
    row.height = max_lines as f32 * line_h + 2.0 * PADDING;
}

/// Draw `spec` at `y`, spilling onto new pages as needed. Returns the cursor
/// below the last fragment.
pub fn compose_table(ctx: &mut RenderContext<'_>, y: f32, spec: &TableSpec) -> f32 {
    let g = ctx.geometry;
    let total_ratio: f32 = spec.columns.iter().map(|c| c.width_ratio).sum::<f32>().max(f32::EPSILON);
    let widths: Vec<f32> = spec
        .columns
        .iter()
        .map(|c| c.width_ratio / total_ratio * g.content_width())
        .collect();

    let header_style = TextStyle::new(ctx.style.body_font, HEADER_PT, ctx.style.header_text).bold();
    let body_style = ctx.body(BODY_PT);
    let titles: Vec<String> = spec.columns.iter().map(|c| c.title.clone()).collect();
    let header = build_row(&titles, &spec.columns, &widths, &header_style);

    let stripe = ctx.style.primary.tint(0.93);
    let mut rows: Vec<TableRow> = spec
        .rows
        .iter()
        .enumerate()
        .map(|(i, cells)| {
            let mut row = build_row(cells, &spec.columns, &widths, &body_style);
            if i % 2 == 1 {
                row.fill = Some(stripe);
            }
            row
        })
        .collect();
    if rows.is_empty() {
        if let Some(msg) = &spec.empty_message {
            rows.push(build_row(std::slice::from_ref(msg), &spec.columns, &widths, &body_style));
        }
    }

    let max_row_h = g.bottom_limit() - g.margin_top - header.height;
    for row in &mut rows {
        clamp_row(row, max_row_h, line_height_mm(body_style.size));
    }

    let first_h = rows.first().map_or(0.0, |r| r.height);
    let mut top = ctx.ensure_space(y, header.height + first_h);
    let (header_fill, border_color) = (ctx.style.header_bg, ctx.style.border);
    let new_fragment = |top: f32| TableCommand {
        x: g.left(),
        y: top,
        column_widths: widths.clone(),
        header: header.clone(),
        rows: Vec::new(),
        header_fill,
        header_style,
        body_style,
        border_color,
        padding: PADDING,
    };
    let mut fragment = new_fragment(top);

    for row in rows {
        let bottom = fragment.y + fragment.height();
        if bottom + row.height > g.bottom_limit() && !fragment.rows.is_empty() {
            ctx.push(DrawCommand::Table(std::mem::replace(&mut fragment, new_fragment(0.0))));
            top = ctx.new_page();
            fragment.y = top;
        }
        fragment.rows.push(row);
    }
    let end = fragment.y + fragment.height();
    ctx.push(DrawCommand::Table(fragment));
    end + 4.0
}

/// One row of the totals block.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalsLine {
    pub label: String,
    pub value: String,
    /// Drawn larger, in the primary colour, above a rule.
    pub emphasized: bool,
}

impl TotalsLine {
    pub fn new(label: &str, value: String) -> Self {
        Self {
            label: label.to_string(),
            value,
            emphasized: false,
        }
    }

    pub fn emphasized(label: &str, value: String) -> Self {
        Self {
            label: label.to_string(),
            value,
            emphasized: true,
        }
    }
}

/// Standard rows for a [`Totals`] record. Discount and shipping rows appear
/// only when non-zero, unless `always_shipping` is set.
pub fn totals_lines(totals: &Totals, tax_rate: f64, always_shipping: bool) -> Vec<TotalsLine> {
    let mut lines = vec![TotalsLine::new("Subtotal", format_currency(totals.subtotal))];
    if totals.discount != 0.0 {
        lines.push(TotalsLine::new("Discount", format_currency(-totals.discount)));
    }
    if tax_rate != 0.0 || totals.tax != 0.0 {
        lines.push(TotalsLine::new(
            &format!("Tax ({}%)", format_quantity(tax_rate)),
            format_currency(totals.tax),
        ));
    }
    if always_shipping || totals.shipping != 0.0 {
        lines.push(TotalsLine::new("Shipping", format_currency(totals.shipping)));
    }
    lines.push(TotalsLine::emphasized("Total", format_currency(totals.total)));
    lines
}

/// Right-aligned label/value block. Returns the cursor below it.
pub fn compose_totals(ctx: &mut RenderContext<'_>, y: f32, lines: &[TotalsLine]) -> f32 {
    let g = ctx.geometry;
    let needed: f32 = lines
        .iter()
        .map(|l| line_height_mm(if l.emphasized { 12.0 } else { 10.0 }) + 1.0)
        .sum::<f32>()
        + 2.0;
    let mut cursor = ctx.ensure_space(y, needed);
    let block_left = g.right() - g.content_width() * 0.4;
    let value_x = g.right();
    let label_x = g.right() - 35.0;

    for line in lines {
        let style = if line.emphasized {
            ctx.body(12.0).bold().colored(ctx.style.primary)
        } else {
            ctx.body(10.0)
        };
        if line.emphasized {
            ctx.line(block_left, cursor, g.right(), cursor, ctx.style.primary, 0.75);
            cursor += 1.5;
        }
        ctx.text(label_x, cursor, &line.label, style, Align::Right);
        cursor = ctx.text(value_x, cursor, &line.value, style, Align::Right) + 1.0;
    }
    cursor + 4.0
}
