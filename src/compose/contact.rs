//! Two-column "from / to" contact block.

use crate::document::{ClientBlock, CompanyBlock, Profile};
use crate::draw::{Align, TextStyle};
use crate::fonts::{line_height_mm, wrap_text};

use super::context::RenderContext;

const LABEL_PT: f32 = 8.0;
const NAME_PT: f32 = 11.0;
const DETAIL_PT: f32 = 9.0;
const COLUMN_GAP: f32 = 10.0;
const SPACING: f32 = 8.0;

/// Company identity with every empty field taken from the profile.
pub fn resolve_company(company: &CompanyBlock, profile: &Profile) -> CompanyBlock {
    let pick = |own: &str, fallback: &str| {
        if own.trim().is_empty() {
            fallback.to_string()
        } else {
            own.to_string()
        }
    };
    CompanyBlock {
        name: pick(&company.name, &profile.company_name),
        address: pick(&company.address, &profile.address),
        phone: pick(&company.phone, &profile.phone),
        email: pick(&company.email, &profile.email),
        license_number: pick(&company.license_number, &profile.license_number),
        logo_url: pick(&company.logo_url, &profile.logo_url),
    }
}

/// One column of the grid: a label, a name line and detail lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactColumn {
    pub label: String,
    pub name: String,
    pub details: Vec<String>,
}

impl ContactColumn {
    pub fn company(label: &str, company: &CompanyBlock) -> Self {
        let mut details: Vec<String> = company.address.lines().map(str::to_string).collect();
        details.push(company.phone.clone());
        details.push(company.email.clone());
        if !company.license_number.trim().is_empty() {
            details.push(format!("License #{}", company.license_number.trim()));
        }
        Self {
            label: label.to_string(),
            name: company.name.clone(),
            details: details.into_iter().filter(|d| !d.trim().is_empty()).collect(),
        }
    }

    pub fn client(label: &str, client: &ClientBlock) -> Self {
        let mut details: Vec<String> = client.address.lines().map(str::to_string).collect();
        details.push(client.phone.clone());
        details.push(client.email.clone());
        Self {
            label: label.to_string(),
            name: client.name.clone(),
            details: details.into_iter().filter(|d| !d.trim().is_empty()).collect(),
        }
    }
}

/// Draw both columns side by side starting at `y` and return the cursor
/// below the taller one.
pub fn compose_contact_grid(ctx: &mut RenderContext<'_>, y: f32, left: &ContactColumn, right: &ContactColumn) -> f32 {
    let g = ctx.geometry;
    let col_w = (g.content_width() - COLUMN_GAP) / 2.0;
    let styles = ColumnStyles::new(ctx);
    // Both columns start on the same page: move on when the taller one,
    // wrapped, does not fit.
    let tallest = styles
        .height(col_w, left)
        .max(styles.height(col_w, right));
    let y = ctx.ensure_space(y, tallest);

    let left_end = draw_column(ctx, g.left(), y, col_w, left, &styles);
    let right_end = draw_column(ctx, g.left() + col_w + COLUMN_GAP, y, col_w, right, &styles);
    left_end.max(right_end) + SPACING
}

struct ColumnStyles {
    label: TextStyle,
    name: TextStyle,
    detail: TextStyle,
}

impl ColumnStyles {
    fn new(ctx: &RenderContext<'_>) -> Self {
        Self {
            label: ctx.body(LABEL_PT).bold().colored(ctx.style.secondary),
            name: ctx.body(NAME_PT).bold(),
            detail: ctx.body(DETAIL_PT),
        }
    }

    /// Height of `col` once wrapped to `width`.
    fn height(&self, width: f32, col: &ContactColumn) -> f32 {
        let wrapped = |text: &str, style: TextStyle| {
            wrap_text(text, style.size, style.bold, style.family, width).len() as f32
                * line_height_mm(style.size)
        };
        let mut h = line_height_mm(self.label.size) + 0.5;
        if !col.name.trim().is_empty() {
            h += wrapped(&col.name, self.name);
        }
        h + col
            .details
            .iter()
            .map(|d| wrapped(d, self.detail))
            .sum::<f32>()
    }
}

fn draw_column(
    ctx: &mut RenderContext<'_>,
    x: f32,
    y: f32,
    width: f32,
    col: &ContactColumn,
    styles: &ColumnStyles,
) -> f32 {
    let mut cursor = ctx.text(x, y, &col.label.to_uppercase(), styles.label, Align::Left) + 0.5;
    if !col.name.trim().is_empty() {
        cursor = ctx.paragraph(x, cursor, &col.name, styles.name, width, Align::Left);
    }
    for detail in &col.details {
        cursor = ctx.paragraph(x, cursor, detail, styles.detail, width, Align::Left);
    }
    cursor
}
