//! Page composers.
//!
//! [`compose_document`] resolves the template, opens a [`RenderContext`] and
//! hands it to the composer for the record's kind. Composers emit draw
//! commands only; turning the resulting [`DocumentLayout`] into PDF bytes is
//! the job of [`crate::render`].

pub mod billing;
pub mod contact;
pub mod context;
pub mod field;
pub mod header;
pub mod narrative;
pub mod signature;
pub mod table;

use crate::assets::{AssetLoader, LoadedImage};
use crate::config::RenderConfig;
use crate::document::{ClientBlock, CompanyBlock, DocumentHeader, DocumentRecord, Profile};
use crate::draw::{Align, DocumentLayout};
use crate::error::Result;
use crate::fonts::line_height_mm;
use crate::pagination::{compose_html, MIN_SLICE_SPACE};
use crate::richtext::dom::{is_blank, parse_html};
use crate::templates::resolve_style;

use contact::{compose_contact_grid, resolve_company, ContactColumn};
use context::RenderContext;
use header::compose_header;
use signature::SignatureSlot;

const SECTION_PT: f32 = 11.0;
const FACT_PT: f32 = 9.5;
const FACT_LABEL_W: f32 = 38.0;

/// Lay out `doc` page by page.
pub fn compose_document(
    doc: &DocumentRecord,
    profile: &Profile,
    config: &RenderConfig,
    loader: &dyn AssetLoader,
) -> Result<DocumentLayout> {
    let header = doc.header();
    let style = resolve_style(&header.template_id, header.theme.as_ref());
    let title = format!("{} {}", doc.type_name(), doc.primary_id());
    log::debug!(
        "Composing {} with template {:?} ({:?} family)",
        title.trim(),
        style.id,
        style.family
    );

    let mut ctx = RenderContext::new(title.trim(), &style, config, loader);
    let company = resolve_company(&header.company, profile);
    let logo = ctx.load_image(&company.logo_url);
    let letterhead = Letterhead {
        header,
        company,
        logo,
    };

    match doc {
        DocumentRecord::Invoice(d) => billing::compose_invoice(&mut ctx, &letterhead, d)?,
        DocumentRecord::Estimate(d) => billing::compose_estimate(&mut ctx, &letterhead, d)?,
        DocumentRecord::ChangeOrder(d) => billing::compose_change_order(&mut ctx, &letterhead, d)?,
        DocumentRecord::PurchaseOrder(d) => billing::compose_purchase_order(&mut ctx, &letterhead, d)?,
        DocumentRecord::Receipt(d) => billing::compose_receipt(&mut ctx, &letterhead, d)?,
        DocumentRecord::WorkOrder(d) => field::compose_work_order(&mut ctx, &letterhead, d)?,
        DocumentRecord::TimeSheet(d) => field::compose_time_sheet(&mut ctx, &letterhead, d)?,
        DocumentRecord::MaterialLog(d) => field::compose_material_log(&mut ctx, &letterhead, d)?,
        DocumentRecord::ExpenseLog(d) => field::compose_expense_log(&mut ctx, &letterhead, d)?,
        DocumentRecord::Warranty(d) => narrative::compose_warranty(&mut ctx, &letterhead, d)?,
        DocumentRecord::DailyReport(d) => narrative::compose_daily_report(&mut ctx, &letterhead, d)?,
        DocumentRecord::Note(d) => narrative::compose_note(&mut ctx, &letterhead, d)?,
    };
    Ok(ctx.finish())
}

/// Identity shared by every page composer: the record's common block, the
/// company after profile fallback and the logo if it loaded.
pub struct Letterhead<'d> {
    pub header: &'d DocumentHeader,
    pub company: CompanyBlock,
    pub logo: Option<LoadedImage>,
}

impl Letterhead<'_> {
    /// Header block at the top margin. Returns the body cursor.
    pub fn open(&self, ctx: &mut RenderContext<'_>, title: &str, meta: &[(&str, String)]) -> f32 {
        let y = ctx.geometry.margin_top;
        compose_header(ctx, y, title, meta, self.logo.as_ref())
    }

    /// Header followed by the "from / to" grid.
    pub fn open_with_client(
        &self,
        ctx: &mut RenderContext<'_>,
        title: &str,
        meta: &[(&str, String)],
        client_label: &str,
    ) -> f32 {
        let y = self.open(ctx, title, meta);
        let from = ContactColumn::company("From", &self.company);
        let to = ContactColumn::client(client_label, &self.header.client);
        compose_contact_grid(ctx, y, &from, &to)
    }

    pub fn client(&self) -> &ClientBlock {
        &self.header.client
    }

    /// Contractor signature slot; the image is the record's own signature.
    pub fn contractor_slot(&self) -> SignatureSlot {
        SignatureSlot {
            label: "Contractor".to_string(),
            name: self.company.name.clone(),
            image: self.header.signature.clone(),
            signed_at: None,
        }
    }
}

/// Section title in the heading colour with a rule beneath. Keeps at least
/// a minimal slice of room for what follows.
pub fn compose_section_heading(ctx: &mut RenderContext<'_>, y: f32, title: &str) -> f32 {
    let top = ctx.ensure_space(y, line_height_mm(SECTION_PT) + MIN_SLICE_SPACE);
    let style = ctx.heading(SECTION_PT);
    let cursor = ctx.text(ctx.geometry.left(), top, title, style, Align::Left) + 0.5;
    ctx.rule(cursor);
    cursor + 2.5
}

/// `label  value` rows with a fixed label column. Empty values are skipped.
pub fn compose_facts(ctx: &mut RenderContext<'_>, y: f32, facts: &[(&str, String)]) -> f32 {
    let g = ctx.geometry;
    let label_style = ctx.body(FACT_PT).bold().colored(ctx.style.secondary);
    let value_style = ctx.body(FACT_PT);
    let mut cursor = y;
    let mut drawn = false;
    for (label, value) in facts.iter().filter(|(_, v)| !v.trim().is_empty()) {
        cursor = ctx.ensure_space(cursor, line_height_mm(FACT_PT));
        ctx.text(g.left(), cursor, label, label_style, Align::Left);
        let width = g.content_width() - FACT_LABEL_W;
        for line in value.trim().lines() {
            cursor = ctx.paragraph(g.left() + FACT_LABEL_W, cursor, line, value_style, width, Align::Left);
        }
        drawn = true;
    }
    if drawn {
        cursor + 4.0
    } else {
        y
    }
}

/// Plain-text section; line breaks in `text` are kept. Blank text draws
/// nothing.
pub fn compose_text_section(ctx: &mut RenderContext<'_>, y: f32, title: &str, text: &str) -> f32 {
    if text.trim().is_empty() {
        return y;
    }
    let g = ctx.geometry;
    let style = ctx.body(10.0);
    let mut cursor = compose_section_heading(ctx, y, title);
    for line in text.trim().lines() {
        if line.trim().is_empty() {
            cursor += line_height_mm(style.size) / 2.0;
            continue;
        }
        cursor = ctx.paragraph(g.left(), cursor, line, style, g.content_width(), Align::Left);
    }
    cursor + 4.0
}

/// Rich-text section paginated as bitmap slices. Blank HTML draws nothing.
pub fn compose_rich_section(ctx: &mut RenderContext<'_>, y: f32, title: &str, html: &str) -> Result<f32> {
    if is_blank(&parse_html(html)) {
        return Ok(y);
    }
    let cursor = compose_section_heading(ctx, y, title);
    Ok(compose_html(ctx, cursor, html)? + 4.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::DefaultAssetLoader;
    use crate::document::{Invoice, Note};

    fn layout(doc: &DocumentRecord) -> DocumentLayout {
        compose_document(doc, &Profile::default(), &RenderConfig::default(), &DefaultAssetLoader::default())
            .unwrap()
    }

    #[test]
    fn title_names_kind_and_number() {
        let doc = DocumentRecord::Invoice(Invoice {
            invoice_number: "INV-9".into(),
            ..Invoice::default()
        });
        assert_eq!(layout(&doc).title, "Invoice INV-9");
    }

    #[test]
    fn profile_fills_company_name() {
        let doc = DocumentRecord::Invoice(Invoice::default());
        let profile = Profile {
            company_name: "Ridge Roofing".into(),
            ..Profile::default()
        };
        let layout = compose_document(&doc, &profile, &RenderConfig::default(), &DefaultAssetLoader::default())
            .unwrap();
        assert!(layout.page_text(0).contains(&"Ridge Roofing"));
    }

    #[test]
    fn blank_sections_draw_nothing() {
        let style = resolve_style("standard", None);
        let config = RenderConfig::default();
        let loader = DefaultAssetLoader::default();
        let mut ctx = RenderContext::new("t", &style, &config, &loader);
        assert_eq!(compose_text_section(&mut ctx, 50.0, "Notes", "  \n "), 50.0);
        assert_eq!(compose_rich_section(&mut ctx, 50.0, "Scope", "<p> </p>").unwrap(), 50.0);
        assert_eq!(compose_facts(&mut ctx, 50.0, &[("Project", String::new())]), 50.0);
        assert!(ctx.finish().page_text(0).iter().all(|t| t.starts_with("Page ")));
    }

    #[test]
    fn note_with_empty_content_is_one_page() {
        let doc = DocumentRecord::Note(Note {
            title: "Site access".into(),
            ..Note::default()
        });
        let layout = layout(&doc);
        assert_eq!(layout.pages.len(), 1);
        assert!(layout.images.is_empty());
    }
}
