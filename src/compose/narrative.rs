//! Composers whose body is mostly rich text: warranty, daily report, note.

use crate::document::{DailyReport, Note, Warranty};
use crate::draw::Align;
use crate::error::Result;
use crate::pagination::compose_html;
use crate::totals::format_quantity;

use super::context::RenderContext;
use super::field::period;
use super::signature::compose_signatures;
use super::{compose_facts, compose_rich_section, Letterhead};

pub fn compose_warranty(ctx: &mut RenderContext<'_>, lh: &Letterhead<'_>, doc: &Warranty) -> Result<f32> {
    let meta = [
        ("Warranty #", doc.warranty_number.clone()),
        ("Date", lh.header.date.clone()),
    ];
    let y = lh.open_with_client(ctx, "WARRANTY", &meta, "Issued To");
    let y = compose_facts(
        ctx,
        y,
        &[
            ("Project", doc.project_name.clone()),
            ("Coverage", period(&doc.coverage_start, &doc.coverage_end)),
        ],
    );
    let y = compose_rich_section(ctx, y, "Warranty Terms", &doc.terms)?;
    let y = compose_rich_section(ctx, y, "Exclusions", &doc.exclusions)?;
    Ok(compose_signatures(ctx, y, &lh.contractor_slot(), None))
}

pub fn compose_daily_report(ctx: &mut RenderContext<'_>, lh: &Letterhead<'_>, doc: &DailyReport) -> Result<f32> {
    let meta = [
        ("Report #", doc.report_number.clone()),
        ("Date", lh.header.date.clone()),
    ];
    let y = lh.open_with_client(ctx, "DAILY REPORT", &meta, "Client");

    let crew = if doc.crew_count > 0 {
        doc.crew_count.to_string()
    } else {
        String::new()
    };
    let hours = if doc.hours_worked > 0.0 {
        format_quantity(doc.hours_worked)
    } else {
        String::new()
    };
    let y = compose_facts(
        ctx,
        y,
        &[
            ("Project", doc.project_name.clone()),
            ("Weather", doc.weather.clone()),
            ("Crew on Site", crew),
            ("Hours Worked", hours),
        ],
    );
    let y = compose_rich_section(ctx, y, "Work Performed", &doc.work_performed)?;
    compose_rich_section(ctx, y, "Issues & Delays", &doc.issues)
}

pub fn compose_note(ctx: &mut RenderContext<'_>, lh: &Letterhead<'_>, doc: &Note) -> Result<f32> {
    let meta = [
        ("Note #", doc.note_number.clone()),
        ("Date", lh.header.date.clone()),
    ];
    let mut y = lh.open(ctx, "NOTE", &meta);
    if !doc.title.trim().is_empty() {
        let g = ctx.geometry;
        let style = ctx.heading(14.0);
        y = ctx.paragraph(g.left(), y, doc.title.trim(), style, g.content_width(), Align::Left) + 3.0;
    }
    compose_html(ctx, y, &doc.content)
}
