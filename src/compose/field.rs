//! Composers for field paperwork: work orders, time sheets, material logs
//! and expense logs.

use std::collections::BTreeMap;

use crate::document::{ExpenseEntry, ExpenseLog, MaterialEntry, MaterialLog, TimeEntry, TimeSheet, WorkOrder};
use crate::draw::Align;
use crate::error::Result;
use crate::totals::{compute_totals, format_currency, format_quantity, Adjustments, BillingMode};

use super::billing::line_item_table;
use super::context::RenderContext;
use super::table::{compose_table, compose_totals, Column, TableSpec, TotalsLine};
use super::{compose_facts, compose_rich_section, compose_section_heading, Letterhead};

pub fn compose_work_order(ctx: &mut RenderContext<'_>, lh: &Letterhead<'_>, doc: &WorkOrder) -> Result<f32> {
    let meta = [
        ("Work Order #", doc.work_order_number.clone()),
        ("Date", lh.header.date.clone()),
    ];
    let y = lh.open_with_client(ctx, "WORK ORDER", &meta, "Customer");
    let y = compose_facts(
        ctx,
        y,
        &[
            ("Job Address", doc.job_address.clone()),
            ("Scheduled", doc.scheduled_date.clone()),
            ("Assigned To", doc.assigned_to.clone()),
            ("Status", doc.status.clone()),
            ("Priority", doc.priority.clone()),
        ],
    );
    let y = compose_rich_section(ctx, y, "Scope of Work", &doc.description)?;

    if doc.tasks.is_empty() {
        return Ok(y);
    }
    let y = compose_section_heading(ctx, y, "Tasks");
    let mut spec = line_item_table(&doc.tasks, BillingMode::Standard);
    spec.columns[0].title = "Task".to_string();
    let y = compose_table(ctx, y, &spec);
    let totals = compute_totals(&doc.tasks, BillingMode::Standard, Adjustments::default());
    if totals.total == 0.0 {
        return Ok(y);
    }
    Ok(compose_totals(
        ctx,
        y,
        &[TotalsLine::emphasized("Total", format_currency(totals.total))],
    ))
}

/// Total hours and total pay across `entries`.
pub fn time_totals(entries: &[TimeEntry]) -> (f64, f64) {
    entries
        .iter()
        .fold((0.0, 0.0), |(hours, pay), e| (hours + e.hours, pay + e.hours * e.rate))
}

pub(super) fn period(start: &str, end: &str) -> String {
    match (start.trim(), end.trim()) {
        ("", "") => String::new(),
        (s, "") => format!("From {s}"),
        ("", e) => format!("Until {e}"),
        (s, e) => format!("{s} to {e}"),
    }
}

pub fn compose_time_sheet(ctx: &mut RenderContext<'_>, lh: &Letterhead<'_>, doc: &TimeSheet) -> Result<f32> {
    let meta = [
        ("Time Sheet #", doc.sheet_number.clone()),
        ("Date", lh.header.date.clone()),
    ];
    let y = lh.open_with_client(ctx, "TIME SHEET", &meta, "Client");
    let y = compose_facts(
        ctx,
        y,
        &[
            ("Employee", doc.employee_name.clone()),
            ("Period", period(&doc.period_start, &doc.period_end)),
        ],
    );

    let spec = TableSpec {
        columns: vec![
            Column::new("Date", 1.3, Align::Left),
            Column::new("Project", 1.8, Align::Left),
            Column::new("Description", 3.0, Align::Left),
            Column::new("Hours", 0.9, Align::Right),
            Column::new("Rate", 1.1, Align::Right),
            Column::new("Pay", 1.3, Align::Right),
        ],
        rows: doc
            .entries
            .iter()
            .map(|e| {
                vec![
                    e.date.clone(),
                    e.project.clone(),
                    e.description.clone(),
                    format_quantity(e.hours),
                    format_currency(e.rate),
                    format_currency(e.hours * e.rate),
                ]
            })
            .collect(),
        empty_message: Some("No time entries".to_string()),
    };
    let y = compose_table(ctx, y, &spec);

    let (hours, pay) = time_totals(&doc.entries);
    Ok(compose_totals(
        ctx,
        y,
        &[
            TotalsLine::new("Total Hours", format_quantity(hours)),
            TotalsLine::emphasized("Total Pay", format_currency(pay)),
        ],
    ))
}

pub fn material_total(entries: &[MaterialEntry]) -> f64 {
    entries.iter().map(|e| e.quantity * e.unit_cost).sum()
}

pub fn compose_material_log(ctx: &mut RenderContext<'_>, lh: &Letterhead<'_>, doc: &MaterialLog) -> Result<f32> {
    let meta = [
        ("Log #", doc.log_number.clone()),
        ("Date", lh.header.date.clone()),
    ];
    let y = lh.open_with_client(ctx, "MATERIAL LOG", &meta, "Client");
    let y = compose_facts(ctx, y, &[("Project", doc.project_name.clone())]);

    let spec = TableSpec {
        columns: vec![
            Column::new("Date", 1.3, Align::Left),
            Column::new("Material", 2.6, Align::Left),
            Column::new("Supplier", 1.8, Align::Left),
            Column::new("Qty", 1.2, Align::Right),
            Column::new("Unit Cost", 1.2, Align::Right),
            Column::new("Total", 1.3, Align::Right),
        ],
        rows: doc
            .entries
            .iter()
            .map(|e| {
                let qty = format!("{} {}", format_quantity(e.quantity), e.unit.trim());
                vec![
                    e.date.clone(),
                    e.material.clone(),
                    e.supplier.clone(),
                    qty.trim_end().to_string(),
                    format_currency(e.unit_cost),
                    format_currency(e.quantity * e.unit_cost),
                ]
            })
            .collect(),
        empty_message: Some("No materials logged".to_string()),
    };
    let y = compose_table(ctx, y, &spec);
    Ok(compose_totals(
        ctx,
        y,
        &[TotalsLine::emphasized("Total Cost", format_currency(material_total(&doc.entries)))],
    ))
}

/// Per-category sums in category order; a blank category counts as
/// "Uncategorized".
pub fn category_totals(entries: &[ExpenseEntry]) -> Vec<(String, f64)> {
    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for e in entries {
        let category = match e.category.trim() {
            "" => "Uncategorized",
            c => c,
        };
        *sums.entry(category.to_string()).or_default() += e.amount;
    }
    sums.into_iter().collect()
}

pub fn compose_expense_log(ctx: &mut RenderContext<'_>, lh: &Letterhead<'_>, doc: &ExpenseLog) -> Result<f32> {
    let meta = [
        ("Log #", doc.log_number.clone()),
        ("Date", lh.header.date.clone()),
    ];
    let y = lh.open_with_client(ctx, "EXPENSE LOG", &meta, "Client");
    let y = compose_facts(ctx, y, &[("Period", doc.period.clone())]);

    let spec = TableSpec {
        columns: vec![
            Column::new("Date", 1.3, Align::Left),
            Column::new("Category", 1.6, Align::Left),
            Column::new("Vendor", 1.8, Align::Left),
            Column::new("Description", 3.0, Align::Left),
            Column::new("Amount", 1.3, Align::Right),
        ],
        rows: doc
            .entries
            .iter()
            .map(|e| {
                vec![
                    e.date.clone(),
                    e.category.clone(),
                    e.vendor.clone(),
                    e.description.clone(),
                    format_currency(e.amount),
                ]
            })
            .collect(),
        empty_message: Some("No expenses recorded".to_string()),
    };
    let y = compose_table(ctx, y, &spec);

    let categories = category_totals(&doc.entries);
    let grand: f64 = categories.iter().map(|(_, v)| v).sum();
    let mut lines: Vec<TotalsLine> = categories
        .into_iter()
        .map(|(category, amount)| TotalsLine::new(&category, format_currency(amount)))
        .collect();
    lines.push(TotalsLine::emphasized("Grand Total", format_currency(grand)));
    Ok(compose_totals(ctx, y, &lines))
}
