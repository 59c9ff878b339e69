//! Composers for priced documents: invoice, estimate, change order,
//! purchase order and receipt.

use crate::document::{ChangeOrder, Estimate, Invoice, LineItem, PurchaseOrder, Receipt};
use crate::draw::Align;
use crate::error::Result;
use crate::totals::{
    compute_totals, format_currency, format_quantity, line_amount, Adjustments, BillingMode, Totals,
};

use super::context::RenderContext;
use super::signature::{compose_signatures, SignatureSlot};
use super::table::{compose_table, compose_totals, totals_lines, Column, TableSpec, TotalsLine};
use super::{compose_facts, compose_section_heading, compose_text_section, Letterhead};

/// Line-item table; progress mode adds a percent-complete column.
pub fn line_item_table(items: &[LineItem], mode: BillingMode) -> TableSpec {
    let mut columns = vec![
        Column::new("Description", 4.0, Align::Left),
        Column::new("Qty", 0.9, Align::Right),
        Column::new("Rate", 1.3, Align::Right),
    ];
    if mode == BillingMode::Progress {
        columns.push(Column::new("% Complete", 1.2, Align::Right));
    }
    columns.push(Column::new("Amount", 1.4, Align::Right));

    let rows = items
        .iter()
        .map(|item| {
            let mut row = vec![
                item.description.clone(),
                format_quantity(item.quantity),
                format_currency(item.rate),
            ];
            if mode == BillingMode::Progress {
                row.push(format!("{}%", format_quantity(item.percent_complete.unwrap_or(0.0))));
            }
            row.push(format_currency(line_amount(item, mode)));
            row
        })
        .collect();

    TableSpec {
        columns,
        rows,
        empty_message: Some("No line items".to_string()),
    }
}

fn priced_body(
    ctx: &mut RenderContext<'_>,
    y: f32,
    items: &[LineItem],
    mode: BillingMode,
    adj: Adjustments,
    always_shipping: bool,
) -> (f32, Totals) {
    let y = compose_table(ctx, y, &line_item_table(items, mode));
    let totals = compute_totals(items, mode, adj);
    let y = compose_totals(ctx, y, &totals_lines(&totals, adj.tax_rate, always_shipping));
    (y, totals)
}

pub fn compose_invoice(ctx: &mut RenderContext<'_>, lh: &Letterhead<'_>, doc: &Invoice) -> Result<f32> {
    let meta = [
        ("Invoice #", doc.invoice_number.clone()),
        ("Date", lh.header.date.clone()),
        ("Due", doc.due_date.clone()),
    ];
    let y = lh.open_with_client(ctx, "INVOICE", &meta, "Bill To");
    let y = compose_facts(ctx, y, &[("Project", doc.project_name.clone())]);

    let mode = if doc.progress_billing {
        BillingMode::Progress
    } else {
        BillingMode::Standard
    };
    let adj = Adjustments {
        discount: doc.discount,
        tax_rate: doc.tax_rate,
        shipping: doc.shipping,
    };
    let (y, _) = priced_body(ctx, y, &doc.items, mode, adj, false);

    let y = compose_text_section(ctx, y, "Payment Terms", &doc.payment_terms);
    Ok(compose_text_section(ctx, y, "Notes", &doc.notes))
}

fn client_slot(name: &str, image: &Option<String>, signed_at: &Option<String>) -> SignatureSlot {
    SignatureSlot {
        label: "Client".to_string(),
        name: name.to_string(),
        image: image.clone(),
        signed_at: signed_at.clone(),
    }
}

pub fn compose_estimate(ctx: &mut RenderContext<'_>, lh: &Letterhead<'_>, doc: &Estimate) -> Result<f32> {
    let meta = [
        ("Estimate #", doc.estimate_number.clone()),
        ("Date", lh.header.date.clone()),
        ("Valid Until", doc.valid_until.clone()),
    ];
    let y = lh.open_with_client(ctx, "ESTIMATE", &meta, "Prepared For");
    let y = compose_facts(ctx, y, &[("Project", doc.project_name.clone())]);

    let adj = Adjustments {
        discount: doc.discount,
        tax_rate: doc.tax_rate,
        shipping: doc.shipping,
    };
    let (y, _) = priced_body(ctx, y, &doc.items, BillingMode::Standard, adj, false);
    let y = compose_text_section(ctx, y, "Notes", &doc.notes);

    let client = client_slot(&lh.client().name, &doc.client_signature, &doc.client_signed_at);
    Ok(compose_signatures(ctx, y, &lh.contractor_slot(), Some(&client)))
}

/// `+3 working days`, `-1 working day` or `No schedule impact`.
pub fn schedule_impact_label(days: i32) -> String {
    match days {
        0 => "No schedule impact".to_string(),
        1 | -1 => format!("{days:+} working day"),
        _ => format!("{days:+} working days"),
    }
}

pub fn compose_change_order(ctx: &mut RenderContext<'_>, lh: &Letterhead<'_>, doc: &ChangeOrder) -> Result<f32> {
    let meta = [
        ("Change Order #", doc.change_order_number.clone()),
        ("Date", lh.header.date.clone()),
    ];
    let y = lh.open_with_client(ctx, "CHANGE ORDER", &meta, "Client");
    let y = compose_facts(ctx, y, &[("Project", doc.project_name.clone())]);
    let y = compose_text_section(ctx, y, "Reason for Change", &doc.reason);

    let adj = Adjustments {
        discount: doc.discount,
        tax_rate: doc.tax_rate,
        shipping: 0.0,
    };
    let (y, _) = priced_body(ctx, y, &doc.items, BillingMode::Standard, adj, false);

    let y = compose_section_heading(ctx, y, "Schedule Impact");
    let style = ctx.body(10.0).bold();
    let y = ctx.text(
        ctx.geometry.left(),
        y,
        &schedule_impact_label(doc.schedule_impact_days),
        style,
        Align::Left,
    ) + 4.0;

    let client = client_slot(&lh.client().name, &doc.client_signature, &doc.client_signed_at);
    Ok(compose_signatures(ctx, y, &lh.contractor_slot(), Some(&client)))
}

pub fn compose_purchase_order(ctx: &mut RenderContext<'_>, lh: &Letterhead<'_>, doc: &PurchaseOrder) -> Result<f32> {
    let meta = [
        ("PO #", doc.po_number.clone()),
        ("Date", lh.header.date.clone()),
    ];
    let y = lh.open_with_client(ctx, "PURCHASE ORDER", &meta, "Vendor");
    let y = compose_facts(
        ctx,
        y,
        &[
            ("Delivery Date", doc.delivery_date.clone()),
            ("Deliver To", doc.delivery_address.clone()),
        ],
    );

    let adj = Adjustments {
        discount: doc.discount,
        tax_rate: doc.tax_rate,
        shipping: doc.shipping,
    };
    let (y, _) = priced_body(ctx, y, &doc.items, BillingMode::Standard, adj, true);
    Ok(compose_text_section(ctx, y, "Notes", &doc.notes))
}

/// Amount paid and balance rows. A receipt without an explicit amount is
/// paid in full.
pub fn payment_lines(total: f64, amount_paid: Option<f64>) -> Vec<TotalsLine> {
    let paid = amount_paid.unwrap_or(total);
    vec![
        TotalsLine::new("Amount Paid", format_currency(paid)),
        TotalsLine::emphasized("Balance Due", format_currency(total - paid)),
    ]
}

pub fn compose_receipt(ctx: &mut RenderContext<'_>, lh: &Letterhead<'_>, doc: &Receipt) -> Result<f32> {
    let meta = [
        ("Receipt #", doc.receipt_number.clone()),
        ("Date", lh.header.date.clone()),
    ];
    let y = lh.open_with_client(ctx, "RECEIPT", &meta, "Received From");
    let y = compose_facts(ctx, y, &[("Payment Method", doc.payment_method.clone())]);

    let adj = Adjustments {
        discount: doc.discount,
        tax_rate: doc.tax_rate,
        shipping: 0.0,
    };
    let (y, totals) = priced_body(ctx, y, &doc.items, BillingMode::Standard, adj, false);
    let y = compose_totals(ctx, y, &payment_lines(totals.total, doc.amount_paid));
    Ok(compose_text_section(ctx, y, "Notes", &doc.notes))
}
