//! Totals arithmetic shared by every billing composer.
//!
//! Order of operations is fixed: discount comes off the subtotal before tax
//! is applied, shipping is added last and is never taxed.

use crate::document::LineItem;

/// How a line's amount is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BillingMode {
    /// `quantity × rate`
    #[default]
    Standard,
    /// `quantity × rate × percentComplete / 100`
    Progress,
}

/// Document-level adjustments applied after the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Adjustments {
    pub discount: f64,
    /// Percent, e.g. `8.25`.
    pub tax_rate: f64,
    pub shipping: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    pub subtotal: f64,
    pub discount: f64,
    pub taxable: f64,
    pub tax: f64,
    pub shipping: f64,
    pub total: f64,
}

pub fn line_amount(item: &LineItem, mode: BillingMode) -> f64 {
    let base = item.quantity * item.rate;
    match mode {
        BillingMode::Standard => base,
        BillingMode::Progress => base * (item.percent_complete.unwrap_or(0.0) / 100.0),
    }
}

pub fn compute_totals(items: &[LineItem], mode: BillingMode, adj: Adjustments) -> Totals {
    let subtotal: f64 = items.iter().map(|i| line_amount(i, mode)).sum();
    let taxable = subtotal - adj.discount;
    let tax = taxable * adj.tax_rate / 100.0;
    Totals {
        subtotal,
        discount: adj.discount,
        taxable,
        tax,
        shipping: adj.shipping,
        total: taxable + tax + adj.shipping,
    }
}

/// Format an amount as `$1,234.56` (negative amounts as `-$12.00`).
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{frac:02}")
}

/// Format a quantity without trailing zeros (`2`, `1.5`, `0.25`).
pub fn format_quantity(value: f64) -> String {
    let s = format!("{value:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
